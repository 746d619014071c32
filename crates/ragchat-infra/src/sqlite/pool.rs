//! SQLite pools backing the chat store.
//!
//! Chat traffic is read-heavy (session lookups, message pages) with short
//! bursts of writes (one user turn plus one reply per chat call). Reads get a
//! pool of read-only connections; writes go through a single connection so
//! SQLite never sees two writers. WAL lets the two proceed side by side.
//! Foreign keys are on because message rows rely on `ON DELETE CASCADE` when
//! their session is deleted.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

/// Database file name inside the data directory.
pub const DB_FILE: &str = "ragchat.db";

const READER_CONNECTIONS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Reader pool plus single-connection writer pool over one database file.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (creating if needed) the service database in `data_dir`.
    pub async fn open(data_dir: &Path) -> Result<Self, sqlx::Error> {
        Self::new(&database_url(data_dir)).await
    }

    /// Connect to `database_url` and bring the schema up to date.
    ///
    /// Migrations run on the writer before any reader connects, so readers
    /// never observe a half-migrated schema.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT)
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options.clone())
            .await?;

        let migrator = sqlx::migrate!("../../migrations");
        migrator.run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(READER_CONNECTIONS)
            .connect_with(options.read_only(true))
            .await?;

        tracing::info!(
            url = database_url,
            migrations = migrator.iter().count(),
            readers = READER_CONNECTIONS,
            "chat database ready"
        );
        Ok(Self { reader, writer })
    }

    /// Round-trip a trivial query on a reader connection.
    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.reader).await?;
        Ok(())
    }

    /// Close both pools, waiting for checked-out connections to return.
    /// The writer closes last so the WAL is checkpointed on the way out.
    pub async fn close(&self) {
        self.reader.close().await;
        self.writer.close().await;
        tracing::debug!("chat database closed");
    }
}

/// SQLite URL for the service database inside `data_dir`.
pub fn database_url(data_dir: &Path) -> String {
    format!("sqlite://{}", data_dir.join(DB_FILE).display())
}
