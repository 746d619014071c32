//! SQLite chat repository implementation.
//!
//! Implements `ChatRepository` from `ragchat-core` using sqlx with split
//! read/write pools: raw queries, private Row structs, RFC 3339 timestamps.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::Row;
use uuid::Uuid;

use ragchat_core::chat::repository::ChatRepository;
use ragchat_types::chat::{ChatMessage, ChatSession, MessageRole};
use ragchat_types::error::RepositoryError;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ChatRepository`.
#[derive(Clone)]
pub struct SqliteChatRepository {
    pool: DatabasePool,
}

impl SqliteChatRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatSessionRow {
    id: String,
    user_id: String,
    name: String,
    favorite: bool,
    created_at: String,
    updated_at: String,
}

impl ChatSessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            favorite: row.try_get("favorite")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_session(self) -> Result<ChatSession, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;

        Ok(ChatSession {
            id,
            user_id: self.user_id,
            name: self.name,
            favorite: self.favorite,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

struct ChatMessageRow {
    id: String,
    session_id: String,
    sender: String,
    message: String,
    created_at: String,
    updated_at: String,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            sender: row.try_get("sender")?,
            message: row.try_get("message")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let session_id = Uuid::parse_str(&self.session_id)
            .map_err(|e| RepositoryError::Query(format!("invalid session_id: {e}")))?;
        let sender: MessageRole = self
            .sender
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;

        Ok(ChatMessage {
            id,
            session_id,
            sender,
            message: self.message,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

// ---------------------------------------------------------------------------
// ChatRepository implementation
// ---------------------------------------------------------------------------

impl ChatRepository for SqliteChatRepository {
    async fn create_session(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO chat_sessions (id, user_id, name, favorite, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(session.id.to_string())
        .bind(&session.user_id)
        .bind(&session.name)
        .bind(session.favorite)
        .bind(format_datetime(&session.created_at))
        .bind(format_datetime(&session.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn get_session(&self, session_id: &Uuid) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(query_err)?;

        match row {
            Some(row) => {
                let session_row = ChatSessionRow::from_row(&row).map_err(query_err)?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }

    async fn list_sessions(&self, user_id: &str) -> Result<Vec<ChatSession>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM chat_sessions WHERE user_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let session_row = ChatSessionRow::from_row(row).map_err(query_err)?;
            sessions.push(session_row.into_session()?);
        }

        Ok(sessions)
    }

    async fn update_session(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"UPDATE chat_sessions
               SET name = ?, favorite = ?, updated_at = ?
               WHERE id = ?"#,
        )
        .bind(&session.name)
        .bind(session.favorite)
        .bind(format_datetime(&session.updated_at))
        .bind(session.id.to_string())
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn delete_session(&self, session_id: &Uuid) -> Result<bool, RepositoryError> {
        // Messages go with the session via ON DELETE CASCADE.
        let result = sqlx::query("DELETE FROM chat_sessions WHERE id = ?")
            .bind(session_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(query_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn save_message(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO chat_messages (id, session_id, sender, message, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.session_id.to_string())
        .bind(message.sender.to_string())
        .bind(&message.message)
        .bind(format_datetime(&message.created_at))
        .bind(format_datetime(&message.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(query_err)?;

        Ok(())
    }

    async fn get_messages(
        &self,
        session_id: &Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM chat_messages WHERE session_id = ?
               ORDER BY created_at ASC, id ASC
               LIMIT ? OFFSET ?"#,
        )
        .bind(session_id.to_string())
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let msg_row = ChatMessageRow::from_row(row).map_err(query_err)?;
            messages.push(msg_row.into_message()?);
        }

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_repo() -> (SqliteChatRepository, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = DatabasePool::new(&url).await.unwrap();
        (SqliteChatRepository::new(pool), dir)
    }

    fn make_session(user_id: &str, name: &str) -> ChatSession {
        let now = Utc::now();
        ChatSession {
            id: Uuid::now_v7(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            favorite: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn make_message(session_id: Uuid, sender: MessageRole, text: &str) -> ChatMessage {
        let now = Utc::now();
        ChatMessage {
            id: Uuid::now_v7(),
            session_id,
            sender,
            message: text.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_session() {
        let (repo, _dir) = test_repo().await;
        let session = make_session("123456", "Support");
        repo.create_session(&session).await.unwrap();

        let fetched = repo.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.id, session.id);
        assert_eq!(fetched.user_id, "123456");
        assert_eq!(fetched.name, "Support");
        assert!(!fetched.favorite);
        assert_eq!(
            fetched.created_at.timestamp_micros(),
            session.created_at.timestamp_micros()
        );
    }

    #[tokio::test]
    async fn test_get_missing_session_returns_none() {
        let (repo, _dir) = test_repo().await;
        assert!(repo.get_session(&Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_list_sessions_filters_by_user_newest_first() {
        let (repo, _dir) = test_repo().await;
        let older = make_session("111111", "Older");
        let mut newer = make_session("111111", "Newer");
        newer.created_at = older.created_at + chrono::Duration::seconds(5);
        let other = make_session("222222", "Other");
        for s in [&older, &newer, &other] {
            repo.create_session(s).await.unwrap();
        }

        let listed = repo.list_sessions("111111").await.unwrap();
        let names: Vec<&str> = listed.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Newer", "Older"]);
    }

    #[tokio::test]
    async fn test_update_session() {
        let (repo, _dir) = test_repo().await;
        let mut session = make_session("123456", "Before");
        repo.create_session(&session).await.unwrap();

        session.name = "After".to_string();
        session.favorite = true;
        repo.update_session(&session).await.unwrap();

        let fetched = repo.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "After");
        assert!(fetched.favorite);
    }

    #[tokio::test]
    async fn test_update_missing_session_is_not_found() {
        let (repo, _dir) = test_repo().await;
        let session = make_session("123456", "Ghost");
        assert!(matches!(
            repo.update_session(&session).await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_session_cascades_to_messages() {
        let (repo, _dir) = test_repo().await;
        let session = make_session("123456", "Doomed");
        repo.create_session(&session).await.unwrap();
        repo.save_message(&make_message(session.id, MessageRole::User, "hi"))
            .await
            .unwrap();

        assert!(repo.delete_session(&session.id).await.unwrap());
        assert!(!repo.delete_session(&session.id).await.unwrap());

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM chat_messages")
            .fetch_one(&repo.pool.reader)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_message_requires_existing_session() {
        let (repo, _dir) = test_repo().await;
        let orphan = make_message(Uuid::now_v7(), MessageRole::User, "lost");
        assert!(repo.save_message(&orphan).await.is_err());
    }

    #[tokio::test]
    async fn test_get_messages_ordered_and_paged() {
        let (repo, _dir) = test_repo().await;
        let session = make_session("123456", "Paged");
        repo.create_session(&session).await.unwrap();

        let base = Utc::now();
        for i in 0..5 {
            let mut msg = make_message(session.id, MessageRole::User, &format!("m{i}"));
            msg.created_at = base + chrono::Duration::milliseconds(i);
            repo.save_message(&msg).await.unwrap();
        }

        let page = repo.get_messages(&session.id, 2, 2).await.unwrap();
        let texts: Vec<&str> = page.iter().map(|m| m.message.as_str()).collect();
        assert_eq!(texts, vec!["m2", "m3"]);

        let all = repo.get_messages(&session.id, 100, 0).await.unwrap();
        assert_eq!(all.len(), 5);
        assert_eq!(all[0].sender, MessageRole::User);
    }
}
