//! Read-through cache in front of the chat repository.
//!
//! Three maps: sessions by id, session lists by user, and message pages by
//! `(session, page, size)`. `ChatService` fills them on reads and evicts on
//! every write.
//!
//! Fills are guarded by a generation counter. A reader snapshots the
//! generation before going to the repository and only stores its result if
//! no eviction happened in between, so a slow read can never put back data
//! that a concurrent write has already invalidated.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde::Serialize;
use uuid::Uuid;

use ragchat_types::chat::{ChatMessage, ChatSession};

/// Key of one cached message page: session, normalized page, clamped size.
pub type PageKey = (Uuid, u32, u32);

/// Snapshot of the eviction counter, taken before a repository read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

#[derive(Debug, Default)]
pub struct ChatCache {
    sessions: DashMap<Uuid, ChatSession>,
    by_user: DashMap<String, Vec<ChatSession>>,
    pages: DashMap<PageKey, Vec<ChatMessage>>,
    generation: AtomicU64,
}

/// Entry counts per map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub sessions: usize,
    pub session_lists: usize,
    pub message_pages: usize,
}

impl ChatCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        Generation(self.generation.load(Ordering::Acquire))
    }

    pub fn session(&self, id: &Uuid) -> Option<ChatSession> {
        self.sessions.get(id).map(|s| s.value().clone())
    }

    pub fn sessions_of(&self, user_id: &str) -> Option<Vec<ChatSession>> {
        self.by_user.get(user_id).map(|l| l.value().clone())
    }

    pub fn page(&self, key: &PageKey) -> Option<Vec<ChatMessage>> {
        self.pages.get(key).map(|p| p.value().clone())
    }

    pub fn fill_session(&self, seen: Generation, session: &ChatSession) {
        fill(&self.sessions, &self.generation, seen, session.id, session.clone());
    }

    pub fn fill_sessions_of(&self, seen: Generation, user_id: &str, sessions: &[ChatSession]) {
        fill(
            &self.by_user,
            &self.generation,
            seen,
            user_id.to_string(),
            sessions.to_vec(),
        );
    }

    pub fn fill_page(&self, seen: Generation, key: PageKey, messages: &[ChatMessage]) {
        fill(&self.pages, &self.generation, seen, key, messages.to_vec());
    }

    /// A session was created, renamed or toggled: its entry and its user's
    /// list are stale.
    pub fn evict_session(&self, session: &ChatSession) {
        self.bump();
        self.sessions.remove(&session.id);
        self.by_user.remove(&session.user_id);
    }

    /// A session was deleted. Its owner may be unknown here, so any cached
    /// list containing it goes too, along with all of its message pages.
    pub fn evict_deleted(&self, id: &Uuid) {
        self.bump();
        self.sessions.remove(id);
        self.by_user.retain(|_, list| list.iter().all(|s| s.id != *id));
        self.pages.retain(|(session_id, _, _), _| session_id != id);
    }

    /// A message was stored: every cached page of that session is stale.
    pub fn evict_pages(&self, session_id: &Uuid) {
        self.bump();
        self.pages.retain(|(id, _, _), _| id != session_id);
    }

    pub fn clear(&self) -> CacheStats {
        self.bump();
        let stats = self.stats();
        self.sessions.clear();
        self.by_user.clear();
        self.pages.clear();
        stats
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            sessions: self.sessions.len(),
            session_lists: self.by_user.len(),
            message_pages: self.pages.len(),
        }
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

/// Store `value` unless an eviction happened since `seen`. The generation is
/// checked while the entry's shard is locked, so an eviction that bumps after
/// the check still removes the value once the lock is released.
fn fill<K, V>(map: &DashMap<K, V>, generation: &AtomicU64, seen: Generation, key: K, value: V)
where
    K: std::hash::Hash + Eq,
{
    let entry = map.entry(key);
    if generation.load(Ordering::Acquire) != seen.0 {
        return;
    }
    match entry {
        Entry::Occupied(mut e) => {
            e.insert(value);
        }
        Entry::Vacant(e) => {
            e.insert(value);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use ragchat_types::chat::MessageRole;

    use super::*;

    fn session(user: &str) -> ChatSession {
        let now = Utc::now();
        ChatSession {
            id: Uuid::now_v7(),
            user_id: user.to_string(),
            name: "Cached".to_string(),
            favorite: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn message(session_id: Uuid) -> ChatMessage {
        let now = Utc::now();
        ChatMessage {
            id: Uuid::now_v7(),
            session_id,
            sender: MessageRole::User,
            message: "hi".to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn fill_is_skipped_after_concurrent_eviction() {
        let cache = ChatCache::new();
        let s = session("123456");

        let seen = cache.generation();
        cache.evict_session(&s);
        cache.fill_session(seen, &s);
        assert!(cache.session(&s.id).is_none());

        cache.fill_session(cache.generation(), &s);
        assert_eq!(cache.session(&s.id), Some(s));
    }

    #[test]
    fn evict_deleted_drops_lists_and_pages_of_that_session() {
        let cache = ChatCache::new();
        let doomed = session("123456");
        let kept = session("654321");
        let g = cache.generation();
        cache.fill_session(g, &doomed);
        cache.fill_sessions_of(g, "123456", &[doomed.clone()]);
        cache.fill_sessions_of(g, "654321", &[kept.clone()]);
        cache.fill_page(g, (doomed.id, 1, 10), &[message(doomed.id)]);
        cache.fill_page(g, (kept.id, 1, 10), &[message(kept.id)]);

        cache.evict_deleted(&doomed.id);
        assert!(cache.session(&doomed.id).is_none());
        assert!(cache.sessions_of("123456").is_none());
        assert!(cache.sessions_of("654321").is_some());
        assert!(cache.page(&(doomed.id, 1, 10)).is_none());
        assert!(cache.page(&(kept.id, 1, 10)).is_some());
    }

    #[test]
    fn evict_pages_keeps_other_sessions() {
        let cache = ChatCache::new();
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let g = cache.generation();
        cache.fill_page(g, (a, 1, 10), &[]);
        cache.fill_page(g, (a, 2, 10), &[]);
        cache.fill_page(g, (b, 1, 10), &[]);

        cache.evict_pages(&a);
        assert_eq!(cache.stats().message_pages, 1);
        assert!(cache.page(&(b, 1, 10)).is_some());
    }

    #[test]
    fn clear_reports_what_was_dropped() {
        let cache = ChatCache::new();
        let s = session("123456");
        let g = cache.generation();
        cache.fill_session(g, &s);
        cache.fill_sessions_of(g, "123456", &[s.clone()]);

        let dropped = cache.clear();
        assert_eq!(
            dropped,
            CacheStats {
                sessions: 1,
                session_lists: 1,
                message_pages: 0
            }
        );
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
