//! Concurrent store of per-key counting windows.
//!
//! Backed by a sharded `DashMap` so unrelated keys never contend on a single
//! lock. Each entry owns its own `Mutex<RateWindow>`; the reset, increment,
//! and limit check for one key run under that mutex as a single unit.
//!
//! Mutation happens while the shard guard is still held (shared for existing
//! keys, exclusive for the first request of a key). `retain` needs the
//! exclusive shard guard, so a sweep can never evict a window that a request
//! is in the middle of updating.

use std::sync::Mutex;

use dashmap::DashMap;

use ragchat_types::admission::RateLimitPolicy;

/// Counting window for one rate-limit key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateWindow {
    /// Instant (clock milliseconds) the current window began.
    pub window_start_ms: u64,
    /// Requests admitted in the current window.
    pub request_count: u32,
    pub limit: u32,
    pub window_ms: u64,
}

impl RateWindow {
    /// A fresh, empty window starting at `now_ms`.
    pub fn new(now_ms: u64, policy: RateLimitPolicy) -> Self {
        Self {
            window_start_ms: now_ms,
            request_count: 0,
            limit: policy.limit,
            window_ms: policy.window_ms,
        }
    }

    /// Milliseconds elapsed in the current window. Zero if `now_ms` is
    /// earlier than the window start (callers may race on the clock read).
    pub fn elapsed(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.window_start_ms)
    }

    pub fn is_expired(&self, now_ms: u64) -> bool {
        self.elapsed(now_ms) >= self.window_ms
    }
}

/// Mapping from rate-limit key to its counting window.
#[derive(Debug, Default)]
pub struct BucketStore {
    buckets: DashMap<String, Mutex<RateWindow>>,
}

impl BucketStore {
    pub fn new() -> Self {
        Self {
            buckets: DashMap::new(),
        }
    }

    /// Run `f` against the window for `key`, creating it with `init` on first use.
    ///
    /// Calls for the same key are serialized; calls for different keys only
    /// share a shard read guard.
    pub fn with_window<R>(
        &self,
        key: &str,
        init: impl FnOnce() -> RateWindow,
        f: impl FnOnce(&mut RateWindow) -> R,
    ) -> R {
        if let Some(bucket) = self.buckets.get(key) {
            let mut window = bucket.lock().expect("rate window lock poisoned");
            return f(&mut window);
        }

        let bucket = self
            .buckets
            .entry(key.to_string())
            .or_insert_with(|| Mutex::new(init()));
        let mut window = bucket.lock().expect("rate window lock poisoned");
        f(&mut window)
    }

    /// Copy of the window for `key`, if one exists.
    pub fn snapshot(&self, key: &str) -> Option<RateWindow> {
        self.buckets
            .get(key)
            .map(|bucket| *bucket.lock().expect("rate window lock poisoned"))
    }

    /// Keep only the windows for which `keep` returns true. Returns how many
    /// windows were removed.
    pub fn retain(&self, mut keep: impl FnMut(&RateWindow) -> bool) -> usize {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            let window = bucket.get_mut().expect("rate window lock poisoned");
            keep(window)
        });
        before.saturating_sub(self.buckets.len())
    }

    /// Number of keys currently tracked.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
