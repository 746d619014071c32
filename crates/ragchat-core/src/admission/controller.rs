//! Fixed-window admission controller.
//!
//! One controller instance per limiter: the service runs a credential-keyed
//! instance (per-key overrides) and an origin-keyed instance (single global
//! policy), each with its own [`BucketStore`].

use std::sync::Arc;

use ragchat_types::admission::Decision;

use super::bucket::{BucketStore, RateWindow};
use super::policy::PolicySource;
use crate::clock::{Clock, MonotonicClock};

/// Decides allow/deny for each request on a key.
pub struct AdmissionController<P: PolicySource> {
    scope: &'static str,
    store: BucketStore,
    policies: P,
    clock: Arc<dyn Clock>,
}

impl<P: PolicySource> AdmissionController<P> {
    /// Create a controller using the process monotonic clock.
    ///
    /// `scope` only labels log lines (e.g. "credential", "origin").
    pub fn new(scope: &'static str, policies: P) -> Self {
        Self::with_clock(scope, policies, Arc::new(MonotonicClock))
    }

    pub fn with_clock(scope: &'static str, policies: P, clock: Arc<dyn Clock>) -> Self {
        Self {
            scope,
            store: BucketStore::new(),
            policies,
            clock,
        }
    }

    pub fn scope(&self) -> &'static str {
        self.scope
    }

    pub fn policies(&self) -> &P {
        &self.policies
    }

    /// Admit or deny one request for `key` at `now_ms`.
    ///
    /// The window is reset when `now - start >= window`, before the limit is
    /// evaluated. A denied request does not consume quota.
    pub fn admit(&self, key: &str, now_ms: u64) -> Decision {
        let policy = self.policies.policy_for(key);
        let decision = self.store.with_window(
            key,
            || RateWindow::new(now_ms, policy),
            |window| {
                if window.is_expired(now_ms) {
                    window.window_start_ms = now_ms;
                    window.request_count = 0;
                }

                if window.request_count >= window.limit {
                    let waited = window.elapsed(now_ms);
                    return Decision {
                        allowed: false,
                        limit: window.limit,
                        remaining: 0,
                        retry_after_ms: window.window_ms.saturating_sub(waited),
                    };
                }

                window.request_count += 1;
                Decision {
                    allowed: true,
                    limit: window.limit,
                    remaining: window.limit - window.request_count,
                    retry_after_ms: 0,
                }
            },
        );

        if decision.allowed {
            tracing::debug!(
                scope = self.scope,
                key,
                remaining = decision.remaining,
                limit = decision.limit,
                "request admitted"
            );
        } else {
            tracing::warn!(
                scope = self.scope,
                key,
                limit = decision.limit,
                retry_after_ms = decision.retry_after_ms,
                "rate limit exceeded"
            );
        }

        decision
    }

    /// [`admit`](Self::admit) at the controller's current clock reading.
    pub fn check(&self, key: &str) -> Decision {
        self.admit(key, self.clock.now_ms())
    }

    /// Evict windows that started more than `idle_multiplier` window lengths
    /// before `now_ms`. Returns the number of evicted keys.
    ///
    /// An evicted key behaves exactly like a never-seen key on its next
    /// request, and its old window had long expired, so eviction never
    /// changes a decision.
    pub fn sweep(&self, now_ms: u64, idle_multiplier: u32) -> usize {
        let removed = self.store.retain(|window| {
            let idle_limit = window.window_ms.saturating_mul(u64::from(idle_multiplier.max(1)));
            window.elapsed(now_ms) < idle_limit
        });
        if removed > 0 {
            tracing::debug!(scope = self.scope, removed, remaining = self.store.len(), "swept idle rate windows");
        }
        removed
    }

    /// [`sweep`](Self::sweep) at the controller's current clock reading.
    pub fn sweep_now(&self, idle_multiplier: u32) -> usize {
        self.sweep(self.clock.now_ms(), idle_multiplier)
    }

    /// Copy of the current window for `key`.
    pub fn window(&self, key: &str) -> Option<RateWindow> {
        self.store.snapshot(key)
    }

    /// Number of keys with a live window.
    pub fn tracked_keys(&self) -> usize {
        self.store.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::policy::KeyedPolicies;
    use crate::clock::ManualClock;
    use ragchat_types::admission::RateLimitPolicy;
    use ragchat_types::config::RateLimitOverride;

    fn controller(limit: u32, window_ms: u64) -> AdmissionController<RateLimitPolicy> {
        AdmissionController::new("test", RateLimitPolicy::new(limit, window_ms))
    }

    #[test]
    fn admits_up_to_limit_then_denies() {
        let ctl = controller(5, 60_000);
        for i in 0..5 {
            let d = ctl.admit("k", 10 + i);
            assert!(d.allowed, "request {i} should be admitted");
            assert_eq!(d.remaining, 4 - i as u32);
        }
        let denied = ctl.admit("k", 20);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert_eq!(denied.limit, 5);
    }

    #[test]
    fn example_scenario_limit_three_window_one_second() {
        let ctl = controller(3, 1000);

        let remaining: Vec<u32> = [0, 100, 200]
            .iter()
            .map(|&t| {
                let d = ctl.admit("A", t);
                assert!(d.allowed);
                d.remaining
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let denied = ctl.admit("A", 300);
        assert!(!denied.allowed);
        assert_eq!(denied.retry_after_ms, 700);
        assert_eq!(denied.retry_after_secs(), 0);

        let after_reset = ctl.admit("A", 1001);
        assert!(after_reset.allowed);
        assert_eq!(after_reset.remaining, 2);
    }

    #[test]
    fn denied_just_before_expiry_admitted_just_after() {
        let ctl = controller(1, 1000);
        assert!(ctl.admit("k", 0).allowed);
        let before = ctl.admit("k", 999);
        assert!(!before.allowed);
        assert_eq!(before.retry_after_ms, 1);
        assert!(ctl.admit("k", 1000).allowed);
    }

    #[test]
    fn denials_do_not_consume_quota() {
        let ctl = controller(2, 1000);
        ctl.admit("k", 0);
        ctl.admit("k", 1);
        for t in 2..10 {
            assert!(!ctl.admit("k", t).allowed);
        }
        assert_eq!(ctl.window("k").unwrap().request_count, 2);
    }

    #[test]
    fn zero_limit_denies_first_request() {
        let ctl = controller(0, 1000);
        let d = ctl.admit("k", 0);
        assert!(!d.allowed);
        assert_eq!(d.retry_after_ms, 1000);
    }

    #[test]
    fn distinct_keys_are_independent() {
        let ctl = controller(1, 1000);
        assert!(ctl.admit("a", 0).allowed);
        assert!(!ctl.admit("a", 10).allowed);

        // "b" starts its own window later and is unaffected by "a".
        assert!(ctl.admit("b", 500).allowed);
        assert!(ctl.admit("a", 1000).allowed);
        let b = ctl.admit("b", 1000);
        assert!(!b.allowed);
        assert_eq!(b.retry_after_ms, 500);
    }

    #[test]
    fn per_key_overrides_apply_at_window_creation() {
        let policies = KeyedPolicies::new(RateLimitPolicy::new(5, 60_000)).with_override(
            "vip",
            RateLimitOverride {
                limit: Some(1),
                window_ms: None,
            },
        );
        let ctl = AdmissionController::new("credential", policies);
        assert!(ctl.admit("VIP", 0).allowed);
        assert!(!ctl.admit("VIP", 1).allowed);
        assert_eq!(ctl.admit("other", 1).limit, 5);
    }

    #[test]
    fn check_uses_injected_clock() {
        let clock = ManualClock::new(0);
        let ctl = AdmissionController::with_clock(
            "test",
            RateLimitPolicy::new(1, 1000),
            Arc::new(clock.clone()),
        );
        assert!(ctl.check("k").allowed);
        clock.advance(400);
        assert_eq!(ctl.check("k").retry_after_ms, 600);
        clock.advance(600);
        assert!(ctl.check("k").allowed);
    }

    #[test]
    fn sweep_evicts_only_long_idle_windows() {
        let ctl = controller(5, 1000);
        ctl.admit("stale", 0);
        ctl.admit("fresh", 4500);

        assert_eq!(ctl.sweep(4999, 5), 0);
        assert_eq!(ctl.sweep(5000, 5), 1);
        assert!(ctl.window("stale").is_none());
        assert!(ctl.window("fresh").is_some());

        // An evicted key starts over like a brand new one.
        let d = ctl.admit("stale", 5001);
        assert!(d.allowed);
        assert_eq!(d.remaining, 4);
    }

    #[test]
    fn concurrent_requests_never_over_admit() {
        let ctl = Arc::new(controller(25, 60_000));
        let handles: Vec<_> = (0..50)
            .map(|_| {
                let ctl = Arc::clone(&ctl);
                std::thread::spawn(move || ctl.admit("shared", 100).allowed)
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(admitted, 25);
        assert_eq!(ctl.window("shared").unwrap().request_count, 25);
    }

    #[test]
    fn concurrent_first_requests_create_one_window() {
        let ctl = Arc::new(controller(3, 1000));
        let barrier = Arc::new(std::sync::Barrier::new(8));
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let ctl = Arc::clone(&ctl);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    ctl.admit("new-key", i).allowed
                })
            })
            .collect();
        let admitted = handles
            .into_iter()
            .filter_map(|h| h.join().ok())
            .filter(|a| *a)
            .count();
        assert_eq!(admitted, 3);
        assert_eq!(ctl.tracked_keys(), 1);
    }
}
