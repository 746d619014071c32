//! Background eviction of idle rate-limit windows.
//!
//! Both bucket stores would otherwise keep one entry per key ever seen. The
//! sweeper wakes every `sweep_interval_ms` and drops windows that started
//! more than `idle_multiplier` window lengths ago.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::state::{AppState, CredentialLimiter, OriginLimiter};

pub struct Sweeper {
    credential: Arc<CredentialLimiter>,
    origin: Arc<OriginLimiter>,
    interval: Duration,
    idle_multiplier: u32,
}

impl Sweeper {
    pub fn new(
        credential: Arc<CredentialLimiter>,
        origin: Arc<OriginLimiter>,
        interval: Duration,
        idle_multiplier: u32,
    ) -> Self {
        Self {
            credential,
            origin,
            // tokio::time::interval panics on a zero period.
            interval: interval.max(Duration::from_millis(1)),
            idle_multiplier,
        }
    }

    /// Sweeper over the state's limiters, tuned by its rate-limit config.
    pub fn from_state(state: &AppState) -> Self {
        let rl = &state.config.rate_limit;
        Self::new(
            Arc::clone(&state.credential_limiter),
            Arc::clone(&state.origin_limiter),
            Duration::from_millis(rl.sweep_interval_ms),
            rl.idle_multiplier,
        )
    }

    /// One pass over both stores. Returns the number of windows removed.
    pub fn sweep_once(&self) -> usize {
        self.credential.sweep_now(self.idle_multiplier) + self.origin.sweep_now(self.idle_multiplier)
    }

    /// Run until `cancel` fires.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        self.sweep_once();
                    }
                }
            }
            tracing::debug!("Rate-limit sweeper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragchat_core::admission::{AdmissionController, KeyedPolicies};
    use ragchat_core::clock::ManualClock;
    use ragchat_types::admission::RateLimitPolicy;

    fn limiters(clock: &ManualClock) -> (Arc<CredentialLimiter>, Arc<OriginLimiter>) {
        let policy = RateLimitPolicy::new(5, 1_000);
        let credential = AdmissionController::with_clock(
            "api_key",
            KeyedPolicies::new(policy),
            Arc::new(clock.clone()),
        );
        let origin = AdmissionController::with_clock("origin", policy, Arc::new(clock.clone()));
        (Arc::new(credential), Arc::new(origin))
    }

    #[test]
    fn test_sweep_once_keeps_recent_windows() {
        let clock = ManualClock::new(0);
        let (credential, origin) = limiters(&clock);
        credential.check("alpha");
        origin.check("10.0.0.1");

        clock.set(3_000);
        credential.check("beta");

        let sweeper = Sweeper::new(credential.clone(), origin.clone(), Duration::from_secs(1), 2);
        assert_eq!(sweeper.sweep_once(), 2);
        assert_eq!(credential.tracked_keys(), 1);
        assert!(credential.window("beta").is_some());
        assert_eq!(origin.tracked_keys(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sweeper_runs_and_stops() {
        let clock = ManualClock::new(0);
        let (credential, origin) = limiters(&clock);
        credential.check("alpha");
        origin.check("10.0.0.1");
        clock.set(10_000);

        let cancel = CancellationToken::new();
        let handle = Sweeper::new(credential.clone(), origin.clone(), Duration::from_secs(60), 5)
            .spawn(cancel.clone());

        tokio::time::sleep(Duration::from_secs(61)).await;
        assert_eq!(credential.tracked_keys(), 0);
        assert_eq!(origin.tracked_keys(), 0);

        cancel.cancel();
        handle.await.unwrap();
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let clock = ManualClock::new(0);
        let (credential, origin) = limiters(&clock);
        let sweeper = Sweeper::new(credential, origin, Duration::ZERO, 5);
        assert_eq!(sweeper.interval, Duration::from_millis(1));
    }
}
