use std::time::Duration;

use super::outcome::AuthOutcome;
use super::probe::SessionProbe;
use crate::config::GuardConfig;
use crate::provider::IdentityProvider;

/// Bounded, sequential retries of a [`SessionProbe`].
///
/// Only transient errors are retried. When every attempt fails transiently the
/// last transient reason is returned as-is; it is never turned into
/// `Unauthenticated`.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
    delay_step: Duration,
    max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(300),
            delay_step: Duration::from_millis(250),
            max_delay: Duration::from_millis(800),
        }
    }
}

impl RetryPolicy {
    /// Fixed delay between attempts. `max_attempts` is clamped to at least 1.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay: delay,
            delay_step: Duration::ZERO,
            max_delay: delay,
        }
    }

    /// Grow the delay by `step` after every failed attempt, never beyond `max_delay`.
    pub fn with_delay_step(mut self, step: Duration, max_delay: Duration) -> Self {
        self.delay_step = step;
        self.max_delay = max_delay.max(self.initial_delay);
        self
    }

    pub fn from_config(config: &GuardConfig) -> Self {
        Self::fixed(config.max_attempts, Duration::from_millis(config.initial_delay_ms)).with_delay_step(
            Duration::from_millis(config.delay_step_ms),
            Duration::from_millis(config.max_delay_ms),
        )
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait applied after failed attempt `attempt` (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let grown = self
            .delay_step
            .saturating_mul(attempt.saturating_sub(1))
            .saturating_add(self.initial_delay);
        grown.min(self.max_delay)
    }

    pub async fn run<P: IdentityProvider>(&self, probe: &SessionProbe<P>) -> AuthOutcome {
        self.run_observed(probe, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_attempt` with the attempt number before each probe.
    pub async fn run_observed<P, F>(&self, probe: &SessionProbe<P>, mut on_attempt: F) -> AuthOutcome
    where
        P: IdentityProvider,
        F: FnMut(u32),
    {
        let mut attempt = 1;
        loop {
            on_attempt(attempt);

            match probe.probe().await {
                AuthOutcome::TransientError(reason) if attempt < self.max_attempts => {
                    let delay = self.delay_after(attempt);
                    tracing::debug!(
                        "Session check attempt {}/{} failed ({}), retrying in {:?}",
                        attempt,
                        self.max_attempts,
                        reason,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                AuthOutcome::TransientError(reason) => {
                    tracing::warn!(
                        "Session check gave up after {} attempts: {}",
                        self.max_attempts,
                        reason
                    );
                    return AuthOutcome::TransientError(reason);
                }
                definitive => return definitive,
            }
        }
    }
}
