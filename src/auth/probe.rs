use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use super::outcome::{AuthOutcome, TransientReason};
use crate::provider::IdentityProvider;

/// One bounded question to the identity provider.
///
/// Probing has no side effects besides the provider call itself, so probing
/// twice against the same provider state classifies the same way.
pub struct SessionProbe<P> {
    provider: Arc<P>,
    timeout: Duration,
}

impl<P> Clone for SessionProbe<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            timeout: self.timeout,
        }
    }
}

impl<P: IdentityProvider> SessionProbe<P> {
    pub fn new(provider: Arc<P>, timeout: Duration) -> Self {
        Self { provider, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Ask once. Always resolves to an outcome; provider errors are classified, not returned.
    pub async fn probe(&self) -> AuthOutcome {
        let outcome = match timeout(self.timeout, self.provider.current_principal()).await {
            Ok(result) => AuthOutcome::classify(result, self.timeout),
            Err(_) => AuthOutcome::TransientError(TransientReason::Timeout(self.timeout)),
        };

        match &outcome {
            AuthOutcome::Authenticated(principal) => {
                tracing::debug!(principal = %principal.id, "session probe: authenticated");
            }
            AuthOutcome::Unauthenticated => tracing::debug!("session probe: unauthenticated"),
            AuthOutcome::TransientError(reason) => {
                tracing::debug!(kind = reason.kind(), "session probe: transient failure: {}", reason);
            }
        }

        outcome
    }
}
