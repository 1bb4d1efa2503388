use std::time::Duration;
use thiserror::Error;

use super::principal::Principal;
use crate::provider::ProviderError;

/// Why a probe could not produce a definitive answer.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransientReason {
    #[error("no answer from identity provider within {0:?}")]
    Timeout(Duration),

    #[error("network failure: {0}")]
    Network(String),

    #[error("identity provider error (HTTP {status})")]
    Server { status: u16 },

    #[error("identity provider is rate limiting")]
    RateLimited,

    #[error("unusable identity provider response: {0}")]
    InvalidResponse(String),
}

impl TransientReason {
    pub fn kind(&self) -> &'static str {
        match self {
            TransientReason::Timeout(_) => "timeout",
            TransientReason::Network(_) => "network",
            TransientReason::Server { .. } => "server_error",
            TransientReason::RateLimited => "rate_limited",
            TransientReason::InvalidResponse(_) => "invalid_response",
        }
    }
}

/// Result of one probe attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    Authenticated(Principal),
    Unauthenticated,
    TransientError(TransientReason),
}

impl AuthOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            AuthOutcome::Authenticated(_) => "authenticated",
            AuthOutcome::Unauthenticated => "unauthenticated",
            AuthOutcome::TransientError(_) => "transient",
        }
    }

    /// Authenticated and Unauthenticated end a retry sequence; transient errors do not.
    pub fn is_definitive(&self) -> bool {
        !matches!(self, AuthOutcome::TransientError(_))
    }

    pub fn principal(&self) -> Option<&Principal> {
        match self {
            AuthOutcome::Authenticated(principal) => Some(principal),
            _ => None,
        }
    }

    /// Fold a provider call result into an outcome.
    ///
    /// `timeout` is the per-attempt bound the caller applied, reported back when
    /// the provider itself says it timed out.
    pub fn classify(result: Result<Principal, ProviderError>, timeout: Duration) -> Self {
        match result {
            Ok(principal) if principal.id.trim().is_empty() => AuthOutcome::TransientError(
                TransientReason::InvalidResponse("principal without id".to_string()),
            ),
            Ok(principal) => AuthOutcome::Authenticated(principal),
            Err(err) if err.is_terminal() => AuthOutcome::Unauthenticated,
            Err(ProviderError::Timeout) => AuthOutcome::TransientError(TransientReason::Timeout(timeout)),
            Err(ProviderError::Network(msg)) => AuthOutcome::TransientError(TransientReason::Network(msg)),
            Err(ProviderError::Server { status, .. }) => {
                AuthOutcome::TransientError(TransientReason::Server { status })
            }
            Err(ProviderError::RateLimited) => AuthOutcome::TransientError(TransientReason::RateLimited),
            Err(ProviderError::InvalidResponse(msg)) => {
                AuthOutcome::TransientError(TransientReason::InvalidResponse(msg))
            }
            Err(ProviderError::NoSession) | Err(ProviderError::Rejected(_)) => AuthOutcome::Unauthenticated,
        }
    }
}
