use thiserror::Error;

/// Everything an identity provider call can report besides a principal.
///
/// The first two variants are well-formed negative answers. The rest describe
/// the absence of an answer and must never be read as "not logged in".
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("No active session")]
    NoSession,

    #[error("Session rejected: {0}")]
    Rejected(String),

    #[error("Identity provider timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Identity provider returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Identity provider rate limited the request")]
    RateLimited,

    #[error("Invalid identity provider response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// True when the provider positively answered "there is no valid session".
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProviderError::NoSession | ProviderError::Rejected(_))
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        ProviderError::Rejected(message.into())
    }

    pub fn network(message: impl Into<String>) -> Self {
        ProviderError::Network(message.into())
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        ProviderError::Server {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout
        } else if err.is_decode() {
            ProviderError::InvalidResponse(err.to_string())
        } else {
            // connect refused, reset, DNS, TLS; all of them mean "no answer"
            ProviderError::Network(err.to_string())
        }
    }
}
