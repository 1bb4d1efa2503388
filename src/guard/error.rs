use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("Session check can only be retried from the degraded state (current state: {0})")]
    NotDegraded(&'static str),

    #[error("Page guard is unmounted")]
    Unmounted,
}
