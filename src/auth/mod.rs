//! Session verification core: who is the caller, and how sure are we?
//!
//! A [`SessionProbe`] asks the identity provider once and folds the answer into
//! an [`AuthOutcome`]. A [`RetryPolicy`] repeats the probe while the answer is
//! transient and stops at the first definitive one.

pub mod outcome;
pub mod principal;
pub mod probe;
pub mod retry;

pub use outcome::{AuthOutcome, TransientReason};
pub use principal::{AccountType, Principal};
pub use probe::SessionProbe;
pub use retry::RetryPolicy;
