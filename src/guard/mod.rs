//! Per-page session gating.
//!
//! ```text
//! Idle --(gate opens)--> Checking --+--> Authorized(principal)
//!                                   +--> Forbidden            (account type mismatch)
//!                                   +--> Denied               (redirect to login, once)
//!                                   +--> Degraded(reason) --(retry)--> Checking
//! ```

pub mod error;
pub mod hydration;
pub mod page;

pub use error::GuardError;
pub use hydration::HydrationGate;
pub use page::{GuardOptions, GuardState, PageGuard};
