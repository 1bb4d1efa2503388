pub mod auth;
pub mod cli;
pub mod config;
pub mod guard;
pub mod navigation;
pub mod provider;

pub use auth::{AccountType, AuthOutcome, Principal, RetryPolicy, SessionProbe, TransientReason};
pub use guard::{GuardError, GuardOptions, GuardState, HydrationGate, PageGuard};
pub use navigation::Navigator;
pub use provider::{IdentityProvider, ProviderError, SupabaseIdentity};

#[cfg(test)]
pub mod testing;
