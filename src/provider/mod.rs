pub mod error;
pub mod supabase;

use async_trait::async_trait;

use crate::auth::Principal;

pub use error::ProviderError;
pub use supabase::{SignedInSession, SupabaseIdentity};

/// Identity provider client: answers "who is the current caller?".
///
/// Session cookies and tokens belong to the implementation. Callers never read
/// or write them, they only ask for the principal.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn current_principal(&self) -> Result<Principal, ProviderError>;
}
