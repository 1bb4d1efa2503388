pub mod auth;
pub mod page;

use std::sync::Arc;

use crate::cli::config::load_session;
use crate::config::config;
use crate::provider::SupabaseIdentity;

/// Identity client for the configured provider, not yet holding a session.
pub(crate) fn identity_client() -> anyhow::Result<Arc<SupabaseIdentity>> {
    Ok(Arc::new(SupabaseIdentity::from_config(&config().provider)?))
}

/// Attach the stored session, if any, to the identity client.
pub(crate) async fn restore_session(identity: &SupabaseIdentity) -> anyhow::Result<bool> {
    match load_session()? {
        Some(stored) => {
            if stored.looks_expired() {
                tracing::debug!("Stored session looks expired; letting the provider decide");
            }
            identity.set_access_token(stored.access_token).await;
            Ok(true)
        }
        None => Ok(false),
    }
}
