// handlers/session.rs - who the verified session belongs to
use axum::Extension;

use binna_auth::auth::{AccountType, Principal};

use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/auth/whoami - principal verified by the session guard
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "id": "0b8f...",
///     "email": "ana@binna.app",
///     "display_name": "Ana",
///     "account_type": "user",
///     "is_verified": true,
///     "last_sign_in_at": "2025-01-01T12:00:00Z"
///   }
/// }
/// ```
pub async fn whoami_get(Extension(principal): Extension<Principal>) -> ApiResult<Principal> {
    Ok(ApiResponse::success(principal))
}

/// GET /api/store/whoami - same, but only for store accounts
pub async fn store_whoami_get(Extension(principal): Extension<Principal>) -> ApiResult<Principal> {
    if !principal.has_account_type(&AccountType::Store) {
        tracing::info!(user_id = %principal.id, account_type = %principal.account_type, "store route refused");
        return Err(ApiError::forbidden("Store account required"));
    }
    Ok(ApiResponse::success(principal))
}
