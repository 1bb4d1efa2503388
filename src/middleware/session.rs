use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

use binna_auth::auth::{AuthOutcome, RetryPolicy, SessionProbe};
use binna_auth::provider::SupabaseIdentity;

use crate::error::ApiError;
use crate::AppState;

/// Session guard for API routes.
///
/// Runs the same bounded retry a protected page does. A verified principal is
/// injected into the request; a rejected session gets 401 with the login path;
/// a check that never got an answer gets 503 so the client can offer a retry.
pub async fn session_guard_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let login_path = state.guard.login_path.as_str();

    // No token means nothing to restore, so the provider is not asked
    let token = extract_bearer_token(&headers).map_err(|msg| ApiError::unauthenticated(msg, login_path))?;

    let identity = SupabaseIdentity::new(state.http.clone(), &state.provider)
        .map_err(|e| {
            tracing::error!("Identity provider misconfigured: {}", e);
            ApiError::internal_server_error("Identity provider is not configured")
        })?
        .with_access_token(token);

    let probe = SessionProbe::new(Arc::new(identity), state.guard.attempt_timeout());
    match RetryPolicy::from_config(&state.guard).run(&probe).await {
        AuthOutcome::Authenticated(principal) => {
            tracing::debug!(user_id = %principal.id, path = %request.uri().path(), "session verified");
            request.extensions_mut().insert(principal);
            Ok(next.run(request).await)
        }
        AuthOutcome::Unauthenticated => Err(ApiError::unauthenticated("Session is not valid", login_path)),
        AuthOutcome::TransientError(reason) => {
            tracing::warn!(kind = reason.kind(), "session check failed: {}", reason);
            Err(ApiError::auth_check_failed(format!(
                "Couldn't verify your session ({}). Please try again.",
                reason
            )))
        }
    }
}

/// Extract the bearer token from the Authorization header
fn extract_bearer_token(headers: &HeaderMap) -> Result<String, String> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or_else(|| "Missing Authorization header".to_string())?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| "Invalid Authorization header format".to_string())?;

    match auth_str.strip_prefix("Bearer ").map(str::trim) {
        Some(token) if !token.is_empty() => Ok(token.to_string()),
        Some(_) => Err("Empty bearer token".to_string()),
        None => Err("Authorization header must use Bearer scheme".to_string()),
    }
}
