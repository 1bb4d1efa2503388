use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use url::Url;

use super::{IdentityProvider, ProviderError};
use crate::auth::{AccountType, Principal};
use crate::config::{ConfigError, ProviderConfig};

/// GoTrue error codes that mean "this session is not valid" rather than "try later".
const SESSION_ERROR_CODES: &[&str] = &[
    "bad_jwt",
    "no_authorization",
    "session_not_found",
    "session_expired",
    "user_not_found",
    "refresh_token_not_found",
];

/// Supabase Auth (GoTrue) client for the current caller.
///
/// Holds at most one access token. The host restores it from wherever it
/// persists sessions with [`set_access_token`](Self::set_access_token).
pub struct SupabaseIdentity {
    http: reqwest::Client,
    auth_url: Url,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

/// Result of a password sign-in.
#[derive(Debug, Clone)]
pub struct SignedInSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<u64>,
    pub principal: Principal,
}

#[derive(Debug, Deserialize)]
struct SupabaseUser {
    #[serde(default)]
    id: String,
    email: Option<String>,
    email_confirmed_at: Option<DateTime<Utc>>,
    confirmed_at: Option<DateTime<Utc>>,
    last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    user_metadata: Map<String, Value>,
    #[serde(default)]
    app_metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
    user: SupabaseUser,
}

/// GoTrue has used several error body shapes over the years.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    error_code: Option<String>,
    error: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn code(&self) -> Option<&str> {
        self.error_code.as_deref().or(self.error.as_deref())
    }

    /// The API gateway's answer to a missing or wrong `apikey` header.
    fn is_api_key_complaint(&self) -> bool {
        [&self.message, &self.msg, &self.error_description]
            .into_iter()
            .flatten()
            .any(|text| text.to_ascii_lowercase().contains("api key"))
    }

    fn message(&self) -> String {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
            .or(self.code())
            .unwrap_or("no details")
            .to_string()
    }
}

impl SupabaseUser {
    fn into_principal(self) -> Principal {
        // app_metadata is server-controlled; user_metadata is writable by the user
        let account_type = metadata_str(&self.app_metadata, &["account_type"])
            .or_else(|| metadata_str(&self.user_metadata, &["account_type"]))
            .map(AccountType::from)
            .unwrap_or_default();

        Principal {
            display_name: metadata_str(&self.user_metadata, &["full_name", "name", "display_name"])
                .map(str::to_string),
            is_verified: self.email_confirmed_at.or(self.confirmed_at).is_some(),
            id: self.id,
            email: self.email.filter(|email| !email.is_empty()),
            account_type,
            last_sign_in_at: self.last_sign_in_at,
        }
    }
}

fn metadata_str<'a>(metadata: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| metadata.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|value| !value.is_empty())
}

/// Map a non-success response from the user endpoint onto the error taxonomy.
fn classify_status(status: StatusCode, body: &ErrorBody) -> ProviderError {
    let session_code = body
        .code()
        .map(|code| SESSION_ERROR_CODES.contains(&code))
        .unwrap_or(false);

    match status.as_u16() {
        // a refused anon key is a deployment fault, not a verdict on the session
        401 | 403 if !session_code && body.is_api_key_complaint() => {
            ProviderError::server(status.as_u16(), body.message())
        }
        401 | 403 => ProviderError::Rejected(body.message()),
        400 | 404 if session_code => ProviderError::Rejected(body.message()),
        408 | 504 => ProviderError::Timeout,
        429 => ProviderError::RateLimited,
        other => ProviderError::server(other, body.message()),
    }
}

impl SupabaseIdentity {
    pub fn new(http: reqwest::Client, config: &ProviderConfig) -> Result<Self, ConfigError> {
        let mut base = Url::parse(&config.url).map_err(|source| ConfigError::InvalidProviderUrl {
            url: config.url.clone(),
            source,
        })?;
        if config.anon_key.trim().is_empty() {
            return Err(ConfigError::MissingAnonKey);
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let auth_url = base.join("auth/v1/").map_err(|source| ConfigError::InvalidProviderUrl {
            url: config.url.clone(),
            source,
        })?;

        Ok(Self {
            http,
            auth_url,
            anon_key: config.anon_key.clone(),
            access_token: RwLock::new(None),
        })
    }

    /// Build a client with its own HTTP connection pool and request timeout.
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ConfigError> {
        let http = reqwest::Client::builder().timeout(config.request_timeout()).build()?;
        Self::new(http, config)
    }

    pub fn with_access_token(self, token: impl Into<String>) -> Self {
        Self {
            access_token: RwLock::new(Some(token.into())),
            ..self
        }
    }

    pub async fn set_access_token(&self, token: impl Into<String>) {
        *self.access_token.write().await = Some(token.into());
    }

    pub async fn clear_access_token(&self) {
        *self.access_token.write().await = None;
    }

    pub async fn has_session(&self) -> bool {
        self.access_token.read().await.is_some()
    }

    fn endpoint(&self, path: &str) -> Result<Url, ProviderError> {
        self.auth_url
            .join(path)
            .map_err(|e| ProviderError::InvalidResponse(format!("bad endpoint '{}': {}", path, e)))
    }

    /// Exchange email and password for a session and keep its access token.
    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<SignedInSession, ProviderError> {
        let mut url = self.endpoint("token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let response = self
            .http
            .post(url)
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<ErrorBody>().await.unwrap_or_default();
            // wrong credentials come back as 400 invalid_grant
            return Err(match status.as_u16() {
                400 => ProviderError::Rejected(body.message()),
                _ => classify_status(status, &body),
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        self.set_access_token(token.access_token.clone()).await;
        tracing::info!("Signed in as {}", email);

        Ok(SignedInSession {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_in: token.expires_in,
            principal: token.user.into_principal(),
        })
    }

    /// Ping the auth service. Does not need a session.
    pub async fn health_check(&self) -> Result<(), ProviderError> {
        let response = self
            .http
            .get(self.endpoint("health")?)
            .header("apikey", &self.anon_key)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        Err(classify_status(status, &body))
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn current_principal(&self) -> Result<Principal, ProviderError> {
        let Some(token) = self.access_token.read().await.clone() else {
            return Err(ProviderError::NoSession);
        };

        let response = self
            .http
            .get(self.endpoint("user")?)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            let user: SupabaseUser = response
                .json()
                .await
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            return Ok(user.into_principal());
        }

        let body = response.json::<ErrorBody>().await.unwrap_or_default();
        let err = classify_status(status, &body);
        tracing::debug!("Supabase user lookup failed with {}: {}", status, err);
        Err(err)
    }
}
