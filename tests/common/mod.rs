#![allow(dead_code)]

use std::collections::HashMap;
use std::process::{Child, Command, Stdio};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};

use binna_auth::config::ProviderConfig;

pub const ANON_KEY: &str = "test-anon-key";
pub const PASSWORD: &str = "correct-horse";

// Bearer tokens the mock identity provider understands
pub const USER_TOKEN: &str = "user-token";
pub const STORE_TOKEN: &str = "store-token";
pub const EXPIRED_TOKEN: &str = "expired-token";
pub const DOWN_TOKEN: &str = "down-token";
pub const SLOW_TOKEN: &str = "slow-token";
/// Any token with this prefix fails twice with 503, then succeeds.
pub const FLAKY_PREFIX: &str = "flaky-";

pub const USER_ID: &str = "5f0c2a9e-1111-4000-8000-000000000001";
pub const STORE_ID: &str = "5f0c2a9e-2222-4000-8000-000000000002";

static PROVIDER: OnceLock<MockProvider> = OnceLock::new();
static SERVER: OnceLock<TestServer> = OnceLock::new();

#[derive(Default)]
struct MockState {
    calls: Mutex<HashMap<String, u32>>,
}

impl MockState {
    fn record(&self, token: &str) -> u32 {
        let mut calls = self.calls.lock().unwrap();
        let count = calls.entry(token.to_string()).or_insert(0);
        *count += 1;
        *count
    }
}

/// Stand-in for Supabase Auth. Runs on its own thread and runtime so it
/// outlives any single #[tokio::test].
pub struct MockProvider {
    pub base_url: String,
    state: Arc<MockState>,
}

impl MockProvider {
    fn spawn() -> Result<Self> {
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = std::net::TcpListener::bind(("127.0.0.1", port)).context("failed to bind mock provider")?;
        listener.set_nonblocking(true)?;

        let state = Arc::new(MockState::default());
        let app = mock_routes(Arc::clone(&state));

        std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .worker_threads(2)
                .enable_all()
                .build()
                .expect("mock provider runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("mock provider listener");
                axum::serve(listener, app).await.expect("mock provider");
            });
        });

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            state,
        })
    }

    /// How many times /auth/v1/user saw this bearer token.
    pub fn calls_for(&self, token: &str) -> u32 {
        self.state.calls.lock().unwrap().get(token).copied().unwrap_or(0)
    }

    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            url: self.base_url.clone(),
            anon_key: ANON_KEY.to_string(),
            request_timeout_ms: 5_000,
        }
    }
}

pub fn mock_provider() -> &'static MockProvider {
    init_tracing();
    PROVIDER.get_or_init(|| MockProvider::spawn().expect("failed to spawn mock identity provider"))
}

fn mock_routes(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/auth/v1/health", get(|| async { Json(json!({ "name": "GoTrue", "version": "mock" })) }))
        .route("/auth/v1/user", get(mock_user))
        .route("/auth/v1/token", post(mock_token))
        .with_state(state)
}

fn user_json(id: &str, email: &str, account_type: &str) -> Value {
    json!({
        "id": id,
        "aud": "authenticated",
        "role": "authenticated",
        "email": email,
        "email_confirmed_at": "2025-01-10T09:00:00Z",
        "last_sign_in_at": "2025-02-01T12:00:00Z",
        "app_metadata": { "provider": "email", "account_type": account_type },
        "user_metadata": { "full_name": "Test Person" }
    })
}

fn gotrue_error(status: StatusCode, error_code: &str, msg: &str) -> Response {
    (
        status,
        Json(json!({ "code": status.as_u16(), "error_code": error_code, "msg": msg })),
    )
        .into_response()
}

async fn mock_user(State(state): State<Arc<MockState>>, headers: HeaderMap) -> Response {
    if headers.get("apikey").and_then(|v| v.to_str().ok()) != Some(ANON_KEY) {
        return (StatusCode::UNAUTHORIZED, Json(json!({ "message": "Invalid API key" }))).into_response();
    }

    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default()
        .to_string();
    let call = state.record(&token);

    match token.as_str() {
        USER_TOKEN => Json(user_json(USER_ID, "ana@binna.app", "user")).into_response(),
        STORE_TOKEN => Json(user_json(STORE_ID, "shop@binna.app", "store")).into_response(),
        EXPIRED_TOKEN => gotrue_error(StatusCode::UNAUTHORIZED, "bad_jwt", "invalid JWT: token is expired"),
        DOWN_TOKEN => gotrue_error(StatusCode::SERVICE_UNAVAILABLE, "unexpected_failure", "database is starting up"),
        SLOW_TOKEN => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(user_json(USER_ID, "ana@binna.app", "user")).into_response()
        }
        flaky if flaky.starts_with(FLAKY_PREFIX) && call <= 2 => {
            gotrue_error(StatusCode::SERVICE_UNAVAILABLE, "unexpected_failure", "upstream connect error")
        }
        flaky if flaky.starts_with(FLAKY_PREFIX) => Json(user_json(USER_ID, "ana@binna.app", "user")).into_response(),
        _ => gotrue_error(StatusCode::FORBIDDEN, "bad_jwt", "invalid JWT: unable to parse or verify signature"),
    }
}

async fn mock_token(Query(query): Query<HashMap<String, String>>, Json(body): Json<Value>) -> Response {
    if query.get("grant_type").map(String::as_str) != Some("password") {
        return gotrue_error(StatusCode::BAD_REQUEST, "validation_failed", "unsupported grant_type");
    }
    if body["password"] != json!(PASSWORD) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant", "error_description": "Invalid login credentials" })),
        )
            .into_response();
    }

    let email = body["email"].as_str().unwrap_or_default();
    Json(json!({
        "access_token": USER_TOKEN,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": "refresh-1",
        "user": user_json(USER_ID, email, "user")
    }))
    .into_response()
}

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn(provider: &MockProvider) -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        // Short delays keep the retry paths fast; the attempt timeout sits below SLOW_TOKEN's sleep
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_binna-auth"));
        cmd.env("APP_ENV", "development")
            .env("BINNA_AUTH_PORT", port.to_string())
            .env("SUPABASE_URL", &provider.base_url)
            .env("SUPABASE_ANON_KEY", ANON_KEY)
            .env("GUARD_MAX_ATTEMPTS", "3")
            .env("GUARD_INITIAL_DELAY_MS", "20")
            .env("GUARD_DELAY_STEP_MS", "10")
            .env("GUARD_MAX_DELAY_MS", "40")
            .env("GUARD_ATTEMPT_TIMEOUT_MS", "500")
            .env("GUARD_LOGIN_PATH", "/login")
            .env_remove("SECURITY_CORS_ORIGINS")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<()> {
        let client = reqwest::Client::new();
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            let url = format!("{}/health", self.base_url);
            if let Ok(resp) = client.get(&url).send().await {
                if resp.status() == reqwest::StatusCode::OK {
                    return Ok(());
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let provider = mock_provider();
    let server = SERVER.get_or_init(|| TestServer::spawn(provider).expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
