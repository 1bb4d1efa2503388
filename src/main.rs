use anyhow::Context;
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use binna_auth::config::{self, AppConfig, GuardConfig, ProviderConfig};
use binna_auth::provider::SupabaseIdentity;

mod error;
mod handlers;
mod middleware;

/// Shared by every request. The reqwest client pools connections to the
/// identity provider; each request gets its own session on top of it.
#[derive(Clone)]
pub struct AppState {
    pub http: reqwest::Client,
    pub provider: ProviderConfig,
    pub guard: GuardConfig,
}

impl AppState {
    fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.provider.request_timeout())
            .build()
            .context("failed to build HTTP client")?;

        // Fail at startup rather than on the first request
        SupabaseIdentity::new(http.clone(), &config.provider).context("invalid identity provider configuration")?;

        Ok(Self {
            http,
            provider: config.provider.clone(),
            guard: config.guard.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SUPABASE_URL and friends
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    tracing::info!("Starting Binna auth guard in {:?} mode", config.environment);
    if binna_auth::is_production!() && config.server.cors_origins.is_empty() {
        tracing::warn!("No CORS origins configured in production; allowing any origin");
    }

    let state = AppState::from_config(config)?;
    let app = app(state, &config.server.cors_origins);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    println!("🚀 Binna auth guard listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server")?;
    Ok(())
}

fn app(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .with_state(state.clone())
        // Behind the session guard
        .merge(guarded_routes(state))
        // Global middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins)),
        )
}

fn guarded_routes(state: AppState) -> Router {
    use handlers::session;

    Router::new()
        .route("/api/auth/whoami", get(session::whoami_get))
        .route("/api/store/whoami", get(session::store_whoami_get))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::session_guard_middleware,
        ))
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "success": true,
        "data": {
            "name": "Binna auth guard",
            "version": version,
            "description": "Session verification in front of Binna's protected pages",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "whoami": "/api/auth/whoami (session required)",
                "store": "/api/store/whoami (store account required)",
            }
        }
    }))
}

async fn health(axum::extract::State(state): axum::extract::State<AppState>) -> impl IntoResponse {
    let now = chrono::Utc::now();

    let checked = match SupabaseIdentity::new(state.http.clone(), &state.provider) {
        Ok(identity) => identity.health_check().await.map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };

    match checked {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "identity_provider": "ok"
                }
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "success": false,
                "error": "identity provider unavailable",
                "data": {
                    "status": "degraded",
                    "timestamp": now,
                    "identity_provider_error": e
                }
            })),
        ),
    }
}
