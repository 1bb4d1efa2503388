use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub provider: ProviderConfig,
    pub guard: GuardConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

/// Where the identity provider lives and how long a single HTTP call may take.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub url: String,
    pub anon_key: String,
    pub request_timeout_ms: u64,
}

/// Retry and redirect settings shared by every guarded page and API route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub delay_step_ms: u64,
    pub max_delay_ms: u64,
    pub attempt_timeout_ms: u64,
    pub login_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid identity provider URL '{url}': {source}")]
    InvalidProviderUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Identity provider anon key is not configured (set SUPABASE_ANON_KEY)")]
    MissingAnonKey,

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl GuardConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }
}

impl ProviderConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Provider overrides; the NEXT_PUBLIC_ names are what the web app already exports
        if let Some(v) = first_var(&["SUPABASE_URL", "NEXT_PUBLIC_SUPABASE_URL"]) {
            self.provider.url = v;
        }
        if let Some(v) = first_var(&["SUPABASE_ANON_KEY", "NEXT_PUBLIC_SUPABASE_ANON_KEY"]) {
            self.provider.anon_key = v;
        }
        if let Ok(v) = env::var("PROVIDER_REQUEST_TIMEOUT_MS") {
            self.provider.request_timeout_ms = v.parse().unwrap_or(self.provider.request_timeout_ms);
        }

        // Guard overrides
        if let Ok(v) = env::var("GUARD_MAX_ATTEMPTS") {
            self.guard.max_attempts = v.parse().unwrap_or(self.guard.max_attempts);
        }
        if let Ok(v) = env::var("GUARD_INITIAL_DELAY_MS") {
            self.guard.initial_delay_ms = v.parse().unwrap_or(self.guard.initial_delay_ms);
        }
        if let Ok(v) = env::var("GUARD_DELAY_STEP_MS") {
            self.guard.delay_step_ms = v.parse().unwrap_or(self.guard.delay_step_ms);
        }
        if let Ok(v) = env::var("GUARD_MAX_DELAY_MS") {
            self.guard.max_delay_ms = v.parse().unwrap_or(self.guard.max_delay_ms);
        }
        if let Ok(v) = env::var("GUARD_ATTEMPT_TIMEOUT_MS") {
            self.guard.attempt_timeout_ms = v.parse().unwrap_or(self.guard.attempt_timeout_ms);
        }
        if let Ok(v) = env::var("GUARD_LOGIN_PATH") {
            if !v.trim().is_empty() {
                self.guard.login_path = v.trim().to_string();
            }
        }

        // Server overrides
        if let Some(v) = first_var(&["BINNA_AUTH_PORT", "PORT"]) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.server.cors_origins = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            provider: ProviderConfig {
                url: "http://localhost:54321".to_string(),
                anon_key: String::new(),
                request_timeout_ms: 10_000,
            },
            guard: GuardConfig {
                max_attempts: 3,
                initial_delay_ms: 300,
                delay_step_ms: 250,
                max_delay_ms: 800,
                attempt_timeout_ms: 8_000,
                login_path: "/login".to_string(),
            },
            server: ServerConfig {
                port: 3100,
                cors_origins: Vec::new(), // permissive
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            provider: ProviderConfig {
                url: String::new(),
                anon_key: String::new(),
                request_timeout_ms: 8_000,
            },
            guard: GuardConfig {
                max_attempts: 3,
                initial_delay_ms: 300,
                delay_step_ms: 250,
                max_delay_ms: 800,
                attempt_timeout_ms: 6_000,
                login_path: "/login".to_string(),
            },
            server: ServerConfig {
                port: 3100,
                cors_origins: vec!["https://staging.binna.app".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            provider: ProviderConfig {
                url: String::new(),
                anon_key: String::new(),
                request_timeout_ms: 6_000,
            },
            guard: GuardConfig {
                max_attempts: 3,
                initial_delay_ms: 400,
                delay_step_ms: 200,
                max_delay_ms: 800,
                attempt_timeout_ms: 5_000,
                login_path: "/login".to_string(),
            },
            server: ServerConfig {
                port: 3100,
                cors_origins: vec!["https://binna.app".to_string()],
            },
        }
    }
}

fn first_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .find(|v| !v.trim().is_empty())
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}
