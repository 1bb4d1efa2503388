use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const SESSION_FILE: &str = "session.json";

/// Session persisted between CLI invocations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSession {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub email: Option<String>,
    pub saved_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl StoredSession {
    pub fn new(access_token: String, refresh_token: Option<String>, email: Option<String>, expires_in: Option<u64>) -> Self {
        let saved_at = Utc::now();
        let expires_at = expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| saved_at + Duration::seconds(secs));

        Self {
            access_token,
            refresh_token,
            email,
            saved_at,
            expires_at,
        }
    }

    /// Local hint only. The identity provider stays the authority on validity.
    pub fn looks_expired(&self) -> bool {
        self.expires_at.map(|at| at <= Utc::now()).unwrap_or(false)
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("BINNA_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME").map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("binna").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_session() -> anyhow::Result<Option<StoredSession>> {
    load_session_from(&get_config_dir()?)
}

pub fn save_session(session: &StoredSession) -> anyhow::Result<()> {
    save_session_to(&get_config_dir()?, session)
}

pub fn clear_session() -> anyhow::Result<bool> {
    clear_session_in(&get_config_dir()?)
}

pub fn load_session_from(dir: &Path) -> anyhow::Result<Option<StoredSession>> {
    let session_file = dir.join(SESSION_FILE);

    if !session_file.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(session_file)?;
    let session: StoredSession = serde_json::from_str(&content)?;
    Ok(Some(session))
}

pub fn save_session_to(dir: &Path, session: &StoredSession) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(session)?;
    fs::write(dir.join(SESSION_FILE), content)?;
    Ok(())
}

pub fn clear_session_in(dir: &Path) -> anyhow::Result<bool> {
    let session_file = dir.join(SESSION_FILE);
    if !session_file.exists() {
        return Ok(false);
    }
    fs::remove_file(session_file)?;
    Ok(true)
}
