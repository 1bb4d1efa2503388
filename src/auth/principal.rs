use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Marketplace account kind attached to a principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AccountType {
    #[default]
    User,
    Store,
    Other(String),
}

impl AccountType {
    pub fn as_str(&self) -> &str {
        match self {
            AccountType::User => "user",
            AccountType::Store => "store",
            AccountType::Other(other) => other,
        }
    }
}

impl From<&str> for AccountType {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "user" => AccountType::User,
            "store" => AccountType::Store,
            other => AccountType::Other(other.to_string()),
        }
    }
}

impl From<String> for AccountType {
    fn from(value: String) -> Self {
        AccountType::from(value.as_str())
    }
}

impl From<AccountType> for String {
    fn from(value: AccountType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated caller as the identity provider reported it.
///
/// Owned by whichever page or request asked for it; never cached across pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub account_type: AccountType,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl Principal {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            display_name: None,
            account_type: AccountType::User,
            is_verified: false,
            last_sign_in_at: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_account_type(mut self, account_type: AccountType) -> Self {
        self.account_type = account_type;
        self
    }

    pub fn verified(mut self) -> Self {
        self.is_verified = true;
        self
    }

    /// Best human-facing label: display name, then email, then the raw id.
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or(&self.id)
    }

    pub fn has_account_type(&self, required: &AccountType) -> bool {
        &self.account_type == required
    }
}
