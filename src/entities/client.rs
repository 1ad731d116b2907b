// 👤 Client Entity - who buys from the store
//
// Clients are never deleted; deactivation is a soft delete that cascades to
// their purchases (see ledger.rs).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{messages, LedgerError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub nickname: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Short label for lists: nickname when there is one
    pub fn label(&self) -> &str {
        self.nickname.as_deref().unwrap_or(&self.name)
    }
}

// ============================================================================
// INPUT
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl NewClient {
    pub fn new(name: impl Into<String>) -> Self {
        NewClient {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Trim fields, turn blank optionals into `None`, and check name / email
    pub fn normalized(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        validate_name(&name)?;

        let email = blank_to_none(self.email);
        if let Some(email) = &email {
            validate_email(email)?;
        }

        Ok(NewClient {
            name,
            nickname: blank_to_none(self.nickname),
            phone: blank_to_none(self.phone),
            email,
        })
    }
}

/// Partial update; `None` leaves a column untouched, a blank nickname or
/// phone clears it
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl ClientUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.nickname.is_none() && self.phone.is_none() && self.email.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            return Err(LedgerError::validation(messages::DATA_FIELDS_EMPTY));
        }
        if let Some(name) = &self.name {
            validate_name(name.trim())?;
        }
        if let Some(email) = &self.email {
            validate_email(email.trim())?;
        }
        Ok(())
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

const NAME_EXTRA_CHARS: &[char] = &[' ', '.', '\'', '-'];

/// Names are letters (any script) plus space, `.`, `'` and `-`
pub fn is_valid_name(name: &str) -> bool {
    name.chars()
        .all(|ch| ch.is_alphabetic() || NAME_EXTRA_CHARS.contains(&ch))
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || !is_valid_name(name) {
        return Err(LedgerError::validation(messages::CLIENT_INVALID_NAME));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };

    if valid {
        Ok(())
    } else {
        Err(LedgerError::validation(messages::CLIENT_INVALID_EMAIL))
    }
}

pub(crate) fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
