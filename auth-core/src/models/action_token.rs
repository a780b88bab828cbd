//! Single-use action tokens for out-of-band account flows.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The out-of-band flow a token belongs to. A token is bound to exactly one
/// kind and one account for its entire lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionTokenKind {
    EmailConfirmation,
    PasswordReset,
}

impl ActionTokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionTokenKind::EmailConfirmation => "EMAIL_CONFIRMATION",
            ActionTokenKind::PasswordReset => "PASSWORD_RESET",
        }
    }
}

/// A time-limited, single-use token delivered out-of-band (email link).
///
/// Consumption flips `used`; records are never deleted, and validity is
/// computed on read, so no expiry sweep is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionToken {
    /// Opaque value, used both as lookup key and bearer secret.
    pub value: String,
    pub kind: ActionTokenKind,
    pub account_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
}

impl ActionToken {
    pub fn new(value: String, kind: ActionTokenKind, account_id: Uuid, ttl_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            value,
            kind,
            account_id,
            created_at: now,
            expires_at: now + Duration::hours(ttl_hours),
            used: false,
        }
    }

    /// A token is redeemable iff it has not been consumed and `now` falls
    /// inside its validity window.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        !self.used && now >= self.created_at && now < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}
