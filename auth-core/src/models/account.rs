//! Account model - user accounts as seen by the auth core.
//!
//! Accounts are owned by the external user directory; this core reads them
//! for credential checks and writes back credential, role, and 2FA state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use crate::models::Role;

/// User account entity.
///
/// `password_hash` is an argon2 PHC string; the plaintext secret never
/// appears here. `totp_secret`, when present, is non-empty base32 and must
/// never be logged - the `Debug` impl redacts both fields.
#[derive(Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Uuid,
    /// Unique login identifier.
    pub email: String,
    pub password_hash: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    /// Always non-empty. `BTreeSet` keeps a defined ordering.
    pub roles: BTreeSet<Role>,
    /// Shared TOTP secret, present once enrollment has started.
    pub totp_secret: Option<String>,
    /// Enrollment is pending until the first code is confirmed.
    pub totp_confirmed: bool,
    /// Restaurants this account manages; feeds the manager session claim.
    pub managed_restaurants: Vec<i64>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account carrying the `Unverified` role sentinel.
    pub fn new(
        email: String,
        password_hash: String,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Self {
        let mut roles = BTreeSet::new();
        roles.insert(Role::Unverified);

        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            first_name,
            last_name,
            roles,
            totp_secret: None,
            totp_confirmed: false,
            managed_restaurants: Vec::new(),
            last_login_at: None,
            created_at: Utc::now(),
        }
    }

    /// 2FA is enforced only after the shared secret has been confirmed once.
    pub fn two_factor_enabled(&self) -> bool {
        self.totp_secret.is_some() && self.totp_confirmed
    }

    pub fn is_unverified(&self) -> bool {
        self.roles.contains(&Role::Unverified)
    }

    /// Replace the unverified marker with the baseline customer role.
    pub fn mark_verified(&mut self) {
        self.roles.remove(&Role::Unverified);
        self.roles.insert(Role::Customer);
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    pub fn grant_role(&mut self, role: Role) {
        self.roles.insert(role);
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("first_name", &self.first_name)
            .field("last_name", &self.last_name)
            .field("roles", &self.roles)
            .field("totp_secret", &self.totp_secret.as_ref().map(|_| "<redacted>"))
            .field("totp_confirmed", &self.totp_confirmed)
            .field("managed_restaurants", &self.managed_restaurants)
            .field("last_login_at", &self.last_login_at)
            .field("created_at", &self.created_at)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account::new(
            "bob@x.com".to_string(),
            "$argon2id$fake".to_string(),
            Some("Bob".to_string()),
            None,
        )
    }

    #[test]
    fn test_new_account_is_unverified() {
        let account = account();
        assert!(account.is_unverified());
        assert_eq!(account.roles.len(), 1);
        assert!(account.last_login_at.is_none());
    }

    #[test]
    fn test_mark_verified_swaps_sentinel_for_customer() {
        let mut account = account();
        account.mark_verified();

        assert!(!account.is_unverified());
        assert!(account.has_role(Role::Customer));
        // Roles stay non-empty through the transition.
        assert!(!account.roles.is_empty());
    }

    #[test]
    fn test_two_factor_requires_confirmation() {
        let mut account = account();
        assert!(!account.two_factor_enabled());

        account.totp_secret = Some("JBSWY3DPEHPK3PXP".to_string());
        assert!(!account.two_factor_enabled());

        account.totp_confirmed = true;
        assert!(account.two_factor_enabled());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut account = account();
        account.totp_secret = Some("JBSWY3DPEHPK3PXP".to_string());

        let debug = format!("{:?}", account);
        assert!(!debug.contains("argon2"));
        assert!(!debug.contains("JBSWY3DPEHPK3PXP"));
    }

    #[test]
    fn test_grant_role_is_idempotent() {
        let mut account = account();
        account.grant_role(Role::Manager);
        account.grant_role(Role::Manager);
        assert!(account.has_role(Role::Manager));
        assert_eq!(account.roles.len(), 2);
    }
}
