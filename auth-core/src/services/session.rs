//! Session token service: self-contained signed bearer tokens.
//!
//! Tokens are HMAC-signed (HS256) with the single configured secret and are
//! never stored server-side. There is no revocation list: a leaked token
//! stays valid until its expiry horizon.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::models::{Account, Role};
use crate::services::AuthError;

/// Claims embedded in a session token.
///
/// A read-only snapshot taken at issuance: later role changes on the account
/// do not affect tokens already in flight until they are reissued.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: the account's login identifier.
    pub sub: String,
    /// Fixed issuer string.
    pub iss: String,
    /// Issued at (Unix timestamp).
    pub iat: i64,
    /// Expiration time (Unix timestamp).
    pub exp: i64,
    /// Role snapshot, sorted.
    pub roles: Vec<Role>,
    /// Restaurants the subject manages; present on manager tokens only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurants: Option<Vec<i64>>,
}

/// Contextual claims attached at issuance.
#[derive(Debug, Clone, Default)]
pub struct SessionExtras {
    pub restaurants: Option<Vec<i64>>,
}

/// Issues and validates session tokens. Pure in-memory computation on both
/// paths; neither acquires a lock nor touches storage.
#[derive(Clone)]
pub struct SessionTokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl SessionTokenService {
    pub fn new(config: &AuthConfig) -> Self {
        Self::with_secret(
            config.signing_secret.expose_secret().as_bytes(),
            &config.issuer,
            Duration::days(config.session_ttl_days),
        )
    }

    /// Build a service from raw parts, with an explicit token lifetime.
    pub fn with_secret(secret: &[u8], issuer: &str, ttl: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.to_string(),
            ttl,
        }
    }

    /// Issue a token for an account, snapshotting its current roles.
    pub fn issue(&self, account: &Account, extras: &SessionExtras) -> Result<String, AuthError> {
        let now = Utc::now();

        let claims = SessionClaims {
            sub: account.email.clone(),
            iss: self.issuer.clone(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            roles: account.roles.iter().copied().collect(),
            restaurants: extras.restaurants.clone(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(anyhow::anyhow!("Failed to encode session token: {}", e)))
    }

    /// Validate a token and return its claims.
    ///
    /// The accepted algorithm is pinned to HS256; the token's own header
    /// cannot select another one. Signature mismatch, structural
    /// malformation, issuer mismatch, and expiry all collapse into
    /// [`AuthError::SessionTokenInvalid`] - no foreign error escapes this
    /// boundary.
    pub fn validate(&self, token: &str) -> Result<SessionClaims, AuthError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|_| AuthError::SessionTokenInvalid)
    }

    /// Subject of previously validated claims.
    pub fn subject<'a>(&self, claims: &'a SessionClaims) -> &'a str {
        &claims.sub
    }

    /// Role snapshot of previously validated claims.
    pub fn roles<'a>(&self, claims: &'a SessionClaims) -> &'a [Role] {
        &claims.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn service() -> SessionTokenService {
        SessionTokenService::with_secret(SECRET, "test-issuer", Duration::days(7))
    }

    fn account() -> Account {
        let mut account = Account::new(
            "bob@x.com".to_string(),
            "$argon2id$fake".to_string(),
            None,
            None,
        );
        account.mark_verified();
        account
    }

    #[test]
    fn test_issue_then_validate_preserves_claims() {
        let service = service();
        let account = account();

        let token = service.issue(&account, &SessionExtras::default()).unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(service.subject(&claims), "bob@x.com");
        assert_eq!(service.roles(&claims), &[Role::Customer]);
        assert_eq!(claims.iss, "test-issuer");
        assert!(claims.exp > claims.iat);
        assert!(claims.restaurants.is_none());
    }

    #[test]
    fn test_validation_is_idempotent() {
        let service = service();
        let token = service.issue(&account(), &SessionExtras::default()).unwrap();

        let first = service.validate(&token).unwrap();
        let second = service.validate(&token).unwrap();

        assert_eq!(first.sub, second.sub);
        assert_eq!(first.iat, second.iat);
        assert_eq!(first.exp, second.exp);
        assert_eq!(first.roles, second.roles);
    }

    #[test]
    fn test_manager_scope_claim_is_carried() {
        let service = service();
        let mut account = account();
        account.grant_role(Role::Manager);
        account.managed_restaurants = vec![7, 11];

        let extras = SessionExtras {
            restaurants: Some(account.managed_restaurants.clone()),
        };
        let token = service.issue(&account, &extras).unwrap();
        let claims = service.validate(&token).unwrap();

        assert_eq!(claims.restaurants.as_deref(), Some(&[7, 11][..]));
        assert_eq!(claims.roles, vec![Role::Customer, Role::Manager]);
    }

    #[test]
    fn test_expired_token_is_invalid() {
        let expired =
            SessionTokenService::with_secret(SECRET, "test-issuer", Duration::seconds(-10));
        let token = expired.issue(&account(), &SessionExtras::default()).unwrap();

        assert!(matches!(
            expired.validate(&token),
            Err(AuthError::SessionTokenInvalid)
        ));
    }

    #[test]
    fn test_any_single_byte_tamper_invalidates() {
        let service = service();
        let token = service.issue(&account(), &SessionExtras::default()).unwrap();

        for i in 0..token.len() {
            let mut bytes = token.clone().into_bytes();
            bytes[i] = if bytes[i] == b'A' { b'B' } else { b'A' };
            let tampered = String::from_utf8(bytes).unwrap();
            assert!(
                service.validate(&tampered).is_err(),
                "tampered byte {} was accepted",
                i
            );
        }
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let service = service();
        let other = SessionTokenService::with_secret(
            b"ffffffffffffffffffffffffffffffff",
            "test-issuer",
            Duration::days(7),
        );

        let token = other.issue(&account(), &SessionExtras::default()).unwrap();
        assert!(service.validate(&token).is_err());
    }

    #[test]
    fn test_algorithm_is_pinned() {
        use serde_json::json;

        // A token signed with HS384 over the same secret must not validate,
        // even though its own header says HS384.
        let service = service();
        let now = Utc::now().timestamp();
        let claims = json!({
            "sub": "bob@x.com",
            "iss": "test-issuer",
            "iat": now,
            "exp": now + 3600,
            "roles": ["CUSTOMER"],
        });

        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(SECRET),
        )
        .unwrap();

        assert!(service.validate(&token).is_err());
    }

    #[test]
    fn test_issuer_mismatch_is_rejected() {
        let service = service();
        let other = SessionTokenService::with_secret(SECRET, "other-issuer", Duration::days(7));

        let token = other.issue(&account(), &SessionExtras::default()).unwrap();
        assert!(service.validate(&token).is_err());
    }

    #[test]
    fn test_garbage_input_is_rejected_without_panicking() {
        let service = service();
        assert!(service.validate("").is_err());
        assert!(service.validate("not.a.token").is_err());
        assert!(service.validate("Bearer abc").is_err());
    }
}
