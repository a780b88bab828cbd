//! Issuing and redeeming single-use action tokens.

use rand::Rng;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{ActionToken, ActionTokenKind};
use crate::services::{ActionTokenStore, AuthError};

/// Issues and consumes action tokens through the store collaborator.
#[derive(Clone)]
pub struct ActionTokenService {
    store: Arc<dyn ActionTokenStore>,
    ttl_hours: i64,
}

impl ActionTokenService {
    pub fn new(store: Arc<dyn ActionTokenStore>, ttl_hours: i64) -> Self {
        Self { store, ttl_hours }
    }

    /// Create and persist a fresh token; returns the opaque value to embed
    /// in the out-of-band link.
    pub async fn issue(
        &self,
        account_id: Uuid,
        kind: ActionTokenKind,
    ) -> Result<String, AuthError> {
        let value = generate_token_value();
        let token = ActionToken::new(value.clone(), kind, account_id, self.ttl_hours);

        self.store.save(token).await.map_err(AuthError::TokenStore)?;

        tracing::info!(account_id = %account_id, kind = kind.as_str(), "Action token issued");
        Ok(value)
    }

    /// Redeem a token: lookup, kind check, validity check, then the store's
    /// atomic mark-used. Under concurrent redemption of the same value
    /// exactly one caller wins; every loser sees `TokenExpiredOrUsed`.
    ///
    /// The mark-used write and whatever account mutation the caller applies
    /// afterwards are separate operations; a crash between the two consumes
    /// the token without the mutation being applied.
    pub async fn redeem(
        &self,
        value: &str,
        expected: ActionTokenKind,
    ) -> Result<ActionToken, AuthError> {
        let token = self
            .store
            .find_by_value(value)
            .await
            .map_err(AuthError::TokenStore)?
            .ok_or(AuthError::TokenNotFound)?;

        if token.kind != expected {
            return Err(AuthError::TokenTypeMismatch);
        }

        if !token.is_valid() {
            return Err(AuthError::TokenExpiredOrUsed);
        }

        if !self.store.mark_used(value).await.map_err(AuthError::TokenStore)? {
            // Lost the race to a concurrent redeemer.
            return Err(AuthError::TokenExpiredOrUsed);
        }

        tracing::info!(
            account_id = %token.account_id,
            kind = token.kind.as_str(),
            "Action token redeemed"
        );

        Ok(ActionToken { used: true, ..token })
    }
}

/// 32 random bytes, hex-encoded: 256 bits of entropy makes the value both an
/// unguessable bearer secret and a collision-free lookup key.
fn generate_token_value() -> String {
    let mut rng = rand::thread_rng();
    let token_bytes: [u8; 32] = rng.gen();
    hex::encode(token_bytes)
}
