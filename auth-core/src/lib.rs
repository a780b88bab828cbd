//! Authentication and authorization core for the reservation platform.
//!
//! Covers the four security-critical concerns the rest of the system sits
//! behind:
//!
//! - credential verification (argon2id, one-way, constant-time),
//! - an optional TOTP second factor layered onto the password check,
//! - self-contained HMAC-signed session tokens carrying identity and role
//!   claims,
//! - single-use, time-limited action tokens for out-of-band flows (email
//!   confirmation, password reset).
//!
//! Storage is abstracted behind the [`services::AccountDirectory`] and
//! [`services::ActionTokenStore`] collaborator traits; the crate ships
//! in-memory implementations for tests and embedded use. The
//! [`middleware::identity_middleware`] gate establishes per-request identity
//! for downstream handlers.

pub mod config;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::{AuthConfig, TotpConfig};
pub use middleware::{
    authenticate_request, identity_middleware, AuthenticatedUser, Identity, RequestIdentity,
};
pub use models::{Account, ActionToken, ActionTokenKind, Role};
pub use services::{
    AccountDirectory, ActionTokenService, ActionTokenStore, AuthError, AuthService,
    FailureCategory, InMemoryDirectory, InMemoryTokenStore, LoginSuccess, SessionClaims,
    SessionExtras, SessionTokenService, TotpEngine, TwoFactorEnrollment,
};
