use thiserror::Error;

/// Internal failure taxonomy for the auth core.
///
/// Variants are deliberately finer-grained than what callers may show to end
/// users; [`AuthError::category`] performs the externally-visible mapping.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("account not found")]
    AccountNotFound,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account email not confirmed")]
    AccountUnverified,

    /// Covers missing, malformed, and wrong one-time codes alike.
    #[error("invalid second factor code")]
    InvalidSecondFactor,

    #[error("action token not found")]
    TokenNotFound,

    #[error("action token type mismatch")]
    TokenTypeMismatch,

    #[error("action token expired or already used")]
    TokenExpiredOrUsed,

    /// Signature mismatch, structural malformation, or expiry of a session
    /// token. Collapsed into one variant so the response cannot tell an
    /// attacker which check failed.
    #[error("session token invalid")]
    SessionTokenInvalid,

    #[error("email already registered")]
    EmailTaken,

    #[error("password rejected: {0}")]
    WeakPassword(String),

    #[error("directory error: {0}")]
    Directory(#[source] anyhow::Error),

    #[error("token store error: {0}")]
    TokenStore(#[source] anyhow::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Externally-visible failure categories.
///
/// `AccountNotFound` is merged into `InvalidCredentials` so responses cannot
/// be used to enumerate registered email addresses. `AccountUnverified` and
/// `InvalidSecondFactor` stay distinct: they guide legitimate remediation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    InvalidCredentials,
    AccountUnverified,
    InvalidSecondFactor,
    TokenNotFound,
    TokenTypeMismatch,
    TokenExpiredOrUsed,
    SessionTokenInvalid,
    EmailTaken,
    WeakPassword,
    Internal,
}

impl AuthError {
    pub fn category(&self) -> FailureCategory {
        match self {
            AuthError::AccountNotFound | AuthError::InvalidCredentials => {
                FailureCategory::InvalidCredentials
            }
            AuthError::AccountUnverified => FailureCategory::AccountUnverified,
            AuthError::InvalidSecondFactor => FailureCategory::InvalidSecondFactor,
            AuthError::TokenNotFound => FailureCategory::TokenNotFound,
            AuthError::TokenTypeMismatch => FailureCategory::TokenTypeMismatch,
            AuthError::TokenExpiredOrUsed => FailureCategory::TokenExpiredOrUsed,
            AuthError::SessionTokenInvalid => FailureCategory::SessionTokenInvalid,
            AuthError::EmailTaken => FailureCategory::EmailTaken,
            AuthError::WeakPassword(_) => FailureCategory::WeakPassword,
            AuthError::Directory(_) | AuthError::TokenStore(_) | AuthError::Internal(_) => {
                FailureCategory::Internal
            }
        }
    }
}
