//! Login orchestration and account security flows.
//!
//! Composes the credential check, the optional TOTP second factor, and the
//! session token service into the full login state machine, and drives the
//! action-token flows (email confirmation, password reset) against the
//! directory and token-store collaborators.

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::models::{Account, ActionTokenKind, Role};
use crate::services::{
    AccountDirectory, ActionTokenService, ActionTokenStore, AuthError, SessionExtras,
    SessionTokenService, TotpEngine,
};
use crate::utils::{
    hash_password, validate_password_strength, verify_password, HashParams, Password,
};

/// Successful login: the issued bearer token plus the authenticated account.
#[derive(Debug, Clone)]
pub struct LoginSuccess {
    pub token: String,
    pub account: Account,
}

/// Handed back to the user when 2FA enrollment starts. The secret is shown
/// exactly once; only its confirmation state is consulted afterwards.
#[derive(Debug, Clone)]
pub struct TwoFactorEnrollment {
    pub secret: String,
    pub provisioning_url: Option<String>,
}

#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn AccountDirectory>,
    sessions: SessionTokenService,
    totp: TotpEngine,
    action_tokens: ActionTokenService,
    hash_params: HashParams,
}

impl AuthService {
    pub fn new(
        config: &AuthConfig,
        directory: Arc<dyn AccountDirectory>,
        token_store: Arc<dyn ActionTokenStore>,
    ) -> Self {
        Self {
            directory,
            sessions: SessionTokenService::new(config),
            totp: TotpEngine::new(&config.totp, &config.issuer),
            action_tokens: ActionTokenService::new(token_store, config.action_token_ttl_hours),
            hash_params: config.hash.clone(),
        }
    }

    /// The session token service backing this orchestrator, for wiring the
    /// request-authentication middleware.
    pub fn sessions(&self) -> &SessionTokenService {
        &self.sessions
    }

    /// Full login state machine.
    ///
    /// Checks run in a fixed order: account lookup, unverified sentinel,
    /// password, then the second factor where enrolled. Each failure is
    /// terminal; nothing is retried. Callers surface
    /// [`AuthError::category`], which merges the account-missing case into
    /// `InvalidCredentials`.
    pub async fn login(
        &self,
        identifier: &str,
        password: &str,
        otp_code: Option<&str>,
    ) -> Result<LoginSuccess, AuthError> {
        let mut account = self
            .find_by_email(identifier)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        // Surfacing onboarding state ahead of the password check is a
        // product decision carried over from the original flow.
        if account.is_unverified() {
            return Err(AuthError::AccountUnverified);
        }

        if !verify_password(&Password::new(password.to_string()), &account.password_hash) {
            tracing::warn!(account_id = %account.id, "Login failed: password mismatch");
            return Err(AuthError::InvalidCredentials);
        }

        if account.two_factor_enabled() {
            let secret = account
                .totp_secret
                .as_deref()
                .ok_or(AuthError::InvalidSecondFactor)?;
            let code = otp_code.ok_or(AuthError::InvalidSecondFactor)?;
            if !self.totp.verify(secret, code) {
                tracing::warn!(account_id = %account.id, "Login failed: second factor rejected");
                return Err(AuthError::InvalidSecondFactor);
            }
        }

        let extras = SessionExtras {
            restaurants: account
                .has_role(Role::Manager)
                .then(|| account.managed_restaurants.clone()),
        };
        let token = self.sessions.issue(&account, &extras)?;

        account.last_login_at = Some(Utc::now());
        let account = self
            .directory
            .save(account)
            .await
            .map_err(AuthError::Directory)?;

        tracing::info!(account_id = %account.id, "Login succeeded");
        Ok(LoginSuccess { token, account })
    }

    /// Create an unverified account and the email-confirmation token for its
    /// onboarding link. Delivering the link is the mail subsystem's job.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        first_name: Option<String>,
        last_name: Option<String>,
    ) -> Result<(Account, String), AuthError> {
        validate_password_strength(password).map_err(AuthError::WeakPassword)?;

        let email = email.trim().to_ascii_lowercase();
        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let password_hash = hash_password(&Password::new(password.to_string()), &self.hash_params)?;
        let account = Account::new(email, password_hash, first_name, last_name);
        let account = self
            .directory
            .save(account)
            .await
            .map_err(AuthError::Directory)?;

        let confirmation = self
            .action_tokens
            .issue(account.id, ActionTokenKind::EmailConfirmation)
            .await?;

        tracing::info!(account_id = %account.id, "Account registered");
        Ok((account, confirmation))
    }

    /// Begin 2FA enrollment: generate and store a pending shared secret.
    /// Nothing is enforced until the first code is confirmed.
    pub async fn enable_2fa(&self, account_id: Uuid) -> Result<TwoFactorEnrollment, AuthError> {
        let mut account = self.require_account(account_id).await?;

        let secret = self.totp.generate_secret();
        let provisioning_url = self.totp.provisioning_url(&secret, &account.email);

        account.totp_secret = Some(secret.clone());
        account.totp_confirmed = false;
        self.directory
            .save(account)
            .await
            .map_err(AuthError::Directory)?;

        tracing::info!(account_id = %account_id, "Two-factor enrollment started");
        Ok(TwoFactorEnrollment {
            secret,
            provisioning_url,
        })
    }

    /// Confirm enrollment with a first valid code; from here on login
    /// requires the second factor.
    pub async fn confirm_2fa(&self, account_id: Uuid, code: &str) -> Result<(), AuthError> {
        let mut account = self.require_account(account_id).await?;

        let secret = account
            .totp_secret
            .clone()
            .ok_or(AuthError::InvalidSecondFactor)?;
        if !self.totp.verify(&secret, code) {
            return Err(AuthError::InvalidSecondFactor);
        }

        account.totp_confirmed = true;
        self.directory
            .save(account)
            .await
            .map_err(AuthError::Directory)?;

        tracing::info!(account_id = %account_id, "Two-factor authentication enabled");
        Ok(())
    }

    /// Disable 2FA. Requires a valid current code so a hijacked session
    /// cannot silently weaken the account.
    pub async fn disable_2fa(&self, account_id: Uuid, code: &str) -> Result<(), AuthError> {
        let mut account = self.require_account(account_id).await?;

        let secret = account
            .totp_secret
            .clone()
            .ok_or(AuthError::InvalidSecondFactor)?;
        if !self.totp.verify(&secret, code) {
            return Err(AuthError::InvalidSecondFactor);
        }

        account.totp_secret = None;
        account.totp_confirmed = false;
        self.directory
            .save(account)
            .await
            .map_err(AuthError::Directory)?;

        tracing::info!(account_id = %account_id, "Two-factor authentication disabled");
        Ok(())
    }

    /// Issue an action token for an out-of-band flow.
    pub async fn issue_action_token(
        &self,
        account_id: Uuid,
        kind: ActionTokenKind,
    ) -> Result<String, AuthError> {
        let account = self.require_account(account_id).await?;
        self.action_tokens.issue(account.id, kind).await
    }

    /// Redeem an action token and return the owning account so the caller
    /// can apply the corresponding mutation. `confirm_email` and
    /// `reset_password` bundle the standard mutations.
    pub async fn redeem_action_token(
        &self,
        value: &str,
        expected: ActionTokenKind,
    ) -> Result<Account, AuthError> {
        let token = self.action_tokens.redeem(value, expected).await?;
        self.directory
            .find_by_id(token.account_id)
            .await
            .map_err(AuthError::Directory)?
            .ok_or(AuthError::AccountNotFound)
    }

    /// Redeem an email-confirmation token and lift the unverified sentinel.
    pub async fn confirm_email(&self, value: &str) -> Result<Account, AuthError> {
        let mut account = self
            .redeem_action_token(value, ActionTokenKind::EmailConfirmation)
            .await?;

        account.mark_verified();
        let account = self
            .directory
            .save(account)
            .await
            .map_err(AuthError::Directory)?;

        tracing::info!(account_id = %account.id, "Email confirmed");
        Ok(account)
    }

    /// Redeem a password-reset token and install a new credential.
    ///
    /// The strength check runs before redemption so a rejected password does
    /// not consume the single-use token.
    pub async fn reset_password(
        &self,
        value: &str,
        new_password: &str,
    ) -> Result<Account, AuthError> {
        validate_password_strength(new_password).map_err(AuthError::WeakPassword)?;

        let mut account = self
            .redeem_action_token(value, ActionTokenKind::PasswordReset)
            .await?;

        account.password_hash =
            hash_password(&Password::new(new_password.to_string()), &self.hash_params)?;
        let account = self
            .directory
            .save(account)
            .await
            .map_err(AuthError::Directory)?;

        tracing::info!(account_id = %account.id, "Password reset completed");
        Ok(account)
    }

    /// Change the password of an authenticated account, re-verifying the
    /// current credential first.
    pub async fn change_password(
        &self,
        account_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let mut account = self.require_account(account_id).await?;

        if !verify_password(
            &Password::new(current_password.to_string()),
            &account.password_hash,
        ) {
            return Err(AuthError::InvalidCredentials);
        }

        validate_password_strength(new_password).map_err(AuthError::WeakPassword)?;

        account.password_hash =
            hash_password(&Password::new(new_password.to_string()), &self.hash_params)?;
        self.directory
            .save(account)
            .await
            .map_err(AuthError::Directory)?;

        tracing::info!(account_id = %account_id, "Password changed");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AuthError> {
        self.directory
            .find_by_email(email)
            .await
            .map_err(AuthError::Directory)
    }

    async fn require_account(&self, id: Uuid) -> Result<Account, AuthError> {
        self.directory
            .find_by_id(id)
            .await
            .map_err(AuthError::Directory)?
            .ok_or(AuthError::AccountNotFound)
    }
}
