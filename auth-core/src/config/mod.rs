//! Runtime configuration.
//!
//! Built once at process start and handed to constructors explicitly; there
//! is no ambient or global secret lookup anywhere in the crate.

use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::str::FromStr;

use crate::utils::HashParams;

/// Top-level configuration for the auth core.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Fixed issuer string embedded in session claims.
    pub issuer: String,
    /// Symmetric signing secret for session tokens. Never logged; rotated
    /// only by redeploying with a new value.
    pub signing_secret: SecretString,
    /// Session token expiry horizon.
    pub session_ttl_days: i64,
    /// Action token expiry offset from creation.
    pub action_token_ttl_hours: i64,
    pub totp: TotpConfig,
    pub hash: HashParams,
}

/// TOTP parameters shared with enrolled authenticator apps.
#[derive(Debug, Clone)]
pub struct TotpConfig {
    pub digits: usize,
    pub step_seconds: u64,
    /// Tolerance window in steps on each side of "now", absorbing clock
    /// drift between server and authenticator.
    pub skew_steps: u8,
}

impl Default for TotpConfig {
    fn default() -> Self {
        Self {
            digits: 6,
            step_seconds: 30,
            skew_steps: 1,
        }
    }
}

impl AuthConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let env_str = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string());
        let is_prod = env_str.eq_ignore_ascii_case("prod");

        let config = AuthConfig {
            issuer: get_env("AUTH_TOKEN_ISSUER", Some("auth-core"), is_prod)?,
            signing_secret: SecretString::new(get_env(
                "AUTH_SIGNING_SECRET",
                // Dev-only fallback; production deployments must set their own.
                Some("dev-only-signing-secret-change-me!"),
                is_prod,
            )?),
            session_ttl_days: parse_env("AUTH_SESSION_TTL_DAYS", "7", is_prod)?,
            action_token_ttl_hours: parse_env("AUTH_ACTION_TOKEN_TTL_HOURS", "48", is_prod)?,
            totp: TotpConfig {
                digits: parse_env("AUTH_TOTP_DIGITS", "6", is_prod)?,
                step_seconds: parse_env("AUTH_TOTP_STEP_SECONDS", "30", is_prod)?,
                skew_steps: parse_env("AUTH_TOTP_SKEW_STEPS", "1", is_prod)?,
            },
            hash: HashParams {
                memory_kib: parse_env("AUTH_ARGON2_MEMORY_KIB", "19456", is_prod)?,
                iterations: parse_env("AUTH_ARGON2_ITERATIONS", "2", is_prod)?,
                parallelism: parse_env("AUTH_ARGON2_PARALLELISM", "1", is_prod)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), anyhow::Error> {
        if self.issuer.is_empty() {
            return Err(anyhow::anyhow!("AUTH_TOKEN_ISSUER must not be empty"));
        }

        // HS256 secrets shorter than the digest size weaken the MAC.
        if self.signing_secret.expose_secret().len() < 32 {
            return Err(anyhow::anyhow!(
                "AUTH_SIGNING_SECRET must be at least 32 bytes"
            ));
        }

        if self.session_ttl_days <= 0 {
            return Err(anyhow::anyhow!("AUTH_SESSION_TTL_DAYS must be positive"));
        }

        if self.action_token_ttl_hours <= 0 {
            return Err(anyhow::anyhow!(
                "AUTH_ACTION_TOKEN_TTL_HOURS must be positive"
            ));
        }

        if !(6..=8).contains(&self.totp.digits) {
            return Err(anyhow::anyhow!("AUTH_TOTP_DIGITS must be between 6 and 8"));
        }

        if self.totp.step_seconds == 0 {
            return Err(anyhow::anyhow!("AUTH_TOTP_STEP_SECONDS must be positive"));
        }

        Ok(())
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, anyhow::Error> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                ))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(anyhow::anyhow!("{} is required but not set", key))
            }
        }
    }
}

fn parse_env<T>(key: &str, default: &str, is_prod: bool) -> Result<T, anyhow::Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get_env(key, Some(default), is_prod)?
        .parse()
        .map_err(|e| anyhow::anyhow!("{} is invalid: {}", key, e))
}
