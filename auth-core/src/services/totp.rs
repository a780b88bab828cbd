//! Time-based one-time password engine (RFC 6238 semantics via `totp-rs`).

use std::time::{SystemTime, UNIX_EPOCH};
use subtle::{Choice, ConstantTimeEq};
use totp_rs::{Algorithm as TotpAlgorithm, Secret, TOTP};

use crate::config::TotpConfig;

/// Generates shared secrets and verifies submitted codes.
///
/// Verification fails closed: malformed secrets and codes return `false`
/// rather than an error that could hint at what to fix.
#[derive(Debug, Clone)]
pub struct TotpEngine {
    digits: usize,
    step_seconds: u64,
    skew_steps: u8,
    issuer: String,
}

impl TotpEngine {
    pub fn new(config: &TotpConfig, issuer: &str) -> Self {
        Self {
            digits: config.digits,
            step_seconds: config.step_seconds,
            skew_steps: config.skew_steps,
            issuer: issuer.to_string(),
        }
    }

    /// Fresh random shared secret, base32-encoded, for enrollment.
    pub fn generate_secret(&self) -> String {
        Secret::generate_secret().to_encoded().to_string()
    }

    /// otpauth:// URL carrying the secret and parameters, the payload an
    /// authenticator app scans as a QR code during enrollment.
    pub fn provisioning_url(&self, secret_base32: &str, account_email: &str) -> Option<String> {
        self.build(secret_base32, account_email)
            .map(|totp| totp.get_url())
    }

    /// Verify a submitted code against the shared secret at the current time.
    pub fn verify(&self, secret_base32: &str, code: &str) -> bool {
        let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(elapsed) => elapsed.as_secs(),
            Err(_) => return false,
        };
        self.verify_at(secret_base32, code, now)
    }

    /// Verify against an explicit timestamp.
    ///
    /// Every step in the `now ± skew` tolerance window is examined, and each
    /// candidate is compared in constant time, so neither the match position
    /// nor a mismatch offset leaks through timing.
    pub fn verify_at(&self, secret_base32: &str, code: &str, unix_time: u64) -> bool {
        if code.len() != self.digits || !code.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }

        let Some(totp) = self.build(secret_base32, "account") else {
            return false;
        };

        let mut matched = Choice::from(0u8);
        let skew = i64::from(self.skew_steps);
        for offset in -skew..=skew {
            let t = unix_time as i64 + offset * self.step_seconds as i64;
            if t < 0 {
                continue;
            }
            let candidate = totp.generate(t as u64);
            matched |= candidate.as_bytes().ct_eq(code.as_bytes());
        }

        matched.into()
    }

    fn build(&self, secret_base32: &str, account: &str) -> Option<TOTP> {
        let secret = Secret::Encoded(secret_base32.to_string()).to_bytes().ok()?;
        TOTP::new(
            TotpAlgorithm::SHA1,
            self.digits,
            self.skew_steps,
            self.step_seconds,
            secret,
            Some(self.issuer.clone()),
            account.to_string(),
        )
        .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> TotpEngine {
        TotpEngine::new(&TotpConfig::default(), "test-issuer")
    }

    /// Expected code for a secret at a timestamp, computed independently of
    /// the engine's verification path.
    fn code_at(engine: &TotpEngine, secret: &str, unix_time: u64) -> String {
        engine.build(secret, "account").unwrap().generate(unix_time)
    }

    #[test]
    fn test_generated_secret_verifies_current_code() {
        let engine = engine();
        let secret = engine.generate_secret();
        assert!(!secret.is_empty());

        let now = 1_700_000_000;
        let code = code_at(&engine, &secret, now);
        assert!(engine.verify_at(&secret, &code, now));
    }

    #[test]
    fn test_adjacent_steps_are_tolerated() {
        let engine = engine();
        let secret = engine.generate_secret();
        let now = 1_700_000_000;

        let previous = code_at(&engine, &secret, now - 30);
        let next = code_at(&engine, &secret, now + 30);
        assert!(engine.verify_at(&secret, &previous, now));
        assert!(engine.verify_at(&secret, &next, now));
    }

    #[test]
    fn test_codes_outside_the_window_are_rejected() {
        let engine = engine();
        let secret = engine.generate_secret();
        let now = 1_700_000_000;

        let stale = code_at(&engine, &secret, now - 90);
        // A stale code could coincide with an in-window candidate; skip the
        // assertion in that unlikely case rather than flake.
        let in_window: Vec<String> = [now - 30, now, now + 30]
            .iter()
            .map(|t| code_at(&engine, &secret, *t))
            .collect();
        if !in_window.contains(&stale) {
            assert!(!engine.verify_at(&secret, &stale, now));
        }
    }

    #[test]
    fn test_wrong_code_is_rejected() {
        let engine = engine();
        let secret = engine.generate_secret();
        let now = 1_700_000_000;

        let mut code = code_at(&engine, &secret, now).into_bytes();
        code[0] = if code[0] == b'0' { b'1' } else { b'0' };
        let wrong = String::from_utf8(code).unwrap();

        let in_window: Vec<String> = [now - 30, now, now + 30]
            .iter()
            .map(|t| code_at(&engine, &secret, *t))
            .collect();
        if !in_window.contains(&wrong) {
            assert!(!engine.verify_at(&secret, &wrong, now));
        }
    }

    #[test]
    fn test_malformed_code_fails_closed() {
        let engine = engine();
        let secret = engine.generate_secret();
        let now = 1_700_000_000;

        assert!(!engine.verify_at(&secret, "", now));
        assert!(!engine.verify_at(&secret, "12345", now));
        assert!(!engine.verify_at(&secret, "1234567", now));
        assert!(!engine.verify_at(&secret, "abcdef", now));
        assert!(!engine.verify_at(&secret, "12 456", now));
    }

    #[test]
    fn test_malformed_secret_fails_closed() {
        let engine = engine();
        assert!(!engine.verify_at("not base32 at all!!!", "123456", 1_700_000_000));
        assert!(!engine.verify_at("", "123456", 1_700_000_000));
    }

    #[test]
    fn test_distinct_secrets_per_enrollment() {
        let engine = engine();
        assert_ne!(engine.generate_secret(), engine.generate_secret());
    }

    #[test]
    fn test_provisioning_url_embeds_issuer() {
        let engine = engine();
        let secret = engine.generate_secret();

        let url = engine.provisioning_url(&secret, "bob@x.com").unwrap();
        assert!(url.starts_with("otpauth://totp/"));
        assert!(url.contains("test-issuer"));
    }
}
