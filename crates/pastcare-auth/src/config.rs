//! Authentication configuration.

use chrono::{Duration, TimeDelta};
use pastcare_core::error::{CoreError, CoreResult};
use serde::Deserialize;

/// Upper bound for every configured lifetime and window (10 years).
pub const MAX_LIFETIME_SECS: u64 = 315_360_000;

/// Configuration for the authentication service and session manager.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// PEM-encoded Ed25519 private key for JWT signing.
    pub jwt_private_key_pem: String,
    /// PEM-encoded Ed25519 public key for JWT verification.
    pub jwt_public_key_pem: String,
    /// JWT issuer (`iss` claim).
    pub jwt_issuer: String,
    /// Access token lifetime in seconds (default: 900 = 15 minutes).
    pub access_token_lifetime_secs: u64,
    /// Access token lifetime when "remember me" is ticked
    /// (default: 604_800 = 7 days).
    pub remember_me_lifetime_secs: u64,
    /// Refresh token lifetime in seconds (default: 2_592_000 = 30 days).
    pub refresh_token_lifetime_secs: u64,
    /// Concurrent valid refresh tokens per user (default: 5).
    pub max_active_sessions_per_user: usize,
    /// How long expired refresh tokens are kept before cleanup
    /// deletes them (default: 604_800 = 7 days).
    pub session_retention_secs: u64,
    /// Optional pepper prepended to passwords before Argon2id verification.
    pub pepper: Option<String>,
    /// Consecutive failed logins before the account is locked (default: 5).
    pub max_failed_login_attempts: u32,
    /// Lockout duration in seconds (default: 900 = 15 minutes).
    pub lockout_duration_secs: u64,
    /// Failed logins from one IP address, inside the attempt window,
    /// before further logins from it are refused (default: 10).
    pub max_failed_attempts_per_ip: u32,
    /// Sliding window for the per-IP count (default: 900 = 15 minutes).
    pub ip_attempt_window_secs: u64,
    /// How long login attempts are kept (default: 2_592_000 = 30 days).
    pub login_attempt_retention_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_private_key_pem: String::new(),
            jwt_public_key_pem: String::new(),
            jwt_issuer: "pastcare".into(),
            access_token_lifetime_secs: 900,
            remember_me_lifetime_secs: 604_800,
            refresh_token_lifetime_secs: 2_592_000,
            max_active_sessions_per_user: 5,
            session_retention_secs: 604_800,
            pepper: None,
            max_failed_login_attempts: 5,
            lockout_duration_secs: 900,
            max_failed_attempts_per_ip: 10,
            ip_attempt_window_secs: 900,
            login_attempt_retention_secs: 2_592_000,
        }
    }
}

impl AuthConfig {
    /// Reject settings the session manager cannot honour.
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_active_sessions_per_user == 0 {
            return Err(CoreError::Validation {
                message: "max_active_sessions_per_user must be at least 1".into(),
            });
        }
        if self.refresh_token_lifetime_secs == 0
            || self.access_token_lifetime_secs == 0
            || self.remember_me_lifetime_secs == 0
        {
            return Err(CoreError::Validation {
                message: "token lifetimes must be positive".into(),
            });
        }
        if self.max_failed_login_attempts == 0 || self.max_failed_attempts_per_ip == 0 {
            return Err(CoreError::Validation {
                message: "failed attempt limits must be at least 1".into(),
            });
        }
        if self.ip_attempt_window_secs == 0 {
            return Err(CoreError::Validation {
                message: "ip_attempt_window_secs must be positive".into(),
            });
        }

        for (name, secs) in [
            ("access_token_lifetime_secs", self.access_token_lifetime_secs),
            ("remember_me_lifetime_secs", self.remember_me_lifetime_secs),
            ("refresh_token_lifetime_secs", self.refresh_token_lifetime_secs),
            ("session_retention_secs", self.session_retention_secs),
            ("lockout_duration_secs", self.lockout_duration_secs),
            ("ip_attempt_window_secs", self.ip_attempt_window_secs),
            ("login_attempt_retention_secs", self.login_attempt_retention_secs),
        ] {
            checked_duration(name, secs)?;
        }
        Ok(())
    }

    pub fn refresh_token_lifetime(&self) -> Duration {
        clamped(self.refresh_token_lifetime_secs)
    }

    pub fn session_retention(&self) -> Duration {
        clamped(self.session_retention_secs)
    }

    pub fn lockout_duration(&self) -> Duration {
        clamped(self.lockout_duration_secs)
    }

    pub fn ip_attempt_window(&self) -> Duration {
        clamped(self.ip_attempt_window_secs)
    }

    pub fn login_attempt_retention(&self) -> Duration {
        clamped(self.login_attempt_retention_secs)
    }

    /// Access token lifetime in seconds for the given login mode.
    pub fn access_lifetime_secs(&self, remember_me: bool) -> u64 {
        if remember_me {
            self.remember_me_lifetime_secs
        } else {
            self.access_token_lifetime_secs
        }
    }
}

/// Convert a configured number of seconds, refusing anything above
/// [`MAX_LIFETIME_SECS`] or outside the range of `TimeDelta`.
fn checked_duration(name: &str, secs: u64) -> CoreResult<Duration> {
    let out_of_range = || CoreError::Validation {
        message: format!("{name} must not exceed {MAX_LIFETIME_SECS} seconds"),
    };
    if secs > MAX_LIFETIME_SECS {
        return Err(out_of_range());
    }
    let secs = i64::try_from(secs).map_err(|_| out_of_range())?;
    TimeDelta::try_seconds(secs).ok_or_else(out_of_range)
}

/// Unvalidated configs still produce a usable duration.
fn clamped(secs: u64) -> Duration {
    let secs = secs.min(MAX_LIFETIME_SECS);
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}
