//! Refresh-token session manager.
//!
//! Issues, validates, touches and revokes refresh tokens, and caps the
//! number of concurrently valid sessions per user. The manager keeps no
//! state of its own: every operation is a read-modify-write against the
//! [`RefreshTokenRepository`], with the current time taken from an
//! injected [`Clock`].
//!
//! ```text
//! create_session ──→ [valid] ──touch──→ [valid]
//!        │              │
//!        │       revoke / revoke_all / evicted by a newer login
//!        │              ▼
//!        │          [revoked] ──┐
//!        ▼                      │  (expires_at + retention passes)
//!   expires_at passes ──→ [expired] ──→ cleanup_expired deletes
//! ```

use std::cmp::Ordering;

use chrono::{DateTime, Duration, Utc};
use pastcare_core::error::{CoreError, CoreResult};
use pastcare_core::models::refresh_token::{CreateRefreshToken, RefreshToken};
use pastcare_core::repository::RefreshTokenRepository;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::token;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A freshly created session.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    /// The stored record.
    pub token: RefreshToken,
    /// Raw bearer string for the client. Not recoverable later.
    pub raw_token: String,
}

/// Most recently used first. Ties fall back to `issued_at`, then to the
/// record id, so the order never depends on store iteration order.
fn by_recency(a: &RefreshToken, b: &RefreshToken) -> Ordering {
    b.last_used_at
        .cmp(&a.last_used_at)
        .then_with(|| b.issued_at.cmp(&a.issued_at))
        .then_with(|| b.id.cmp(&a.id))
}

/// Pick the sessions to revoke so that one more fits under `max_active`.
///
/// Keeps the `max_active - 1` most recently used and returns the rest.
pub fn sessions_to_evict(mut active: Vec<RefreshToken>, max_active: usize) -> Vec<RefreshToken> {
    active.sort_by(by_recency);
    let keep = max_active.saturating_sub(1).min(active.len());
    active.split_off(keep)
}

pub struct SessionManager<S: RefreshTokenRepository, K: Clock = SystemClock> {
    repo: S,
    clock: K,
    refresh_token_lifetime: Duration,
    max_active_per_user: usize,
}

impl<S: RefreshTokenRepository> SessionManager<S, SystemClock> {
    pub fn new(repo: S, config: &AuthConfig) -> Self {
        Self::with_clock(repo, SystemClock, config)
    }
}

impl<S: RefreshTokenRepository, K: Clock> SessionManager<S, K> {
    pub fn with_clock(repo: S, clock: K, config: &AuthConfig) -> Self {
        Self {
            repo,
            clock,
            refresh_token_lifetime: config.refresh_token_lifetime(),
            max_active_per_user: config.max_active_sessions_per_user.max(1),
        }
    }

    /// Current time according to the manager's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Start a new session for `user_id`, revoking the least recently
    /// used sessions if the user is at the cap.
    pub async fn create_session(
        &self,
        user_id: Uuid,
        church_id: Option<Uuid>,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> CoreResult<IssuedSession> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(self.refresh_token_lifetime)
            .ok_or_else(|| {
                CoreError::Internal(format!(
                    "refresh token expiry overflows: {now} + {}",
                    self.refresh_token_lifetime
                ))
            })?;

        let active_count = self.repo.count_valid_by_user(user_id, now).await?;
        let evict: Vec<Uuid> = if active_count >= self.max_active_per_user as u64 {
            let active = self.repo.find_valid_by_user(user_id, now).await?;
            let evicted = sessions_to_evict(active, self.max_active_per_user);
            warn!(
                %user_id,
                active = active_count,
                evicting = evicted.len(),
                "Session cap reached, revoking least recently used sessions"
            );
            evicted.into_iter().map(|t| t.id).collect()
        } else {
            Vec::new()
        };

        let raw_token = token::generate_refresh_token();
        let stored = self
            .repo
            .issue(
                CreateRefreshToken {
                    user_id,
                    church_id,
                    token_hash: token::hash_refresh_token(&raw_token),
                    issued_at: now,
                    expires_at,
                    ip_address,
                    user_agent,
                },
                &evict,
            )
            .await?;

        info!(
            %user_id,
            session_id = %stored.id,
            ip_address = stored.ip_address.as_deref().unwrap_or("-"),
            "Created session"
        );

        Ok(IssuedSession {
            token: stored,
            raw_token,
        })
    }

    /// Look up a raw refresh token; `None` unless it exists and is valid
    /// right now. Read-only.
    pub async fn validate(&self, raw_token: &str) -> CoreResult<Option<RefreshToken>> {
        let now = self.clock.now();
        let found = self
            .repo
            .find_by_token_hash(&token::hash_refresh_token(raw_token))
            .await?;
        Ok(found.filter(|t| t.is_valid(now)))
    }

    /// Record use of a session. `last_used_at` never moves backwards.
    pub async fn touch(&self, mut token: RefreshToken) -> CoreResult<RefreshToken> {
        token.last_used_at = token.last_used_at.max(self.clock.now());
        self.repo.update(&token).await?;
        Ok(token)
    }

    /// Revoke a single session. Unknown or already revoked tokens are a
    /// no-op.
    pub async fn revoke(&self, raw_token: &str) -> CoreResult<()> {
        let found = self
            .repo
            .find_by_token_hash(&token::hash_refresh_token(raw_token))
            .await?;

        let Some(mut token) = found else {
            return Ok(());
        };
        if !token.revoked {
            token.revoked = true;
            self.repo.update(&token).await?;
            info!(user_id = %token.user_id, session_id = %token.id, "Revoked session");
        }

        Ok(())
    }

    /// Revoke every session of a user ("log out everywhere").
    pub async fn revoke_all(&self, user_id: Uuid) -> CoreResult<u64> {
        let revoked = self.repo.revoke_all_by_user(user_id).await?;
        info!(%user_id, revoked, "Revoked all sessions");
        Ok(revoked)
    }

    /// Valid sessions of a user, most recently used first.
    pub async fn list_active_sessions(&self, user_id: Uuid) -> CoreResult<Vec<RefreshToken>> {
        let mut active = self
            .repo
            .find_valid_by_user(user_id, self.clock.now())
            .await?;
        active.sort_by(by_recency);
        Ok(active)
    }

    /// Delete sessions that expired more than `retention` ago.
    pub async fn cleanup_expired(&self, retention: Duration) -> CoreResult<u64> {
        let cutoff = self.clock.now() - retention;
        let deleted = self.repo.delete_expired_before(cutoff).await?;
        info!(%cutoff, deleted, "Cleaned up expired sessions");
        Ok(deleted)
    }
}
