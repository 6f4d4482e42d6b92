//! Periodic removal of long-expired sessions and old login attempts.

use std::time::Duration;

use pastcare_auth::{AuthService, Clock};
use pastcare_core::repository::{
    ChurchRepository, LoginAttemptRepository, RefreshTokenRepository, UserRepository,
};
use tracing::{error, info};

/// Records deleted over the lifetime of a cleanup loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CleanupTotals {
    pub sessions: u64,
    pub login_attempts: u64,
}

/// Run both cleanups every `every` until `shutdown` resolves. The first
/// pass runs immediately. Failed passes are logged and retried on the
/// next tick.
pub async fn run_cleanup_loop<U, C, S, A, K>(
    service: &AuthService<U, C, S, A, K>,
    every: Duration,
    shutdown: impl Future<Output = ()>,
) -> CleanupTotals
where
    U: UserRepository,
    C: ChurchRepository,
    S: RefreshTokenRepository,
    A: LoginAttemptRepository,
    K: Clock,
{
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    let mut totals = CleanupTotals::default();
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                match service.cleanup_expired_sessions().await {
                    Ok(deleted) => totals.sessions += deleted,
                    Err(e) => error!(error = %e, "Session cleanup failed"),
                }
                match service.cleanup_login_attempts().await {
                    Ok(deleted) => totals.login_attempts += deleted,
                    Err(e) => error!(error = %e, "Login attempt cleanup failed"),
                }
            }
        }
    }

    info!(
        sessions_deleted = totals.sessions,
        login_attempts_deleted = totals.login_attempts,
        "Cleanup loop stopped"
    );
    totals
}
