//! Authentication service: registration, login, refresh and logout
//! orchestration.
//!
//! Login refuses an address with too many recent failures before it
//! looks at the account, then applies the per-account lockout. Every
//! credential check that gets that far is written to the login attempt
//! log, which feeds the per-address count.

use chrono::{DateTime, Utc};
use pastcare_core::error::{CoreError, CoreResult};
use pastcare_core::models::church::CreateChurch;
use pastcare_core::models::login_attempt::CreateLoginAttempt;
use pastcare_core::models::refresh_token::RefreshToken;
use pastcare_core::models::user::{CreateUser, Role, UpdateUser, User, UserProfile};
use pastcare_core::repository::{
    ChurchRepository, LoginAttemptRepository, RefreshTokenRepository, UserRepository,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::password;
use crate::session::{Clock, SessionManager, SystemClock};
use crate::token;

/// Input for the login flow.
#[derive(Debug)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    /// Issue a long-lived access token.
    pub remember_me: bool,
}

/// Successful login result.
#[derive(Debug)]
pub struct LoginOutput {
    /// Signed JWT access token.
    pub access_token: String,
    /// Raw opaque refresh token (return to client, not stored).
    pub refresh_token: String,
    /// Session ID, for listing and auditing sessions.
    pub session_id: Uuid,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
    pub user: UserProfile,
}

/// Input for signing up a new church together with its first admin.
#[derive(Debug)]
pub struct RegisterChurchInput {
    pub church: CreateChurch,
    pub admin_name: String,
    pub admin_email: String,
    pub admin_phone_number: Option<String>,
    pub admin_title: Option<String>,
    pub password: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

/// Successful refresh result. The refresh token itself is not rotated.
#[derive(Debug)]
pub struct RefreshOutput {
    pub access_token: String,
    pub expires_in: u64,
    pub user: UserProfile,
}

/// Authentication service.
///
/// Generic over repository implementations so that the auth layer
/// has no dependency on the database crate.
pub struct AuthService<U, C, S, A, K = SystemClock>
where
    U: UserRepository,
    C: ChurchRepository,
    S: RefreshTokenRepository,
    A: LoginAttemptRepository,
    K: Clock,
{
    user_repo: U,
    church_repo: C,
    attempt_repo: A,
    sessions: SessionManager<S, K>,
    config: AuthConfig,
}

impl<U, C, S, A> AuthService<U, C, S, A, SystemClock>
where
    U: UserRepository,
    C: ChurchRepository,
    S: RefreshTokenRepository,
    A: LoginAttemptRepository,
{
    pub fn new(
        user_repo: U,
        church_repo: C,
        token_repo: S,
        attempt_repo: A,
        config: AuthConfig,
    ) -> Self {
        let sessions = SessionManager::new(token_repo, &config);
        Self::with_sessions(user_repo, church_repo, attempt_repo, sessions, config)
    }
}

impl<U, C, S, A, K> AuthService<U, C, S, A, K>
where
    U: UserRepository,
    C: ChurchRepository,
    S: RefreshTokenRepository,
    A: LoginAttemptRepository,
    K: Clock,
{
    pub fn with_sessions(
        user_repo: U,
        church_repo: C,
        attempt_repo: A,
        sessions: SessionManager<S, K>,
        config: AuthConfig,
    ) -> Self {
        Self {
            user_repo,
            church_repo,
            attempt_repo,
            sessions,
            config,
        }
    }

    /// Create a church and its first `Admin`, and sign the admin in.
    pub async fn register_church(&self, input: RegisterChurchInput) -> CoreResult<LoginOutput> {
        let name = input.church.name.trim();
        if name.is_empty() {
            return Err(CoreError::Validation {
                message: "church name must not be empty".into(),
            });
        }
        if input.password.is_empty() {
            return Err(CoreError::Validation {
                message: "password must not be empty".into(),
            });
        }

        if self.church_repo.exists_by_name(name).await? {
            warn!(church = %name, "Registration for an existing church name");
            return Err(CoreError::AlreadyExists {
                entity: "church".into(),
            });
        }
        match self.user_repo.get_by_email(&input.admin_email).await {
            Ok(_) => {
                warn!(email = %input.admin_email, "Registration with an email already in use");
                return Err(CoreError::AlreadyExists {
                    entity: "user".into(),
                });
            }
            Err(CoreError::NotFound { .. }) => {}
            Err(e) => return Err(e),
        }

        let church = self.church_repo.create(input.church).await?;
        let admin = self
            .user_repo
            .create(CreateUser {
                church_id: Some(church.id),
                name: input.admin_name,
                email: input.admin_email,
                phone_number: input.admin_phone_number,
                title: input.admin_title,
                role: Role::Admin,
                password: input.password,
            })
            .await
            .inspect_err(|e| {
                warn!(church_id = %church.id, error = %e, "Church created but its admin was not");
            })?;

        info!(church_id = %church.id, user_id = %admin.id, "Registered church");

        self.start_session(&admin, false, input.ip_address, input.user_agent)
            .await
    }

    /// Authenticate with email + password and start a session.
    pub async fn login(&self, input: LoginInput) -> CoreResult<LoginOutput> {
        let now = self.sessions.now();

        // 1. Addresses with too many recent failures are refused outright.
        if let Some(ip) = input.ip_address.as_deref() {
            self.check_ip_block(ip, now).await?;
        }

        // 2. Account checks. Credential failures are logged; store
        //    errors are not.
        let outcome = self.authenticate(&input, now).await;
        if matches!(outcome, Ok(_) | Err(CoreError::AuthenticationFailed { .. })) {
            self.record_attempt(&input, outcome.is_ok(), now).await?;
        }
        let user = outcome?;

        // 3. Clear any failure streak or elapsed lock.
        if user.failed_login_attempts > 0 || user.locked_until.is_some() {
            self.user_repo
                .update(
                    user.id,
                    UpdateUser {
                        failed_login_attempts: Some(0),
                        locked_until: Some(None),
                        ..Default::default()
                    },
                )
                .await?;
        }

        // 4. Issue the access token and the session.
        self.start_session(&user, input.remember_me, input.ip_address, input.user_agent)
            .await
    }

    /// Exchange a valid refresh token for a new access token.
    pub async fn refresh(&self, raw_refresh_token: &str) -> CoreResult<RefreshOutput> {
        let session = self
            .sessions
            .validate(raw_refresh_token)
            .await?
            .ok_or_else(|| AuthError::TokenInvalid("refresh token is invalid or expired".into()))?;

        let session = self.sessions.touch(session).await?;

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .map_err(|e| match e {
                CoreError::NotFound { .. } => {
                    AuthError::TokenInvalid("session owner no longer exists".into()).into()
                }
                other => other,
            })?;
        self.check_church_association(&user).await?;

        let access_token = token::issue_access_token(&user, false, self.sessions.now(), &self.config)?;

        Ok(RefreshOutput {
            access_token,
            expires_in: self.config.access_token_lifetime_secs,
            user: UserProfile::from(&user),
        })
    }

    /// End the session behind a refresh token. Unknown tokens are ignored.
    pub async fn logout(&self, raw_refresh_token: &str) -> CoreResult<()> {
        self.sessions.revoke(raw_refresh_token).await
    }

    /// End every session of a user.
    pub async fn logout_everywhere(&self, user_id: Uuid) -> CoreResult<u64> {
        self.sessions.revoke_all(user_id).await
    }

    /// Sessions a user can review and terminate.
    pub async fn active_sessions(&self, user_id: Uuid) -> CoreResult<Vec<RefreshToken>> {
        self.sessions.list_active_sessions(user_id).await
    }

    /// Delete sessions past the configured retention window.
    pub async fn cleanup_expired_sessions(&self) -> CoreResult<u64> {
        self.sessions
            .cleanup_expired(self.config.session_retention())
            .await
    }

    /// Delete login attempts older than the configured retention.
    pub async fn cleanup_login_attempts(&self) -> CoreResult<u64> {
        let now = self.sessions.now();
        let cutoff = now
            .checked_sub_signed(self.config.login_attempt_retention())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let deleted = self.attempt_repo.delete_before(cutoff).await?;
        if deleted > 0 {
            info!(deleted, %cutoff, "Deleted old login attempts");
        }
        Ok(deleted)
    }

    /// Steps that decide whether `input` names a user allowed in.
    async fn authenticate(&self, input: &LoginInput, now: DateTime<Utc>) -> CoreResult<User> {
        // Unknown emails look like bad passwords.
        let user = match self.user_repo.get_by_email(&input.email).await {
            Ok(u) => u,
            Err(CoreError::NotFound { .. }) => {
                warn!(email = %input.email, "Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        if let Some(until) = user.locked_until.filter(|until| *until > now) {
            warn!(user_id = %user.id, %until, "Login attempt on locked account");
            return Err(AuthError::AccountLocked { until }.into());
        }

        let valid = password::verify_password(
            &input.password,
            &user.password_hash,
            self.config.pepper.as_deref(),
        )?;
        if !valid {
            self.record_failed_attempt(&user, now).await?;
            return Err(AuthError::InvalidCredentials.into());
        }

        // Church-bound roles need an active church.
        self.check_church_association(&user).await?;

        Ok(user)
    }

    async fn start_session(
        &self,
        user: &User,
        remember_me: bool,
        ip_address: Option<String>,
        user_agent: Option<String>,
    ) -> CoreResult<LoginOutput> {
        let now = self.sessions.now();
        let access_token = token::issue_access_token(user, remember_me, now, &self.config)?;
        let issued = self
            .sessions
            .create_session(user.id, user.church_id, ip_address, user_agent)
            .await?;

        info!(user_id = %user.id, session_id = %issued.token.id, "Signed in");

        Ok(LoginOutput {
            access_token,
            refresh_token: issued.raw_token,
            session_id: issued.token.id,
            expires_in: self.config.access_lifetime_secs(remember_me),
            user: UserProfile::from(user),
        })
    }

    async fn check_ip_block(&self, ip: &str, now: DateTime<Utc>) -> CoreResult<()> {
        let since = now
            .checked_sub_signed(self.config.ip_attempt_window())
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let failures = self.attempt_repo.count_failed_by_ip_since(ip, since).await?;
        if failures >= u64::from(self.config.max_failed_attempts_per_ip) {
            warn!(ip_address = %ip, failures, "Login refused for blocked address");
            return Err(AuthError::IpBlocked { ip: ip.to_string() }.into());
        }
        Ok(())
    }

    async fn record_attempt(
        &self,
        input: &LoginInput,
        success: bool,
        now: DateTime<Utc>,
    ) -> CoreResult<()> {
        self.attempt_repo
            .record(CreateLoginAttempt {
                email: input.email.clone(),
                ip_address: input.ip_address.clone(),
                user_agent: input.user_agent.clone(),
                success,
                attempted_at: now,
            })
            .await?;
        Ok(())
    }

    async fn record_failed_attempt(&self, user: &User, now: DateTime<Utc>) -> CoreResult<()> {
        // A lock that has run out starts a fresh streak.
        let previous = if user.locked_until.is_some() {
            0
        } else {
            user.failed_login_attempts
        };
        let attempts = previous + 1;

        let locked_until = if attempts >= self.config.max_failed_login_attempts {
            let until = now
                .checked_add_signed(self.config.lockout_duration())
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            warn!(user_id = %user.id, attempts, %until, "Account locked after failed logins");
            Some(Some(until))
        } else {
            warn!(user_id = %user.id, attempts, "Failed login");
            Some(None)
        };

        self.user_repo
            .update(
                user.id,
                UpdateUser {
                    failed_login_attempts: Some(attempts),
                    locked_until,
                    ..Default::default()
                },
            )
            .await?;

        Ok(())
    }

    async fn check_church_association(&self, user: &User) -> CoreResult<()> {
        if !user.role.requires_church() {
            return Ok(());
        }

        let church_id = user.church_id.ok_or_else(|| {
            AuthError::ChurchAssociation(format!("role {} requires a church", user.role))
        })?;

        let church = match self.church_repo.get_by_id(church_id).await {
            Ok(c) => c,
            Err(CoreError::NotFound { .. }) => {
                return Err(AuthError::ChurchAssociation("church does not exist".into()).into());
            }
            Err(e) => return Err(e),
        };

        if !church.active {
            return Err(AuthError::ChurchAssociation("church is inactive".into()).into());
        }

        Ok(())
    }
}
