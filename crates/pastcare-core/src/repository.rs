//! Repository trait definitions for data access abstraction.
//!
//! All repository operations are async. Lookups that callers routinely
//! expect to miss (refresh tokens) return `Option`; entity lookups by id
//! return [`CoreError::NotFound`](crate::error::CoreError::NotFound).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::CoreResult;
use crate::models::{
    church::{Church, CreateChurch, UpdateChurch},
    login_attempt::{CreateLoginAttempt, LoginAttempt},
    refresh_token::{CreateRefreshToken, RefreshToken},
    user::{CreateUser, UpdateUser, User},
};

// ---------------------------------------------------------------------------
// Churches (tenants)
// ---------------------------------------------------------------------------

pub trait ChurchRepository: Send + Sync {
    fn create(&self, input: CreateChurch) -> impl Future<Output = CoreResult<Church>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<Church>> + Send;
    fn update(
        &self,
        id: Uuid,
        input: UpdateChurch,
    ) -> impl Future<Output = CoreResult<Church>> + Send;
    /// Church names are unique ignoring case.
    fn exists_by_name(&self, name: &str) -> impl Future<Output = CoreResult<bool>> + Send;
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

pub trait UserRepository: Send + Sync {
    fn create(&self, input: CreateUser) -> impl Future<Output = CoreResult<User>> + Send;
    fn get_by_id(&self, id: Uuid) -> impl Future<Output = CoreResult<User>> + Send;
    /// Emails are unique across all churches.
    fn get_by_email(&self, email: &str) -> impl Future<Output = CoreResult<User>> + Send;
    fn update(&self, id: Uuid, input: UpdateUser)
    -> impl Future<Output = CoreResult<User>> + Send;
}

// ---------------------------------------------------------------------------
// Refresh tokens
// ---------------------------------------------------------------------------

pub trait RefreshTokenRepository: Send + Sync {
    /// Store a new token and revoke `evict` in the same transaction.
    fn issue(
        &self,
        input: CreateRefreshToken,
        evict: &[Uuid],
    ) -> impl Future<Output = CoreResult<RefreshToken>> + Send;
    /// Persist `last_used_at` and `revoked` of an existing token.
    fn update(&self, token: &RefreshToken) -> impl Future<Output = CoreResult<()>> + Send;
    fn find_by_token_hash(
        &self,
        token_hash: &str,
    ) -> impl Future<Output = CoreResult<Option<RefreshToken>>> + Send;
    /// Tokens of `user_id` that are unrevoked and unexpired at `now`.
    fn find_valid_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = CoreResult<Vec<RefreshToken>>> + Send;
    fn count_valid_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> impl Future<Output = CoreResult<u64>> + Send;
    /// Revoke every token of a user; returns how many were newly revoked.
    fn revoke_all_by_user(&self, user_id: Uuid) -> impl Future<Output = CoreResult<u64>> + Send;
    /// Delete tokens whose `expires_at` is strictly before `cutoff`.
    fn delete_expired_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> impl Future<Output = CoreResult<u64>> + Send;
}

// ---------------------------------------------------------------------------
// Login attempts
// ---------------------------------------------------------------------------

pub trait LoginAttemptRepository: Send + Sync {
    fn record(
        &self,
        input: CreateLoginAttempt,
    ) -> impl Future<Output = CoreResult<LoginAttempt>> + Send;
    /// Failed attempts from `ip_address` at or after `since`.
    fn count_failed_by_ip_since(
        &self,
        ip_address: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = CoreResult<u64>> + Send;
    /// Delete attempts strictly before `cutoff`.
    fn delete_before(&self, cutoff: DateTime<Utc>)
    -> impl Future<Output = CoreResult<u64>> + Send;
}
