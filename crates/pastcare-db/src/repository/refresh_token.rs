//! SurrealDB implementation of [`RefreshTokenRepository`].

use chrono::{DateTime, Utc};
use pastcare_core::error::CoreResult;
use pastcare_core::models::refresh_token::{CreateRefreshToken, RefreshToken};
use pastcare_core::repository::RefreshTokenRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use super::CountRow;
use crate::error::DbError;

/// Row returned by `UPDATE`, where the UUID is already known.
#[derive(Debug, SurrealValue)]
struct RefreshTokenRow {
    revoked: bool,
}

#[derive(Debug, SurrealValue)]
struct RefreshTokenRowWithId {
    record_id: String,
    user_id: String,
    church_id: Option<String>,
    token_hash: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    last_used_at: DateTime<Utc>,
    revoked: bool,
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl RefreshTokenRowWithId {
    fn try_into_token(self) -> Result<RefreshToken, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Migration(format!("invalid UUID: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| DbError::Migration(format!("invalid user UUID: {e}")))?;
        let church_id = self
            .church_id
            .map(|s| {
                Uuid::parse_str(&s)
                    .map_err(|e| DbError::Migration(format!("invalid church UUID: {e}")))
            })
            .transpose()?;
        Ok(RefreshToken {
            id,
            user_id,
            church_id,
            token_hash: self.token_hash,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            last_used_at: self.last_used_at,
            revoked: self.revoked,
            ip_address: self.ip_address,
            user_agent: self.user_agent,
        })
    }
}

/// SurrealDB implementation of the refresh token repository.
#[derive(Clone)]
pub struct SurrealRefreshTokenRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealRefreshTokenRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> RefreshTokenRepository for SurrealRefreshTokenRepository<C> {
    async fn issue(&self, input: CreateRefreshToken, evict: &[Uuid]) -> CoreResult<RefreshToken> {
        let id = Uuid::new_v4();
        let evict: Vec<String> = evict.iter().map(Uuid::to_string).collect();

        // Evictions and the new record commit or fail together.
        self.db
            .query(
                "BEGIN TRANSACTION; \
                 UPDATE refresh_token SET revoked = true \
                 WHERE user_id = $user_id AND meta::id(id) IN $evict; \
                 CREATE type::record('refresh_token', $id) SET \
                 user_id = $user_id, \
                 church_id = $church_id, \
                 token_hash = $token_hash, \
                 issued_at = $issued_at, \
                 expires_at = $expires_at, \
                 last_used_at = $issued_at, \
                 revoked = false, \
                 ip_address = $ip_address, \
                 user_agent = $user_agent; \
                 COMMIT TRANSACTION;",
            )
            .bind(("id", id.to_string()))
            .bind(("evict", evict))
            .bind(("user_id", input.user_id.to_string()))
            .bind(("church_id", input.church_id.map(|c| c.to_string())))
            .bind(("token_hash", input.token_hash.clone()))
            .bind(("issued_at", input.issued_at))
            .bind(("expires_at", input.expires_at))
            .bind(("ip_address", input.ip_address.clone()))
            .bind(("user_agent", input.user_agent.clone()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(RefreshToken {
            id,
            user_id: input.user_id,
            church_id: input.church_id,
            token_hash: input.token_hash,
            issued_at: input.issued_at,
            expires_at: input.expires_at,
            last_used_at: input.issued_at,
            revoked: false,
            ip_address: input.ip_address,
            user_agent: input.user_agent,
        })
    }

    async fn update(&self, token: &RefreshToken) -> CoreResult<()> {
        let id_str = token.id.to_string();

        // `revoked` only ever moves from false to true.
        let result = self
            .db
            .query(
                "UPDATE type::record('refresh_token', $id) SET \
                 last_used_at = $last_used_at, \
                 revoked = revoked OR $revoked",
            )
            .bind(("id", id_str.clone()))
            .bind(("last_used_at", token.last_used_at))
            .bind(("revoked", token.revoked))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        let rows: Vec<RefreshTokenRow> = result.take(0).map_err(DbError::from)?;
        if rows.is_empty() {
            return Err(DbError::NotFound {
                entity: "refresh_token".into(),
                id: id_str,
            }
            .into());
        }

        Ok(())
    }

    async fn find_by_token_hash(&self, token_hash: &str) -> CoreResult<Option<RefreshToken>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM refresh_token \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RefreshTokenRowWithId> = result.take(0).map_err(DbError::from)?;
        let token = rows
            .into_iter()
            .next()
            .map(RefreshTokenRowWithId::try_into_token)
            .transpose()?;

        Ok(token)
    }

    async fn find_valid_by_user(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<RefreshToken>> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM refresh_token \
                 WHERE user_id = $user_id AND revoked = false \
                 AND expires_at > $now \
                 ORDER BY last_used_at DESC",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<RefreshTokenRowWithId> = result.take(0).map_err(DbError::from)?;
        let tokens = rows
            .into_iter()
            .map(RefreshTokenRowWithId::try_into_token)
            .collect::<Result<Vec<_>, DbError>>()?;

        Ok(tokens)
    }

    async fn count_valid_by_user(&self, user_id: Uuid, now: DateTime<Utc>) -> CoreResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM refresh_token \
                 WHERE user_id = $user_id AND revoked = false \
                 AND expires_at > $now \
                 GROUP ALL",
            )
            .bind(("user_id", user_id.to_string()))
            .bind(("now", now))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn revoke_all_by_user(&self, user_id: Uuid) -> CoreResult<u64> {
        let user_id_str = user_id.to_string();

        // Count not-yet-revoked tokens first, then revoke.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM refresh_token \
                 WHERE user_id = $user_id AND revoked = false \
                 GROUP ALL",
            )
            .bind(("user_id", user_id_str.clone()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query(
                "UPDATE refresh_token SET revoked = true \
                 WHERE user_id = $user_id AND revoked = false",
            )
            .bind(("user_id", user_id_str))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(total)
    }

    async fn delete_expired_before(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM refresh_token \
                 WHERE expires_at < $cutoff \
                 GROUP ALL",
            )
            .bind(("cutoff", cutoff))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE refresh_token WHERE expires_at < $cutoff")
            .bind(("cutoff", cutoff))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(total)
    }
}
