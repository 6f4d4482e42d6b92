//! SurrealDB implementation of [`LoginAttemptRepository`].

use chrono::{DateTime, Utc};
use pastcare_core::error::CoreResult;
use pastcare_core::models::login_attempt::{CreateLoginAttempt, LoginAttempt};
use pastcare_core::repository::LoginAttemptRepository;
use surrealdb::{Connection, Surreal};
use uuid::Uuid;

use super::CountRow;
use crate::error::DbError;

/// SurrealDB implementation of the login attempt repository.
#[derive(Clone)]
pub struct SurrealLoginAttemptRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealLoginAttemptRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> LoginAttemptRepository for SurrealLoginAttemptRepository<C> {
    async fn record(&self, input: CreateLoginAttempt) -> CoreResult<LoginAttempt> {
        let id = Uuid::new_v4();
        let email = input.email.trim().to_lowercase();

        self.db
            .query(
                "CREATE type::record('login_attempt', $id) SET \
                 email = $email, \
                 ip_address = $ip_address, \
                 user_agent = $user_agent, \
                 success = $success, \
                 attempted_at = $attempted_at",
            )
            .bind(("id", id.to_string()))
            .bind(("email", email.clone()))
            .bind(("ip_address", input.ip_address.clone()))
            .bind(("user_agent", input.user_agent.clone()))
            .bind(("success", input.success))
            .bind(("attempted_at", input.attempted_at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(LoginAttempt {
            id,
            email,
            ip_address: input.ip_address,
            user_agent: input.user_agent,
            success: input.success,
            attempted_at: input.attempted_at,
        })
    }

    async fn count_failed_by_ip_since(
        &self,
        ip_address: &str,
        since: DateTime<Utc>,
    ) -> CoreResult<u64> {
        let mut result = self
            .db
            .query(
                "SELECT count() AS total FROM login_attempt \
                 WHERE ip_address = $ip_address \
                 AND success = false \
                 AND attempted_at >= $since \
                 GROUP ALL",
            )
            .bind(("ip_address", ip_address.to_string()))
            .bind(("since", since))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CountRow> = result.take(0).map_err(DbError::from)?;
        Ok(rows.first().map(|r| r.total).unwrap_or(0))
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> CoreResult<u64> {
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM login_attempt \
                 WHERE attempted_at < $cutoff \
                 GROUP ALL",
            )
            .bind(("cutoff", cutoff))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query("DELETE login_attempt WHERE attempted_at < $cutoff")
            .bind(("cutoff", cutoff))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Migration(e.to_string()))?;

        Ok(total)
    }
}
