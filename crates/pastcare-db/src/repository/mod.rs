//! SurrealDB repository implementations.

mod church;
mod login_attempt;
mod refresh_token;
mod user;

pub use church::SurrealChurchRepository;
pub use login_attempt::SurrealLoginAttemptRepository;
pub use refresh_token::SurrealRefreshTokenRepository;
pub use user::SurrealUserRepository;

use surrealdb_types::SurrealValue;

/// Row struct for `count()` queries.
#[derive(Debug, SurrealValue)]
pub(crate) struct CountRow {
    pub(crate) total: u64,
}
