//! Schema definitions and migration runner for SurrealDB.
//!
//! All table definitions use SCHEMAFULL mode. UUIDs are stored as
//! strings, enums as strings with ASSERT constraints.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: SCHEMA_V1,
    },
    Migration {
        version: 2,
        name: "church_registration_and_login_attempts",
        sql: SCHEMA_V2,
    },
];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Churches (tenants)
-- =======================================================================
DEFINE TABLE church SCHEMAFULL;
DEFINE FIELD name ON TABLE church TYPE string;
DEFINE FIELD email ON TABLE church TYPE option<string>;
DEFINE FIELD phone_number ON TABLE church TYPE option<string>;
DEFINE FIELD address ON TABLE church TYPE option<string>;
DEFINE FIELD website ON TABLE church TYPE option<string>;
DEFINE FIELD active ON TABLE church TYPE bool DEFAULT true;
DEFINE FIELD created_at ON TABLE church TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE church TYPE datetime \
    DEFAULT time::now();

-- =======================================================================
-- Users (church scope; church_id is NONE for super-admins)
-- =======================================================================
DEFINE TABLE user SCHEMAFULL;
DEFINE FIELD church_id ON TABLE user TYPE option<string>;
DEFINE FIELD name ON TABLE user TYPE string;
DEFINE FIELD email ON TABLE user TYPE string;
DEFINE FIELD phone_number ON TABLE user TYPE option<string>;
DEFINE FIELD title ON TABLE user TYPE option<string>;
DEFINE FIELD role ON TABLE user TYPE string \
    ASSERT $value IN ['SuperAdmin', 'Admin', 'Pastor', 'Treasurer', \
    'FellowshipHead', 'FellowshipLeader', 'MemberManager', 'Member'];
DEFINE FIELD password_hash ON TABLE user TYPE string;
DEFINE FIELD failed_login_attempts ON TABLE user TYPE int DEFAULT 0;
DEFINE FIELD locked_until ON TABLE user TYPE option<datetime>;
DEFINE FIELD created_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE FIELD updated_at ON TABLE user TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX idx_user_email ON TABLE user COLUMNS email UNIQUE;
DEFINE INDEX idx_user_church ON TABLE user COLUMNS church_id;

-- =======================================================================
-- Refresh tokens (one per signed-in device)
-- =======================================================================
DEFINE TABLE refresh_token SCHEMAFULL;
DEFINE FIELD user_id ON TABLE refresh_token TYPE string;
DEFINE FIELD church_id ON TABLE refresh_token TYPE option<string>;
DEFINE FIELD token_hash ON TABLE refresh_token TYPE string;
DEFINE FIELD issued_at ON TABLE refresh_token TYPE datetime;
DEFINE FIELD expires_at ON TABLE refresh_token TYPE datetime;
DEFINE FIELD last_used_at ON TABLE refresh_token TYPE datetime;
DEFINE FIELD revoked ON TABLE refresh_token TYPE bool DEFAULT false;
DEFINE FIELD ip_address ON TABLE refresh_token TYPE option<string>;
DEFINE FIELD user_agent ON TABLE refresh_token TYPE option<string>;
DEFINE INDEX idx_refresh_token_hash ON TABLE refresh_token \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_refresh_token_user ON TABLE refresh_token \
    COLUMNS user_id;
DEFINE INDEX idx_refresh_token_expiry ON TABLE refresh_token \
    COLUMNS expires_at;
";

// -----------------------------------------------------------------------
// Schema v2
// -----------------------------------------------------------------------

const SCHEMA_V2: &str = "\
-- =======================================================================
-- Case-insensitive church names
-- =======================================================================
DEFINE FIELD name_key ON TABLE church TYPE string;
UPDATE church SET name_key = string::lowercase(name);
DEFINE INDEX idx_church_name_key ON TABLE church COLUMNS name_key UNIQUE;

-- =======================================================================
-- Login attempts (per-IP throttling and audit)
-- =======================================================================
DEFINE TABLE login_attempt SCHEMAFULL;
DEFINE FIELD email ON TABLE login_attempt TYPE string;
DEFINE FIELD ip_address ON TABLE login_attempt TYPE option<string>;
DEFINE FIELD user_agent ON TABLE login_attempt TYPE option<string>;
DEFINE FIELD success ON TABLE login_attempt TYPE bool;
DEFINE FIELD attempted_at ON TABLE login_attempt TYPE datetime;
DEFINE INDEX idx_login_attempt_ip ON TABLE login_attempt \
    COLUMNS ip_address, attempted_at;
DEFINE INDEX idx_login_attempt_time ON TABLE login_attempt \
    COLUMNS attempted_at;
";

/// Run all pending migrations against the database.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current_version {
            continue;
        }

        info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        db.query(migration.sql).await?.check().map_err(|e| {
            DbError::Migration(format!(
                "Migration v{} '{}' failed: {}",
                migration.version, migration.name, e,
            ))
        })?;

        db.query(
            "CREATE _migration SET version = $version, \
             name = $name",
        )
        .bind(("version", migration.version))
        .bind(("name", migration.name))
        .await?
        .check()
        .map_err(|e| {
            DbError::Migration(format!(
                "Failed to record migration v{}: {}",
                migration.version, e,
            ))
        })?;

        info!(version = migration.version, "Migration applied");
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}

/// Returns the raw schema DDL for version 2.
pub fn schema_v2() -> &'static str {
    SCHEMA_V2
}
