//! SurrealDB connection management.
//!
//! [`DbConfig`] mirrors the `database` section of the server's YAML file.
//! [`DbManager::connect`] validates it, opens a WebSocket session, signs
//! in when credentials are configured and, unless disabled, brings the
//! schema up to date before handing the client out.

use serde::Deserialize;
use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::{info, warn};

use crate::error::DbError;
use crate::schema::run_migrations;

const WS_SCHEME: &str = "ws://";

/// Connection settings for the PastCare database.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Server address, `host:port` or `ws://host:port`.
    pub url: String,
    pub namespace: String,
    pub database: String,
    /// Root credentials. Both or neither; without them the session stays
    /// anonymous, which suits servers started with `--unauthenticated`.
    pub username: Option<String>,
    pub password: Option<String>,
    /// Apply pending schema migrations right after connecting.
    pub migrate_on_connect: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "pastcare".into(),
            database: "main".into(),
            username: Some("root".into()),
            password: Some("root".into()),
            migrate_on_connect: true,
        }
    }
}

impl DbConfig {
    /// Check the settings before any network traffic happens.
    pub fn validate(&self) -> Result<(), DbError> {
        let address = self.address();
        if address.is_empty() {
            return Err(DbError::Config("database.url must not be empty".into()));
        }
        if address.contains("://") {
            return Err(DbError::Config(format!(
                "database.url must be host:port or {WS_SCHEME}host:port, got {}",
                self.url
            )));
        }
        if self.namespace.trim().is_empty() || self.database.trim().is_empty() {
            return Err(DbError::Config(
                "database.namespace and database.database must not be empty".into(),
            ));
        }
        match (&self.username, &self.password) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            _ => Err(DbError::Config(
                "database.username and database.password must be set together".into(),
            )),
        }
    }

    /// `host:port` handed to the WebSocket engine.
    pub fn address(&self) -> &str {
        let url = self.url.trim();
        url.strip_prefix(WS_SCHEME).unwrap_or(url)
    }

    fn credentials(&self) -> Option<Root> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(Root {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }
}

/// Owns the database client shared by every repository.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        config.validate()?;

        info!(
            address = config.address(),
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(config.address()).await?;

        match config.credentials() {
            Some(root) => {
                db.signin(root).await?;
            }
            None => warn!("No database credentials configured, using an anonymous session"),
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        if config.migrate_on_connect {
            run_migrations(&db).await?;
        }

        info!("Connected to SurrealDB");

        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
