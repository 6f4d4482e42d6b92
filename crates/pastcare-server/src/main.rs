//! PastCare Server: application entry point.

mod cleanup;
mod config;

use std::time::Duration;

use pastcare_auth::AuthService;
use pastcare_db::DbManager;
use pastcare_db::repository::{
    SurrealChurchRepository, SurrealLoginAttemptRepository, SurrealRefreshTokenRepository,
    SurrealUserRepository,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    let config_path =
        std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config/config.yaml".to_string());
    let cfg = Config::load(&config_path)?;

    info!(
        app_name = %cfg.app.name,
        version = %cfg.app.version,
        environment = %cfg.app.environment,
        "Starting PastCare server"
    );

    let db = DbManager::connect(&cfg.database).await?;
    if !cfg.database.migrate_on_connect {
        warn!("Schema migrations are disabled for this deployment");
    }

    let phones = cfg.sms.phone_numbers();
    info!(
        local_prefix = phones.table().local_prefix(),
        country_codes = phones.table().len(),
        "SMS routing table loaded"
    );

    let client = db.client().clone();
    let user_repo = match cfg.auth.settings.pepper.clone() {
        Some(pepper) => SurrealUserRepository::with_pepper(client.clone(), pepper),
        None => SurrealUserRepository::new(client.clone()),
    };
    let service = AuthService::new(
        user_repo,
        SurrealChurchRepository::new(client.clone()),
        SurrealRefreshTokenRepository::new(client.clone()),
        SurrealLoginAttemptRepository::new(client),
        cfg.auth.settings.clone(),
    );

    let every = Duration::from_secs(cfg.maintenance.cleanup_interval_secs);
    info!(interval_secs = every.as_secs(), "Cleanup scheduled");
    cleanup::run_cleanup_loop(&service, every, shutdown_signal()).await;

    info!("PastCare server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                warn!(error = %e, "Failed to listen for Ctrl-C");
            }
        },
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
