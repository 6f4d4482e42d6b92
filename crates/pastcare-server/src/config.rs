use std::path::Path;

use pastcare_auth::AuthConfig;
use pastcare_db::DbConfig;
use pastcare_sms::SmsConfig;
use serde::Deserialize;

/// Top-level server configuration, loaded from YAML. Every section is
/// optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub app: AppConfig,
    #[serde(default)]
    pub database: DbConfig,
    #[serde(default)]
    pub auth: AuthSection,
    #[serde(default)]
    pub sms: SmsConfig,
    #[serde(default)]
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            version: default_version(),
            environment: default_environment(),
        }
    }
}

fn default_name() -> String {
    "pastcare-server".to_string()
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_environment() -> String {
    "dev".to_string()
}

/// Auth settings plus optional key files. A key file is only read when
/// the matching inline PEM is empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthSection {
    #[serde(flatten)]
    pub settings: AuthConfig,
    #[serde(default)]
    pub jwt_private_key_file: Option<String>,
    #[serde(default)]
    pub jwt_public_key_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MaintenanceConfig {
    /// Seconds between cleanup passes over expired sessions and old
    /// login attempts.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

fn default_cleanup_interval() -> u64 {
    3600
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Failed to read config file {}: {}", path, e))?;
        let mut config = Self::from_yaml(&content)?;
        config.resolve_key_files()?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config file: {}", e))
    }

    /// Fill empty inline PEM keys from their configured files.
    pub fn resolve_key_files(&mut self) -> anyhow::Result<()> {
        let auth = &mut self.auth;
        if auth.settings.jwt_private_key_pem.is_empty() {
            if let Some(path) = &auth.jwt_private_key_file {
                auth.settings.jwt_private_key_pem = read_key(path)?;
            }
        }
        if auth.settings.jwt_public_key_pem.is_empty() {
            if let Some(path) = &auth.jwt_public_key_file {
                auth.settings.jwt_public_key_pem = read_key(path)?;
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.database.validate()?;
        self.auth.settings.validate()?;
        if self.auth.settings.jwt_private_key_pem.is_empty()
            || self.auth.settings.jwt_public_key_pem.is_empty()
        {
            anyhow::bail!("auth: JWT signing keys are not configured");
        }
        if self.maintenance.cleanup_interval_secs == 0 {
            anyhow::bail!("maintenance.cleanup_interval_secs must be positive");
        }
        Ok(())
    }
}

fn read_key(path: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(Path::new(path))
        .map_err(|e| anyhow::anyhow!("Failed to read key file {}: {}", path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_deserialization() {
        let yaml = r#"
app:
  name: "pastcare-server"
  environment: "staging"
database:
  url: "db.internal:8000"
  namespace: "pastcare"
  database: "main"
auth:
  jwt_private_key_pem: "private"
  jwt_public_key_pem: "public"
  max_active_sessions_per_user: 3
  session_retention_secs: 86400
sms:
  local_prefix: "+234"
maintenance:
  cleanup_interval_secs: 600
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.app.environment, "staging");
        assert_eq!(config.app.version, "0.1.0");
        assert_eq!(config.database.url, "db.internal:8000");
        assert_eq!(config.auth.settings.max_active_sessions_per_user, 3);
        assert_eq!(config.auth.settings.session_retention_secs, 86_400);
        // Unset auth fields keep their defaults.
        assert_eq!(config.auth.settings.refresh_token_lifetime_secs, 2_592_000);
        assert_eq!(config.sms.local_prefix, "+234");
        assert_eq!(config.maintenance.cleanup_interval_secs, 600);
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_sections_take_defaults() {
        let config = Config::from_yaml("app:\n  name: \"pc\"\n").unwrap();
        assert_eq!(config.app.name, "pc");
        assert_eq!(config.database.namespace, "pastcare");
        assert_eq!(config.auth.settings.max_active_sessions_per_user, 5);
        assert_eq!(config.auth.settings.jwt_issuer, "pastcare");
        assert_eq!(config.sms.local_prefix, "+233");
        assert_eq!(config.maintenance.cleanup_interval_secs, 3600);
    }

    #[test]
    fn test_validate_rejects_missing_keys() {
        let config = Config::from_yaml("{}").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_session_cap() {
        let yaml = r#"
auth:
  jwt_private_key_pem: "private"
  jwt_public_key_pem: "public"
  max_active_sessions_per_user: 0
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_lifetime() {
        let yaml = r#"
auth:
  jwt_private_key_pem: "private"
  jwt_public_key_pem: "public"
  refresh_token_lifetime_secs: 18446744073709551615
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_section_is_validated() {
        let yaml = r#"
database:
  url: "https://db.internal"
auth:
  jwt_private_key_pem: "private"
  jwt_public_key_pem: "public"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_anonymous_database_without_migrations() {
        let yaml = r#"
database:
  url: "ws://db.internal:8000"
  username: null
  password: null
  migrate_on_connect: false
auth:
  jwt_private_key_pem: "private"
  jwt_public_key_pem: "public"
  max_failed_attempts_per_ip: 20
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert!(config.database.username.is_none());
        assert!(!config.database.migrate_on_connect);
        assert_eq!(config.database.address(), "db.internal:8000");
        assert_eq!(config.auth.settings.max_failed_attempts_per_ip, 20);
        assert_eq!(config.auth.settings.ip_attempt_window_secs, 900);
        config.validate().unwrap();
    }

    #[test]
    fn test_key_files_fill_empty_pems() {
        let dir = std::env::temp_dir().join(format!("pastcare-keys-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let private = dir.join("jwt.pem");
        let public = dir.join("jwt.pub.pem");
        std::fs::write(&private, "PRIVATE PEM").unwrap();
        std::fs::write(&public, "PUBLIC PEM").unwrap();

        let yaml = format!(
            "auth:\n  jwt_private_key_file: \"{}\"\n  jwt_public_key_file: \"{}\"\n",
            private.display(),
            public.display()
        );
        let mut config = Config::from_yaml(&yaml).unwrap();
        config.resolve_key_files().unwrap();

        assert_eq!(config.auth.settings.jwt_private_key_pem, "PRIVATE PEM");
        assert_eq!(config.auth.settings.jwt_public_key_pem, "PUBLIC PEM");
        config.validate().unwrap();

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_missing_key_file_is_an_error() {
        let mut config =
            Config::from_yaml("auth:\n  jwt_private_key_file: \"/nonexistent/jwt.pem\"\n").unwrap();
        assert!(config.resolve_key_files().is_err());
    }
}
