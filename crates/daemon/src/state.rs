use std::str::FromStr;
use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

use common::client::{ClientError, KeyClient};
use common::keystore::{FsBackend, KeyStore};

pub const APP_NAME: &str = "jailbird";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "db.sqlite";
pub const KEYS_DIR_NAME: &str = "keys";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Identity sent with every API request
    #[serde(default)]
    pub user: Option<String>,
    /// Default log level for the service (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_api_port() -> u16 {
    service::config::DEFAULT_API_PORT
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            user: None,
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    pub fn tracing_level(&self) -> Result<tracing::Level, StateError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| StateError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the jailbird directory (~/.jailbird)
    pub jailbird_dir: PathBuf,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Path to the local key store
    pub keys_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the jailbird directory path (custom or default ~/.jailbird)
    pub fn jailbird_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new jailbird state directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let jailbird_dir = Self::jailbird_dir(custom_path)?;

        if jailbird_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        let config = config.unwrap_or_default();
        config.tracing_level()?;

        fs::create_dir_all(&jailbird_dir)?;

        let keys_path = jailbird_dir.join(KEYS_DIR_NAME);
        fs::create_dir_all(&keys_path)?;

        let config_path = jailbird_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // Create empty database (just touch the file, it will be initialized by the service)
        let db_path = jailbird_dir.join(DB_FILE_NAME);
        fs::write(&db_path, "")?;

        Ok(Self {
            jailbird_dir,
            db_path,
            keys_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the jailbird directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let jailbird_dir = Self::jailbird_dir(custom_path)?;

        if !jailbird_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = jailbird_dir.join(DB_FILE_NAME);
        let keys_path = jailbird_dir.join(KEYS_DIR_NAME);
        let config_path = jailbird_dir.join(CONFIG_FILE_NAME);

        if !db_path.exists() {
            return Err(StateError::MissingFile(DB_FILE_NAME.to_string()));
        }
        if !keys_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", KEYS_DIR_NAME)));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            jailbird_dir,
            db_path,
            keys_path,
            config_path,
            config,
        })
    }

    pub fn key_store(&self) -> KeyStore {
        KeyStore::new(FsBackend::new(self.keys_path.clone()))
    }

    /// A key client over the local key store, with every readable key
    ///  loaded. Unreadable records are logged and skipped.
    pub async fn key_client(&self) -> Result<KeyClient, StateError> {
        let client = KeyClient::new(self.key_store());
        let report = client.initialize_from_store().await?;
        for (variant, kid, reason) in &report.failed {
            tracing::warn!(%variant, %kid, "unreadable key record: {}", reason);
        }
        Ok(client)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("jailbird directory not initialized. Run 'jailbird init' first")]
    NotInitialized,

    #[error("jailbird directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("key store error: {0}")]
    Keys(#[from] ClientError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("state");
        let config = AppConfig {
            user: Some("alice".to_string()),
            ..Default::default()
        };

        let created = AppState::init(Some(root.clone()), Some(config.clone())).unwrap();
        assert!(created.keys_path.is_dir());
        assert!(created.db_path.is_file());

        let loaded = AppState::load(Some(root)).unwrap();
        assert_eq!(loaded.config, config);
    }

    #[test]
    fn test_init_twice_fails() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("state");
        AppState::init(Some(root.clone()), None).unwrap();
        assert!(matches!(
            AppState::init(Some(root), None),
            Err(StateError::AlreadyInitialized)
        ));
    }

    #[test]
    fn test_load_uninitialized() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppState::load(Some(dir.path().join("missing"))),
            Err(StateError::NotInitialized)
        ));
    }

    #[test]
    fn test_config_defaults_fill_missing_fields() {
        let config: AppConfig = toml::from_str("user = \"bob\"").unwrap();
        assert_eq!(config.api_port, service::config::DEFAULT_API_PORT);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.tracing_level().unwrap(), tracing::Level::INFO);
    }

    #[test]
    fn test_bad_log_level_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            log_level: "chatty".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            AppState::init(Some(dir.path().join("state")), Some(config)),
            Err(StateError::InvalidLogLevel(_))
        ));
    }

    #[tokio::test]
    async fn test_key_client_reads_local_store() {
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::init(Some(dir.path().join("state")), None).unwrap();
        let client = state.key_client().await.unwrap();
        assert_eq!(client.private_key_count(), 0);
    }
}
