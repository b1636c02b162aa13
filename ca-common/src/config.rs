//! Configuration loading and root folder resolution
//!
//! Bootstrap configuration comes from an optional TOML file. A missing or
//! unreadable file never stops startup: a warning is logged and built-in
//! defaults are used.
//!
//! Root folder priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`CA_ROOT_FOLDER`)
//! 3. TOML config file (`root_folder`)
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding the root folder
pub const ROOT_FOLDER_ENV: &str = "CA_ROOT_FOLDER";

/// Environment variable carrying the Emusys API token
pub const EMUSYS_TOKEN_ENV: &str = "EMUSYS_TOKEN";

/// Application directory name used under the platform config/data dirs
const APP_DIR: &str = "confirmaula";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Root folder for the local cache and the default remote database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// HTTP bind host
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// sqlx connection URL of the remote store (defaults to `<root>/remote.db`)
    #[serde(default)]
    pub remote_database_url: Option<String>,

    #[serde(default)]
    pub emusys: EmusysConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            root_folder: None,
            port: default_port(),
            bind_host: default_bind_host(),
            remote_database_url: None,
            emusys: EmusysConfig::default(),
            sync: SyncConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// External lesson API settings
#[derive(Debug, Clone, Deserialize)]
pub struct EmusysConfig {
    #[serde(default = "default_emusys_base_url")]
    pub base_url: String,

    /// API token; `EMUSYS_TOKEN` takes precedence when set
    #[serde(default)]
    pub token: Option<String>,

    /// Safety cap on records fetched per range
    #[serde(default = "default_max_records")]
    pub max_records: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmusysConfig {
    fn default() -> Self {
        Self {
            base_url: default_emusys_base_url(),
            token: None,
            max_records: default_max_records(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl EmusysConfig {
    /// Token from the environment, else from TOML; blank values count as missing
    pub fn resolved_token(&self) -> Option<String> {
        std::env::var(EMUSYS_TOKEN_ENV)
            .ok()
            .or_else(|| self.token.clone())
            .filter(|t| !t.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Sync timers
#[derive(Debug, Clone, Deserialize)]
pub struct SyncConfig {
    /// Delay between the last local change and the remote push
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Remote divergence polling interval
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Background check for new external lessons
    #[serde(default = "default_update_check_interval_secs")]
    pub update_check_interval_secs: u64,

    /// Repair the remote store right after the initial load
    #[serde(default = "default_true")]
    pub heal_on_load: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            poll_interval_secs: default_poll_interval_secs(),
            update_check_interval_secs: default_update_check_interval_secs(),
            heal_on_load: true,
        }
    }
}

impl SyncConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn update_check_interval(&self) -> Duration {
        Duration::from_secs(self.update_check_interval_secs.max(1))
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    5740
}

fn default_bind_host() -> String {
    "127.0.0.1".to_string()
}

fn default_emusys_base_url() -> String {
    "https://api.emusys.com.br/v1".to_string()
}

fn default_max_records() -> usize {
    5000
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_debounce_ms() -> u64 {
    3000
}

fn default_poll_interval_secs() -> u64 {
    20
}

fn default_update_check_interval_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid TOML in {}: {}", path.display(), e)))
}

/// Load the config file, falling back to defaults when it is missing or invalid
///
/// `explicit` is the `--config` path; without it the platform default
/// location is tried.
pub fn load_or_default(explicit: Option<&Path>) -> TomlConfig {
    let path = match explicit.map(Path::to_path_buf).or_else(default_config_path) {
        Some(p) => p,
        None => {
            warn!("Could not determine config directory, using built-in defaults");
            return TomlConfig::default();
        }
    };

    if !path.exists() {
        info!("No config file at {}, using built-in defaults", path.display());
        return TomlConfig::default();
    }

    match load_toml_config(&path) {
        Ok(config) => {
            info!("Loaded config from {}", path.display());
            config
        }
        Err(e) => {
            warn!("{} - using built-in defaults", e);
            TomlConfig::default()
        }
    }
}

/// `~/.config/confirmaula/ca-sync.toml` (platform equivalent elsewhere)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("ca-sync.toml"))
}

/// Resolves the root folder following the priority order above
#[derive(Debug, Clone)]
pub struct RootFolderResolver {
    module_name: String,
    cli_arg: Option<PathBuf>,
    toml_root: Option<PathBuf>,
}

impl RootFolderResolver {
    pub fn new(module_name: &str) -> Self {
        Self {
            module_name: module_name.to_string(),
            cli_arg: None,
            toml_root: None,
        }
    }

    pub fn with_cli_arg(mut self, path: Option<PathBuf>) -> Self {
        self.cli_arg = path;
        self
    }

    pub fn with_toml_root(mut self, path: Option<PathBuf>) -> Self {
        self.toml_root = path;
        self
    }

    pub fn resolve(&self) -> PathBuf {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_arg {
            info!("{}: root folder from command line", self.module_name);
            return path.clone();
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV) {
            if !path.trim().is_empty() {
                info!("{}: root folder from {}", self.module_name, ROOT_FOLDER_ENV);
                return PathBuf::from(path);
            }
        }

        // Priority 3: TOML config file
        if let Some(path) = &self.toml_root {
            info!("{}: root folder from config file", self.module_name);
            return path.clone();
        }

        // Priority 4: OS-dependent compiled default
        default_root_folder()
    }
}

/// OS-dependent default root folder
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("./confirmaula_data"))
}

/// Creates the root folder layout on first run
#[derive(Debug, Clone)]
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn ensure_directory_exists(&self) -> Result<()> {
        std::fs::create_dir_all(self.cache_dir())?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the local cache JSON files
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("cache")
    }

    /// Default sqlite file used as the remote store
    pub fn remote_database_path(&self) -> PathBuf {
        self.root.join("remote.db")
    }

    /// sqlx URL for the default remote store
    pub fn remote_database_url(&self) -> String {
        format!("sqlite://{}?mode=rwc", self.remote_database_path().display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_sections_missing() {
        let config: TomlConfig = toml::from_str("port = 6000").unwrap();
        assert_eq!(config.port, 6000);
        assert_eq!(config.bind_host, "127.0.0.1");
        assert_eq!(config.emusys.max_records, 5000);
        assert_eq!(config.sync.debounce_ms, 3000);
        assert_eq!(config.sync.poll_interval_secs, 20);
        assert!(config.sync.heal_on_load);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_intervals_never_zero() {
        let sync = SyncConfig {
            debounce_ms: 0,
            poll_interval_secs: 0,
            update_check_interval_secs: 0,
            heal_on_load: false,
        };
        assert_eq!(sync.debounce(), Duration::ZERO);
        assert_eq!(sync.poll_interval(), Duration::from_secs(1));
        assert_eq!(sync.update_check_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_initializer_layout() {
        let init = RootFolderInitializer::new(PathBuf::from("/srv/studio"));
        assert_eq!(init.cache_dir(), PathBuf::from("/srv/studio/cache"));
        assert_eq!(
            init.remote_database_url(),
            "sqlite:///srv/studio/remote.db?mode=rwc"
        );
    }
}
