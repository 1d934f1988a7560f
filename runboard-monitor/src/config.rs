//! Configuration file support for runboard

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use runboard_data::cache::default_snapshot_path;
use runboard_data::{CacheConfig, PollConfig};
use serde::{Deserialize, Serialize};

pub const API_URL_ENV: &str = "RUNBOARD_API_URL";
pub const API_KEY_ENV: &str = "RUNBOARD_API_KEY";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub tui: TuiConfig,
    pub polling: PollingConfig,
    pub cache: CacheSettings,
    pub logging: LoggingConfig,
}

/// Backend connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: String,
    /// Startup authentication budget in milliseconds
    pub auth_timeout_ms: u64,
}

/// TUI refresh configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TuiConfig {
    /// Input poll / tick interval in milliseconds
    pub tick_rate_ms: u64,
    /// Page size for the run list
    pub page_size: usize,
}

/// Run status polling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub base_interval_secs: u64,
    pub max_interval_secs: u64,
    pub backoff_factor: f64,
    pub timeout_mins: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub run_ttl_secs: u64,
    pub identity_ttl_hours: u64,
    /// Snapshot file. Unset uses `<config dir>/runboard/cache.json`; an
    /// empty string disables persistence.
    pub snapshot_path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Path to the log file
    pub file: PathBuf,
    /// EnvFilter directive used when RUNBOARD_LOG is unset
    pub filter: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            api_key: String::new(),
            auth_timeout_ms: 3000,
        }
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            tick_rate_ms: 250,
            page_size: 20,
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            base_interval_secs: 5,
            max_interval_secs: 30,
            backoff_factor: 1.5,
            timeout_mins: 45,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            run_ttl_secs: 30,
            identity_ttl_hours: 24 * 7,
            snapshot_path: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("~/.local/share/runboard/runboard.log"),
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Returns the default path to the configuration file
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("runboard").join("config.toml"))
    }

    /// Load configuration from `path` (or the default location), falling back
    /// to defaults if the file does not exist, then apply env overrides.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(Self::config_path);
        let mut config = match path {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Environment variables override file values.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.is_empty()) {
            self.api.base_url = url;
        }
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.is_empty()) {
            self.api.api_key = key;
        }
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tui.tick_rate_ms.max(10))
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_millis(self.api.auth_timeout_ms)
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            base_interval: Duration::from_secs(self.polling.base_interval_secs.max(1)),
            max_interval: Duration::from_secs(self.polling.max_interval_secs),
            backoff_factor: self.polling.backoff_factor,
            timeout: Duration::from_secs(self.polling.timeout_mins * 60),
        }
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            run_ttl: Duration::from_secs(self.cache.run_ttl_secs),
            identity_ttl: Duration::from_secs(self.cache.identity_ttl_hours * 3600),
            snapshot_path: match self.cache.snapshot_path.as_deref() {
                Some(p) if p.as_os_str().is_empty() => None,
                Some(p) => Some(expand_path(p)),
                None => default_snapshot_path(),
            },
        }
    }

    pub fn log_file(&self) -> PathBuf {
        expand_path(&self.logging.file)
    }
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) => shellexpand::tilde(s).into_owned().into(),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_config_file(dir: &TempDir, contents: &str) -> PathBuf {
        let config_path = dir.path().join("config.toml");
        let mut file = fs::File::create(&config_path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        config_path
    }

    #[test]
    fn test_default_config_values() {
        let config = Config::default();

        assert_eq!(config.api.base_url, "http://localhost:8080");
        assert_eq!(config.tui.tick_rate_ms, 250);
        assert_eq!(config.polling.base_interval_secs, 5);
        assert_eq!(config.polling.max_interval_secs, 30);
        assert_eq!(config.polling.backoff_factor, 1.5);
        assert_eq!(config.polling.timeout_mins, 45);
        assert_eq!(config.cache.identity_ttl_hours, 168);
        assert_eq!(config.poll_config(), PollConfig::default());
    }

    #[test]
    fn test_loading_from_toml_file() {
        let temp_dir = TempDir::new().unwrap();
        let toml_content = r#"
[api]
base_url = "https://runs.example.com"
api_key = "secret"

[tui]
tick_rate_ms = 100

[polling]
base_interval_secs = 2
max_interval_secs = 10
backoff_factor = 2.0
timeout_mins = 5

[cache]
run_ttl_secs = 60
snapshot_path = "/tmp/runboard-cache.json"

[logging]
file = "/tmp/runboard.log"
filter = "debug"
"#;
        let config_path = create_test_config_file(&temp_dir, toml_content);

        let config = Config::from_file(&config_path).unwrap();

        assert_eq!(config.api.base_url, "https://runs.example.com");
        assert_eq!(config.api.api_key, "secret");
        assert_eq!(config.tick_rate(), Duration::from_millis(100));
        let poll = config.poll_config();
        assert_eq!(poll.base_interval, Duration::from_secs(2));
        assert_eq!(poll.max_interval, Duration::from_secs(10));
        assert_eq!(poll.backoff_factor, 2.0);
        assert_eq!(poll.timeout, Duration::from_secs(300));
        let cache = config.cache_config();
        assert_eq!(cache.run_ttl, Duration::from_secs(60));
        assert_eq!(
            cache.snapshot_path,
            Some(PathBuf::from("/tmp/runboard-cache.json"))
        );
        assert_eq!(config.log_file(), PathBuf::from("/tmp/runboard.log"));
        assert_eq!(config.logging.filter, "debug");
    }

    #[test]
    fn test_missing_config_file_returns_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent = temp_dir.path().join("nonexistent.toml");

        let mut config = Config::load(Some(&non_existent)).unwrap();
        // Neutralize whatever the test environment exports
        config.api = ApiConfig::default();

        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let toml_content = r#"
[polling]
base_interval_secs = 3
# everything else missing
"#;
        let config_path = create_test_config_file(&temp_dir, toml_content);

        let config = Config::from_file(&config_path).unwrap();

        assert_eq!(config.polling.base_interval_secs, 3);
        assert_eq!(config.polling.max_interval_secs, 30);
        assert_eq!(config.tui.page_size, 20);
        assert_eq!(config.api.auth_timeout_ms, 3000);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = create_test_config_file(&temp_dir, "[polling\nbase = ");

        let err = Config::from_file(&config_path).unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut config = Config::default();
        config.api.api_key = "from-file".to_string();

        config.apply_env(|key| match key {
            API_URL_ENV => Some("https://env.example.com".to_string()),
            API_KEY_ENV => Some(String::new()),
            _ => None,
        });

        assert_eq!(config.api.base_url, "https://env.example.com");
        // Empty env values do not clobber the file
        assert_eq!(config.api.api_key, "from-file");
    }

    #[test]
    fn test_snapshot_path_resolution() {
        let mut config = Config::default();
        config.cache.snapshot_path = Some(PathBuf::new());
        assert!(config.cache_config().snapshot_path.is_none());

        config.cache.snapshot_path = None;
        assert_eq!(config.cache_config().snapshot_path, default_snapshot_path());
    }

    #[test]
    fn test_tilde_is_expanded() {
        let expanded = expand_path(Path::new("~/runboard.log"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("runboard.log"));
    }
}
