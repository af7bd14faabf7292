use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::FilterMode;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Statuses counted as "completed" when filtering (compared exactly)
  #[serde(default = "default_completed_statuses")]
  pub completed_statuses: Vec<String>,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      api: ApiConfig::default(),
      cache: CacheConfig::default(),
      completed_statuses: default_completed_statuses(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
  /// Bearer token. Usually supplied through TASKNOTES_API_TOKEN instead.
  #[serde(default)]
  pub token: Option<String>,
  /// Per-request deadline, covering connect, send and body read
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
  /// Where task filters are evaluated: client, server or auto
  #[serde(default)]
  pub filter_mode: FilterMode,
}

impl Default for ApiConfig {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_port(),
      token: None,
      timeout_ms: default_timeout_ms(),
      filter_mode: FilterMode::default(),
    }
  }
}

impl ApiConfig {
  pub fn base_url(&self) -> String {
    format!("http://{}:{}", self.host, self.port)
  }

  pub fn timeout(&self) -> Duration {
    Duration::from_millis(self.timeout_ms)
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// SQLite file holding the task snapshot (default: $XDG_DATA_HOME/tasknotes/cache.db)
  pub path: Option<PathBuf>,
  /// How long a snapshot counts as fresh
  #[serde(default = "default_ttl_secs")]
  pub ttl_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      path: None,
      ttl_secs: default_ttl_secs(),
    }
  }
}

impl CacheConfig {
  pub fn ttl(&self) -> chrono::Duration {
    chrono::Duration::seconds(self.ttl_secs as i64)
  }
}

fn default_host() -> String {
  "127.0.0.1".to_string()
}

fn default_port() -> u16 {
  8080
}

fn default_timeout_ms() -> u64 {
  5000
}

fn default_ttl_secs() -> u64 {
  300
}

fn default_completed_statuses() -> Vec<String> {
  vec!["done".to_string()]
}

impl Config {
  /// Load configuration from file, falling back to defaults.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./tasknotes.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/tasknotes/config.yaml
  ///
  /// Environment overrides are applied last.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    config.with_env_overrides()
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("tasknotes.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("tasknotes").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  pub fn from_yaml_str(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    if config.api.timeout_ms == 0 {
      return Err(eyre!("api.timeout_ms must be greater than zero"));
    }
    Ok(config)
  }

  fn with_env_overrides(mut self) -> Result<Self> {
    if let Some(token) = Self::get_api_token() {
      self.api.token = Some(token);
    }

    if let Ok(port) = std::env::var("TASKNOTES_API_PORT") {
      self.api.port = port
        .trim()
        .parse()
        .map_err(|_| eyre!("TASKNOTES_API_PORT is not a valid port: {:?}", port))?;
    }

    Ok(self)
  }

  /// Get the API token from the environment, if set and non-empty.
  pub fn get_api_token() -> Option<String> {
    std::env::var("TASKNOTES_API_TOKEN")
      .ok()
      .filter(|t| !t.trim().is_empty())
  }
}

/// Directory for the cache database and log file.
pub fn data_dir() -> Result<PathBuf> {
  let data_dir = dirs::data_dir()
    .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
    .ok_or_else(|| eyre!("Could not determine data directory"))?;

  Ok(data_dir.join("tasknotes"))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults_point_at_local_api() {
    let config = Config::default();
    assert_eq!(config.api.base_url(), "http://127.0.0.1:8080");
    assert_eq!(config.api.timeout(), Duration::from_millis(5000));
    assert_eq!(config.api.token, None);
    assert_eq!(config.api.filter_mode, FilterMode::Client);
    assert_eq!(config.cache.ttl(), chrono::Duration::minutes(5));
    assert_eq!(config.completed_statuses, vec!["done".to_string()]);
  }

  #[test]
  fn test_partial_yaml_keeps_defaults() {
    let config = Config::from_yaml_str("api:\n  port: 27124\n").unwrap();
    assert_eq!(config.api.port, 27124);
    assert_eq!(config.api.host, "127.0.0.1");
    assert_eq!(config.api.timeout_ms, 5000);
    assert_eq!(config.cache.ttl_secs, 300);
  }

  #[test]
  fn test_full_yaml() {
    let yaml = r#"
api:
  host: localhost
  port: 9000
  token: secret
  timeout_ms: 1500
  filter_mode: auto
cache:
  path: /tmp/tasknotes-cache.db
  ttl_secs: 60
completed_statuses: [done, cancelled]
"#;
    let config = Config::from_yaml_str(yaml).unwrap();
    assert_eq!(config.api.base_url(), "http://localhost:9000");
    assert_eq!(config.api.token.as_deref(), Some("secret"));
    assert_eq!(config.api.filter_mode, FilterMode::Auto);
    assert_eq!(
      config.cache.path,
      Some(PathBuf::from("/tmp/tasknotes-cache.db"))
    );
    assert_eq!(config.cache.ttl(), chrono::Duration::seconds(60));
    assert_eq!(config.completed_statuses, vec!["done", "cancelled"]);
  }

  #[test]
  fn test_zero_timeout_rejected() {
    assert!(Config::from_yaml_str("api:\n  timeout_ms: 0\n").is_err());
  }

  #[test]
  fn test_unknown_filter_mode_rejected() {
    assert!(Config::from_yaml_str("api:\n  filter_mode: sometimes\n").is_err());
  }

  #[test]
  fn test_explicit_missing_path_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.yaml");
    let err = Config::load(Some(&missing)).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_load_from_explicit_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "api:\n  port: 4321\n").unwrap();

    let config = Config::load_from_path(&path).unwrap();
    assert_eq!(config.api.port, 4321);
  }
}
