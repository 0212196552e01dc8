use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/api";

/// Environment variable that overrides `server.url`
pub const SERVER_URL_ENV: &str = "TASKDECK_SERVER_URL";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  /// Tracing filter directive, e.g. "taskdeck=debug" (RUST_LOG wins)
  pub log_level: Option<String>,
  /// Where the session database and logs live (defaults to the XDG data dir)
  pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_server_url")]
  pub url: String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      url: default_server_url(),
    }
  }
}

fn default_server_url() -> String {
  DEFAULT_SERVER_URL.to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Seconds before fetched collections are considered stale
  #[serde(default = "default_stale_secs")]
  pub stale_secs: u64,
  /// Extra attempts for a failed read
  #[serde(default = "default_retry")]
  pub retry: u32,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      stale_secs: default_stale_secs(),
      retry: default_retry(),
    }
  }
}

fn default_stale_secs() -> u64 {
  300
}

fn default_retry() -> u32 {
  1
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./taskdeck.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/taskdeck/config.yaml
  ///
  /// Without a file the defaults apply. `TASKDECK_SERVER_URL` overrides
  /// the server URL from either source.
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

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Config::default(),
    };

    if let Ok(url) = std::env::var(SERVER_URL_ENV) {
      if !url.trim().is_empty() {
        config.server.url = url;
      }
    }

    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("taskdeck.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("taskdeck").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    if contents.trim().is_empty() {
      return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Directory for the session database and log files.
  pub fn data_dir(&self) -> Result<PathBuf> {
    if let Some(dir) = &self.data_dir {
      return Ok(dir.clone());
    }
    dirs::data_dir()
      .map(|d| d.join("taskdeck"))
      .ok_or_else(|| eyre!("Could not determine a data directory; set data_dir in the config"))
  }

  pub fn stale_time(&self) -> chrono::Duration {
    chrono::Duration::seconds(i64::try_from(self.cache.stale_secs).unwrap_or(i64::MAX))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_file_uses_defaults() {
    let config = Config::parse("").unwrap();
    assert_eq!(config.server.url, DEFAULT_SERVER_URL);
    assert_eq!(config.cache.stale_secs, 300);
    assert_eq!(config.cache.retry, 1);
    assert!(config.log_level.is_none());
  }

  #[test]
  fn test_partial_file_fills_defaults() {
    let config = Config::parse(
      "server:\n  url: https://todo.example.com/api\ncache:\n  retry: 0\nlog_level: taskdeck=debug\n",
    )
    .unwrap();
    assert_eq!(config.server.url, "https://todo.example.com/api");
    assert_eq!(config.cache.retry, 0);
    assert_eq!(config.cache.stale_secs, 300);
    assert_eq!(config.log_level.as_deref(), Some("taskdeck=debug"));
  }

  #[test]
  fn test_invalid_yaml_is_an_error() {
    assert!(Config::parse("server: [unclosed").is_err());
  }

  #[test]
  fn test_missing_explicit_path_is_an_error() {
    let err = Config::load(Some(Path::new("/nonexistent/taskdeck.yaml"))).unwrap_err();
    assert!(err.to_string().contains("Config file not found"));
  }

  #[test]
  fn test_stale_time_and_data_dir_override() {
    let config = Config {
      data_dir: Some(PathBuf::from("/tmp/taskdeck-test")),
      cache: CacheConfig {
        stale_secs: 60,
        retry: 1,
      },
      ..Config::default()
    };
    assert_eq!(config.stale_time(), chrono::Duration::minutes(1));
    assert_eq!(config.data_dir().unwrap(), PathBuf::from("/tmp/taskdeck-test"));
  }
}
