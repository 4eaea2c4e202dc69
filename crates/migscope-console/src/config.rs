//! Console configuration.
//!
//! Layered lowest to highest: built-in defaults, a TOML file, `MIGSCOPE_*`
//! environment variables, command-line flags (applied by `main`).
//!
//! ```toml
//! # migscope.toml
//! bind_addr = "127.0.0.1:9380"
//! data_url = "https://exports.example.com/data"
//! self_test_url = "https://pipeline.example.com/.netlify/functions/test_run"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use migscope_core::{LOG_CAPACITY, SELF_TEST_PATH};
use migscope_loader::{DataRoot, LoadError};

pub const CONFIG_FILE_NAME: &str = "migscope.toml";
const ENV_PREFIX: &str = "MIGSCOPE_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    MissingConfig { path: PathBuf },

    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value '{value}' for {key}")]
    InvalidEnv { key: String, value: String },

    #[error("invalid self-test URL '{url}'")]
    InvalidSelfTestUrl { url: String },

    #[error(transparent)]
    DataRoot(#[from] LoadError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP dashboard listens on.
    pub bind_addr: String,
    /// HTTP base prefixes are resolved against. Takes precedence over `data_dir`.
    pub data_url: Option<String>,
    /// Local root prefixes are resolved against when no `data_url` is set.
    pub data_dir: PathBuf,
    pub self_test_url: String,
    pub request_timeout_secs: u64,
    pub log_capacity: usize,
    /// Largest accepted multipart upload, in megabytes.
    pub max_upload_mb: usize,
    /// Prefix loaded once at startup.
    pub initial_prefix: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9380".to_string(),
            data_url: None,
            data_dir: PathBuf::from("data"),
            self_test_url: format!("http://127.0.0.1:8888{SELF_TEST_PATH}"),
            request_timeout_secs: 30,
            log_capacity: LOG_CAPACITY,
            max_upload_mb: 64,
            initial_prefix: None,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// Load the file layer and the environment layer.
    ///
    /// An explicit path must exist. Without one, `./migscope.toml` and then
    /// the per-user config file are tried; none existing means defaults.
    pub fn load(
        explicit: Option<&Path>,
        cwd: &Path,
        env: &BTreeMap<String, String>,
    ) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let path = match explicit {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::MissingConfig {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => Some(path.to_path_buf()),
            None => find_config_path(cwd),
        };

        let mut config = match &path {
            Some(path) => Self::from_toml_file(path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        Ok((config, path))
    }

    /// Override fields from `MIGSCOPE_*` variables.
    pub fn apply_env(&mut self, env: &BTreeMap<String, String>) -> Result<(), ConfigError> {
        let get = |name: &str| {
            env.get(&format!("{ENV_PREFIX}{name}"))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(v) = get("BIND_ADDR") {
            self.bind_addr = v;
        }
        if let Some(v) = get("DATA_URL") {
            self.data_url = Some(v);
        }
        if let Some(v) = get("DATA_DIR") {
            self.data_dir = PathBuf::from(v);
        }
        if let Some(v) = get("SELF_TEST_URL") {
            self.self_test_url = v;
        }
        if let Some(v) = get("REQUEST_TIMEOUT_SECS") {
            self.request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = get("LOG_CAPACITY") {
            self.log_capacity = parse_env("LOG_CAPACITY", &v)?;
        }
        if let Some(v) = get("MAX_UPLOAD_MB") {
            self.max_upload_mb = parse_env("MAX_UPLOAD_MB", &v)?;
        }
        if let Some(v) = get("PREFIX") {
            self.initial_prefix = Some(v);
        }
        Ok(())
    }

    pub fn data_root(&self) -> Result<DataRoot, ConfigError> {
        match self.data_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Ok(DataRoot::http(url)?),
            None => Ok(DataRoot::Dir(self.data_dir.clone())),
        }
    }

    pub fn self_test_endpoint(&self) -> Result<Url, ConfigError> {
        Url::parse(self.self_test_url.trim()).map_err(|_| ConfigError::InvalidSelfTestUrl {
            url: self.self_test_url.clone(),
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.max(1).saturating_mul(1024 * 1024)
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        key: format!("{ENV_PREFIX}{key}"),
        value: value.to_string(),
    })
}

fn find_config_path(cwd: &Path) -> Option<PathBuf> {
    let local = cwd.join(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| dir.join("migscope").join("config.toml"))
        .filter(|p| p.is_file())
}

/// Directory for the process log file in console mode.
pub fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("migscope")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg = Config::from_toml_str(
            "data_url = \"https://exports.example/data\"\nlog_capacity = 50\n",
            Path::new("inline.toml"),
        )
        .unwrap();
        assert_eq!(cfg.data_url.as_deref(), Some("https://exports.example/data"));
        assert_eq!(cfg.log_capacity, 50);
        assert_eq!(cfg.bind_addr, Config::default().bind_addr);
        assert!(matches!(cfg.data_root().unwrap(), DataRoot::Http(_)));
    }

    #[test]
    fn upload_limit_saturates_instead_of_overflowing() {
        let huge = Config {
            max_upload_mb: usize::MAX / 2,
            ..Config::default()
        };
        assert_eq!(huge.max_upload_bytes(), usize::MAX);

        let zero = Config {
            max_upload_mb: 0,
            ..Config::default()
        };
        assert_eq!(zero.max_upload_bytes(), 1024 * 1024);
    }

    #[test]
    fn invalid_toml_names_the_file() {
        let err = Config::from_toml_str("bind_addr = [", Path::new("bad.toml")).unwrap_err();
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut cfg = Config::default();
        cfg.apply_env(&env(&[
            ("MIGSCOPE_DATA_DIR", "/srv/exports"),
            ("MIGSCOPE_REQUEST_TIMEOUT_SECS", "5"),
            ("MIGSCOPE_PREFIX", " 2025/run-01 "),
            ("MIGSCOPE_BIND_ADDR", "   "),
        ]))
        .unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("/srv/exports"));
        assert_eq!(cfg.request_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.initial_prefix.as_deref(), Some("2025/run-01"));
        assert_eq!(cfg.bind_addr, "127.0.0.1:9380");
    }

    #[test]
    fn malformed_env_number_is_rejected() {
        let mut cfg = Config::default();
        let err = cfg
            .apply_env(&env(&[("MIGSCOPE_LOG_CAPACITY", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { .. }));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        let err = Config::load(Some(&missing), dir.path(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingConfig { .. }));
    }

    #[test]
    fn local_file_is_discovered() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "max_upload_mb = 8\n").unwrap();
        let (cfg, path) = Config::load(None, dir.path(), &BTreeMap::new()).unwrap();
        assert_eq!(cfg.max_upload_mb, 8);
        assert_eq!(cfg.max_upload_bytes(), 8 * 1024 * 1024);
        assert_eq!(path, Some(dir.path().join(CONFIG_FILE_NAME)));
    }

    #[test]
    fn default_self_test_endpoint_targets_the_function_path() {
        let url = Config::default().self_test_endpoint().unwrap();
        assert_eq!(url.path(), SELF_TEST_PATH);
    }
}
