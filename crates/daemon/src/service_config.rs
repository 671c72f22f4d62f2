use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use common::prelude::CvmfsServerConfig;

pub const DEFAULT_TTL_S: i64 = 7200;

/// Which implementation of the transaction primitive backs the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// `cvmfs_server` / `cvmfs_swissknife` on a stratum 0
    Cvmfs(CvmfsServerConfig),
    /// Directory snapshots; for development and tests
    Local,
}

impl Default for BackendConfig {
    fn default() -> Self {
        BackendConfig::Cvmfs(CvmfsServerConfig::default())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding one subdirectory per repository
    pub storage_root: PathBuf,
    pub listen_addr: SocketAddr,
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence
    pub log_level: String,
    /// Write daily-rotated log files here instead of stdout
    pub log_dir: Option<PathBuf>,
    pub default_ttl_s: i64,
    pub housekeeping_interval_s: u64,
    /// Re-sign every repository daily at 00:00 UTC
    pub resign_enabled: bool,
    pub max_upload_mb: usize,
    pub backend: BackendConfig,
    /// Program and leading arguments used to expand archive uploads; the
    /// archive path and destination directory are appended.
    pub unpack_command: Option<Vec<String>>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_root: PathBuf::from("/cvmfs"),
            listen_addr: SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), 81),
            log_level: "info".to_string(),
            log_dir: None,
            default_ttl_s: DEFAULT_TTL_S,
            housekeeping_interval_s: 60,
            resign_enabled: true,
            max_upload_mb: 4096,
            backend: BackendConfig::default(),
            unpack_command: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Load from a TOML file, or use the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&raw).map_err(|source| ConfigError::Parse {
                    path: path.to_path_buf(),
                    source,
                })?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.housekeeping_interval_s == 0 {
            return Err(ConfigError::Invalid(
                "housekeeping_interval_s must be positive".to_string(),
            ));
        }
        if self.max_upload_mb == 0 {
            return Err(ConfigError::Invalid(
                "max_upload_mb must be positive".to_string(),
            ));
        }
        if matches!(&self.unpack_command, Some(argv) if argv.is_empty()) {
            return Err(ConfigError::Invalid(
                "unpack_command must name a program".to_string(),
            ));
        }
        Ok(())
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}
