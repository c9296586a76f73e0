//! Process configuration.
//!
//! One [`Config`] is loaded at startup — from the TOML file named by the
//! `TASKD_CONFIG` environment variable, or built-in defaults when the
//! variable is unset — and threaded explicitly through the constructors
//! that need it. There is no ambient global.
//!
//! ```toml
//! addr = "0.0.0.0:3000"
//! shutdown_grace_secs = 30
//!
//! [[auth.keys]]
//! token = "valid-token"
//! subject = "tecchu"
//! role = "admin"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::middleware::{PresharedKeys, Principal, Role};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "TASKD_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize)]
pub struct Config {
    /// Listen address, `host:port`.
    #[serde(default = "default_addr")]
    pub addr: String,

    /// How long shutdown waits for in-flight requests before aborting them.
    #[serde(default = "default_grace_secs")]
    pub shutdown_grace_secs: u64,

    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthConfig {
    /// The pre-shared-key table: one entry per accepted credential.
    #[serde(default)]
    pub keys: Vec<KeyEntry>,
}

#[derive(Debug, Deserialize)]
pub struct KeyEntry {
    pub token: String,
    pub subject: String,
    pub role: Role,
}

fn default_addr() -> String {
    "0.0.0.0:3000".to_owned()
}

fn default_grace_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            addr: default_addr(),
            shutdown_grace_secs: default_grace_secs(),
            auth: AuthConfig::default(),
        }
    }
}

impl Config {
    /// Loads the file named by `TASKD_CONFIG`, or defaults when unset.
    pub fn load() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_path(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Builds the authenticator from the key table.
    pub fn preshared_keys(&self) -> PresharedKeys {
        self.auth.keys.iter().fold(PresharedKeys::new(), |keys, entry| {
            keys.insert(
                entry.token.clone(),
                Principal::new(entry.subject.clone(), entry.role),
            )
        })
    }

    pub fn grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
