use dotenvy::dotenv;
use std::{env, net::SocketAddr, path::PathBuf, str::FromStr};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{name} must be a number, got {value:?}")]
    NotANumber { name: &'static str, value: String },
    #[error("unknown storage type {0:?} (expected \"local\" or \"memory\")")]
    UnknownStorage(String),
    #[error("invalid host or port: {0}")]
    InvalidAddr(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    Local,
    Memory,
}

impl FromStr for StorageType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(StorageType::Local),
            "memory" => Ok(StorageType::Memory),
            other => Err(ConfigError::UnknownStorage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage_type: StorageType,
    pub storage_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Request body cap for uploads. `None` leaves uploads unbounded.
    pub max_upload_bytes: Option<usize>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_type: StorageType::Local,
            storage_path: PathBuf::from("uploads"),
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_upload_bytes: None,
        }
    }
}

impl AppConfig {
    /// Reads the process environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let default = Self::default();

        let storage_type = match lookup("STORAGE_TYPE") {
            Some(value) => value.parse()?,
            None => default.storage_type,
        };

        let port = match lookup("PORT") {
            Some(value) => value.parse().map_err(|_| ConfigError::NotANumber {
                name: "PORT",
                value,
            })?,
            None => default.port,
        };

        let max_upload_bytes = match lookup("MAX_UPLOAD_BYTES") {
            Some(value) => Some(value.parse().map_err(|_| ConfigError::NotANumber {
                name: "MAX_UPLOAD_BYTES",
                value,
            })?),
            None => default.max_upload_bytes,
        };

        Ok(Self {
            storage_type,
            storage_path: lookup("STORAGE_PATH")
                .map(PathBuf::from)
                .unwrap_or(default.storage_path),
            host: lookup("HOST").unwrap_or(default.host),
            port,
            max_upload_bytes,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.host, self.port);
        addr.parse().map_err(|_| ConfigError::InvalidAddr(addr))
    }
}
