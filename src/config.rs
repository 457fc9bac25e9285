//! Runtime configuration: CLI flags with `STREAMGATE_*` environment fallbacks.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{session, DirectoryConfig, DEFAULT_ADMIN_USERNAME};
use crate::storage::{FileStore, MemoryStore, SharedStore};

pub const DEFAULT_LISTEN: &str = "0.0.0.0:8080";
pub const DEFAULT_DB_PATH: &str = "auth.db";
/// Longest accepted dashboard session: one year.
pub const MAX_SESSION_TTL_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("session ttl must be between 1 and {max} seconds, got {0}", max = MAX_SESSION_TTL_SECS)]
    SessionTtl(i64),
}

/// streamgate - authentication webhook and dashboard for a media gateway
#[derive(Parser, Debug, Clone)]
#[command(name = "streamgate")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address the HTTP server binds to
    #[arg(long, env = "STREAMGATE_LISTEN", default_value = DEFAULT_LISTEN)]
    pub listen: SocketAddr,

    /// Path of the durable store file
    #[arg(long, env = "STREAMGATE_DB", default_value = DEFAULT_DB_PATH)]
    pub db: PathBuf,

    /// Keep everything in memory; nothing survives a restart
    #[arg(long, env = "STREAMGATE_MEMORY", conflicts_with = "db")]
    pub memory: bool,

    /// Name of the bootstrap administrator
    #[arg(long, env = "STREAMGATE_ADMIN_USER", default_value = DEFAULT_ADMIN_USERNAME)]
    pub admin_user: String,

    /// Dashboard session lifetime in seconds
    #[arg(
        long,
        env = "STREAMGATE_SESSION_TTL_SECS",
        default_value_t = session::DEFAULT_SESSION_TTL_SECS,
        value_parser = clap::value_parser!(i64).range(1..=MAX_SESSION_TTL_SECS)
    )]
    pub session_ttl_secs: i64,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, env = "STREAMGATE_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StorageConfig {
    Memory,
    File { path: PathBuf },
}

impl StorageConfig {
    /// Construct the store. `init()` is left to the caller.
    pub fn open(&self) -> SharedStore {
        match self {
            StorageConfig::Memory => Arc::new(MemoryStore::new()),
            StorageConfig::File { path } => Arc::new(FileStore::new(path)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub listen: SocketAddr,
    pub storage: StorageConfig,
    pub admin_username: String,
    pub session_ttl_secs: i64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8080)),
            storage: StorageConfig::File { path: PathBuf::from(DEFAULT_DB_PATH) },
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            session_ttl_secs: session::DEFAULT_SESSION_TTL_SECS,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Directory settings. `Config` can also come from serde, so the TTL is checked
    /// here as well as by the CLI parser.
    pub fn directory(&self) -> Result<DirectoryConfig, ConfigError> {
        let secs = self.session_ttl_secs;
        let session_ttl = (1..=MAX_SESSION_TTL_SECS)
            .contains(&secs)
            .then(|| chrono::Duration::try_seconds(secs))
            .flatten()
            .ok_or(ConfigError::SessionTtl(secs))?;
        Ok(DirectoryConfig { admin_username: self.admin_username.clone(), session_ttl })
    }
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let storage = if args.memory { StorageConfig::Memory } else { StorageConfig::File { path: args.db } };
        Self {
            listen: args.listen,
            storage,
            admin_username: args.admin_user,
            session_ttl_secs: args.session_ttl_secs,
            log_level: args.log_level,
        }
    }
}
