use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the crime table
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("failed to create database directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("crime {0} already exists")]
    Duplicate(Uuid),
    #[error("crime {0} does not exist")]
    NotFound(Uuid),
    #[error("invalid value in column {column}: {value}")]
    CorruptRow { column: &'static str, value: String },
}

/// Errors raised while constructing or reaching the repository
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("crime repository must be initialized before use")]
    NotInitialized,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("failed to start the write worker: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

/// Errors raised while loading the configuration file
#[derive(Debug, Error)]
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
        source: serde_json::Error,
    },
    #[error("could not determine user data directory")]
    NoDataDir,
}
