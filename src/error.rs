// Error types, one enum per failure scope.

use std::path::PathBuf;

/// Startup-only failures. Any of these stops the process before the loop.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to open config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode YAML from config file '{path}': {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("proxy list is empty, cannot proceed with requests")]
    EmptyProxyList,
    #[error("invalid proxy URL '{proxy}': {source}")]
    InvalidProxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{0} must be set")]
    Missing(&'static str),
}

/// Failures of a single fetch attempt. Scoped to the current cycle.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid proxy URL '{proxy}': {source}")]
    Proxy {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("error fetching data from {url} using proxy {proxy}: {source}")]
    Request {
        url: String,
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("error reading HTML from {url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("JSON data not found at {url}")]
    DataNotFound { url: String },
    #[error("error decoding JSON data from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Per-player store failures, plus migration failures at startup.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error(transparent)]
    Sql(#[from] sqlx::Error),
    #[error("failed to read migrations from '{path}': {source}")]
    MigrationIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("error executing SQL command #{index} in file {file}: {source}")]
    MigrationStatement {
        file: PathBuf,
        index: usize,
        #[source]
        source: sqlx::Error,
    },
}

/// Delivery failures of a notification sink. Always logged and swallowed.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("log file error: {0}")]
    LogFile(#[from] std::io::Error),
    #[error("failed to send message to channel {channel}: {source}")]
    Chat {
        channel: String,
        #[source]
        source: reqwest::Error,
    },
}
