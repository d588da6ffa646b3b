use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Fatal errors that abort a vmcycle run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to read host list {path}: {source}")]
    HostListUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unknown action `{action}`. Supported actions: shutdown, startup.")]
    UnknownAction { action: String },
    #[error("Failed to read configuration file at {path}: {source}")]
    ReadConfig {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Configuration at {path} could not be parsed: {source}")]
    ParseConfig {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("Configuration validation failed for {path}:\n{message}")]
    InvalidConfig { path: PathBuf, message: String },
    #[error("The configuration path {path} does not exist or is not readable.")]
    ExplicitConfigMissing { path: PathBuf },
    #[error("Invalid VM name filter `{filter}`: {message}")]
    InvalidNameFilter { filter: String, message: String },
    #[error("Running-VM list {path} could not be {action}: {source}")]
    RunningListUnavailable {
        path: PathBuf,
        action: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to open run log {path}: {source}")]
    LogUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to connect to the {service} at {endpoint}: {message}")]
    ConnectFailed {
        service: &'static str,
        endpoint: String,
        message: String,
    },
}

/// Failure of a single call against the inventory or maintenance service.
///
/// These never abort a run; callers log them and move on to the next VM or host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },
    #[error("{url} answered HTTP {status}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
    #[error("no managed desktop record matches `{vm}`")]
    NoMatchingRecord { vm: String },
    #[error("{count} managed desktop records match `{vm}`")]
    AmbiguousRecord { vm: String, count: usize },
}
