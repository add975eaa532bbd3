//! Worker error types.
//!
//! Recoverable failures (offline fetches, cache misses, bad push payloads,
//! failed replays) never reach the host as `Err`: they are turned into
//! synthesized responses, fallback notifications or retained sync entries.
//! The variants below cover host and configuration mistakes.

use std::path::PathBuf;

use crate::lifecycle::ServiceWorkerState;

/// Top-level error returned by worker operations.
#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("lifecycle error: {0}")]
    Lifecycle(#[from] LifecycleError),

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("request cannot be deferred for background sync: {method} {url}")]
    NotDeferrable { method: String, url: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Rejected fetch. Mirrors the ways a platform `fetch()` promise rejects.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("network unreachable")]
    Offline,

    #[error("DNS lookup failed for {host}")]
    Dns { host: String },

    #[error("request timed out")]
    Timeout,

    #[error("fetch failed: {0}")]
    Other(String),
}

/// Cache storage failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache not found: {0}")]
    NotFound(String),

    #[error("pre-cache of {url} failed: {reason}")]
    AddAllFailed { url: String, reason: String },

    #[error("snapshot error: {0}")]
    Snapshot(String),
}

/// A window client operation was rejected by the host.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("no window client with id {0}")]
    NotFound(String),

    #[error("client operation rejected: {0}")]
    Rejected(String),
}

/// Invalid worker configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid API pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("origin must be an absolute http(s) URL: {0}")]
    InvalidOrigin(String),

    #[error("cache version must not be empty")]
    EmptyVersion,

    #[error("route template for '{kind}' must start with '/': {template}")]
    InvalidRoute { kind: String, template: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid worker state transition.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ServiceWorkerState,
        to: ServiceWorkerState,
    },
}
