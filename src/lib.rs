//! Links-Benchmark: a load and regression harness for the links service
//!
//! This crate publishes link fetch requests onto a message queue, correlates
//! the asynchronous responses back to their requests, aggregates latency
//! statistics, and optionally persists each result so two runs can be
//! compared field by field.

pub mod bench;
pub mod compare;
pub mod config;
pub mod output;
pub mod providers;
pub mod transport;

use thiserror::Error;

/// Main error type for Links-Benchmark operations
#[derive(Debug, Error)]
pub enum BenchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] transport::TransportError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error for {path}: {source}")]
    File {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl BenchError {
    /// Wraps an IO error with the path that produced it
    pub fn file(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::File {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Links-Benchmark operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use bench::{generate_key, Classification, Correlator, Dispatcher, LinkSet};
pub use config::Config;
pub use output::{ResultPersister, RunStatistics, RunSummary};
