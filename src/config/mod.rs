//! Configuration module for Links-Benchmark
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! A missing configuration file is not an error at the CLI level: every
//! setting has a default matching a local nsqd and links service.
//!
//! # Example
//!
//! ```no_run
//! use links_benchmark::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("bench.toml")).unwrap();
//! println!("Consuming from: {}", config.queue.tcp_address());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, OutputConfig, QueueConfig, RunConfig, ServiceConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
