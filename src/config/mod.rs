//! Configuration module for Furlong
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use furlong::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("furlong.toml")).unwrap();
//! println!("Crawling the last {} days", config.crawler.days);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, CrawlerConfig, OutputConfig, SourceConfig, StorageBackend, UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
