//! Configuration module
//!
//! Handles loading, parsing, and validating TOML configuration files,
//! plus content hashing so scrape jobs can record which configuration
//! produced them.

mod parser;
mod types;
mod validation;

pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use types::{Config, OracleConfig, RetryConfig, ScraperConfig, StoreConfig};
pub use validation::validate;
