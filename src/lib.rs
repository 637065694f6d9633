//! Storyscope: a fanfiction-archive analytics scraper
//!
//! This crate ingests works and their metadata from Archive of Our Own,
//! normalizes the scraped data into canonical entities, persists it
//! idempotently with time-series engagement snapshots, and answers
//! fandom-level analytics queries through a degrade-gracefully
//! resolution chain (persisted store, live crawl, generative fallback).

pub mod config;
pub mod crawler;
pub mod jobs;
pub mod oracle;
pub mod resolve;
pub mod store;

use thiserror::Error;

/// Main error type for Storyscope operations
#[derive(Debug, Error)]
pub enum StoryscopeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Fetch error: {0}")]
    Fetch(#[from] crawler::FetchError),

    #[error("Store error: {0}")]
    Store(#[from] store::StoreError),

    #[error("Oracle error: {0}")]
    Oracle(#[from] oracle::OracleError),

    #[error("Resolution error: {0}")]
    Resolve(#[from] resolve::ResolveError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

/// Result type alias for Storyscope operations
pub type Result<T> = std::result::Result<T, StoryscopeError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Crawler, ScrapedAuthor, ScrapedWork, SearchQuery, SortKey};
pub use store::SqliteStore;
