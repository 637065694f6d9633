//! Knowledge oracle interface
//!
//! The external generative-text provider is consumed only through this
//! narrow request/response contract: map a free-text fandom name onto
//! the archive's canonical tag spelling, or synthesize a structured
//! fandom profile from background knowledge. The core never depends on
//! the provider's reasoning, only on its output shape and on it
//! eventually returning or failing.

mod claude;

pub use claude::{strip_code_fences, Claude};

use crate::crawler::TagStatistics;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Oracle call failures
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("Oracle configuration error: {0}")]
    Config(String),

    #[error("Oracle network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Oracle API error: {0}")]
    Api(String),

    #[error("Oracle response parse error: {0}")]
    Parse(String),
}

/// Narrow contract against the generative-knowledge provider
#[async_trait]
pub trait KnowledgeOracle: Send + Sync {
    /// Maps a free-text fandom name onto the archive's canonical tag
    /// spelling
    async fn map_fandom_name(&self, query: &str) -> Result<String, OracleError>;

    /// Synthesizes a structured fandom profile, optionally incorporating
    /// partial scraped data
    async fn generate_profile(
        &self,
        fandom: &str,
        partial: Option<&TagStatistics>,
    ) -> Result<FandomProfile, OracleError>;
}

/// Structured fandom profile synthesized by the oracle
///
/// Every field defaults so a sparse response still parses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FandomProfile {
    #[serde(default)]
    pub fandom: String,
    #[serde(default)]
    pub category: Option<String>,
    /// The provider sometimes returns a number, sometimes prose
    #[serde(default)]
    pub estimated_works: Option<serde_json::Value>,
    #[serde(default)]
    pub popularity_tier: Option<String>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub dominant_genres: Vec<String>,
    #[serde(default)]
    pub popular_ships: Vec<String>,
    #[serde(default)]
    pub top_characters: Vec<String>,
    #[serde(default)]
    pub common_tropes: Vec<String>,
    #[serde(default)]
    pub audience_profile: Option<String>,
    #[serde(default)]
    pub content_rating_breakdown: Option<String>,
    #[serde(default)]
    pub writing_opportunities: Vec<String>,
    #[serde(default)]
    pub crossover_potential: Vec<String>,
}
