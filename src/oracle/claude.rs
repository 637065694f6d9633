//! Claude-backed knowledge oracle
//!
//! Thin client over the Anthropic Messages API. Prompts pin the
//! response to bare text or JSON; code fences are stripped defensively
//! before parsing since models wrap JSON in them anyway.

use crate::config::OracleConfig;
use crate::crawler::TagStatistics;
use crate::oracle::{FandomProfile, KnowledgeOracle, OracleError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Knowledge oracle backed by the Anthropic API
pub struct Claude {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
        }
    }

    /// Builds a client from configuration plus the `ANTHROPIC_API_KEY`
    /// environment variable
    pub fn from_env(config: &OracleConfig) -> Result<Self, OracleError> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
            OracleError::Config("ANTHROPIC_API_KEY environment variable not set".to_string())
        })?;
        Ok(Self::new(api_key, &config.model, config.max_tokens))
    }

    /// Overrides the API endpoint (proxies, tests)
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    async fn complete(&self, system: &str, user: &str) -> Result<String, OracleError> {
        tracing::debug!(prompt_chars = user.len(), "calling knowledge oracle");

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system,
            messages: vec![WireMessage {
                role: "user",
                content: user,
            }],
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OracleError::Api(format!("HTTP {}: {}", status, body)));
        }

        let parsed: MessagesResponse = response.json().await?;
        let text = parsed
            .content
            .into_iter()
            .find_map(|block| block.text)
            .ok_or_else(|| OracleError::Api("empty oracle response".to_string()))?;

        tracing::debug!(response_chars = text.len(), "oracle responded");
        Ok(text)
    }
}

#[async_trait]
impl KnowledgeOracle for Claude {
    async fn map_fandom_name(&self, query: &str) -> Result<String, OracleError> {
        let system = "You are an expert on Archive of Our Own (AO3) fandom tags. \
            Given a user's fandom query, return the EXACT tag name as it appears on AO3.\n\
            IMPORTANT: Respond with ONLY the fandom tag name, nothing else. \
            No quotes, no explanation, just the tag.\n\n\
            Examples:\n\
            - \"Harry Potter\" -> Harry Potter - J. K. Rowling\n\
            - \"Marvel\" -> Marvel Cinematic Universe\n\
            - \"Attack on Titan\" -> 進撃の巨人 | Shingeki no Kyojin | Attack on Titan\n\
            - \"Genshin Impact\" -> 原神 | Genshin Impact (Video Game)\n\
            - \"One Piece\" -> One Piece";

        let user = format!("What is the exact AO3 fandom tag for: {}", query);

        let result = self.complete(system, &user).await?;
        Ok(result.trim().trim_matches('"').trim_matches('\'').to_string())
    }

    async fn generate_profile(
        &self,
        fandom: &str,
        partial: Option<&TagStatistics>,
    ) -> Result<FandomProfile, OracleError> {
        let system = "You are a fanfiction and fandom expert with extensive knowledge \
            of AO3, fanfiction trends, and fandom communities.\n\
            IMPORTANT: Respond with ONLY valid JSON, no markdown, no explanation.\n\n\
            Generate an analysis for the requested fandom with this structure:\n\
            {\n\
                \"fandom\": \"Fandom name\",\n\
                \"category\": \"Anime & Manga / TV Shows / Movies / Books / Video Games / etc\",\n\
                \"estimated_works\": \"Approximate number of works on AO3\",\n\
                \"popularity_tier\": \"S/A/B/C tier based on fanfic volume\",\n\
                \"summary\": \"2-3 sentence overview of the fandom's fanfiction landscape\",\n\
                \"dominant_genres\": [\"Top genres\"],\n\
                \"popular_ships\": [\"Top pairings\"],\n\
                \"top_characters\": [\"Most written about characters\"],\n\
                \"common_tropes\": [\"Popular tropes and themes\"],\n\
                \"audience_profile\": \"Typical reader demographics\",\n\
                \"content_rating_breakdown\": \"Typical rating distribution\",\n\
                \"writing_opportunities\": [\"Underserved niches\"],\n\
                \"crossover_potential\": [\"Fandoms it commonly crosses over with\"]\n\
            }";

        let mut user = format!("Generate a fanfiction analysis for: {}", fandom);
        if let Some(stats) = partial {
            let data = serde_json::to_string_pretty(stats)
                .map_err(|e| OracleError::Parse(e.to_string()))?;
            user.push_str("\n\nScraped data to incorporate:\n");
            user.push_str(&data);
        }

        let raw = self.complete(system, &user).await?;
        let json = strip_code_fences(&raw);
        serde_json::from_str(json.trim()).map_err(|e| OracleError::Parse(e.to_string()))
    }
}

/// Strips a markdown code fence wrapper from a model response
pub fn strip_code_fences(text: &str) -> &str {
    let stripped = if let Some((_, rest)) = text.split_once("```json") {
        rest
    } else if let Some((_, rest)) = text.split_once("```") {
        rest
    } else {
        return text;
    };

    match stripped.split_once("```") {
        Some((body, _)) => body,
        None => stripped,
    }
}
