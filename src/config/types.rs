use serde::Deserialize;

/// Main configuration structure for Storyscope
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub store: StoreConfig,
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/// Persisted store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Scraper session configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperConfig {
    /// Base URL of the source archive
    #[serde(rename = "base-url", default = "default_base_url")]
    pub base_url: String,

    /// Requests per second for this session (0.2 = one request per 5s)
    #[serde(rename = "rate-limit", default = "default_rate_limit")]
    pub rate_limit: f64,

    /// Delay after a successful fetch, letting client-side rendering settle
    #[serde(rename = "settle-ms", default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Per-request timeout in seconds
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// User agent presented to the source site
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

/// Knowledge oracle configuration
///
/// The API key is deliberately not part of the file; it comes from the
/// `ANTHROPIC_API_KEY` environment variable.
#[derive(Debug, Clone, Deserialize)]
pub struct OracleConfig {
    #[serde(default = "default_oracle_model")]
    pub model: String,

    #[serde(rename = "max-tokens", default = "default_oracle_max_tokens")]
    pub max_tokens: u32,
}

/// Operation-level retry configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(rename = "base-delay-ms", default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            model: default_oracle_model(),
            max_tokens: default_oracle_max_tokens(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
        }
    }
}

fn default_base_url() -> String {
    "https://archiveofourown.org".to_string()
}

// The archive throttles aggressively; one request per five seconds.
fn default_rate_limit() -> f64 {
    0.2
}

fn default_settle_ms() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    60
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
        .to_string()
}

fn default_oracle_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_oracle_max_tokens() -> u32 {
    2048
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    2000
}
