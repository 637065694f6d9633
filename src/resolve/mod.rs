//! Three-tier fandom resolution
//!
//! Answers "tell me about fandom X" by trying progressively weaker
//! sources of truth, short-circuiting on the first tier that produces
//! non-empty data:
//!
//! 1. Persisted store aggregates
//! 2. Live tag-statistics crawl, with an oracle name-lookup assist
//! 3. Oracle-generated profile from background knowledge
//!
//! A tier that fails is logged and treated as having produced nothing;
//! only when all three tiers come up empty does an error surface.

mod retry;

pub use retry::{with_retry, RetryPolicy};

use crate::crawler::{Crawler, FetchError, TagStatistics};
use crate::oracle::{FandomProfile, KnowledgeOracle};
use crate::store::{FandomAggregates, FandomIndex};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

/// Resolution failures surfaced to the caller
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no resolution tier produced data for '{fandom}'")]
    Exhausted { fandom: String },

    #[error("resolution timed out after {seconds}s")]
    Timeout { seconds: u64 },
}

/// Which tier produced the answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Database,
    LiveScrape,
    LlmKnowledge,
}

/// The data behind a resolution, shaped per tier
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FandomReport {
    Stored(FandomAggregates),
    Live(TagStatistics),
    Synthesized(FandomProfile),
}

/// A resolved fandom query, tagged with its source tier
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub source: ResolutionSource,
    pub report: FandomReport,
}

/// Outcome of a single resolution tier
///
/// Explicit rather than exception-driven so the short-circuit contract
/// stays directly testable.
#[derive(Debug)]
pub enum TierOutcome<T> {
    Found(T),
    Empty,
    Failed(String),
}

/// Live access to tag statistics, the seam for resolution tier 2
#[async_trait]
pub trait StatsSource: Send {
    async fn tag_statistics(&mut self, tag: &str) -> Result<TagStatistics, FetchError>;
}

#[async_trait]
impl StatsSource for Crawler {
    async fn tag_statistics(&mut self, tag: &str) -> Result<TagStatistics, FetchError> {
        Crawler::tag_statistics(self, tag).await
    }
}

/// The degrade-gracefully resolution chain
pub struct ResolutionChain<I, S, O> {
    index: I,
    stats: S,
    oracle: O,
    retry: RetryPolicy,
}

impl<I, S, O> ResolutionChain<I, S, O>
where
    I: FandomIndex,
    S: StatsSource,
    O: KnowledgeOracle,
{
    pub fn new(index: I, stats: S, oracle: O, retry: RetryPolicy) -> Self {
        Self {
            index,
            stats,
            oracle,
            retry,
        }
    }

    /// Resolves a fandom query through the tiers in order
    pub async fn resolve(&mut self, fandom: &str) -> Result<Resolution, ResolveError> {
        tracing::info!(%fandom, "resolving fandom");

        match self.stored_tier(fandom) {
            TierOutcome::Found(aggregates) => {
                tracing::info!(%fandom, "resolved from persisted store");
                return Ok(Resolution {
                    source: ResolutionSource::Database,
                    report: FandomReport::Stored(aggregates),
                });
            }
            TierOutcome::Empty => tracing::debug!(%fandom, "store tier produced nothing"),
            TierOutcome::Failed(error) => tracing::warn!(%fandom, %error, "store tier failed"),
        }

        let mut partial = None;
        match self.live_tier(fandom, &mut partial).await {
            TierOutcome::Found(stats) => {
                tracing::info!(%fandom, total_works = stats.total_works, "resolved from live scrape");
                return Ok(Resolution {
                    source: ResolutionSource::LiveScrape,
                    report: FandomReport::Live(stats),
                });
            }
            TierOutcome::Empty => tracing::debug!(%fandom, "live tier produced nothing"),
            TierOutcome::Failed(error) => tracing::warn!(%fandom, %error, "live tier failed"),
        }

        match self.generative_tier(fandom, partial.as_ref()).await {
            TierOutcome::Found(profile) => {
                tracing::info!(%fandom, "resolved from oracle knowledge");
                Ok(Resolution {
                    source: ResolutionSource::LlmKnowledge,
                    report: FandomReport::Synthesized(profile),
                })
            }
            TierOutcome::Failed(error) => {
                tracing::warn!(%fandom, %error, "generative tier failed");
                Err(ResolveError::Exhausted {
                    fandom: fandom.to_string(),
                })
            }
            TierOutcome::Empty => Err(ResolveError::Exhausted {
                fandom: fandom.to_string(),
            }),
        }
    }

    /// Resolves inside one timeout envelope covering the whole chain
    ///
    /// The envelope cancels everything in flight, not just the current
    /// retry.
    pub async fn resolve_within(
        &mut self,
        window: Duration,
        fandom: &str,
    ) -> Result<Resolution, ResolveError> {
        match tokio::time::timeout(window, self.resolve(fandom)).await {
            Ok(result) => result,
            Err(_) => Err(ResolveError::Timeout {
                seconds: window.as_secs(),
            }),
        }
    }

    fn stored_tier(&self, fandom: &str) -> TierOutcome<FandomAggregates> {
        match self.index.fandom_aggregates(fandom) {
            Ok(Some(aggregates)) => TierOutcome::Found(aggregates),
            Ok(None) => TierOutcome::Empty,
            Err(error) => TierOutcome::Failed(error.to_string()),
        }
    }

    /// Tier 2: oracle-assisted live scrape
    ///
    /// The oracle maps the query onto the archive's tag spelling,
    /// falling back to the original on failure. If the mapped spelling
    /// yields nothing, the original spelling gets one more try. Whatever
    /// was scraped, usable or not, is stashed in `partial` for tier 3.
    async fn live_tier(
        &mut self,
        fandom: &str,
        partial: &mut Option<TagStatistics>,
    ) -> TierOutcome<TagStatistics> {
        let mapped = match self.oracle.map_fandom_name(fandom).await {
            Ok(name) => {
                tracing::info!(query = fandom, tag = %name, "oracle mapped fandom name");
                name
            }
            Err(error) => {
                tracing::warn!(%error, "name mapping failed, using the original spelling");
                fandom.to_string()
            }
        };

        let mut names = vec![mapped];
        if names[0] != fandom {
            names.push(fandom.to_string());
        }

        let policy = self.retry;
        let stats_source = &mut self.stats;
        let mut last_error = None;

        for name in &names {
            let fetched = with_retry(&policy, "tag_statistics", async || {
                stats_source.tag_statistics(name).await
            })
            .await;

            match fetched {
                Ok(stats) => {
                    let usable = stats.total_works > 0 || !stats.freeform.is_empty();
                    *partial = Some(stats.clone());
                    if usable {
                        return TierOutcome::Found(stats);
                    }
                    tracing::debug!(tag = %name, "tag statistics came back empty");
                }
                Err(error) => {
                    tracing::warn!(tag = %name, %error, "tag statistics fetch failed");
                    last_error = Some(error.to_string());
                }
            }
        }

        match last_error {
            Some(error) => TierOutcome::Failed(error),
            None => TierOutcome::Empty,
        }
    }

    async fn generative_tier(
        &self,
        fandom: &str,
        partial: Option<&TagStatistics>,
    ) -> TierOutcome<FandomProfile> {
        match self.oracle.generate_profile(fandom, partial).await {
            Ok(profile) => TierOutcome::Found(profile),
            Err(error) => TierOutcome::Failed(error.to_string()),
        }
    }
}
