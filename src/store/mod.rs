//! Persisted store for canonical entities and engagement history
//!
//! This module handles all database operations for the scraper, including:
//! - SQLite schema management
//! - Canonical entity resolution (platforms, authors, tags, fandoms, relationships)
//! - Work upserts with additive association sync
//! - Append-only engagement snapshots
//! - Fandom-level aggregate queries backing the resolution chain

mod schema;
mod sqlite;
mod traits;

pub use schema::initialize_schema;
pub use sqlite::{Repository, SqliteStore};
pub use traits::{FandomIndex, StoreError, StoreResult};

use serde::Serialize;

/// Supported source platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformKind {
    ArchiveOfOurOwn,
    RoyalRoad,
    FanfictionNet,
}

impl PlatformKind {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::ArchiveOfOurOwn => "ao3",
            Self::RoyalRoad => "royalroad",
            Self::FanfictionNet => "ffn",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "ao3" => Some(Self::ArchiveOfOurOwn),
            "royalroad" => Some(Self::RoyalRoad),
            "ffn" => Some(Self::FanfictionNet),
            _ => None,
        }
    }

    /// Display name stored on the platform row
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ArchiveOfOurOwn => "AO3",
            Self::RoyalRoad => "ROYALROAD",
            Self::FanfictionNet => "FFN",
        }
    }
}

/// Content rating, normalized across platforms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentRating {
    General,
    Teen,
    Mature,
    Explicit,
    NotRated,
}

impl ContentRating {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Teen => "teen",
            Self::Mature => "mature",
            Self::Explicit => "explicit",
            Self::NotRated => "not_rated",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "general" => Some(Self::General),
            "teen" => Some(Self::Teen),
            "mature" => Some(Self::Mature),
            "explicit" => Some(Self::Explicit),
            "not_rated" => Some(Self::NotRated),
            _ => None,
        }
    }
}

/// Work completion status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkStatus {
    Ongoing,
    Completed,
    Unknown,
}

impl WorkStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "ongoing" => Some(Self::Ongoing),
            "completed" => Some(Self::Completed),
            "unknown" => Some(Self::Unknown),
            _ => None,
        }
    }
}

/// Normalizes an entity name for canonical lookup
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Represents a work row in the database
#[derive(Debug, Clone)]
pub struct WorkRecord {
    pub id: i64,
    pub platform_id: i64,
    pub platform_work_id: String,
    pub author_id: Option<i64>,
    pub title: String,
    pub summary: Option<String>,
    pub url: String,
    pub rating: ContentRating,
    pub language: String,
    pub status: WorkStatus,
    pub chapter_count: i64,
    pub word_count: i64,
    pub latest_views: i64,
    pub latest_likes: i64,
    pub latest_comments: i64,
    pub latest_bookmarks: i64,
}

/// One work in a fandom aggregate, ranked by views
#[derive(Debug, Clone, Serialize)]
pub struct TopWork {
    pub title: String,
    pub views: i64,
    pub likes: i64,
}

/// A tag with its association frequency inside one fandom
#[derive(Debug, Clone, Serialize)]
pub struct RankedTag {
    pub name: String,
    pub count: i64,
}

/// Aggregates computed from persisted works for one fandom
///
/// This is what resolution tier 1 returns when the store already knows
/// the fandom.
#[derive(Debug, Clone, Serialize)]
pub struct FandomAggregates {
    pub fandom: String,
    pub category: Option<String>,
    pub works_tracked: u64,
    pub estimated_work_count: i64,
    pub total_views: i64,
    pub total_likes: i64,
    pub avg_word_count: i64,
    pub top_works: Vec<TopWork>,
    pub top_tags: Vec<RankedTag>,
}

/// Entity counts for the stats view
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub platforms: u64,
    pub authors: u64,
    pub works: u64,
    pub tags: u64,
    pub fandoms: u64,
    pub relationships: u64,
    pub snapshots: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_kind_roundtrip() {
        for kind in &[
            PlatformKind::ArchiveOfOurOwn,
            PlatformKind::RoyalRoad,
            PlatformKind::FanfictionNet,
        ] {
            let db_str = kind.to_db_string();
            assert_eq!(Some(*kind), PlatformKind::from_db_string(db_str));
        }
    }

    #[test]
    fn test_rating_roundtrip() {
        for rating in &[
            ContentRating::General,
            ContentRating::Teen,
            ContentRating::Mature,
            ContentRating::Explicit,
            ContentRating::NotRated,
        ] {
            let db_str = rating.to_db_string();
            assert_eq!(Some(*rating), ContentRating::from_db_string(db_str));
        }
    }

    #[test]
    fn test_status_roundtrip() {
        for status in &[
            WorkStatus::Ongoing,
            WorkStatus::Completed,
            WorkStatus::Unknown,
        ] {
            let db_str = status.to_db_string();
            assert_eq!(Some(*status), WorkStatus::from_db_string(db_str));
        }
    }

    #[test]
    fn test_invalid_db_strings() {
        assert_eq!(ContentRating::from_db_string("invalid"), None);
        assert_eq!(WorkStatus::from_db_string("invalid"), None);
        assert_eq!(PlatformKind::from_db_string("invalid"), None);
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("  Harry Potter "), "harry potter");
        assert_eq!(normalize_name("NARUTO"), "naruto");
        assert_eq!(normalize_name("already normal"), "already normal");
    }
}
