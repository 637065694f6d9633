//! Scraped record types handed from the crawler to the entity resolver

use crate::store::{ContentRating, WorkStatus};
use chrono::NaiveDate;
use serde::Serialize;

/// Scraped author data
#[derive(Debug, Clone, Default)]
pub struct ScrapedAuthor {
    pub platform_author_id: String,
    pub username: String,
    pub display_name: Option<String>,
    pub profile_url: Option<String>,
    pub bio: Option<String>,
    pub patreon_url: Option<String>,
    pub kofi_url: Option<String>,
}

/// Scraped work data ready for upserting
#[derive(Debug, Clone)]
pub struct ScrapedWork {
    pub platform_work_id: String,
    pub title: String,
    pub url: String,

    pub author: Option<ScrapedAuthor>,

    pub summary: Option<String>,
    pub rating: ContentRating,
    pub language: String,
    pub status: WorkStatus,

    pub chapter_count: i64,
    pub word_count: i64,

    pub published_at: Option<NaiveDate>,
    pub updated_at: Option<NaiveDate>,

    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    pub bookmarks: i64,

    /// Freeform tags, in source order
    pub tags: Vec<String>,
    pub fandoms: Vec<String>,
    pub relationships: Vec<String>,
    /// Parsed for completeness; no canonical character entity exists
    pub characters: Vec<String>,
    pub warnings: Vec<String>,
}

impl Default for ScrapedWork {
    fn default() -> Self {
        Self {
            platform_work_id: String::new(),
            title: String::new(),
            url: String::new(),
            author: None,
            summary: None,
            rating: ContentRating::NotRated,
            language: "English".to_string(),
            status: WorkStatus::Unknown,
            chapter_count: 0,
            word_count: 0,
            published_at: None,
            updated_at: None,
            views: 0,
            likes: 0,
            comments: 0,
            bookmarks: 0,
            tags: Vec::new(),
            fandoms: Vec::new(),
            relationships: Vec::new(),
            characters: Vec::new(),
            warnings: Vec::new(),
        }
    }
}

/// A labeled count parsed from a tag-statistics filter section
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub name: String,
    pub count: u64,
}

/// Aggregate statistics scraped from one tag-browse page
#[derive(Debug, Clone, Default, Serialize)]
pub struct TagStatistics {
    pub fandom: String,
    pub total_works: u64,
    pub ratings: Vec<TagCount>,
    pub warnings: Vec<TagCount>,
    pub categories: Vec<TagCount>,
    /// Freeform tags; the closest thing the archive has to genres
    pub freeform: Vec<TagCount>,
    pub relationships: Vec<TagCount>,
    pub characters: Vec<TagCount>,
}

/// One entry of the fandom directory, ranked by work count
#[derive(Debug, Clone, Serialize)]
pub struct FandomEntry {
    pub name: String,
    pub work_count: u64,
    pub category: Option<String>,
}
