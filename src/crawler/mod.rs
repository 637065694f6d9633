//! Crawler module for archive page fetching and parsing
//!
//! This module contains the ingestion-side crawling logic:
//! - Rate-limited page fetching with a typed error taxonomy
//! - Pure HTML-to-record parsing for listing, detail, tag-statistics,
//!   and directory pages
//! - Paginated search crawling with quota and stop conditions

mod fetcher;
mod parser;
mod records;
mod search;

pub use fetcher::{FetchError, Session};
pub use parser::{
    map_rating, map_status, parse_count, parse_date, parse_detail_page, parse_fandom_directory,
    parse_listing_item, parse_listing_page, parse_tag_statistics,
};
pub use records::{FandomEntry, ScrapedAuthor, ScrapedWork, TagCount, TagStatistics};
pub use search::{Crawler, SearchQuery, SearchResults, SortKey};
