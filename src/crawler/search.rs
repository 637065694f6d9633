//! Paginated crawling against the source archive
//!
//! `Crawler` drives the fetcher and parser across listing, detail, and
//! directory pages:
//! - `search` walks paginated listing pages as a lazy, stoppable
//!   sequence of scraped works
//! - `scrape_one` fetches a single detail page, bypassing pagination
//! - `fandom_catalog` ranks the fandom directory by work count
//!
//! Stop conditions for a search: the quota is reached, a page parses
//! zero blurbs, or no next-page affordance is present. A fetch failure
//! aborts the crawl for that call; already-yielded items stand, and
//! retry is a caller concern.

use crate::config::ScraperConfig;
use crate::crawler::fetcher::{FetchError, Session};
use crate::crawler::parser::{parse_detail_page, parse_fandom_directory, parse_listing_page};
use crate::crawler::records::{FandomEntry, ScrapedWork};
use crate::Result;
use std::collections::{HashMap, VecDeque};
use url::Url;

/// Sort keys accepted from the user, mapped onto site sort columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Kudos,
    Hits,
    Bookmarks,
    Comments,
    Date,
    Words,
}

impl SortKey {
    /// Parses a user-facing sort name; unknown names fall back to kudos
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "hits" => Self::Hits,
            "bookmarks" => Self::Bookmarks,
            "comments" => Self::Comments,
            "date" => Self::Date,
            "words" => Self::Words,
            _ => Self::Kudos,
        }
    }

    /// The archive's sort column for this key
    pub fn column(self) -> &'static str {
        match self {
            Self::Kudos => "kudos_count",
            Self::Hits => "hits",
            Self::Bookmarks => "bookmarks_count",
            Self::Comments => "comments_count",
            Self::Date => "revised_at",
            Self::Words => "word_count",
        }
    }
}

/// Search filters for a crawl
///
/// A fandom or tag filter browses that tag's page rather than running a
/// free search.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub fandom: Option<String>,
    pub tag: Option<String>,
    pub sort: SortKey,
    pub limit: usize,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            query: None,
            fandom: None,
            tag: None,
            sort: SortKey::Kudos,
            limit: 100,
        }
    }
}

/// Substitutes the characters the archive repurposes in its tag-URL
/// scheme before percent-encoding
fn encode_tag(tag: &str) -> String {
    tag.replace('.', "*d*").replace('/', "*s*")
}

/// Crawler over one archive session
pub struct Crawler {
    session: Session,
    base_url: Url,
}

impl Crawler {
    /// Creates a crawler with its own fetch session
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let session = Session::open(config)?;
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self { session, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Starts a lazy search over paginated listing pages
    ///
    /// The returned sequence is finite and not restartable mid-stream;
    /// calling `search` again starts over from page 1.
    pub fn search(&mut self, query: SearchQuery) -> SearchResults<'_> {
        SearchResults {
            crawler: self,
            query,
            page: 1,
            buffer: VecDeque::new(),
            yielded: 0,
            exhausted: false,
        }
    }

    /// Fetches and parses a single work's detail page
    ///
    /// Returns `Ok(None)` for missing works, whether signalled by a 404
    /// or by an explicit not-found page.
    pub async fn scrape_one(&mut self, work_id: &str) -> std::result::Result<Option<ScrapedWork>, FetchError> {
        let mut url = self
            .base_url
            .join(&format!("works/{}", work_id))
            .unwrap_or_else(|_| self.base_url.clone());
        url.set_query(Some("view_adult=true"));

        tracing::info!(%work_id, "scraping single work");

        match self.session.fetch(url.as_str()).await {
            Ok(body) => Ok(parse_detail_page(&body, work_id, &self.base_url)),
            Err(FetchError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Fetches the fandom directory and ranks entries by work count
    ///
    /// Duplicate names keep the highest observed count.
    pub async fn fandom_catalog(
        &mut self,
        limit: usize,
    ) -> std::result::Result<Vec<FandomEntry>, FetchError> {
        let url = self
            .base_url
            .join("media")
            .unwrap_or_else(|_| self.base_url.clone());

        tracing::info!("fetching fandom directory");
        let body = self.session.fetch(url.as_str()).await?;

        let mut best: HashMap<String, FandomEntry> = HashMap::new();
        for entry in parse_fandom_directory(&body) {
            match best.get(&entry.name) {
                Some(seen) if seen.work_count >= entry.work_count => {}
                _ => {
                    best.insert(entry.name.clone(), entry);
                }
            }
        }

        let mut ranked: Vec<FandomEntry> = best.into_values().collect();
        ranked.sort_by(|a, b| b.work_count.cmp(&a.work_count));
        ranked.truncate(limit);

        tracing::info!(fandoms = ranked.len(), "fandom directory ranked");
        Ok(ranked)
    }

    /// Fetches one tag-browse page and parses its aggregate statistics
    pub async fn tag_statistics(
        &mut self,
        tag: &str,
    ) -> std::result::Result<crate::crawler::TagStatistics, FetchError> {
        let url = self.tag_page_url(tag);
        tracing::info!(%tag, "fetching tag statistics");
        let body = self.session.fetch(url.as_str()).await?;
        Ok(crate::crawler::parser::parse_tag_statistics(&body, tag))
    }

    /// The tag-browse page for a fandom or freeform tag
    pub fn tag_page_url(&self, tag: &str) -> Url {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .expect("base URL is validated as a base");
            segments.pop_if_empty();
            segments.push("tags");
            segments.push(&encode_tag(tag));
            segments.push("works");
        }
        url
    }

    fn listing_url(&self, query: &SearchQuery, page: u32) -> Url {
        let mut url = match query.fandom.as_deref().or(query.tag.as_deref()) {
            Some(tag) => self.tag_page_url(tag),
            None => self
                .base_url
                .join("works")
                .unwrap_or_else(|_| self.base_url.clone()),
        };

        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("commit", "Sort and Filter");
            pairs.append_pair("work_search[sort_column]", query.sort.column());
            pairs.append_pair("work_search[sort_direction]", "desc");
            if let Some(text) = &query.query {
                pairs.append_pair("work_search[query]", text);
            }
            pairs.append_pair("page", &page.to_string());
        }

        url
    }
}

/// Lazy sequence of scraped works from a paginated search
///
/// Pull-based: each `next` call yields the following parsed work,
/// fetching further pages on demand.
pub struct SearchResults<'a> {
    crawler: &'a mut Crawler,
    query: SearchQuery,
    page: u32,
    buffer: VecDeque<ScrapedWork>,
    yielded: usize,
    exhausted: bool,
}

impl SearchResults<'_> {
    /// Yields the next scraped work, or `None` once the quota or the
    /// source is exhausted
    pub async fn next(&mut self) -> std::result::Result<Option<ScrapedWork>, FetchError> {
        loop {
            if self.yielded >= self.query.limit {
                return Ok(None);
            }
            if let Some(work) = self.buffer.pop_front() {
                self.yielded += 1;
                return Ok(Some(work));
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_next_page().await?;
        }
    }

    async fn fetch_next_page(&mut self) -> std::result::Result<(), FetchError> {
        let url = self.crawler.listing_url(&self.query, self.page);

        tracing::info!(
            page = self.page,
            yielded = self.yielded,
            limit = self.query.limit,
            "fetching listing page"
        );

        let body = self.crawler.session.fetch(url.as_str()).await?;
        let (works, has_next) = parse_listing_page(&body, &self.crawler.base_url);

        if works.is_empty() {
            tracing::info!(page = self.page, "no more works found");
            self.exhausted = true;
            return Ok(());
        }

        if !has_next {
            self.exhausted = true;
        }

        self.buffer.extend(works);
        self.page += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_crawler() -> Crawler {
        let config = ScraperConfig {
            base_url: "https://archiveofourown.org".to_string(),
            rate_limit: 10.0,
            settle_ms: 0,
            request_timeout_secs: 10,
            user_agent: "TestAgent/1.0".to_string(),
        };
        Crawler::new(&config).unwrap()
    }

    #[test]
    fn test_sort_key_mapping() {
        assert_eq!(SortKey::from_name("kudos").column(), "kudos_count");
        assert_eq!(SortKey::from_name("hits").column(), "hits");
        assert_eq!(SortKey::from_name("bookmarks").column(), "bookmarks_count");
        assert_eq!(SortKey::from_name("comments").column(), "comments_count");
        assert_eq!(SortKey::from_name("date").column(), "revised_at");
        assert_eq!(SortKey::from_name("WORDS").column(), "word_count");
        // Unknown names fall back to kudos
        assert_eq!(SortKey::from_name("popular").column(), "kudos_count");
    }

    #[test]
    fn test_tag_encoding() {
        assert_eq!(encode_tag("K/DA"), "K*s*DA");
        assert_eq!(encode_tag("St. Agnes"), "St*d* Agnes");
        assert_eq!(encode_tag("plain"), "plain");
    }

    #[test]
    fn test_listing_url_free_search() {
        let crawler = test_crawler();
        let query = SearchQuery {
            query: Some("time travel".to_string()),
            ..Default::default()
        };
        let url = crawler.listing_url(&query, 3);

        assert_eq!(url.path(), "/works");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        assert!(pairs.contains(&(
            "work_search[sort_column]".to_string(),
            "kudos_count".to_string()
        )));
        assert!(pairs.contains(&(
            "work_search[sort_direction]".to_string(),
            "desc".to_string()
        )));
        assert!(pairs.contains(&("work_search[query]".to_string(), "time travel".to_string())));
        assert!(pairs.contains(&("page".to_string(), "3".to_string())));
    }

    #[test]
    fn test_listing_url_fandom_browse() {
        let crawler = test_crawler();
        let query = SearchQuery {
            fandom: Some("K/DA".to_string()),
            ..Default::default()
        };
        let url = crawler.listing_url(&query, 1);

        // Slash replaced by the literal marker before percent-encoding
        assert_eq!(url.path(), "/tags/K*s*DA/works");
    }

    #[test]
    fn test_tag_page_url_percent_encodes() {
        let crawler = test_crawler();
        let url = crawler.tag_page_url("Shingeki no Kyojin");
        assert_eq!(url.path(), "/tags/Shingeki%20no%20Kyojin/works");
    }
}
