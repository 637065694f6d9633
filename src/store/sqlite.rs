//! SQLite store and the entity-resolution repository
//!
//! `SqliteStore` owns the connection and the read-side queries.
//! `Repository` is the write side: it only exists inside
//! [`SqliteStore::unit_of_work`], which wraps one transaction around
//! each call-site invocation (a crawled page batch, a single-work
//! scrape). The transaction commits on normal return and rolls back on
//! any error, with release guaranteed on every exit path.

use crate::crawler::{ScrapedAuthor, ScrapedWork};
use crate::store::schema::initialize_schema;
use crate::store::traits::{FandomIndex, StoreError, StoreResult};
use crate::store::{
    normalize_name, ContentRating, FandomAggregates, PlatformKind, RankedTag, StatsSummary,
    TopWork, WorkRecord, WorkStatus,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashSet;
use std::path::Path;

/// SQLite storage backend
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Opens or creates a database at the given path
    pub fn new(path: &Path) -> StoreResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Runs `f` inside one transaction
    ///
    /// Commits when `f` returns `Ok`; any `Err` drops the transaction,
    /// which rolls it back.
    pub fn unit_of_work<T>(
        &mut self,
        f: impl FnOnce(&Repository<'_>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let tx = self.conn.transaction()?;
        let result = f(&Repository { conn: &tx })?;
        tx.commit()?;
        Ok(result)
    }

    // ===== Read side =====

    /// Looks up a work by its platform-native identity
    pub fn get_work(
        &self,
        platform_id: i64,
        platform_work_id: &str,
    ) -> StoreResult<Option<WorkRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, platform_id, platform_work_id, author_id, title, summary, url,
                    rating, language, status, chapter_count, word_count,
                    latest_views, latest_likes, latest_comments, latest_bookmarks
             FROM works WHERE platform_id = ?1 AND platform_work_id = ?2",
        )?;

        let work = stmt
            .query_row(params![platform_id, platform_work_id], |row| {
                Ok(WorkRecord {
                    id: row.get(0)?,
                    platform_id: row.get(1)?,
                    platform_work_id: row.get(2)?,
                    author_id: row.get(3)?,
                    title: row.get(4)?,
                    summary: row.get(5)?,
                    url: row.get(6)?,
                    rating: ContentRating::from_db_string(&row.get::<_, String>(7)?)
                        .unwrap_or(ContentRating::NotRated),
                    language: row.get(8)?,
                    status: WorkStatus::from_db_string(&row.get::<_, String>(9)?)
                        .unwrap_or(WorkStatus::Unknown),
                    chapter_count: row.get(10)?,
                    word_count: row.get(11)?,
                    latest_views: row.get(12)?,
                    latest_likes: row.get(13)?,
                    latest_comments: row.get(14)?,
                    latest_bookmarks: row.get(15)?,
                })
            })
            .optional()?;

        Ok(work)
    }

    /// Names of tags associated with a work, filtered by category
    pub fn work_tag_names(&self, work_id: i64, category: &str) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT t.name FROM work_tags wt
             JOIN tags t ON t.id = wt.tag_id
             WHERE wt.work_id = ?1 AND t.category = ?2
             ORDER BY wt.id",
        )?;
        let names = stmt
            .query_map(params![work_id, category], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Names of fandoms associated with a work
    pub fn work_fandom_names(&self, work_id: i64) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.name FROM work_fandoms wf
             JOIN fandoms f ON f.id = wf.fandom_id
             WHERE wf.work_id = ?1
             ORDER BY wf.id",
        )?;
        let names = stmt
            .query_map(params![work_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Names of relationships associated with a work
    pub fn work_relationship_names(&self, work_id: i64) -> StoreResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.name FROM work_relationships wr
             JOIN relationships r ON r.id = wr.relationship_id
             WHERE wr.work_id = ?1
             ORDER BY wr.id",
        )?;
        let names = stmt
            .query_map(params![work_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// Number of engagement snapshots recorded for a work
    pub fn snapshot_count(&self, work_id: i64) -> StoreResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM engagement_snapshots WHERE work_id = ?1",
            params![work_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Entity counts for the stats view
    pub fn stats_summary(&self) -> StoreResult<StatsSummary> {
        let count = |table: &str| -> StoreResult<u64> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                        row.get(0)
                    })?;
            Ok(n as u64)
        };

        Ok(StatsSummary {
            platforms: count("platforms")?,
            authors: count("authors")?,
            works: count("works")?,
            tags: count("tags")?,
            fandoms: count("fandoms")?,
            relationships: count("relationships")?,
            snapshots: count("engagement_snapshots")?,
        })
    }
}

impl FandomIndex for SqliteStore {
    /// Resolution tier 1: aggregates over persisted works
    ///
    /// Substring match on the normalized fandom name. Returns `None`
    /// unless the matched fandom has at least one associated work.
    fn fandom_aggregates(&self, name: &str) -> StoreResult<Option<FandomAggregates>> {
        let normalized = normalize_name(name);

        let fandom = self
            .conn
            .query_row(
                "SELECT id, name, category, estimated_work_count FROM fandoms
                 WHERE normalized_name LIKE '%' || ?1 || '%' LIMIT 1",
                params![normalized],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, Option<String>>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )
            .optional()?;

        let Some((fandom_id, fandom_name, category, estimated_work_count)) = fandom else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT w.title, w.latest_views, w.latest_likes, w.word_count
             FROM works w
             JOIN work_fandoms wf ON wf.work_id = w.id
             WHERE wf.fandom_id = ?1",
        )?;
        let works = stmt
            .query_map(params![fandom_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        if works.is_empty() {
            return Ok(None);
        }

        let total_views: i64 = works.iter().map(|w| w.1).sum();
        let total_likes: i64 = works.iter().map(|w| w.2).sum();
        let avg_word_count =
            (works.iter().map(|w| w.3).sum::<i64>() as f64 / works.len() as f64).round() as i64;

        let mut ranked = works.clone();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        let top_works = ranked
            .iter()
            .take(5)
            .map(|(title, views, likes, _)| TopWork {
                title: title.clone(),
                views: *views,
                likes: *likes,
            })
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT t.name, COUNT(*) AS n
             FROM work_tags wt
             JOIN tags t ON t.id = wt.tag_id
             JOIN work_fandoms wf ON wf.work_id = wt.work_id
             WHERE wf.fandom_id = ?1
             GROUP BY t.id
             ORDER BY n DESC
             LIMIT 10",
        )?;
        let top_tags = stmt
            .query_map(params![fandom_id], |row| {
                Ok(RankedTag {
                    name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(FandomAggregates {
            fandom: fandom_name,
            category,
            works_tracked: works.len() as u64,
            estimated_work_count,
            total_views,
            total_likes,
            avg_word_count,
            top_works,
            top_tags,
        }))
    }
}

/// Write-side entity resolution, scoped to one transaction
pub struct Repository<'a> {
    conn: &'a Connection,
}

impl Repository<'_> {
    /// Gets or creates the platform row for a source site
    pub fn get_or_create_platform(
        &self,
        kind: PlatformKind,
        base_url: &str,
        rate_limit_rps: f64,
    ) -> StoreResult<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM platforms WHERE platform_type = ?1",
                params![kind.to_db_string()],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO platforms (name, platform_type, base_url, rate_limit_rps)
             VALUES (?1, ?2, ?3, ?4)",
            params![kind.display_name(), kind.to_db_string(), base_url, rate_limit_rps],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Gets or creates an author; on hit, non-empty incoming fields win
    /// and absent or empty values never erase existing data
    pub fn get_or_create_author(
        &self,
        platform_id: i64,
        scraped: &ScrapedAuthor,
    ) -> StoreResult<i64> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM authors WHERE platform_id = ?1 AND platform_author_id = ?2",
                params![platform_id, scraped.platform_author_id],
                |row| row.get(0),
            )
            .optional()?;

        let non_empty = |value: &Option<String>| -> Option<String> {
            value.as_ref().filter(|s| !s.is_empty()).cloned()
        };

        let now = Utc::now().to_rfc3339();

        match existing {
            Some(id) => {
                self.conn.execute(
                    "UPDATE authors SET
                        display_name = COALESCE(?1, display_name),
                        profile_url = COALESCE(?2, profile_url),
                        bio = COALESCE(?3, bio),
                        patreon_url = COALESCE(?4, patreon_url),
                        kofi_url = COALESCE(?5, kofi_url),
                        updated_at = ?6
                     WHERE id = ?7",
                    params![
                        non_empty(&scraped.display_name),
                        non_empty(&scraped.profile_url),
                        non_empty(&scraped.bio),
                        non_empty(&scraped.patreon_url),
                        non_empty(&scraped.kofi_url),
                        now,
                        id
                    ],
                )?;
                Ok(id)
            }
            None => {
                self.conn.execute(
                    "INSERT INTO authors (platform_id, platform_author_id, username,
                        display_name, profile_url, bio, patreon_url, kofi_url,
                        created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
                    params![
                        platform_id,
                        scraped.platform_author_id,
                        scraped.username,
                        non_empty(&scraped.display_name),
                        non_empty(&scraped.profile_url),
                        non_empty(&scraped.bio),
                        non_empty(&scraped.patreon_url),
                        non_empty(&scraped.kofi_url),
                        now
                    ],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }

    /// Gets or creates a canonical tag, keyed by normalized name plus category
    pub fn get_or_create_tag(&self, name: &str, category: Option<&str>) -> StoreResult<i64> {
        let normalized = normalize_name(name);

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM tags WHERE normalized_name = ?1 AND category IS ?2",
                params![normalized, category],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO tags (name, normalized_name, category) VALUES (?1, ?2, ?3)",
            params![name, normalized, category],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Gets or creates a canonical fandom; on hit, updates the category
    /// when one is supplied and the estimated count when it is positive
    pub fn get_or_create_fandom(
        &self,
        name: &str,
        category: Option<&str>,
        estimated_work_count: i64,
    ) -> StoreResult<i64> {
        let normalized = normalize_name(name);

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM fandoms WHERE normalized_name = ?1",
                params![normalized],
                |row| row.get(0),
            )
            .optional()?;

        match existing {
            Some(id) => {
                self.conn.execute(
                    "UPDATE fandoms SET
                        category = COALESCE(?1, category),
                        estimated_work_count = CASE
                            WHEN ?2 > 0 THEN ?2 ELSE estimated_work_count
                        END
                     WHERE id = ?3",
                    params![category, estimated_work_count, id],
                )?;
                Ok(id)
            }
            None => {
                self.conn.execute(
                    "INSERT INTO fandoms (name, normalized_name, category, estimated_work_count)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![name, normalized, category, estimated_work_count.max(0)],
                )?;
                Ok(self.conn.last_insert_rowid())
            }
        }
    }

    /// Gets or creates a canonical relationship
    pub fn get_or_create_relationship(&self, name: &str) -> StoreResult<i64> {
        let normalized = normalize_name(name);

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM relationships WHERE normalized_name = ?1",
                params![normalized],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(id) = existing {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO relationships (name, normalized_name) VALUES (?1, ?2)",
            params![name, normalized],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Inserts or updates a work from scraped data
    ///
    /// Scalar fields are replaced unconditionally with the fresh scrape;
    /// associations are additive only (see the sync methods). The author
    /// is resolved first so the resulting id can be attached either way.
    pub fn upsert_work(&self, scraped: &ScrapedWork, platform_id: i64) -> StoreResult<i64> {
        let author_id = match &scraped.author {
            Some(author) => Some(self.get_or_create_author(platform_id, author)?),
            None => None,
        };

        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM works WHERE platform_id = ?1 AND platform_work_id = ?2",
                params![platform_id, scraped.platform_work_id],
                |row| row.get(0),
            )
            .optional()?;

        let now = Utc::now().to_rfc3339();
        let published_at = scraped.published_at.map(|d| d.to_string());
        let updated_at = scraped.updated_at.map(|d| d.to_string());

        let work_id = match existing {
            Some(id) => {
                self.conn.execute(
                    "UPDATE works SET
                        author_id = ?1, title = ?2, summary = ?3, rating = ?4,
                        language = ?5, status = ?6, chapter_count = ?7, word_count = ?8,
                        updated_at = ?9, scraped_at = ?10,
                        latest_views = ?11, latest_likes = ?12,
                        latest_comments = ?13, latest_bookmarks = ?14
                     WHERE id = ?15",
                    params![
                        author_id,
                        scraped.title,
                        scraped.summary,
                        scraped.rating.to_db_string(),
                        scraped.language,
                        scraped.status.to_db_string(),
                        scraped.chapter_count,
                        scraped.word_count,
                        updated_at,
                        now,
                        scraped.views,
                        scraped.likes,
                        scraped.comments,
                        scraped.bookmarks,
                        id
                    ],
                )?;
                id
            }
            None => {
                self.conn.execute(
                    "INSERT INTO works (platform_id, platform_work_id, author_id, title,
                        summary, url, rating, language, status, chapter_count, word_count,
                        published_at, updated_at, scraped_at,
                        latest_views, latest_likes, latest_comments, latest_bookmarks)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14,
                             ?15, ?16, ?17, ?18)",
                    params![
                        platform_id,
                        scraped.platform_work_id,
                        author_id,
                        scraped.title,
                        scraped.summary,
                        scraped.url,
                        scraped.rating.to_db_string(),
                        scraped.language,
                        scraped.status.to_db_string(),
                        scraped.chapter_count,
                        scraped.word_count,
                        published_at,
                        updated_at,
                        now,
                        scraped.views,
                        scraped.likes,
                        scraped.comments,
                        scraped.bookmarks
                    ],
                )?;
                self.conn.last_insert_rowid()
            }
        };

        self.sync_work_tags(work_id, &scraped.tags, "freeform")?;
        self.sync_work_tags(work_id, &scraped.warnings, "warning")?;
        self.sync_work_fandoms(work_id, &scraped.fandoms)?;
        self.sync_work_relationships(work_id, &scraped.relationships)?;

        Ok(work_id)
    }

    /// Adds tag associations for names not already present; existing
    /// associations are left untouched even when absent from the scrape
    fn sync_work_tags(&self, work_id: i64, names: &[String], category: &str) -> StoreResult<()> {
        let mut stmt = self.conn.prepare(
            "SELECT t.normalized_name FROM work_tags wt
             JOIN tags t ON t.id = wt.tag_id
             WHERE wt.work_id = ?1 AND t.category = ?2",
        )?;
        let existing: HashSet<String> = stmt
            .query_map(params![work_id, category], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        for (i, name) in names.iter().enumerate() {
            if existing.contains(&normalize_name(name)) {
                continue;
            }
            let tag_id = self.get_or_create_tag(name, Some(category))?;
            self.conn.execute(
                "INSERT OR IGNORE INTO work_tags (work_id, tag_id, is_primary)
                 VALUES (?1, ?2, ?3)",
                params![work_id, tag_id, i == 0],
            )?;
        }
        Ok(())
    }

    fn sync_work_fandoms(&self, work_id: i64, names: &[String]) -> StoreResult<()> {
        let mut stmt = self.conn.prepare(
            "SELECT f.normalized_name FROM work_fandoms wf
             JOIN fandoms f ON f.id = wf.fandom_id
             WHERE wf.work_id = ?1",
        )?;
        let existing: HashSet<String> = stmt
            .query_map(params![work_id], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        for (i, name) in names.iter().enumerate() {
            if existing.contains(&normalize_name(name)) {
                continue;
            }
            let fandom_id = self.get_or_create_fandom(name, None, 0)?;
            self.conn.execute(
                "INSERT OR IGNORE INTO work_fandoms (work_id, fandom_id, is_primary)
                 VALUES (?1, ?2, ?3)",
                params![work_id, fandom_id, i == 0],
            )?;
        }
        Ok(())
    }

    fn sync_work_relationships(&self, work_id: i64, names: &[String]) -> StoreResult<()> {
        let mut stmt = self.conn.prepare(
            "SELECT r.normalized_name FROM work_relationships wr
             JOIN relationships r ON r.id = wr.relationship_id
             WHERE wr.work_id = ?1",
        )?;
        let existing: HashSet<String> = stmt
            .query_map(params![work_id], |row| row.get(0))?
            .collect::<Result<_, _>>()?;

        for (i, name) in names.iter().enumerate() {
            if existing.contains(&normalize_name(name)) {
                continue;
            }
            let relationship_id = self.get_or_create_relationship(name)?;
            self.conn.execute(
                "INSERT OR IGNORE INTO work_relationships (work_id, relationship_id, is_primary)
                 VALUES (?1, ?2, ?3)",
                params![work_id, relationship_id, i == 0],
            )?;
        }
        Ok(())
    }

    /// Records a point-in-time engagement measurement for a work
    ///
    /// Copies the work's current latest counters and structure metrics.
    /// A second snapshot on the same calendar day collapses into the
    /// existing row via the (work, date) uniqueness constraint.
    pub fn create_engagement_snapshot(&self, work_id: i64) -> StoreResult<i64> {
        let counters = self
            .conn
            .query_row(
                "SELECT latest_views, latest_likes, latest_comments, latest_bookmarks,
                        chapter_count, word_count
                 FROM works WHERE id = ?1",
                params![work_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                    ))
                },
            )
            .optional()?
            .ok_or(StoreError::WorkNotFound(work_id))?;

        let snapshot_date = Utc::now().format("%Y-%m-%d").to_string();

        self.conn.execute(
            "INSERT INTO engagement_snapshots
                (work_id, snapshot_date, views, likes, comments, bookmarks,
                 chapter_count, word_count)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(work_id, snapshot_date) DO UPDATE SET
                views = excluded.views,
                likes = excluded.likes,
                comments = excluded.comments,
                bookmarks = excluded.bookmarks,
                chapter_count = excluded.chapter_count,
                word_count = excluded.word_count",
            params![
                work_id,
                snapshot_date,
                counters.0,
                counters.1,
                counters.2,
                counters.3,
                counters.4,
                counters.5
            ],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM engagement_snapshots WHERE work_id = ?1 AND snapshot_date = ?2",
            params![work_id, snapshot_date],
            |row| row.get(0),
        )?;
        Ok(id)
    }
}
