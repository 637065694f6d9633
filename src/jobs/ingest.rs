//! Ingestion drivers
//!
//! Each driver owns its crawl session and its transactional
//! unit-of-work against the store. A work upsert and its engagement
//! snapshot commit together; a failure marks the job terminal with the
//! captured error while already-committed works stand.

use crate::config::Config;
use crate::crawler::{Crawler, SearchQuery};
use crate::jobs::JobRegistry;
use crate::store::{PlatformKind, SqliteStore};
use crate::Result;
use uuid::Uuid;

/// Crawls a search or tag listing and ingests every yielded work
///
/// Returns the number of works ingested. A fetch failure mid-crawl
/// fails the job; works ingested before the failure remain committed.
pub async fn ingest_search(
    registry: &JobRegistry,
    job_id: Uuid,
    store: &mut SqliteStore,
    crawler: &mut Crawler,
    config: &Config,
    query: SearchQuery,
) -> Result<u64> {
    registry.start(job_id);
    match run_search(registry, job_id, store, crawler, config, query).await {
        Ok(count) => {
            registry.complete(job_id, count);
            Ok(count)
        }
        Err(error) => {
            registry.fail(job_id, &error.to_string());
            Err(error)
        }
    }
}

async fn run_search(
    registry: &JobRegistry,
    job_id: Uuid,
    store: &mut SqliteStore,
    crawler: &mut Crawler,
    config: &Config,
    query: SearchQuery,
) -> Result<u64> {
    let platform_id = create_platform(store, crawler, config)?;

    let mut results = crawler.search(query);
    let mut count = 0u64;

    while let Some(work) = results.next().await? {
        store.unit_of_work(|repo| {
            let work_id = repo.upsert_work(&work, platform_id)?;
            repo.create_engagement_snapshot(work_id)?;
            Ok(())
        })?;
        count += 1;
        registry.progress(job_id, count);
        tracing::debug!(count, title = %work.title, "ingested work");
    }

    tracing::info!(count, "search ingestion finished");
    Ok(count)
}

/// Scrapes a single work by id and ingests it
///
/// Returns the work title, or `None` when the archive has no such work
/// (which also fails the job, matching the terminal not-found policy).
pub async fn ingest_work(
    registry: &JobRegistry,
    job_id: Uuid,
    store: &mut SqliteStore,
    crawler: &mut Crawler,
    config: &Config,
    work_id: &str,
) -> Result<Option<String>> {
    registry.start(job_id);
    match run_single(store, crawler, config, work_id).await {
        Ok(Some(title)) => {
            registry.complete(job_id, 1);
            Ok(Some(title))
        }
        Ok(None) => {
            registry.fail(job_id, &format!("work {} not found", work_id));
            Ok(None)
        }
        Err(error) => {
            registry.fail(job_id, &error.to_string());
            Err(error)
        }
    }
}

async fn run_single(
    store: &mut SqliteStore,
    crawler: &mut Crawler,
    config: &Config,
    work_id: &str,
) -> Result<Option<String>> {
    let platform_id = create_platform(store, crawler, config)?;

    let Some(work) = crawler.scrape_one(work_id).await? else {
        return Ok(None);
    };

    store.unit_of_work(|repo| {
        let id = repo.upsert_work(&work, platform_id)?;
        repo.create_engagement_snapshot(id)?;
        Ok(())
    })?;

    tracing::info!(%work_id, title = %work.title, "ingested single work");
    Ok(Some(work.title))
}

/// Refreshes the fandom directory rankings into the store
pub async fn ingest_fandom_catalog(
    registry: &JobRegistry,
    job_id: Uuid,
    store: &mut SqliteStore,
    crawler: &mut Crawler,
    limit: usize,
) -> Result<u64> {
    registry.start(job_id);

    let catalog = match crawler.fandom_catalog(limit).await {
        Ok(catalog) => catalog,
        Err(error) => {
            registry.fail(job_id, &error.to_string());
            return Err(error.into());
        }
    };

    let result = store.unit_of_work(|repo| {
        for entry in &catalog {
            repo.get_or_create_fandom(
                &entry.name,
                entry.category.as_deref(),
                entry.work_count as i64,
            )?;
        }
        Ok(catalog.len() as u64)
    });

    match result {
        Ok(count) => {
            registry.progress(job_id, count);
            registry.complete(job_id, count);
            tracing::info!(count, "fandom catalog ingested");
            Ok(count)
        }
        Err(error) => {
            registry.fail(job_id, &error.to_string());
            Err(error.into())
        }
    }
}

fn create_platform(
    store: &mut SqliteStore,
    crawler: &Crawler,
    config: &Config,
) -> Result<i64> {
    let base_url = crawler.base_url().to_string();
    let platform_id = store.unit_of_work(|repo| {
        repo.get_or_create_platform(
            PlatformKind::ArchiveOfOurOwn,
            &base_url,
            config.scraper.rate_limit,
        )
    })?;
    Ok(platform_id)
}
