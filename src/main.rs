//! Storyscope main entry point
//!
//! Command-line interface for the fanfiction-archive analytics scraper.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use storyscope::config::load_config_with_hash;
use storyscope::crawler::{Crawler, SearchQuery, SortKey};
use storyscope::jobs::{self, JobKind, JobRegistry};
use storyscope::oracle::Claude;
use storyscope::resolve::{ResolutionChain, RetryPolicy};
use storyscope::store::SqliteStore;
use tracing_subscriber::EnvFilter;

/// Storyscope: fanfiction-archive analytics scraper
///
/// Ingests works and fandom data from Archive of Our Own under a strict
/// politeness budget, tracks engagement over time, and answers fandom
/// analytics queries with a degrade-gracefully resolution chain.
#[derive(Parser, Debug)]
#[command(name = "storyscope")]
#[command(version = "0.1.0")]
#[command(about = "Fanfiction-archive analytics scraper", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl a search or tag listing and ingest the results
    Scrape {
        /// Free-text search query
        #[arg(long)]
        query: Option<String>,

        /// Browse this fandom's tag page
        #[arg(long)]
        fandom: Option<String>,

        /// Browse this tag's page
        #[arg(long)]
        tag: Option<String>,

        /// Sort order: kudos, hits, bookmarks, comments, date, words
        #[arg(long, default_value = "kudos")]
        sort: String,

        /// Maximum number of works to ingest
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// Scrape and ingest a single work by its archive id
    Work {
        /// The platform-native work id
        id: String,
    },

    /// Refresh the fandom directory rankings
    Fandoms {
        /// Keep the top N fandoms by work count
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },

    /// Run the fandom resolution chain and print the report
    Analyze {
        /// Fandom name, in whatever spelling the user knows
        name: String,

        /// Abort the whole chain after this many seconds
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,
    },

    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)?;

    match cli.command {
        Command::Scrape {
            query,
            fandom,
            tag,
            sort,
            limit,
        } => {
            let search = SearchQuery {
                query,
                fandom,
                tag,
                sort: SortKey::from_name(&sort),
                limit,
            };
            handle_scrape(&config, &config_hash, search).await?;
        }
        Command::Work { id } => {
            handle_work(&config, &config_hash, &id).await?;
        }
        Command::Fandoms { limit } => {
            handle_fandoms(&config, &config_hash, limit).await?;
        }
        Command::Analyze { name, timeout_secs } => {
            handle_analyze(&config, &name, timeout_secs).await?;
        }
        Command::Stats => {
            handle_stats(&config)?;
        }
    }

    Ok(())
}

/// Sets up the tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("storyscope=info,warn"),
            1 => EnvFilter::new("storyscope=debug,info"),
            2 => EnvFilter::new("storyscope=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

async fn handle_scrape(
    config: &storyscope::Config,
    config_hash: &str,
    search: SearchQuery,
) -> anyhow::Result<()> {
    let mut store = SqliteStore::new(Path::new(&config.store.database_path))?;
    let mut crawler = Crawler::new(&config.scraper)?;

    let registry = JobRegistry::new();
    let job_id = registry.submit(JobKind::ScrapeWorks, search.limit as u64, config_hash);

    match jobs::ingest_search(&registry, job_id, &mut store, &mut crawler, config, search).await {
        Ok(count) => {
            println!("Ingested {} works (job {})", count, job_id);
        }
        Err(error) => {
            let ingested = registry.get(job_id).map(|job| job.progress).unwrap_or(0);
            eprintln!(
                "Job {} failed after {} works: {}",
                job_id, ingested, error
            );
            return Err(error.into());
        }
    }

    Ok(())
}

async fn handle_work(
    config: &storyscope::Config,
    config_hash: &str,
    work_id: &str,
) -> anyhow::Result<()> {
    let mut store = SqliteStore::new(Path::new(&config.store.database_path))?;
    let mut crawler = Crawler::new(&config.scraper)?;

    let registry = JobRegistry::new();
    let job_id = registry.submit(JobKind::ScrapeSingleWork, 1, config_hash);

    match jobs::ingest_work(&registry, job_id, &mut store, &mut crawler, config, work_id).await? {
        Some(title) => println!("Ingested: {}", title),
        None => println!("Work {} not found", work_id),
    }

    Ok(())
}

async fn handle_fandoms(
    config: &storyscope::Config,
    config_hash: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let mut store = SqliteStore::new(Path::new(&config.store.database_path))?;
    let mut crawler = Crawler::new(&config.scraper)?;

    let registry = JobRegistry::new();
    let job_id = registry.submit(JobKind::ScrapeFandoms, limit as u64, config_hash);

    let count =
        jobs::ingest_fandom_catalog(&registry, job_id, &mut store, &mut crawler, limit).await?;
    println!("Ingested {} fandoms (job {})", count, job_id);

    Ok(())
}

async fn handle_analyze(
    config: &storyscope::Config,
    name: &str,
    timeout_secs: u64,
) -> anyhow::Result<()> {
    let store = SqliteStore::new(Path::new(&config.store.database_path))?;
    let crawler = Crawler::new(&config.scraper)?;
    let oracle = Claude::from_env(&config.oracle)?;

    let mut chain = ResolutionChain::new(
        store,
        crawler,
        oracle,
        RetryPolicy::from_config(&config.retry),
    );

    let resolution = chain
        .resolve_within(Duration::from_secs(timeout_secs), name)
        .await?;

    println!("{}", serde_json::to_string_pretty(&resolution)?);
    Ok(())
}

fn handle_stats(config: &storyscope::Config) -> anyhow::Result<()> {
    let store = SqliteStore::new(Path::new(&config.store.database_path))?;
    let summary = store.stats_summary()?;

    println!("Database: {}\n", config.store.database_path);
    println!("Platforms:     {}", summary.platforms);
    println!("Authors:       {}", summary.authors);
    println!("Works:         {}", summary.works);
    println!("Tags:          {}", summary.tags);
    println!("Fandoms:       {}", summary.fandoms);
    println!("Relationships: {}", summary.relationships);
    println!("Snapshots:     {}", summary.snapshots);

    Ok(())
}
