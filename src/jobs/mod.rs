//! Ingestion job tracking
//!
//! The registry is an explicit, injectable table of in-flight and
//! finished scrape jobs: entries are created on submission, mutated
//! only by the owning job, and read by status queries. Storage is in
//! memory only, so job history is lost on process restart; that is a
//! recorded trade-off, not an accident.

mod ingest;

pub use ingest::{ingest_fandom_catalog, ingest_search, ingest_work};

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Lifecycle state of a scrape job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

/// What a job ingests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    ScrapeWorks,
    ScrapeSingleWork,
    ScrapeFandoms,
}

/// One tracked ingestion job
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: Uuid,
    pub kind: JobKind,
    pub status: JobStatus,
    /// Hash of the configuration that produced this job
    pub config_hash: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub progress: u64,
    pub total: u64,
    pub error: Option<String>,
    pub works_ingested: u64,
}

/// Process-wide job table
#[derive(Clone, Default)]
pub struct JobRegistry {
    inner: Arc<Mutex<HashMap<Uuid, Job>>>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a pending job entry and returns its id
    pub fn submit(&self, kind: JobKind, total: u64, config_hash: &str) -> Uuid {
        let id = Uuid::new_v4();
        let job = Job {
            id,
            kind,
            status: JobStatus::Pending,
            config_hash: config_hash.to_string(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            progress: 0,
            total,
            error: None,
            works_ingested: 0,
        };
        self.inner.lock().unwrap().insert(id, job);
        id
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.inner.lock().unwrap().get(&id).cloned()
    }

    /// All jobs, most recent first
    pub fn list(&self) -> Vec<Job> {
        let mut jobs: Vec<Job> = self.inner.lock().unwrap().values().cloned().collect();
        jobs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        jobs
    }

    pub(crate) fn start(&self, id: Uuid) {
        if let Some(job) = self.inner.lock().unwrap().get_mut(&id) {
            job.status = JobStatus::Running;
            job.started_at = Some(Utc::now());
        }
    }

    pub(crate) fn progress(&self, id: Uuid, progress: u64) {
        if let Some(job) = self.inner.lock().unwrap().get_mut(&id) {
            job.progress = progress;
        }
    }

    pub(crate) fn complete(&self, id: Uuid, works_ingested: u64) {
        if let Some(job) = self.inner.lock().unwrap().get_mut(&id) {
            job.status = JobStatus::Completed;
            job.completed_at = Some(Utc::now());
            job.works_ingested = works_ingested;
        }
    }

    pub(crate) fn fail(&self, id: Uuid, error: &str) {
        if let Some(job) = self.inner.lock().unwrap().get_mut(&id) {
            job.status = JobStatus::Failed;
            job.completed_at = Some(Utc::now());
            job.error = Some(error.to_string());
        }
    }
}
