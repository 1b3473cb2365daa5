//! Bulk download of a user's submission history.

pub mod fetch;
pub mod job;
pub mod pool;

use crate::error::Error;
use crate::global::ExtTable;
use simple_log::log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub use fetch::{CodeFetcher, Retriever};
pub use job::{Planner, RetrievalJob};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Saved(PathBuf),
    Exists,
    Skipped,
    Unsupported(String),
    Malformed(String),
    Failed(String),
    /// Not terminal: the job goes back on the queue.
    RateLimited,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CloneReport {
    pub total: usize,
    pub processed: usize,
    pub saved: usize,
    pub exists: usize,
    pub skipped: usize,
    pub unsupported: usize,
    pub malformed: usize,
    pub failed: usize,
    pub requeued: usize,
}

/// Counter shared by all workers. The lock covers one tally update and its
/// log line, never a download.
pub struct Progress {
    report: Mutex<CloneReport>,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            report: Mutex::new(CloneReport {
                total,
                ..Default::default()
            }),
        }
    }

    /// Accounts for one outcome; returns true once every item is processed.
    pub async fn record(&self, context: &str, outcome: Outcome) -> bool {
        let mut r = self.report.lock().await;
        let (processed, total) = (r.processed + 1, r.total);
        match outcome {
            Outcome::RateLimited => {
                r.requeued += 1;
                warn!("[{}/{}] too many requests, will retry {}", r.processed, total, context);
                return false;
            }
            Outcome::Saved(path) => {
                r.saved += 1;
                info!("[{}/{}] saved {} -> {}", processed, total, context, path.display());
            }
            Outcome::Exists => {
                r.exists += 1;
                info!("[{}/{}] skip existing {}", processed, total, context);
            }
            Outcome::Skipped => {
                r.skipped += 1;
                info!("[{}/{}] skip not accepted {}", processed, total, context);
            }
            Outcome::Unsupported(lang) => {
                r.unsupported += 1;
                warn!("[{}/{}] unsupported language {}: {}", processed, total, lang, context);
            }
            Outcome::Malformed(e) => {
                r.malformed += 1;
                error!("[{}/{}] bad record {}: {}", processed, total, context, e);
            }
            Outcome::Failed(e) => {
                r.failed += 1;
                error!("[{}/{}] failed {}: {}", processed, total, context, e);
            }
        }
        r.processed = processed;
        r.processed == r.total
    }

    pub async fn report(&self) -> CloneReport {
        self.report.lock().await.clone()
    }
}

pub struct CloneOptions {
    pub host: String,
    pub root: PathBuf,
    pub ext: ExtTable,
    pub ac_only: bool,
    pub workers: usize,
    pub cooldown: Duration,
}

/// Plans a job for every history record and downloads them in parallel.
/// Bad records are logged and counted; they never stop the clone.
pub async fn clone_history(
    records: &[serde_json::Value],
    fetcher: Arc<dyn CodeFetcher>,
    opts: &CloneOptions,
) -> CloneReport {
    let progress = Arc::new(Progress::new(records.len()));
    let planner = Planner {
        host: &opts.host,
        root: &opts.root,
        ext: &opts.ext,
        ac_only: opts.ac_only,
    };

    let mut jobs = vec![];
    for raw in records {
        let context = raw.get("id").map(|id| id.to_string()).unwrap_or_else(|| raw.to_string());
        match planner.plan(raw) {
            Ok(Some(job)) => jobs.push(job),
            Ok(None) => {
                progress.record(&context, Outcome::Skipped).await;
            }
            Err(e) => {
                let outcome = match Error::of(&e) {
                    Some(Error::Unsupported(lang)) => Outcome::Unsupported(lang.clone()),
                    _ => Outcome::Malformed(e.to_string()),
                };
                let context = match outcome {
                    Outcome::Malformed(_) => raw.to_string(),
                    _ => context,
                };
                progress.record(&context, outcome).await;
            }
        }
    }

    pool::run(jobs, fetcher, progress.clone(), opts.workers, opts.cooldown).await;
    progress.report().await
}
