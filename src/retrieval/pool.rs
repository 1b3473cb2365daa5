use super::fetch::CodeFetcher;
use super::job::RetrievalJob;
use super::{Outcome, Progress};
use crate::error::{is_rate_limited, Error};
use anyhow::anyhow;
use simple_log::log::error;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex, Notify};

fn classify(res: anyhow::Result<std::path::PathBuf>) -> Outcome {
    match res {
        Ok(path) => Outcome::Saved(path),
        Err(e) if is_rate_limited(&e) => Outcome::RateLimited,
        Err(e) => match Error::of(&e) {
            Some(Error::AlreadyExists(_)) => Outcome::Exists,
            _ => Outcome::Failed(e.to_string()),
        },
    }
}

/// Downloads `jobs` with `workers` concurrent tasks.
///
/// Rate-limited jobs sleep out `cooldown` on the worker that hit the limit and
/// are then handed to a relay task that puts them back on the job queue. The
/// relay buffers retries while the job queue is full, so a worker never waits
/// on the queue it consumes from. The call returns once every job is accounted
/// for in `progress`. A download that panics counts as failed.
pub async fn run(
    jobs: Vec<RetrievalJob>,
    fetcher: Arc<dyn CodeFetcher>,
    progress: Arc<Progress>,
    workers: usize,
    cooldown: Duration,
) {
    if jobs.is_empty() {
        return;
    }
    let workers = workers.max(1);
    let (job_tx, job_rx) = mpsc::channel::<RetrievalJob>(workers);
    let (retry_tx, mut retry_rx) = mpsc::channel::<RetrievalJob>(workers);
    let job_rx = Arc::new(Mutex::new(job_rx));
    let finished = Arc::new(Notify::new());

    let relay = {
        let job_tx = job_tx.clone();
        let finished = finished.clone();
        tokio::spawn(async move {
            let mut pending = VecDeque::new();
            loop {
                tokio::select! {
                    _ = finished.notified() => break,
                    job = retry_rx.recv() => match job {
                        Some(job) => pending.push_back(job),
                        None => break,
                    },
                    permit = job_tx.reserve(), if !pending.is_empty() => match permit {
                        Ok(permit) => {
                            if let Some(job) = pending.pop_front() {
                                permit.send(job);
                            }
                        }
                        Err(_) => break,
                    },
                }
            }
        })
    };

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let job_rx = job_rx.clone();
        let retry_tx = retry_tx.clone();
        let fetcher = fetcher.clone();
        let progress = progress.clone();
        let finished = finished.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let job = job_rx.lock().await.recv().await;
                let Some(job) = job else {
                    break;
                };
                // a panicking download must still be accounted for
                let attempt = {
                    let fetcher = fetcher.clone();
                    let job = job.clone();
                    tokio::spawn(async move { fetcher.fetch_code(&job, false).await })
                };
                let res = match attempt.await {
                    Ok(res) => res,
                    Err(e) => Err(anyhow!("download task stopped: {}", e)),
                };
                match classify(res) {
                    Outcome::RateLimited => {
                        progress.record(&job.url, Outcome::RateLimited).await;
                        tokio::time::sleep(cooldown).await;
                        if retry_tx.send(job).await.is_err() {
                            error!("retry queue closed, cannot requeue");
                        }
                    }
                    outcome => {
                        if progress.record(&job.url, outcome).await {
                            finished.notify_one();
                        }
                    }
                }
            }
        }));
    }
    drop(retry_tx);

    for job in jobs {
        if job_tx.send(job).await.is_err() {
            break;
        }
    }
    drop(job_tx);

    if let Err(e) = relay.await {
        error!("retry relay stopped: {}", e);
    }
    for h in handles {
        if let Err(e) = h.await {
            error!("worker stopped: {}", e);
        }
    }
}
