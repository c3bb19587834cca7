//! Worker pool - fans repository checks out to a fixed number of tasks
//!
//! Jobs go through one shared queue and results come back through one
//! result channel. The persisted state is shared read-only for the whole
//! parallel phase; nothing here mutates it.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error};

use crate::error::CheckError;
use crate::github::ReleaseSource;
use crate::novelty;
use crate::release::{ReleaseList, RepositorySpec};
use crate::retry::{list_releases_with_retry, RetryPolicy};
use crate::state::PersistedState;

/// Number of concurrent workers querying the GitHub API
pub const RELEASE_WORKER_COUNT: usize = 3;

/// Result of checking one repository
#[derive(Debug)]
pub enum JobOutcome {
    /// Check succeeded; `releases` may be empty
    Checked { repo: String, releases: ReleaseList },
    /// Check failed; the repository's watermark must stay as it was
    Failed { repo: String, error: CheckError },
}

impl JobOutcome {
    pub fn repo(&self) -> &str {
        match self {
            JobOutcome::Checked { repo, .. } | JobOutcome::Failed { repo, .. } => repo,
        }
    }
}

/// Check one repository against its previous watermark
pub async fn check_repository(
    worker_id: usize,
    source: &dyn ReleaseSource,
    state: &PersistedState,
    spec: &RepositorySpec,
    policy: RetryPolicy,
) -> JobOutcome {
    let previous = state.watermark(&spec.repo);
    debug!(
        "[{}] Repository '{}' - Previous version: '{}'",
        worker_id, spec.repo, previous.version
    );

    let result = match spec.owner_and_name() {
        Ok(_) => list_releases_with_retry(source, &spec.repo, policy, worker_id)
            .await
            .map(|page| novelty::detect(&previous, &page.releases, spec.prereleases)),
        Err(e) => Err(e),
    };

    match result {
        Ok(releases) => JobOutcome::Checked {
            repo: spec.repo.clone(),
            releases,
        },
        Err(error) => {
            error!(
                "[{}] Check for repo '{}' failed: {}",
                worker_id, spec.repo, error
            );
            JobOutcome::Failed {
                repo: spec.repo.clone(),
                error,
            }
        }
    }
}

async fn check_release_worker(
    worker_id: usize,
    source: Arc<dyn ReleaseSource>,
    state: Arc<PersistedState>,
    policy: RetryPolicy,
    jobs: Arc<Mutex<mpsc::Receiver<RepositorySpec>>>,
    results: mpsc::Sender<JobOutcome>,
) {
    debug!("[{}] Release worker starting", worker_id);

    loop {
        let job = jobs.lock().await.recv().await;
        let Some(spec) = job else {
            break;
        };

        let outcome = check_repository(worker_id, source.as_ref(), &state, &spec, policy).await;
        if results.send(outcome).await.is_err() {
            break;
        }
        debug!("[{}] job done", worker_id);
    }

    debug!("[{}] Release worker leaving", worker_id);
}

/// Check every repository with `worker_count` concurrent workers.
///
/// Returns exactly one outcome per repository, in completion order.
pub async fn run_workers(
    source: Arc<dyn ReleaseSource>,
    state: Arc<PersistedState>,
    repositories: &[RepositorySpec],
    policy: RetryPolicy,
    worker_count: usize,
) -> Vec<JobOutcome> {
    let expected = repositories.len();
    if expected == 0 {
        return Vec::new();
    }
    let worker_count = worker_count.clamp(1, expected);

    let (job_tx, job_rx) = mpsc::channel::<RepositorySpec>(worker_count);
    let (result_tx, mut result_rx) = mpsc::channel::<JobOutcome>(worker_count);
    let job_rx = Arc::new(Mutex::new(job_rx));

    let workers: Vec<_> = (1..=worker_count)
        .map(|worker_id| {
            tokio::spawn(check_release_worker(
                worker_id,
                source.clone(),
                state.clone(),
                policy,
                job_rx.clone(),
                result_tx.clone(),
            ))
        })
        .collect();
    drop(result_tx);

    let jobs = repositories.to_vec();
    let producer = tokio::spawn(async move {
        for spec in jobs {
            if job_tx.send(spec).await.is_err() {
                break;
            }
        }
        // Dropping the sender closes the queue; workers exit once it drains.
    });

    let mut outcomes = Vec::with_capacity(expected);
    while outcomes.len() < expected {
        match result_rx.recv().await {
            Some(outcome) => outcomes.push(outcome),
            None => {
                error!(
                    "Workers stopped after {} of {} repositories",
                    outcomes.len(),
                    expected
                );
                break;
            }
        }
    }

    for joined in futures::future::join_all(workers).await {
        if let Err(e) = joined {
            error!("Release worker aborted: {}", e);
        }
    }
    if let Err(e) = producer.await {
        error!("Job producer aborted: {}", e);
    }

    outcomes
}
