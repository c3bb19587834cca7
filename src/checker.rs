//! Release Checker - loads state, runs the worker pool and reconciles watermarks
//!
//! A run has two phases. During the parallel phase the workers only read the
//! loaded state. Once every worker has reported, the single-threaded merge
//! phase moves the watermark of each repository with new releases to its
//! most recent accepted release and writes the state back.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::{CheckError, Result};
use crate::github::ReleaseSource;
use crate::release::{ReleaseList, RepositorySpec};
use crate::retry::RetryPolicy;
use crate::state::{PersistedState, StateStore};
use crate::worker::{run_workers, JobOutcome, RELEASE_WORKER_COUNT};

/// Outcome of one check run
#[derive(Debug, Default)]
pub struct CheckReport {
    /// New releases, one list per repository that has any, in completion order
    pub releases: Vec<ReleaseList>,
    /// Repositories whose check failed (already logged)
    pub failed: Vec<String>,
    /// Whether updated watermarks were written to the state file
    pub state_saved: bool,
    /// State could not be written; `releases` is still complete
    pub save_error: Option<CheckError>,
    pub duration: Duration,
}

impl CheckReport {
    /// Number of new releases across all repositories
    pub fn release_count(&self) -> usize {
        self.releases.iter().map(Vec::len).sum()
    }
}

/// The release-checking engine
pub struct ReleaseChecker {
    source: Arc<dyn ReleaseSource>,
    store: StateStore,
    state: PersistedState,
    policy: RetryPolicy,
    worker_count: usize,
}

impl ReleaseChecker {
    /// Create a checker using `source` for API calls and `store` for watermarks
    pub fn new(source: Arc<dyn ReleaseSource>, store: StateStore) -> Self {
        Self {
            source,
            store,
            state: PersistedState::default(),
            policy: RetryPolicy::default(),
            worker_count: RELEASE_WORKER_COUNT,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_worker_count(mut self, worker_count: usize) -> Self {
        self.worker_count = worker_count.max(1);
        self
    }

    /// State as of the end of the last run
    pub fn state(&self) -> &PersistedState {
        &self.state
    }

    /// Check `repositories` for releases published since the last run.
    ///
    /// Fails only if the state file cannot be loaded. A failed save is
    /// reported through [`CheckReport::save_error`] alongside the releases.
    pub async fn check(
        &mut self,
        repositories: &[RepositorySpec],
        read_only: bool,
    ) -> Result<CheckReport> {
        let start_time = Instant::now();

        self.state = self.store.load()?;

        info!(
            "Checking {} repositories with {} workers",
            repositories.len(),
            self.worker_count
        );

        let snapshot = Arc::new(std::mem::take(&mut self.state));
        let outcomes = run_workers(
            self.source.clone(),
            snapshot.clone(),
            repositories,
            self.policy,
            self.worker_count,
        )
        .await;
        // Workers are joined, so the snapshot is normally uniquely owned again.
        self.state = Arc::try_unwrap(snapshot).unwrap_or_else(|shared| (*shared).clone());

        let mut report = CheckReport::default();
        for outcome in outcomes {
            match outcome {
                JobOutcome::Checked { releases, .. } if releases.is_empty() => {}
                JobOutcome::Checked { releases, .. } => report.releases.push(releases),
                JobOutcome::Failed { repo, .. } => report.failed.push(repo),
            }
        }

        if !report.failed.is_empty() {
            warn!(
                "{} of {} repositories could not be checked",
                report.failed.len(),
                repositories.len()
            );
        }

        if report.releases.is_empty() || read_only {
            report.duration = start_time.elapsed();
            debug!("Leaving state untouched (read-only: {})", read_only);
            return Ok(report);
        }

        self.reconcile(&report.releases);

        debug!("Saving states...");
        match self.store.save(&self.state) {
            Ok(()) => report.state_saved = self.store.path().is_some(),
            Err(e) => {
                warn!("New releases found but state was not saved: {}", e);
                report.save_error = Some(e);
            }
        }

        report.duration = start_time.elapsed();
        info!(
            "Check completed in {:.2}s: {} new releases in {} repositories",
            report.duration.as_secs_f64(),
            report.release_count(),
            report.releases.len()
        );

        Ok(report)
    }

    /// Move each repository's watermark to its most recent new release
    fn reconcile(&mut self, releases: &[ReleaseList]) {
        for list in releases {
            if let Some(latest) = list.first() {
                self.state.record(latest.state.clone());
            }
        }
    }
}
