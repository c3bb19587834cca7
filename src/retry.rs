//! Rate-limit handling around a single release listing call

use chrono::{DateTime, Utc};
use std::time::Duration;
use tracing::info;

use crate::error::{CheckError, Result};
use crate::github::ReleaseSource;
use crate::release::ReleasePage;

/// Extra wait after the advertised reset; quota is not always back at the exact instant
pub const RATE_LIMIT_BUFFER: Duration = Duration::from_secs(30);

/// Retries allowed per call after waiting for a rate-limit reset
pub const MAX_RATE_LIMIT_RETRIES: u32 = 1;

/// What to do when the API reports an exhausted quota
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Sleep until the quota resets and try again instead of failing
    pub wait_on_rate_limit: bool,
}

impl RetryPolicy {
    pub fn new(wait_on_rate_limit: bool) -> Self {
        Self { wait_on_rate_limit }
    }
}

/// Time to sleep before retrying: until `reset` plus the buffer, in whole seconds
pub fn rate_limit_delay(reset: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    let until_reset = (reset - now).to_std().unwrap_or(Duration::ZERO);
    let delay = until_reset + RATE_LIMIT_BUFFER;
    Duration::from_secs(delay.as_secs())
}

/// List releases of `repo`, waiting out a rate limit at most once when the policy allows
pub async fn list_releases_with_retry(
    source: &dyn ReleaseSource,
    repo: &str,
    policy: RetryPolicy,
    worker_id: usize,
) -> Result<ReleasePage> {
    let mut retries = 0;

    loop {
        match source.list_releases(repo).await {
            Err(CheckError::RateLimited { reset })
                if policy.wait_on_rate_limit && retries < MAX_RATE_LIMIT_RETRIES =>
            {
                let delay = rate_limit_delay(reset, Utc::now());
                info!(
                    "[{}] We're being rate-limited. Limit reset at {}; waiting for {}s",
                    worker_id,
                    reset,
                    delay.as_secs()
                );
                tokio::time::sleep(delay).await;
                retries += 1;
            }
            result => return result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::MockReleaseSource;
    use crate::release::ReleaseRecord;
    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use mockall::Sequence;

    fn page(version: &str) -> ReleasePage {
        ReleasePage {
            releases: vec![ReleaseRecord {
                version: version.to_string(),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_delay_adds_buffer_and_truncates() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let reset = now + chrono::Duration::milliseconds(5_700);
        assert_eq!(rate_limit_delay(reset, now), Duration::from_secs(35));

        let reset = now - chrono::Duration::seconds(90);
        assert_eq!(rate_limit_delay(reset, now), RATE_LIMIT_BUFFER);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_for_reset_then_retries_once() {
        let mut source = MockReleaseSource::new();
        let mut seq = Sequence::new();
        let reset = Utc::now() + chrono::Duration::seconds(5);

        source
            .expect_list_releases()
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_| Err(CheckError::RateLimited { reset }));
        source
            .expect_list_releases()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(page("v1.0")));

        let start = tokio::time::Instant::now();
        let result = list_releases_with_retry(&source, "owner/repo", RetryPolicy::new(true), 1)
            .await
            .unwrap();

        assert_eq!(result.releases[0].version, "v1.0");
        assert!(start.elapsed() >= Duration::from_secs(34));
    }

    #[tokio::test]
    async fn test_no_wait_propagates_immediately() {
        let mut source = MockReleaseSource::new();
        let reset = Utc::now() + chrono::Duration::seconds(5);

        source
            .expect_list_releases()
            .times(1)
            .returning(move |_| Err(CheckError::RateLimited { reset }));

        let result =
            list_releases_with_retry(&source, "owner/repo", RetryPolicy::default(), 1).await;
        assert_matches!(result, Err(CheckError::RateLimited { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_is_bounded() {
        let mut source = MockReleaseSource::new();
        let reset = Utc::now();

        source
            .expect_list_releases()
            .times(2)
            .returning(move |_| Err(CheckError::RateLimited { reset }));

        let result =
            list_releases_with_retry(&source, "owner/repo", RetryPolicy::new(true), 1).await;
        assert_matches!(result, Err(CheckError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_other_errors_not_retried() {
        let mut source = MockReleaseSource::new();

        source
            .expect_list_releases()
            .withf(|repo| repo.to_string() == "owner/gone")
            .times(1)
            .returning(|repo| Err(CheckError::NotFound(repo.to_string())));

        let result =
            list_releases_with_retry(&source, "owner/gone", RetryPolicy::new(true), 1).await;
        assert_matches!(result, Err(CheckError::NotFound(_)));
    }
}
