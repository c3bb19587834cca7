//! Novelty detection - decides which releases of a repository are new
//!
//! Releases are scanned most recent first against the repository's previous
//! [`Watermark`]. The scan stops at the first release that was already
//! reported, at the release whose version matches the watermark (after
//! evaluating it, since its tag or date may have changed), or after the
//! first accepted release when the repository has never been checked.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::release::{Release, ReleaseList, ReleaseRecord, Watermark};

/// New releases in `releases` relative to `previous`, most recent first
pub fn detect(previous: &Watermark, releases: &[ReleaseRecord], prereleases: bool) -> ReleaseList {
    let mut found = ReleaseList::new();

    for record in releases {
        if record.draft {
            continue;
        }

        // Already-seen history starts here; evaluate this one, then stop.
        let boundary = record.version == previous.version;

        if record.is_prerelease() && !prereleases {
            if boundary {
                break;
            }
            continue;
        }

        debug!(
            "{}: version '{}' tag {:?} date {:?}",
            previous.repo, record.version, record.tag, record.publish_date
        );

        if is_older(record.publish_date, previous.publish_date) {
            break;
        }
        if !is_new(record, previous) {
            break;
        }

        found.push(Release::new(&previous.repo, record));

        // First check of this repository: only report the latest release.
        if previous.publish_date.is_none() || boundary {
            break;
        }
    }

    found
}

/// Release differs from the watermark in version, date or tag.
///
/// An unset watermark tag or date only counts when the release has one.
fn is_new(record: &ReleaseRecord, previous: &Watermark) -> bool {
    record.version != previous.version
        || is_newer(record.publish_date, previous.publish_date)
        || record.tag != previous.tag
}

fn is_newer(date: Option<DateTime<Utc>>, previous: Option<DateTime<Utc>>) -> bool {
    match (date, previous) {
        (Some(_), None) => true,
        (Some(date), Some(previous)) => date.timestamp() > previous.timestamp(),
        (None, _) => false,
    }
}

/// Published before the watermark; an undated release counts as older than any date
fn is_older(date: Option<DateTime<Utc>>, previous: Option<DateTime<Utc>>) -> bool {
    match (date, previous) {
        (Some(date), Some(previous)) => date.timestamp() < previous.timestamp(),
        (None, Some(_)) => true,
        (_, None) => false,
    }
}
