//! Release data model shared by the client, the novelty detector and the printers

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CheckError, Result};

/// A repository to watch, as listed in the configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct RepositorySpec {
    /// `owner/name`
    pub repo: String,

    /// Report pre-releases as new releases
    #[serde(default)]
    pub prereleases: bool,
}

impl RepositorySpec {
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            prereleases: false,
        }
    }

    pub fn with_prereleases(mut self, prereleases: bool) -> Self {
        self.prereleases = prereleases;
        self
    }

    /// Split the identifier into `(owner, name)`
    pub fn owner_and_name(&self) -> Result<(&str, &str)> {
        split_repo(&self.repo)
    }
}

/// Split an `owner/name` identifier, rejecting anything else
pub fn split_repo(repo: &str) -> Result<(&str, &str)> {
    let mut parts = repo.split('/');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => {
            Ok((owner, name))
        }
        _ => Err(CheckError::Config(repo.to_string())),
    }
}

/// One release as reported by the remote API
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseRecord {
    /// Release name; GitHub's `name`, empty when unset
    pub version: String,
    pub tag: Option<String>,
    pub draft: bool,
    pub prerelease: Option<bool>,
    pub publish_date: Option<DateTime<Utc>>,
    pub body: Option<String>,
}

impl ReleaseRecord {
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.unwrap_or(false)
    }
}

/// Last-seen release position for one repository
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Watermark {
    pub repo: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_date: Option<DateTime<Utc>>,
}

impl Watermark {
    /// Watermark of a repository that has never been checked
    pub fn empty(repo: impl Into<String>) -> Self {
        Self {
            repo: repo.into(),
            ..Default::default()
        }
    }

    /// Watermark that results from accepting `record`
    pub fn from_record(repo: &str, record: &ReleaseRecord) -> Self {
        Self {
            repo: repo.to_string(),
            version: record.version.clone(),
            tag: record.tag.clone(),
            prerelease: record.prerelease,
            publish_date: record.publish_date,
        }
    }
}

/// A release judged new, in the shape handed to printers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Release {
    #[serde(flatten)]
    pub state: Watermark,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl Release {
    pub fn new(repo: &str, record: &ReleaseRecord) -> Self {
        Self {
            state: Watermark::from_record(repo, record),
            body: record.body.clone(),
        }
    }

    pub fn repo(&self) -> &str {
        &self.state.repo
    }

    pub fn is_prerelease(&self) -> bool {
        self.state.prerelease.unwrap_or(false)
    }
}

/// New releases of one repository, most recent first
pub type ReleaseList = Vec<Release>;

/// Quota envelope attached to every API response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RateLimitInfo {
    pub remaining: Option<u32>,
    pub reset: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    pub fn is_exhausted(&self) -> bool {
        self.remaining == Some(0)
    }
}

/// Successful answer to "list releases"
#[derive(Debug, Clone, Default)]
pub struct ReleasePage {
    /// Most recent first, as returned by the API
    pub releases: Vec<ReleaseRecord>,
    pub rate_limit: RateLimitInfo,
}
