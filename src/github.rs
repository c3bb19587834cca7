//! GitHub API integration - release listing and token discovery

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use octocrab::Octocrab;
use serde::Deserialize;
use std::env;
use std::process::Command;
use tracing::{debug, info, warn};

use crate::error::{CheckError, Result};
use crate::release::{split_repo, RateLimitInfo, ReleasePage, ReleaseRecord};

/// Source of release listings for `owner/name` repositories
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// List releases of `repo`, most recent first
    async fn list_releases(&self, repo: &str) -> Result<ReleasePage>;
}

/// GitHub client wrapper
pub struct GitHubClient {
    client: Octocrab,
}

/// Where the API token came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStrategy {
    /// `--token` flag or `token` in the configuration file
    Explicit,
    /// Use environment variable token
    EnvironmentToken,
    /// Use GitHub CLI authentication
    GitHubCLI,
    /// No token; subject to the low anonymous rate limit
    Anonymous,
}

/// Release object as returned by `GET /repos/{owner}/{repo}/releases`
#[derive(Debug, Deserialize)]
struct ApiRelease {
    name: Option<String>,
    tag_name: Option<String>,
    #[serde(default)]
    draft: bool,
    prerelease: Option<bool>,
    published_at: Option<DateTime<Utc>>,
    body: Option<String>,
}

impl From<ApiRelease> for ReleaseRecord {
    fn from(release: ApiRelease) -> Self {
        Self {
            version: release.name.unwrap_or_default(),
            tag: release.tag_name,
            draft: release.draft,
            prerelease: release.prerelease,
            publish_date: release.published_at,
            body: release.body,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

impl GitHubClient {
    /// Create a client for api.github.com
    pub fn new(token: Option<String>) -> anyhow::Result<Self> {
        Self::build(token, None)
    }

    /// Create a client against another API root (GitHub Enterprise, test servers)
    pub fn with_base_uri(token: Option<String>, base_uri: &str) -> anyhow::Result<Self> {
        Self::build(token, Some(base_uri))
    }

    fn build(token: Option<String>, base_uri: Option<&str>) -> anyhow::Result<Self> {
        let mut builder = Octocrab::builder();
        if let Some(token) = token {
            builder = builder.personal_token(token);
        }
        if let Some(base_uri) = base_uri {
            builder = builder
                .base_uri(base_uri)
                .with_context(|| format!("Invalid GitHub API URI: {}", base_uri))?;
        }

        let client = builder.build().context("Failed to create GitHub client")?;
        Ok(Self { client })
    }

    /// Resolve a token: explicit value, then `GITHUB_TOKEN`, then the GitHub CLI
    pub fn detect_authentication(explicit: Option<String>) -> (AuthStrategy, Option<String>) {
        if let Some(token) = explicit.filter(|t| !t.trim().is_empty()) {
            return (AuthStrategy::Explicit, Some(token));
        }
        if let Ok(token) = Self::try_environment_token() {
            return (AuthStrategy::EnvironmentToken, Some(token));
        }
        match Self::try_github_cli() {
            Ok(token) => (AuthStrategy::GitHubCLI, Some(token)),
            Err(e) => {
                debug!("GitHub CLI authentication unavailable: {}", e);
                (AuthStrategy::Anonymous, None)
            }
        }
    }

    /// Try to get token from GitHub CLI
    fn try_github_cli() -> anyhow::Result<String> {
        debug!("Attempting GitHub CLI authentication");

        if !Self::is_command_available("gh") {
            return Err(anyhow!("GitHub CLI (gh) is not installed"));
        }

        let token_output = Command::new("gh")
            .args(["auth", "token"])
            .output()
            .context("Failed to get GitHub CLI token")?;

        if !token_output.status.success() {
            return Err(anyhow!(
                "Failed to retrieve token from GitHub CLI: {}",
                String::from_utf8_lossy(&token_output.stderr)
            ));
        }

        let token = String::from_utf8(token_output.stdout)
            .context("GitHub CLI token is not valid UTF-8")?
            .trim()
            .to_string();

        if token.is_empty() {
            return Err(anyhow!("GitHub CLI returned empty token"));
        }

        debug!("Successfully obtained token from GitHub CLI");
        Ok(token)
    }

    /// Try to get token from environment variable
    fn try_environment_token() -> anyhow::Result<String> {
        let token = env::var("GITHUB_TOKEN").context("GITHUB_TOKEN environment variable not set")?;

        if token.is_empty() {
            return Err(anyhow!("GITHUB_TOKEN is empty"));
        }

        if !["ghp_", "gho_", "ghs_", "github_pat_"]
            .iter()
            .any(|prefix| token.starts_with(prefix))
        {
            warn!("GITHUB_TOKEN doesn't look like a valid GitHub token");
        }

        debug!("Successfully found GITHUB_TOKEN environment variable");
        Ok(token)
    }

    /// Check if a command is available in PATH
    fn is_command_available(command: &str) -> bool {
        Command::new("which")
            .arg(command)
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    }
}

/// Quota envelope from the `x-ratelimit-remaining` / `x-ratelimit-reset` header values
fn rate_limit_info(remaining: Option<&str>, reset: Option<&str>) -> RateLimitInfo {
    RateLimitInfo {
        remaining: remaining.and_then(|v| v.trim().parse().ok()),
        reset: reset
            .and_then(|v| v.trim().parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0)),
    }
}

#[async_trait]
impl ReleaseSource for GitHubClient {
    async fn list_releases(&self, repo: &str) -> Result<ReleasePage> {
        let (owner, name) = split_repo(repo)?;
        let route = format!("/repos/{}/{}/releases?per_page=100", owner, name);

        let response = self
            .client
            ._get(route)
            .await
            .map_err(|e| CheckError::TransientNetwork(e.to_string()))?;

        let status = response.status().as_u16();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let rate_limit = rate_limit_info(
            header("x-ratelimit-remaining").as_deref(),
            header("x-ratelimit-reset").as_deref(),
        );

        let body = self
            .client
            .body_to_string(response)
            .await
            .map_err(|e| CheckError::TransientNetwork(e.to_string()))?;

        match status {
            200..=299 => {}
            403 | 429 if rate_limit.is_exhausted() => {
                let reset = rate_limit.reset.unwrap_or_else(Utc::now);
                info!("Rate limited on {}; limit resets at {}", repo, reset);
                return Err(CheckError::RateLimited { reset });
            }
            404 => return Err(CheckError::NotFound(repo.to_string())),
            _ => {
                let message = serde_json::from_str::<ApiErrorBody>(&body)
                    .ok()
                    .and_then(|b| b.message)
                    .unwrap_or(body);
                return Err(CheckError::Unknown(format!("HTTP {}: {}", status, message)));
            }
        }

        let releases: Vec<ApiRelease> = serde_json::from_str(&body)
            .map_err(|e| CheckError::Unknown(format!("unexpected release payload: {}", e)))?;

        debug!(
            "Fetched {} releases for {} (remaining quota: {:?})",
            releases.len(),
            repo,
            rate_limit.remaining
        );

        Ok(ReleasePage {
            releases: releases.into_iter().map(ReleaseRecord::from).collect(),
            rate_limit,
        })
    }
}
