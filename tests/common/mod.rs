//! Common test utilities and helpers for releasewatch tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use tempfile::TempDir;

use releasewatch::error::{CheckError, Result};
use releasewatch::release::{ReleasePage, ReleaseRecord};
use releasewatch::ReleaseSource;

/// Temporary directory holding a config file and a state file
pub struct TestEnvironment {
    pub temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp dir"),
        }
    }

    pub fn state_path(&self) -> PathBuf {
        self.temp_dir.path().join("state.json")
    }

    pub fn create_test_config(&self, content: &str) -> PathBuf {
        let config_path = self.temp_dir.path().join("releasewatch.yaml");
        std::fs::write(&config_path, content).expect("Failed to write test config");
        config_path
    }

    /// Config with a state file and the given repositories
    pub fn create_minimal_config(&self, repositories: &[&str]) -> PathBuf {
        let mut content = format!("state_file: \"{}\"\n", self.state_path().display());
        if repositories.is_empty() {
            content.push_str("repositories: []\n");
        } else {
            content.push_str("repositories:\n");
            for repo in repositories {
                content.push_str(&format!("  - repo: \"{}\"\n", repo));
            }
        }
        self.create_test_config(&content)
    }
}

/// Published, non-draft release on a fixed date
pub fn release(version: &str, day: u32) -> ReleaseRecord {
    ReleaseRecord {
        version: version.to_string(),
        tag: Some(version.to_lowercase().replace(' ', "-")),
        draft: false,
        prerelease: Some(false),
        publish_date: Some(Utc.with_ymd_and_hms(2024, 6, day, 12, 0, 0).unwrap()),
        body: Some(format!("Notes for {}", version)),
    }
}

/// Release source answering from a fixed table; unknown repositories are 404s
#[derive(Default)]
pub struct StubSource {
    pages: HashMap<String, Vec<ReleaseRecord>>,
    failures: HashMap<String, String>,
    pub calls: Mutex<Vec<String>>,
}

impl StubSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_releases(mut self, repo: &str, releases: Vec<ReleaseRecord>) -> Self {
        self.pages.insert(repo.to_string(), releases);
        self
    }

    pub fn with_failure(mut self, repo: &str, message: &str) -> Self {
        self.failures.insert(repo.to_string(), message.to_string());
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ReleaseSource for StubSource {
    async fn list_releases(&self, repo: &str) -> Result<ReleasePage> {
        self.calls.lock().unwrap().push(repo.to_string());

        if let Some(message) = self.failures.get(repo) {
            return Err(CheckError::TransientNetwork(message.clone()));
        }
        match self.pages.get(repo) {
            Some(releases) => Ok(ReleasePage {
                releases: releases.clone(),
                ..Default::default()
            }),
            None => Err(CheckError::NotFound(repo.to_string())),
        }
    }
}
