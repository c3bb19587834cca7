//! releasewatch - GitHub release notifications from the command line
//!
//! releasewatch checks a list of GitHub repositories for releases published
//! since the previous run, prints them, and remembers the most recent one of
//! every repository in a small JSON state file.
//!
//! ## Core Features
//!
//! - **Parallel checks**: A fixed pool of workers queries the GitHub API
//! - **Rate limit handling**: Optionally waits for the quota to reset, once per repository
//! - **Novelty detection**: Drafts are skipped, pre-releases are opt-in per repository
//! - **Printers**: Plain text, JSON, YAML or a user supplied template
//! - **Configuration Management**: YAML-based configuration with XDG compliance
//!
//! ## Modules
//!
//! - [`checker`]: The check run (load state, fan out, reconcile, save)
//! - [`config`]: Configuration management and parsing
//! - [`github`]: GitHub API integration and authentication
//! - [`novelty`]: Decides which listed releases are new
//! - [`printer`]: Output formats
//! - [`state`]: Watermark persistence

pub mod checker;
pub mod config;
pub mod error;
pub mod github;
pub mod novelty;
pub mod printer;
pub mod release;
pub mod retry;
pub mod state;
pub mod worker;

pub use checker::{CheckReport, ReleaseChecker};
pub use config::Config;
pub use error::CheckError;
pub use github::{GitHubClient, ReleaseSource};
pub use release::{Release, ReleaseList, ReleaseRecord, RepositorySpec, Watermark};
pub use retry::RetryPolicy;
pub use state::{PersistedState, StateStore};
