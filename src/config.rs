use anyhow::{Context, Result};
use dirs::config_dir;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::release::{split_repo, RepositorySpec};

/// Application name, used for the configuration directory and file
pub const APP_NAME: &str = "releasewatch";

/// Main configuration structure for releasewatch
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    /// GitHub token (optional; falls back to GITHUB_TOKEN and the GitHub CLI)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// JSON file keeping the last seen release of every repository
    #[serde(default)]
    pub state_file: String,

    /// Wait for the rate limit to reset instead of failing
    #[serde(default)]
    pub wait: bool,

    /// Repositories to watch
    #[serde(default)]
    pub repositories: Vec<RepositorySpec>,

    /// Default printer settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub printer: Option<PrinterConfig>,
}

/// Printer defaults, overridden by command-line flags
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PrinterConfig {
    /// Output handler: plain, json, yaml or template
    pub default_output: Option<String>,

    #[serde(default)]
    pub plain_printer: Option<PlainPrinterConfig>,

    #[serde(default)]
    pub template_printer: Option<TemplatePrinterConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct PlainPrinterConfig {
    pub show_body: Option<bool>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct TemplatePrinterConfig {
    pub template: Option<String>,

    /// auto, on or off
    #[serde(default, deserialize_with = "deserialize_color_mode")]
    pub color_mode: Option<String>,
}

/// YAML turns a bare `on`/`off`/`true`/`false` into a boolean
fn deserialize_color_mode<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Mode {
        Flag(bool),
        Name(String),
    }

    Ok(Option::<Mode>::deserialize(deserializer)?.map(|mode| match mode {
        Mode::Flag(true) => "on".to_string(),
        Mode::Flag(false) => "off".to_string(),
        Mode::Name(name) => match name.as_str() {
            "true" => "on".to_string(),
            "false" => "off".to_string(),
            _ => name,
        },
    }))
}

impl Config {
    /// Load configuration from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        // Expand environment variables in paths
        config.expand_paths()?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default configuration file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join(APP_NAME).join(format!("{}.yaml", APP_NAME)))
    }

    /// Expand `~` and environment variables in the state file path
    pub fn expand_paths(&mut self) -> Result<()> {
        if !self.state_file.is_empty() {
            self.state_file = shellexpand::full(&self.state_file)
                .context("Failed to expand state_file path")?
                .into_owned();
        }

        Ok(())
    }

    /// State file path, if persistence is enabled
    pub fn state_path(&self) -> Option<PathBuf> {
        if self.state_file.is_empty() {
            None
        } else {
            Some(PathBuf::from(&self.state_file))
        }
    }

    /// Repository entries that are not `owner/name`
    pub fn invalid_repositories(&self) -> Vec<&str> {
        self.repositories
            .iter()
            .filter(|r| split_repo(&r.repo).is_err())
            .map(|r| r.repo.as_str())
            .collect()
    }

    pub fn default_output(&self) -> Option<&str> {
        self.printer.as_ref()?.default_output.as_deref()
    }

    pub fn show_body(&self) -> Option<bool> {
        self.printer.as_ref()?.plain_printer.as_ref()?.show_body
    }

    pub fn template(&self) -> Option<&str> {
        self.printer
            .as_ref()?
            .template_printer
            .as_ref()?
            .template
            .as_deref()
    }

    pub fn color_mode(&self) -> Option<&str> {
        self.printer
            .as_ref()?
            .template_printer
            .as_ref()?
            .color_mode
            .as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tempfile::TempDir;

    // Helper function to create a temporary config directory
    fn setup_test_config_dir() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let config_dir = temp_dir.path().join(APP_NAME);
        std::fs::create_dir_all(&config_dir).expect("Failed to create config dir");
        (temp_dir, config_dir)
    }

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert!(config.token.is_none());
        assert!(config.state_path().is_none());
        assert!(!config.wait);
        assert!(config.repositories.is_empty());
        assert!(config.default_output().is_none());
        assert!(config.show_body().is_none());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml_content = r#"
token: "ghp_example"
state_file: "/var/lib/releasewatch/state.json"
wait: true
repositories:
  - repo: "rust-lang/rust"
  - repo: "tokio-rs/tokio"
    prereleases: true
printer:
  default_output: "template"
  plain_printer:
    show_body: true
  template_printer:
    template: "{{repo}} {{version}}"
    color_mode: off
"#;

        let config: Config = serde_yaml::from_str(yaml_content).expect("Failed to parse YAML");

        assert_eq!(config.token.as_deref(), Some("ghp_example"));
        assert_eq!(
            config.state_path(),
            Some(PathBuf::from("/var/lib/releasewatch/state.json"))
        );
        assert!(config.wait);
        assert_eq!(config.repositories.len(), 2);
        assert!(!config.repositories[0].prereleases);
        assert!(config.repositories[1].prereleases);
        assert_eq!(config.default_output(), Some("template"));
        assert_eq!(config.show_body(), Some(true));
        assert_eq!(config.template(), Some("{{repo}} {{version}}"));
        assert_eq!(config.color_mode(), Some("off"));
    }

    #[test]
    fn test_color_mode_booleans() {
        let config: Config = serde_yaml::from_str(
            "printer:\n  template_printer:\n    color_mode: true\n",
        )
        .unwrap();
        assert_eq!(config.color_mode(), Some("on"));

        let config: Config = serde_yaml::from_str(
            "printer:\n  template_printer:\n    color_mode: auto\n",
        )
        .unwrap();
        assert_eq!(config.color_mode(), Some("auto"));
    }

    #[test]
    fn test_invalid_repositories() {
        let config: Config = serde_yaml::from_str(
            "repositories:\n  - repo: good/one\n  - repo: bad\n  - repo: a/b/c\n",
        )
        .unwrap();

        assert_eq!(config.invalid_repositories(), vec!["bad", "a/b/c"]);
    }

    #[test]
    #[serial]
    fn test_expand_paths() {
        env::set_var("TEST_RELEASEWATCH_HOME", "/test/home");

        let mut config = Config {
            state_file: "${TEST_RELEASEWATCH_HOME}/state.json".to_string(),
            ..Default::default()
        };
        config.expand_paths().expect("Failed to expand paths");

        assert_eq!(config.state_file, "/test/home/state.json");

        env::remove_var("TEST_RELEASEWATCH_HOME");
    }

    #[test]
    fn test_config_load_nonexistent_file() {
        let nonexistent_path = Path::new("/nonexistent/path/releasewatch.yaml");
        assert!(Config::load(nonexistent_path).is_err());
    }

    #[test]
    fn test_config_save_and_load() {
        let (_temp_dir, config_dir) = setup_test_config_dir();
        let config_path = config_dir.join("releasewatch.yaml");

        let config = Config {
            state_file: "/tmp/releasewatch-state.json".to_string(),
            wait: true,
            repositories: vec![RepositorySpec::new("owner/repo").with_prereleases(true)],
            ..Default::default()
        };
        config.save(&config_path).expect("Failed to save config");

        let loaded = Config::load(&config_path).expect("Failed to load config");
        assert_eq!(loaded.state_file, "/tmp/releasewatch-state.json");
        assert!(loaded.wait);
        assert_eq!(loaded.repositories, config.repositories);
    }

    #[test]
    fn test_config_default_path_xdg() {
        let default_path = Config::default_config_path().expect("Failed to get default path");
        assert!(default_path.to_string_lossy().contains(APP_NAME));
        assert!(default_path.to_string_lossy().ends_with("releasewatch.yaml"));
    }
}
