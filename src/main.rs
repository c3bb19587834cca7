use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use releasewatch::github::AuthStrategy;
use releasewatch::printer::{new_printer, ColorMode, OutputFormat};
use releasewatch::{Config, GitHubClient, ReleaseChecker, RetryPolicy, StateStore};

#[derive(Parser)]
#[command(name = "releasewatch")]
#[command(about = "A release watcher for GitHub projects")]
#[command(
    long_about = "releasewatch displays GitHub projects with a new release since the last time it was run.\n\n\
The repositories to check are listed in a YAML configuration file. A JSON state \
file, set in the configuration, keeps the last seen release of each repository \
between runs.\n\n\
The GitHub API is rate-limited, especially for anonymous users. Use a token to \
raise the limit."
)]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to XDG config location)
    #[arg(long)]
    config: Option<PathBuf>,

    /// GitHub API token
    #[arg(short, long)]
    token: Option<String>,

    /// Wait when the rate limit is exceeded
    #[arg(long)]
    wait: bool,

    /// Display debugging details
    #[arg(long)]
    debug: bool,

    /// Output handler: plain, json, yaml or template (default: plain)
    #[arg(short, long)]
    output: Option<String>,

    /// Output template (for --output template)
    #[arg(long)]
    template: Option<String>,

    /// Color mode: auto, on or off (for --output template)
    #[arg(long)]
    color: Option<String>,

    /// Display release body (for --output plain)
    #[arg(long)]
    show_body: bool,

    /// Do not update the state file
    #[arg(long)]
    read_only: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.debug)?;
    debug!("Starting releasewatch v{}", env!("CARGO_PKG_VERSION"));

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::default_config_path()?,
    };
    let config = Config::load(&config_path)?;

    for repo in config.invalid_repositories() {
        warn!("Invalid repository name '{}' (expected owner/name), its check will fail", repo);
    }

    // The printer is set up before the check so a bad template cannot cost a state update
    let format = output_format(&cli, &config)?;
    let printer = new_printer(&format)?;

    let (strategy, token) =
        GitHubClient::detect_authentication(cli.token.clone().or_else(|| config.token.clone()));
    match strategy {
        AuthStrategy::Anonymous => {
            warn!("No GitHub token found, using anonymous access (low rate limit)")
        }
        other => debug!("Using GitHub authentication: {:?}", other),
    }
    let client = GitHubClient::new(token)?;

    let policy = RetryPolicy::new(cli.wait || config.wait);
    let store = StateStore::new(config.state_path());
    if store.path().is_none() {
        info!("No state file configured, every run starts from scratch");
    }

    let mut checker = ReleaseChecker::new(Arc::new(client), store).with_policy(policy);
    let report = checker
        .check(&config.repositories, cli.read_only)
        .await
        .context("Release check failed")?;

    let mut out = std::io::stdout().lock();
    printer
        .print(&report.releases, &mut out)
        .context("Could not display releases")?;
    out.flush()?;

    if let Some(e) = report.save_error {
        return Err(anyhow::Error::new(e).context("Could not save state"));
    }

    Ok(())
}

/// Initialize logging on stderr based on the debug flag
fn init_logging(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    Ok(())
}

/// Combine printer flags with the configuration defaults; flags win
fn output_format(cli: &Cli, config: &Config) -> Result<OutputFormat> {
    let show_body = cli.show_body || config.show_body().unwrap_or(false);

    let color = match cli.color.as_deref().or(config.color_mode()) {
        Some(mode) => mode.parse::<ColorMode>()?,
        None => ColorMode::Auto,
    };

    let mut output = match (&cli.output, &cli.template) {
        (Some(output), _) => output.clone(),
        (None, Some(_)) => "template".to_string(),
        (None, None) => config.default_output().unwrap_or("plain").to_string(),
    };

    let template = cli
        .template
        .clone()
        .or_else(|| config.template().map(String::from))
        .filter(|t| !t.is_empty());

    if output == "template" && template.is_none() && cli.output.is_none() {
        error!("Cannot use template output (no template)");
        output = "plain".to_string();
    }

    OutputFormat::from_name(&output, show_body, template, color)
}
