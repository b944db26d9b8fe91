//! Command-line interface for encore-rehost.
//!
//! Provides commands for running the re-hosting passes and inspecting the
//! resolved configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::error;

use crate::adapters::{GitHubPublisher, HttpFetcher};
use crate::config::ResolvedConfig;
use crate::core::{write_catalog, Pipeline, PipelineError, Resolver, RoleResolver, RunReport, WeaponResolver};

/// encore-rehost - Re-host game art in a GitHub repository
#[derive(Parser, Debug)]
#[command(name = "encore-rehost")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (defaults to a discovered .encore-rehost/config.yaml)
    #[arg(long, global = true, env = "ENCORE_REHOST_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch, re-host and write the catalogs
    Run {
        /// Only run one family
        #[arg(long, value_enum)]
        only: Option<Family>,

        /// Directory the catalogs are written to
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Entity family selectable on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Family {
    /// Characters
    Roles,

    /// Weapons
    Weapons,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        // Credentials are checked here, before anything touches the network
        let config = ResolvedConfig::load(self.config.as_deref())
            .context("Failed to load configuration")?;

        match self.command {
            Commands::Run { only, output_dir } => run(&config, only, output_dir).await,
            Commands::Config => show_config(&config),
        }
    }
}

/// Run the selected families; each is independent of the others' outcome
async fn run(config: &ResolvedConfig, only: Option<Family>, output_dir: Option<PathBuf>) -> Result<()> {
    let fetcher = HttpFetcher::new().context("Failed to build HTTP client")?;
    let publisher = GitHubPublisher::new(&config.store).context("Failed to build GitHub client")?;
    let pipeline = Pipeline::new(&fetcher, &publisher);

    let output_dir = output_dir.unwrap_or_else(|| PathBuf::from("."));
    let selected = |family: Family| only.map_or(true, |o| o == family);

    let mut failures: Vec<PipelineError> = Vec::new();

    if selected(Family::Roles) {
        let resolver = RoleResolver::new(&config.settings);
        let path = output_dir.join(&config.settings.roles.output);
        if let Err(e) = run_family(&pipeline, &resolver, &path).await {
            error!(error = %e, "Roles pass aborted");
            failures.push(e);
        }
    }

    if selected(Family::Weapons) {
        let resolver = WeaponResolver::new(&config.settings);
        let path = output_dir.join(&config.settings.weapons.output);
        if let Err(e) = run_family(&pipeline, &resolver, &path).await {
            error!(error = %e, "Weapons pass aborted");
            failures.push(e);
        }
    }

    if !failures.is_empty() {
        let messages: Vec<String> = failures.iter().map(|e| e.to_string()).collect();
        anyhow::bail!("{} pass(es) aborted: {}", failures.len(), messages.join("; "));
    }

    Ok(())
}

async fn run_family<R: Resolver>(
    pipeline: &Pipeline<'_>,
    resolver: &R,
    path: &Path,
) -> Result<RunReport, PipelineError> {
    let (catalog, mut report) = pipeline.run(resolver).await?;
    write_catalog(&catalog, path, &mut report).await?;
    print_summary(&report);
    Ok(report)
}

fn print_summary(report: &RunReport) {
    let excluded = report.skipped.len() - report.failed();
    let elapsed = report.finished_at - report.started_at;

    eprintln!(
        "\n[{} {}: {} published, {} failed, {} excluded in {}s]",
        report.family,
        report.run_id,
        report.included,
        report.failed(),
        excluded,
        elapsed.num_seconds()
    );

    for skipped in report.skipped.iter().filter(|s| !matches!(s.reason, crate::core::SkipReason::Excluded)) {
        match &skipped.key {
            Some(key) => eprintln!("  skipped {}: {}", key, skipped.reason),
            None => eprintln!("  skipped (unreadable record): {}", skipped.reason),
        }
    }

    match (&report.output, report.output_written) {
        (Some(path), true) => eprintln!("  catalog: {}", path.display()),
        (Some(path), false) => eprintln!("  catalog NOT written: {}", path.display()),
        (None, _) => {}
    }
}

/// Show resolved configuration
fn show_config(config: &ResolvedConfig) -> Result<()> {
    let settings = &config.settings;
    let store = &config.store;

    println!("encore-rehost configuration");
    println!();
    println!(
        "Config file: {}",
        config
            .config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Content store:");
    println!("  Repository: {}/{}", store.owner, store.repo);
    println!("  Branch:     {}", store.branch);
    println!("  API:        {}", store.api_url);
    println!("  Public URL: {}", store.public_url("<path>"));
    println!("  Token:      (set, {} chars)", store.token.len());
    println!();
    println!("Upstream:");
    println!("  Roles:      {}", settings.upstream.role_listing_url());
    println!("  Weapons:    {}", settings.upstream.weapon_listing_url());
    println!();
    println!("Settings:");
    let yaml = serde_yaml::to_string(settings).context("Failed to render settings")?;
    for line in yaml.lines() {
        println!("  {}", line);
    }

    Ok(())
}
