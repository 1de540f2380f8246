//! Sync command - mirror changed assets from the CDN.

use std::path::{Path, PathBuf};

use assetmirror::config::ConfigFile;
use assetmirror::sync::{SyncConfig, SyncOutcome, SyncRunner};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;

use crate::error::CliError;

/// Arguments for the sync command.
#[derive(Debug, Default, Args)]
pub struct SyncArgs {
    /// Mirror every density, resolution tier and locale
    #[arg(long)]
    pub all: bool,

    /// Mirror only the preferred variants, even if the config enables all
    #[arg(long, conflicts_with = "all")]
    pub preferred: bool,

    /// Preferred Android density (e.g., xxxhdpi)
    #[arg(long, value_name = "KEY")]
    pub android: Option<String>,

    /// Preferred iOS resolution tier (e.g., images3x)
    #[arg(long, value_name = "KEY")]
    pub ios: Option<String>,

    /// Preferred locale (e.g., en)
    #[arg(long, value_name = "KEY")]
    pub locale: Option<String>,

    /// Attempts per asset before giving up
    #[arg(long, value_name = "N")]
    pub retries: Option<u32>,

    /// CDN base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Local mirror directory
    #[arg(long, value_name = "DIR")]
    pub assets_dir: Option<PathBuf>,

    /// Maximum concurrent HTTP requests
    #[arg(long, value_name = "N")]
    pub max_connections: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Start from an empty baseline if no previous manifest exists
    #[arg(long)]
    pub fresh: bool,
}

impl SyncArgs {
    /// Apply CLI overrides on top of the config file.
    fn resolve(self, mut config: ConfigFile) -> SyncConfig {
        if self.all {
            config.selection.download_all = true;
        }
        if self.preferred {
            config.selection.download_all = false;
        }
        if let Some(android) = self.android {
            config.selection.android = android;
        }
        if let Some(ios) = self.ios {
            config.selection.ios = ios;
        }
        if let Some(locale) = self.locale {
            config.selection.locale = locale;
        }
        if let Some(retries) = self.retries {
            config.retry.attempts = retries;
        }
        if let Some(base_url) = self.base_url {
            config.cdn.base_url = base_url;
        }
        if let Some(assets_dir) = self.assets_dir {
            config.storage.assets_dir = assets_dir;
        }
        if let Some(max_connections) = self.max_connections {
            config.cdn.max_connections = max_connections;
        }
        if let Some(timeout) = self.timeout {
            config.cdn.timeout = timeout;
        }

        SyncConfig {
            fresh: self.fresh,
            ..config.to_sync_config()
        }
    }
}

/// Run the sync command.
pub fn run(args: SyncArgs, config_path: &Path) -> Result<(), CliError> {
    let config = args.resolve(ConfigFile::load_from(config_path)?);
    debug!(config_file = %config_path.display(), ?config, "Resolved sync settings");

    println!("AssetMirror v{}", assetmirror::VERSION);
    println!("==================");
    println!();
    println!("CDN:    {}", config.base_url);
    println!("Assets: {}", config.assets_dir.display());
    println!();

    let progress = progress_bar();
    let bar = progress.clone();
    let runner = SyncRunner::from_config(config)?.with_progress(Box::new(move |p| {
        bar.set_length(p.total as u64);
        bar.set_position(p.resolved() as u64);
        if p.failure > 0 {
            bar.set_message(format!("{} failed", p.failure));
        }
        if p.finished {
            bar.finish();
        }
    }));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    let outcome = runtime.block_on(runner.run());
    progress.finish_and_clear();

    match outcome? {
        SyncOutcome::Unchanged => println!("Assets are up to date."),
        SyncOutcome::Synced(summary) => {
            println!(
                "Downloaded {} of {} changed assets ({} failed).",
                summary.success, summary.total, summary.failure
            );
            if summary.failure > 0 {
                println!("Failed assets are not retried until their hash changes again.");
                println!("Use -v to see which downloads failed.");
            }
        }
    }

    Ok(())
}

fn progress_bar() -> ProgressBar {
    let progress = ProgressBar::new(0);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .map(|style| style.progress_chars("#>-"))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    progress.set_style(style);
    progress
}
