use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use postharvest_common::{load_config, Config, FileConfig};
use postharvest_scout::traits::ChromeLauncher;
use postharvest_scout::{Orchestrator, Scheduler, ScrapeSettings};
use searchstore_client::SearchStoreClient;

const DEFAULT_CONFIG: &str = "postharvest.toml";

#[derive(Parser)]
#[command(name = "postharvest", about = "Scrapes profile activity feeds into a search index")]
struct Cli {
    /// Path to config TOML file. Defaults apply when the default file is absent.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run a single scrape and exit instead of looping.
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("postharvest=info".parse()?))
        .init();

    let cli = Cli::parse();
    info!("postharvest starting...");

    let file_config = read_file_config(cli.config.as_deref())?;
    let config = Config::from_env()?;
    config.log_redacted();

    let credentials = match (&config.search_user, &config.search_password) {
        (Some(user), Some(password)) => Some((user.clone(), password.clone())),
        _ => None,
    };
    let store = SearchStoreClient::new(&config.search_url, credentials)
        .context("Failed to build search store client")?;
    let launcher = ChromeLauncher {
        webdriver_url: config.webdriver_url.clone(),
        headless: file_config.browser.headless,
    };
    let settings = ScrapeSettings::from_config(&config, &file_config);
    let orchestrator = Orchestrator::new(settings, launcher, store);

    if cli.once {
        let stats = orchestrator.run_once().await?;
        info!("Single run finished. {stats}");
        return Ok(());
    }

    let (min_idle, max_idle) = file_config.poll_bounds();
    Scheduler::new(min_idle, max_idle)
        .run(|| orchestrator.run_once(), None)
        .await;
    Ok(())
}

fn read_file_config(path: Option<&Path>) -> Result<FileConfig> {
    match path {
        Some(path) => load_config(path),
        None if Path::new(DEFAULT_CONFIG).exists() => load_config(Path::new(DEFAULT_CONFIG)),
        None => {
            info!(file = DEFAULT_CONFIG, "No config file, using defaults");
            Ok(FileConfig::default())
        }
    }
}
