use anyhow::{Context, Result};
use bellwire::config::Config;
use bellwire::gateway::{HttpGateway, NotificationGateway};
use bellwire::sync::{ListenerRegistry, NotificationCenter};
use bellwire::ui::{self, BrowserNavigator};
use clap::Parser;
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod demo;

/// Get the config directory path (~/.config/bellwire/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("bellwire"))
}

#[derive(Parser, Debug)]
#[command(name = "bellwire", about = "Notification bell for the terminal, synced with your jobs portal")]
struct Args {
    /// Notification API root (overrides base_url in the config file)
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Run against a built-in in-memory server with sample notifications
    #[arg(long, conflicts_with = "base_url")]
    demo: bool,

    /// Alternate config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seconds between unread-count polls (overrides the config file)
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..=Config::MAX_POLL_INTERVAL_SECS))]
    poll_secs: Option<u64>,

    /// Write logs to this file (the TUI owns the terminal)
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,
}

/// Logs go to `--log-file` when given, otherwise to stderr filtered by
/// `RUST_LOG` (silent by default so the TUI is not painted over).
fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file '{}'", path.display()))?;
            let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => path.clone(),
        None => get_config_dir()?.join("config.toml"),
    };
    let mut config = Config::load(&path)
        .with_context(|| format!("Failed to load config from '{}'", path.display()))?;

    if let Some(base_url) = &args.base_url {
        config.base_url = Some(base_url.clone());
    }
    if let Some(secs) = args.poll_secs {
        config.poll_interval_secs = secs;
    }
    config.validate().context("Invalid command-line override")?;
    tracing::debug!(?config, "Configuration loaded");
    Ok(config)
}

fn http_gateway(config: &Config) -> Result<Arc<dyn NotificationGateway>> {
    let Some(base_url) = config.base_url.as_deref() else {
        anyhow::bail!(
            "No notification API configured. Pass --base-url, set base_url in the config file, or try --demo"
        );
    };
    let token = config.resolve_api_token().map(SecretString::from);
    if token.is_none() {
        tracing::warn!("No API token configured; requests will be unauthenticated");
    }
    let gateway = HttpGateway::new(base_url, token, config.request_timeout())
        .with_context(|| format!("Invalid notification API URL '{}'", base_url))?;
    Ok(Arc::new(gateway))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;

    let config = load_config(&args)?;

    let (gateway, arrivals) = if args.demo {
        let demo_gateway = demo::seeded_gateway();
        let arrivals = demo::spawn_arrivals(Arc::clone(&demo_gateway));
        (demo_gateway as Arc<dyn NotificationGateway>, Some(arrivals))
    } else {
        (http_gateway(&config)?, None)
    };

    let site_root = if args.demo {
        url::Url::parse("https://jobs.example.com/").ok()
    } else {
        config.site_root()
    };

    let mut center = NotificationCenter::mount(
        gateway,
        config.sync_config(),
        Box::new(BrowserNavigator::new(site_root)),
        ListenerRegistry::new(),
    );

    let result = ui::run(&mut center).await;

    if let Some(handle) = arrivals {
        handle.abort();
    }
    // Give in-flight mark-read calls a moment to reach the server
    if center.in_flight() > 0 {
        tracing::debug!(in_flight = center.in_flight(), "Waiting for in-flight requests");
        if tokio::time::timeout(Duration::from_secs(2), center.settle()).await.is_err() {
            tracing::debug!(
                in_flight = center.in_flight(),
                "Exiting with requests still in flight"
            );
        }
    }

    result
}
