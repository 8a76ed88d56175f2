//! Tallyweb main entry point

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tallyweb_api::{routes, Application};
use tallyweb_config::{Config, ConfigError};
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "tallyweb")]
#[command(version = "0.1.0")]
#[command(about = "A small JSON-file backed ledger service for transactions and categories", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Override the configured listen port
    #[arg(short, long)]
    port: Option<u16>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let (mut config, config_missing) = match Config::load(&args.config) {
        Ok(config) => (config, false),
        Err(ConfigError::FileNotFound { .. }) => (Config::default(), true),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to load {}", args.config.display()))
        }
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    if config_missing {
        log::warn!("Config file {} not found, using defaults", args.config.display());
    }
    log::info!(
        "Data files: {} and {}",
        config.transactions_path().display(),
        config.categories_path().display()
    );

    let rt = Runtime::new()?;
    rt.block_on(async {
        let mut app = Application::new();
        routes::register_routes(&mut app, &config)
            .await
            .context("Failed to open data files")?;
        app.ready(&config.bind_addr()).await
    })
}
