//! epd-stats
//!
//! Shows case statistics on a Waveshare 2.13" (B/C) panel attached to a Raspberry Pi.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

use epd_stats::app::{self, App, Cycle};
use epd_stats::bus::LinuxBus;
use epd_stats::config::Config;
use epd_stats::render::Fonts;
use epd_stats::stats::StatsClient;

#[derive(Parser)]
#[command(name = "epd-stats")]
#[command(about = "Case statistics on a 2.13\" e-paper panel")]
#[command(version)]
struct Cli {
    /// Configuration file (default: config/default.toml, if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Refresh the panel periodically (the default)
    Run {
        /// Refresh once and exit
        #[arg(long)]
        once: bool,
    },
    /// Render the current numbers to a PNG without touching the panel
    Snapshot {
        /// Output file path
        #[arg(short, long, default_value = "epd-stats.png")]
        output: PathBuf,
    },
    /// Whiten the panel and put it to sleep
    Clear,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::load_or_default(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Run { once: false }) {
        Commands::Run { once } => run(&config, once),
        Commands::Snapshot { output } => snapshot(&config, &output),
        Commands::Clear => clear(&config),
    }
}

fn client(config: &Config) -> StatsClient {
    StatsClient::new(
        config.source.url.clone(),
        config.source.country.clone(),
        config.request_timeout(),
    )
}

fn open(config: &Config) -> Result<LinuxBus> {
    LinuxBus::open(&config.bus_config(), config.driver_settings())
        .context("Failed to open display bus")
}

fn run(config: &Config, once: bool) -> Result<()> {
    let mut bus = open(config)?;
    let mut app = App::new(client(config), config);
    info!("Refreshing from {}", config.source.url);

    let cycles = once.then_some(1);
    let LinuxBus { epd, spi, delay, .. } = &mut bus;
    let outcome = app.run(epd, spi, delay, cycles, std::thread::sleep);

    bus.close()?;
    if outcome != Cycle::Displayed {
        anyhow::bail!("Refresh did not complete: {:?}", outcome);
    }
    Ok(())
}

fn snapshot(config: &Config, output: &Path) -> Result<()> {
    let fonts = Fonts::from_config(&config.render);
    app::snapshot(&mut client(config), &fonts, output)
}

fn clear(config: &Config) -> Result<()> {
    let mut bus = open(config)?;
    let LinuxBus { epd, spi, delay, .. } = &mut bus;
    let result = app::clear_panel(epd, spi, delay);
    bus.close()?;
    result
}
