//! Telemetry Dashboard CLI Application
//!
//! This is the console front end for the telemetry pipeline.
//! It uses the telemetry-core library and adds:
//! - Configuration from a TOML file and command-line flags
//! - Console panels (overview, speed gauge, trends, records table)
//! - Interactive controls (start/stop/reload) while polling

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use telemetry_core::{CycleOutcome, HttpRowSource, Poller};

mod config;
mod controls;
mod dashboard;

use config::AppConfig;
use controls::ControlExit;

/// Telemetry Dashboard - Poll a sensor sheet and show the latest readings
#[derive(Parser, Debug)]
#[command(name = "telemetry-dash")]
#[command(about = "Poll a JSON sensor feed and display live readings", long_about = None)]
#[command(version)]
struct Args {
    /// Source URL returning a JSON array of rows
    #[arg(short, long, value_name = "URL")]
    url: Option<String>,

    /// Poll interval in milliseconds
    #[arg(short, long, value_name = "MS")]
    interval_ms: Option<u64>,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Fetch once, print the dashboard and exit
    #[arg(long)]
    once: bool,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Telemetry Dashboard v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using telemetry-core v{}", telemetry_core::VERSION);

    let config = resolve_config(&args)?;
    let poller_config = config.poller_config();

    let source = HttpRowSource::new(poller_config.request_timeout())
        .context("Failed to build HTTP client")?;
    let mut poller = Poller::new(source, poller_config);
    poller.set_render_targets(dashboard::stdout_targets());

    let mut url = config.source.url.clone();

    if args.once {
        return once_mode(&poller, &url).await;
    }

    println!("Polling {} (type 'help' for commands)", url);
    poller.start_polling(url.clone());

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let exit = tokio::select! {
        exit = controls::run(&mut poller, stdin, &mut url) => exit,
        _ = tokio::signal::ctrl_c() => ControlExit::Quit,
    };

    if exit == ControlExit::InputClosed {
        // No operator attached: keep polling until interrupted
        log::info!("Input closed, polling until Ctrl-C");
        tokio::signal::ctrl_c()
            .await
            .context("Failed to listen for Ctrl-C")?;
    }

    poller.stop_polling();
    log::info!("Dashboard stopped");
    Ok(())
}

/// Load the config file (if any) and apply command-line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    if let Some(url) = &args.url {
        config.source.url = url.trim().to_string();
    }
    if let Some(interval_ms) = args.interval_ms {
        config.polling.interval_ms = interval_ms;
    }

    config.validate().context("Invalid command-line options")?;
    log::debug!("Effective configuration: {:?}", config);
    Ok(config)
}

/// Single fetch-render cycle, failing the process if the source is unreachable
async fn once_mode(poller: &Poller<HttpRowSource>, url: &str) -> Result<()> {
    let outcome = poller
        .fetch_once(url)
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;

    match outcome {
        CycleOutcome::Published { records } => log::info!("Rendered {} records", records),
        CycleOutcome::Empty => println!("Source returned no rows"),
        CycleOutcome::Stale => log::warn!("Fetch superseded"),
    }
    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
