//! memcached-gmond - version 0.1.0
//!
//! Standalone self-test for the memcached gmond module. Polls memcached on a
//! fixed interval through the module interface and prints every metric until
//! interrupted.

mod cli;
mod commands;

use clap::Parser;
use memcached_gmond::config::{render_config, validate_effective_config};
use memcached_gmond::{Config, MetricModule, Scheduler, StatsPoller};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

use cli::{Args, Commands, LogLevel};
use commands::{command_test, print_cycle};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config, args: &Args) {
    let level = args
        .log_level
        .clone()
        .or_else(|| config.log_level.as_deref().and_then(LogLevel::from_config))
        .unwrap_or(LogLevel::Warn);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level.as_filter())
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }

    info!("Logging initialized with level: {:?}", level);
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = cli::resolve_config(&args)?;

    if args.show_config {
        println!("{}", render_config(&config, args.config_format)?);
        return Ok(());
    }

    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    if args.check_config {
        println!("✅ Configuration is valid");
        return Ok(());
    }

    setup_logging(&config, &args);

    let poller_config = config.poller_config();

    if let Some(Commands::Test {
        iterations,
        verbose,
    }) = &args.command
    {
        return tokio::task::block_in_place(|| command_test(*iterations, *verbose, poller_config));
    }

    let interval = config.interval.as_duration();
    println!(
        "Polling {}:{} with a {} second interval:\n",
        poller_config.host,
        poller_config.port,
        interval.as_secs_f64()
    );

    let poller = Arc::new(Mutex::new(StatsPoller::with_tcp(poller_config)));
    let scheduler = Scheduler::new();

    let cycle_poller = Arc::clone(&poller);
    tokio::task::block_in_place(|| {
        scheduler.every(interval, move || {
            let mut poller = cycle_poller.lock().unwrap_or_else(PoisonError::into_inner);
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            if let Err(e) = print_cycle(&mut poller, &mut out) {
                error!("Polling cycle failed: {}", e);
            }
        })
    })?;

    scheduler.join().await;

    poller
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .cleanup();
    info!("memcached-gmond stopped gracefully");
    Ok(())
}
