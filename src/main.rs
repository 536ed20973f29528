//! Links-Benchmark main entry point
//!
//! Command-line interface for the links service benchmark, the result
//! comparator, and the provider table converter.

use anyhow::Context;
use clap::{Parser, Subcommand};
use links_benchmark::bench::{run_benchmark, LinkSet};
use links_benchmark::compare::{compare, print_report, write_mismatches};
use links_benchmark::config::{load_config_with_hash, Config};
use links_benchmark::providers::convert;
use links_benchmark::transport::TransportError;
use links_benchmark::BenchError;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Links-Benchmark: a load and regression harness for the links service
///
/// Publishes one fetch request per link onto the queue, correlates the
/// responses, and reports latency statistics. Labelled runs store every
/// result so two implementations can be compared afterwards.
#[derive(Parser, Debug)]
#[command(name = "links-benchmark")]
#[command(version = "1.0.0")]
#[command(about = "Benchmark and regression harness for the links service", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults are used when omitted)
    #[arg(short, long, global = true, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Benchmark the links service with a file of URLs
    Run {
        /// File with one URL per line
        links_file: Option<PathBuf>,

        /// Label for stored results; nothing is stored without it
        label: Option<String>,
    },

    /// Compare the stored results of two labelled runs
    Compare {
        /// The two run labels to compare
        labels: Vec<String>,
    },

    /// Convert a provider listing into a JSON lookup table
    Providers {
        #[arg(long, default_value = "providers.txt")]
        input: PathBuf,

        #[arg(long, default_value = "providers.json")]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load(cli.config.as_deref())?;

    match cli.command {
        Command::Run { links_file, label } => {
            handle_run(&config, links_file.as_deref(), label.as_deref()).await
        }
        Command::Compare { labels } => handle_compare(&config, &labels),
        Command::Providers { input, output } => handle_providers(&input, &output),
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("links_benchmark=info,warn"),
            1 => EnvFilter::new("links_benchmark=debug,info"),
            2 => EnvFilter::new("links_benchmark=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads the configuration file, or the defaults when none is given
fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        tracing::debug!("No configuration file given, using defaults");
        return Ok(Config::default());
    };

    tracing::info!("Loading configuration from: {}", path.display());
    let (config, hash) = load_config_with_hash(path)
        .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    Ok(config)
}

/// Handles the run subcommand
///
/// Usage problems and an unreachable queue are reported on stdout and end
/// the process normally.
async fn handle_run(
    config: &Config,
    links_file: Option<&Path>,
    label: Option<&str>,
) -> anyhow::Result<()> {
    let Some(links_file) = links_file else {
        println!("Usage: links-benchmark run [links file] [optional: results output name]");
        return Ok(());
    };

    let links = match LinkSet::load(links_file) {
        Ok(links) => links,
        Err(e) => {
            tracing::debug!("Cannot load links: {}", e);
            println!("Error opening: {}", links_file.display());
            return Ok(());
        }
    };

    tracing::info!(
        "Loaded {} unique links from {}",
        links.len(),
        links_file.display()
    );

    match run_benchmark(config, &links, label).await {
        Ok(_) => Ok(()),
        Err(BenchError::Transport(e @ TransportError::Connect { .. })) => {
            println!("Could not reach the message queue: {}", e);
            Ok(())
        }
        Err(e) => Err(e).context("Benchmark run failed"),
    }
}

/// Handles the compare subcommand
fn handle_compare(config: &Config, labels: &[String]) -> anyhow::Result<()> {
    let [label_a, label_b, ..] = labels else {
        println!("Usage: links-benchmark compare [label1] [label2]");
        return Ok(());
    };

    if labels.len() > 2 {
        tracing::warn!("Ignoring extra labels: {}", labels[2..].join(", "));
    }

    let results_dir = Path::new(&config.output.results_dir);
    let mismatch_path = Path::new(&config.output.mismatch_path);

    let report = compare(results_dir, label_a, label_b)
        .with_context(|| format!("Failed to compare {} and {}", label_a, label_b))?;
    write_mismatches(&report, mismatch_path)?;
    print_report(&report, mismatch_path);

    Ok(())
}

/// Handles the providers subcommand
fn handle_providers(input: &Path, output: &Path) -> anyhow::Result<()> {
    if !input.exists() {
        println!("{} not found!", input.display());
        return Ok(());
    }

    let count = convert(input, output)?;
    println!("Wrote {} providers to {}", count, output.display());
    Ok(())
}
