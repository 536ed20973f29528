//! Benchmark module for request dispatch and response correlation
//!
//! This module contains the core benchmark logic, including:
//! - Correlation key generation
//! - Links file loading and deduplication
//! - Request shaping and dispatch
//! - Response correlation and classification
//! - Overall run orchestration

mod correlator;
mod dispatcher;
mod driver;
mod key;
mod links;

pub use correlator::{
    classify, extract_envelope, Classification, Correlator, EnvelopeError, Outcome,
    ResponseEnvelope, EVENT_ID_MARKER,
};
pub use dispatcher::{
    build_request, DispatchReport, Dispatcher, OutboundRequest, EVENT_ID_HEADER, TIMEOUT_HEADER,
};
pub use driver::{interrupt_signal, BenchDriver, RunOutcome, StopReason};
pub use key::{generate_key, is_valid_key, KEY_LENGTH};
pub use links::LinkSet;

use crate::config::Config;
use crate::output::ResultPersister;
use crate::transport::{HttpPublisher, TcpSubscriber};
use crate::BenchError;
use std::path::Path;

/// Runs a complete benchmark against nsqd
///
/// This is the main entry point for a benchmark run. It will:
/// 1. Open the result persister when a label is given
/// 2. Subscribe to the response topic
/// 3. Publish one request per link
/// 4. Consume responses until every attempt succeeded or Ctrl-C
///
/// # Arguments
///
/// * `config` - The benchmark configuration
/// * `links` - Deduplicated links to request
/// * `label` - Optional run label enabling result persistence
///
/// # Example
///
/// ```no_run
/// use links_benchmark::bench::{run_benchmark, LinkSet};
/// use links_benchmark::Config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let links = LinkSet::load(Path::new("testlinks.txt"))?;
/// run_benchmark(&Config::default(), &links, Some("go")).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_benchmark(
    config: &Config,
    links: &LinkSet,
    label: Option<&str>,
) -> Result<RunOutcome, BenchError> {
    let persister = ResultPersister::new(Path::new(&config.output.results_dir), label)?;
    let publisher = HttpPublisher::from_config(&config.queue)?;
    let subscriber = TcpSubscriber::from_config(&config.queue).await?;

    tracing::info!(
        "Connected to nsqd at {} ({} -> {})",
        config.queue.tcp_address(),
        config.queue.request_topic,
        config.queue.response_topic
    );

    BenchDriver::new(publisher, subscriber, persister, config)
        .run(links, interrupt_signal())
        .await
}
