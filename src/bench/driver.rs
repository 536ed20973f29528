//! Benchmark driver - run orchestration
//!
//! This module contains the run loop that ties everything together:
//! - Dispatching every link before responses are consumed
//! - Consuming responses one at a time and acknowledging each
//! - Stopping when every attempt has succeeded, on interrupt, when the
//!   subscription ends, or after an optional idle period
//! - Printing the statistics and closing persisted output

use crate::bench::correlator::Correlator;
use crate::bench::dispatcher::{DispatchReport, Dispatcher};
use crate::bench::links::LinkSet;
use crate::config::{Config, ServiceConfig};
use crate::output::{print_summary, ResultPersister, RunStatistics, RunSummary};
use crate::transport::{InboundMessage, Publisher, Subscriber};
use crate::BenchError;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Why a run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Every attempted request succeeded
    Completed,
    /// The publisher accepted nothing, so nothing can be awaited
    NothingDispatched,
    /// The shutdown signal fired
    Interrupted,
    /// No message arrived within the idle timeout
    IdleTimeout,
    /// The subscription ended
    SubscriberClosed,
}

/// Final report of a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub reason: StopReason,
    pub dispatch: DispatchReport,
    pub summary: RunSummary,
}

/// What the receive step produced
enum Event {
    Message(InboundMessage),
    Closed,
    Idle,
    Interrupted,
}

/// Drives one benchmark run over a publisher/subscriber pair
pub struct BenchDriver<P: Publisher, S: Subscriber> {
    publisher: P,
    subscriber: S,
    correlator: Correlator,
    service: ServiceConfig,
    request_topic: String,
    idle_timeout: Option<Duration>,
}

impl<P: Publisher, S: Subscriber> BenchDriver<P, S> {
    /// Creates a driver from configuration
    pub fn new(publisher: P, subscriber: S, persister: ResultPersister, config: &Config) -> Self {
        let idle_timeout = match config.run.idle_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            publisher,
            subscriber,
            correlator: Correlator::new(persister),
            service: config.service.clone(),
            request_topic: config.queue.request_topic.clone(),
            idle_timeout,
        }
    }

    /// Overrides the idle timeout
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Runs the benchmark until completion or `shutdown` resolves
    ///
    /// `shutdown` is watched from the first publish on, so an interrupt
    /// during dispatch still ends with the statistics printed. The summary is
    /// printed once after dispatch and once when the run stops.
    pub async fn run<F>(mut self, links: &LinkSet, shutdown: F) -> Result<RunOutcome, BenchError>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut stats = RunStatistics::new();

        let dispatch = Dispatcher::new(&self.publisher, &self.service, &self.request_topic)?
            .dispatch_until(links, &mut stats, shutdown.as_mut())
            .await;

        let reason = if dispatch.interrupted {
            StopReason::Interrupted
        } else {
            print_summary(&stats.summary());
            println!("All requests sent... getting responses...");

            if stats.attempted() == 0 {
                tracing::warn!("No requests were accepted, nothing to wait for");
                StopReason::NothingDispatched
            } else {
                self.consume(&mut stats, shutdown.as_mut()).await
            }
        };

        if let Err(e) = self.subscriber.close().await {
            tracing::warn!("Failed to close subscription: {}", e);
        }
        self.correlator.finish();

        match reason {
            StopReason::Interrupted => println!("Terminating..."),
            StopReason::Completed => println!("Done!"),
            other => println!("Stopped: {:?}", other),
        }
        let summary = stats.summary();
        print_summary(&summary);

        tracing::info!(
            "Run stopped ({:?}): {} of {} attempts succeeded",
            reason,
            summary.succeeded,
            summary.attempted
        );

        Ok(RunOutcome {
            reason,
            dispatch,
            summary,
        })
    }

    /// Processes messages one at a time until a stop condition is met
    async fn consume<F>(&mut self, stats: &mut RunStatistics, mut shutdown: Pin<&mut F>) -> StopReason
    where
        F: Future<Output = ()>,
    {
        loop {
            let event = tokio::select! {
                _ = shutdown.as_mut() => Event::Interrupted,
                event = receive(&mut self.subscriber, self.idle_timeout) => event,
            };

            let message = match event {
                Event::Message(message) => message,
                Event::Closed => return StopReason::SubscriberClosed,
                Event::Idle => return StopReason::IdleTimeout,
                Event::Interrupted => return StopReason::Interrupted,
            };

            if message.attempts > 1 {
                tracing::debug!("Redelivered message {} (attempt {})", message.id, message.attempts);
            }

            self.correlator.on_message(&message.body, stats);

            // Acknowledged whatever the outcome; a redelivery would only repeat it
            if let Err(e) = self.subscriber.finish(&message).await {
                tracing::warn!("Failed to acknowledge message {}: {}", message.id, e);
            }

            if stats.is_complete() {
                return StopReason::Completed;
            }
        }
    }
}

async fn receive<S: Subscriber>(subscriber: &mut S, idle_timeout: Option<Duration>) -> Event {
    let next = match idle_timeout {
        Some(limit) => match tokio::time::timeout(limit, subscriber.next_message()).await {
            Ok(next) => next,
            Err(_) => return Event::Idle,
        },
        None => subscriber.next_message().await,
    };

    match next {
        Some(message) => Event::Message(message),
        None => Event::Closed,
    }
}

/// Resolves when the process receives Ctrl-C
pub async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for interrupt: {}", e);
        std::future::pending::<()>().await;
    }
}
