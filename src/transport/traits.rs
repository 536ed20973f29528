//! Transport traits and error types
//!
//! This module defines the publish and subscribe interfaces the benchmark
//! needs from a message queue, and the errors a transport may report.

use std::future::Future;
use thiserror::Error;

/// Errors that can occur while talking to the message queue
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect to {address}: {source}")]
    Connect {
        address: String,
        source: std::io::Error,
    },

    #[error("Publish rejected: {0}")]
    Rejected(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Transport closed")]
    Closed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for transport operations
pub type TransportResult<T> = Result<T, TransportError>;

/// A message delivered by a subscriber
///
/// The `id` is whatever the transport needs to acknowledge the message;
/// the body is handed to the correlator untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Transport-specific message identifier
    pub id: String,

    /// Number of delivery attempts reported by the transport
    pub attempts: u16,

    /// Raw message body
    pub body: Vec<u8>,
}

impl InboundMessage {
    /// Creates a first-attempt message
    pub fn new(id: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            attempts: 1,
            body: body.into(),
        }
    }
}

/// Publishing side of the message queue
pub trait Publisher {
    /// Publishes a payload onto a topic
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The queue acknowledged the message
    /// * `Err(TransportError)` - The message was not accepted
    fn publish(&self, topic: &str, payload: &[u8]) -> impl Future<Output = TransportResult<()>>;
}

/// Subscribing side of the message queue
///
/// Deliveries are at-least-once: the same message may arrive more than once
/// and nothing here deduplicates it.
pub trait Subscriber {
    /// Waits for the next message
    ///
    /// Returns `None` once the subscription is closed and drained.
    fn next_message(&mut self) -> impl Future<Output = Option<InboundMessage>>;

    /// Acknowledges a message so the queue does not redeliver it
    fn finish(&mut self, message: &InboundMessage) -> impl Future<Output = TransportResult<()>>;

    /// Stops receiving new messages
    fn close(&mut self) -> impl Future<Output = TransportResult<()>>;
}
