//! Message queue transport for requests and responses
//!
//! This module handles the benchmark's only external plumbing:
//! - Publishing shaped requests to the links service's request topic
//! - Subscribing to the response topic and acknowledging deliveries
//! - An in-process channel pair for tests and embedding

pub mod memory;
pub mod nsq;
mod traits;

pub use memory::{channel, MemoryPublisher, MemorySubscriber};
pub use nsq::{HttpPublisher, TcpSubscriber};
pub use traits::{InboundMessage, Publisher, Subscriber, TransportError, TransportResult};
