//! In-process transport over tokio channels
//!
//! Publishes are recorded for inspection and never reach the subscriber;
//! responses are injected with [`MemoryPublisher::deliver`]. Useful for
//! embedding the benchmark in tests or for feeding it recorded responses.

use crate::transport::{InboundMessage, Publisher, Subscriber, TransportError, TransportResult};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Creates a connected publisher/subscriber pair
pub fn channel() -> (MemoryPublisher, MemorySubscriber) {
    let (tx, rx) = mpsc::unbounded_channel();
    let published = Arc::new(Mutex::new(Vec::new()));
    let finished = Arc::new(Mutex::new(Vec::new()));

    let publisher = MemoryPublisher {
        tx,
        next_id: Arc::new(AtomicU64::new(0)),
        published: Arc::clone(&published),
        reject_all: false,
    };
    let subscriber = MemorySubscriber {
        rx,
        finished,
        closed: false,
    };

    (publisher, subscriber)
}

/// Publishing half of an in-process channel
#[derive(Clone)]
pub struct MemoryPublisher {
    tx: mpsc::UnboundedSender<InboundMessage>,
    next_id: Arc<AtomicU64>,
    published: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
    reject_all: bool,
}

impl MemoryPublisher {
    /// Returns a publisher that refuses every message
    pub fn rejecting(mut self) -> Self {
        self.reject_all = true;
        self
    }

    /// Returns a copy of every accepted `(topic, payload)` pair
    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published
            .lock()
            .map(|published| published.clone())
            .unwrap_or_default()
    }

    /// Delivers a message directly to the subscriber, bypassing topic bookkeeping
    pub fn deliver(&self, body: impl Into<Vec<u8>>) -> TransportResult<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.tx
            .send(InboundMessage::new(format!("{:016x}", id), body))
            .map_err(|_| TransportError::Closed)
    }
}

impl Publisher for MemoryPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> TransportResult<()> {
        if self.reject_all {
            return Err(TransportError::Rejected(format!(
                "topic {} is not accepting messages",
                topic
            )));
        }

        if let Ok(mut published) = self.published.lock() {
            published.push((topic.to_string(), payload.to_vec()));
        }
        Ok(())
    }
}

/// Subscribing half of an in-process channel
pub struct MemorySubscriber {
    rx: mpsc::UnboundedReceiver<InboundMessage>,
    finished: Arc<Mutex<Vec<String>>>,
    closed: bool,
}

impl MemorySubscriber {
    /// Returns the identifiers of every acknowledged message
    pub fn finished(&self) -> Vec<String> {
        self.finished
            .lock()
            .map(|finished| finished.clone())
            .unwrap_or_default()
    }

    /// Returns true once `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Subscriber for MemorySubscriber {
    async fn next_message(&mut self) -> Option<InboundMessage> {
        if self.closed {
            return None;
        }
        self.rx.recv().await
    }

    async fn finish(&mut self, message: &InboundMessage) -> TransportResult<()> {
        let mut finished = self.finished.lock().map_err(|_| TransportError::Closed)?;
        finished.push(message.id.clone());
        Ok(())
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.closed = true;
        self.rx.close();
        Ok(())
    }
}
