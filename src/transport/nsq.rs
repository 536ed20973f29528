//! nsqd transport
//!
//! Requests are published through nsqd's HTTP `/pub` endpoint. Responses are
//! consumed over the TCP protocol with the smallest command set a consumer
//! needs: `SUB`, `RDY`, `FIN`, `NOP` and `CLS`. There is no feature
//! negotiation, TLS, compression, or requeueing.

use crate::config::QueueConfig;
use crate::transport::{InboundMessage, Publisher, Subscriber, TransportError, TransportResult};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

/// Protocol magic sent once after connecting
const MAGIC_V2: &[u8] = b"  V2";

const FRAME_TYPE_RESPONSE: u32 = 0;
const FRAME_TYPE_ERROR: u32 = 1;
const FRAME_TYPE_MESSAGE: u32 = 2;

const HEARTBEAT: &[u8] = b"_heartbeat_";

/// Timestamp (8 bytes) + attempts (2 bytes) + message id (16 bytes)
const MESSAGE_HEADER_LEN: usize = 26;

/// Frames larger than this are treated as a protocol error
const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Publishes messages through nsqd's HTTP API
pub struct HttpPublisher {
    client: Client,
    base_url: String,
}

impl HttpPublisher {
    /// Creates a publisher for the nsqd HTTP listener at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(5))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Creates a publisher from queue configuration
    pub fn from_config(config: &QueueConfig) -> Result<Self, reqwest::Error> {
        Self::new(config.http_base_url())
    }
}

impl Publisher for HttpPublisher {
    async fn publish(&self, topic: &str, payload: &[u8]) -> TransportResult<()> {
        let response = self
            .client
            .post(format!("{}/pub", self.base_url))
            .query(&[("topic", topic)])
            .body(payload.to_vec())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status.is_success() && body.trim() == "OK" {
            Ok(())
        } else {
            Err(TransportError::Rejected(format!(
                "HTTP {}: {}",
                status.as_u16(),
                body.trim()
            )))
        }
    }
}

/// A frame read from nsqd
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Response(Vec<u8>),
    Error(Vec<u8>),
    Message(InboundMessage),
}

/// Consumes one topic/channel from nsqd over TCP
///
/// A reader task owns the read half of the connection, answers heartbeats,
/// and forwards messages into a queue. The benchmark loop drains that queue
/// one message at a time. The reader never waits on the queue, so heartbeats
/// are answered even while nothing is being consumed; nsqd sends at most
/// `RDY` unacknowledged messages, which bounds the queue.
pub struct TcpSubscriber {
    writer: Arc<Mutex<OwnedWriteHalf>>,
    messages: mpsc::UnboundedReceiver<InboundMessage>,
    reader: JoinHandle<()>,
}

impl TcpSubscriber {
    /// Connects to nsqd, subscribes, and signals readiness for `max_in_flight` messages
    pub async fn connect(
        address: &str,
        topic: &str,
        channel: &str,
        max_in_flight: u32,
    ) -> TransportResult<Self> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|source| TransportError::Connect {
                address: address.to_string(),
                source,
            })?;
        let (mut read_half, mut write_half) = stream.into_split();

        write_half.write_all(MAGIC_V2).await?;
        write_half
            .write_all(format!("SUB {} {}\n", topic, channel).as_bytes())
            .await?;

        // The subscription is confirmed before any message can arrive
        match read_frame(&mut read_half).await? {
            Frame::Response(body) if body == b"OK" => {}
            Frame::Error(body) => {
                return Err(TransportError::Protocol(format!(
                    "SUB failed: {}",
                    String::from_utf8_lossy(&body)
                )))
            }
            other => {
                return Err(TransportError::Protocol(format!(
                    "unexpected reply to SUB: {:?}",
                    other
                )))
            }
        }

        write_half
            .write_all(format!("RDY {}\n", max_in_flight).as_bytes())
            .await?;

        tracing::debug!(
            "Subscribed to {}/{} at {} (max in flight {})",
            topic,
            channel,
            address,
            max_in_flight
        );

        let writer = Arc::new(Mutex::new(write_half));
        let (tx, messages) = mpsc::unbounded_channel();
        let reader = tokio::spawn(read_loop(read_half, Arc::clone(&writer), tx));

        Ok(Self {
            writer,
            messages,
            reader,
        })
    }

    /// Connects using queue configuration
    pub async fn from_config(config: &QueueConfig) -> TransportResult<Self> {
        Self::connect(
            &config.tcp_address(),
            &config.response_topic,
            &config.channel,
            config.max_in_flight,
        )
        .await
    }

    async fn send_command(&self, command: &str) -> TransportResult<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(command.as_bytes()).await?;
        Ok(())
    }
}

impl Subscriber for TcpSubscriber {
    async fn next_message(&mut self) -> Option<InboundMessage> {
        self.messages.recv().await
    }

    async fn finish(&mut self, message: &InboundMessage) -> TransportResult<()> {
        self.send_command(&format!("FIN {}\n", message.id)).await
    }

    async fn close(&mut self) -> TransportResult<()> {
        let result = self.send_command("CLS\n").await;
        self.messages.close();
        self.reader.abort();
        result
    }
}

impl Drop for TcpSubscriber {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Reads frames until the connection ends or the consumer goes away
async fn read_loop(
    mut reader: OwnedReadHalf,
    writer: Arc<Mutex<OwnedWriteHalf>>,
    tx: mpsc::UnboundedSender<InboundMessage>,
) {
    loop {
        let frame = match read_frame(&mut reader).await {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!("nsqd connection ended: {}", e);
                return;
            }
        };

        match frame {
            Frame::Response(body) if body == HEARTBEAT => {
                let mut writer = writer.lock().await;
                if let Err(e) = writer.write_all(b"NOP\n").await {
                    tracing::warn!("Failed to answer nsqd heartbeat: {}", e);
                    return;
                }
            }
            Frame::Response(body) => {
                tracing::debug!("nsqd response: {}", String::from_utf8_lossy(&body));
            }
            Frame::Error(body) => {
                tracing::warn!("nsqd error: {}", String::from_utf8_lossy(&body));
            }
            Frame::Message(message) => {
                if tx.send(message).is_err() {
                    return;
                }
            }
        }
    }
}

/// Reads one size-prefixed frame
async fn read_frame(reader: &mut OwnedReadHalf) -> TransportResult<Frame> {
    let size = match reader.read_u32().await {
        Ok(size) => size as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(TransportError::Closed)
        }
        Err(e) => return Err(e.into()),
    };

    if !(4..=MAX_FRAME_SIZE).contains(&size) {
        return Err(TransportError::Protocol(format!(
            "invalid frame size {}",
            size
        )));
    }

    let frame_type = reader.read_u32().await?;
    let mut data = vec![0u8; size - 4];
    reader.read_exact(&mut data).await?;

    decode_frame(frame_type, data)
}

/// Decodes a frame body once its type is known
fn decode_frame(frame_type: u32, data: Vec<u8>) -> TransportResult<Frame> {
    match frame_type {
        FRAME_TYPE_RESPONSE => Ok(Frame::Response(data)),
        FRAME_TYPE_ERROR => Ok(Frame::Error(data)),
        FRAME_TYPE_MESSAGE => decode_message(&data).map(Frame::Message),
        other => Err(TransportError::Protocol(format!(
            "unknown frame type {}",
            other
        ))),
    }
}

/// Decodes a message frame body: timestamp, attempts, id, then the payload
fn decode_message(data: &[u8]) -> TransportResult<InboundMessage> {
    if data.len() < MESSAGE_HEADER_LEN {
        return Err(TransportError::Protocol(format!(
            "message frame too short: {} bytes",
            data.len()
        )));
    }

    let attempts = u16::from_be_bytes([data[8], data[9]]);
    let id = std::str::from_utf8(&data[10..MESSAGE_HEADER_LEN])
        .map_err(|_| TransportError::Protocol("message id is not ASCII".to_string()))?
        .to_string();

    Ok(InboundMessage {
        id,
        attempts,
        body: data[MESSAGE_HEADER_LEN..].to_vec(),
    })
}
