//! Response correlation and classification
//!
//! Every inbound message carries the correlation key in an `X-Bn-Event-Id`
//! header line followed, somewhere later, by the JSON body the links service
//! produced. This module pulls both out, classifies the body, and feeds the
//! run statistics and the result persister.
//!
//! Nothing in here can fail the run: a message that cannot be understood is
//! counted, logged, and dropped.

use crate::bench::key::{is_valid_key, KEY_LENGTH};
use crate::output::{ResultPersister, RunStatistics};
use serde_json::Value;
use thiserror::Error;

/// Marker preceding the correlation key in inbound messages
pub const EVENT_ID_MARKER: &[u8] = b"X-Bn-Event-Id:";

/// Longest slice of a bad message echoed into logs
const LOG_PREVIEW_LEN: usize = 200;

/// Reasons an inbound message cannot be turned into an envelope
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("correlation key marker not found")]
    MissingMarker,

    #[error("correlation key is truncated or not hex")]
    InvalidKey,

    #[error("no JSON body after the correlation key")]
    MissingBody,

    #[error("JSON body does not parse: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

/// A correlated response: its key and parsed payload
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope {
    pub key: String,
    pub payload: Value,
}

/// Extracts the correlation key and JSON payload from a raw message
pub fn extract_envelope(raw: &[u8]) -> Result<ResponseEnvelope, EnvelopeError> {
    let marker_at = find(raw, EVENT_ID_MARKER).ok_or(EnvelopeError::MissingMarker)?;

    let mut key_start = marker_at + EVENT_ID_MARKER.len();
    while raw.get(key_start) == Some(&b' ') {
        key_start += 1;
    }

    let key_bytes = raw
        .get(key_start..key_start + KEY_LENGTH)
        .ok_or(EnvelopeError::InvalidKey)?;
    let key = std::str::from_utf8(key_bytes).map_err(|_| EnvelopeError::InvalidKey)?;
    if !is_valid_key(key) {
        return Err(EnvelopeError::InvalidKey);
    }

    let after_key = key_start + KEY_LENGTH;
    let body_start = raw[after_key..]
        .iter()
        .position(|&b| b == b'{')
        .map(|offset| after_key + offset)
        .ok_or(EnvelopeError::MissingBody)?;

    let payload = serde_json::from_slice(&raw[body_start..])?;

    Ok(ResponseEnvelope {
        key: key.to_ascii_lowercase(),
        payload,
    })
}

/// How a response payload was judged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// The link was fetched and parsed; durations in milliseconds
    Success { fetch_ms: u64, parse_ms: u64 },

    /// The service reported an error fetching the link
    TransportError(String),

    /// A response without a usable link object or durations
    MalformedSuccess(&'static str),

    /// The message could not be correlated or has no response at all
    Unknown(String),
}

impl Classification {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Short label used in logs
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success { .. } => "success",
            Self::TransportError(_) => "transport error",
            Self::MalformedSuccess(_) => "malformed response",
            Self::Unknown(_) => "unknown message",
        }
    }
}

/// Classifies a parsed response payload
///
/// | Payload | Classification |
/// |---------|----------------|
/// | no top-level `response` | Unknown |
/// | `response.error`, or first entry has `error` and no `link` | TransportError |
/// | no first entry, no `link` object, or a missing duration | MalformedSuccess |
/// | `link` with `fetchDuration` and `parseDuration` | Success |
pub fn classify(payload: &Value) -> Classification {
    let Some(response) = payload.get("response") else {
        return Classification::Unknown("payload has no response field".to_string());
    };

    let first = match response {
        Value::Object(fields) => {
            return match fields.get("error") {
                Some(error) => Classification::TransportError(error_text(error)),
                None => Classification::MalformedSuccess("response is an object without error"),
            };
        }
        Value::Array(entries) => match entries.first() {
            Some(first) => first,
            None => return Classification::MalformedSuccess("response array is empty"),
        },
        _ => return Classification::MalformedSuccess("response is neither object nor array"),
    };

    let link = match (first.get("link"), first.get("error")) {
        (Some(link @ Value::Object(_)), _) => link,
        (None, Some(error)) => return Classification::TransportError(error_text(error)),
        _ => return Classification::MalformedSuccess("first response has no link object"),
    };

    let (Some(fetch), Some(parse)) = (link.get("fetchDuration"), link.get("parseDuration")) else {
        return Classification::MalformedSuccess("link is missing fetchDuration or parseDuration");
    };

    match (duration_ms(fetch), duration_ms(parse)) {
        (Some(fetch_ms), Some(parse_ms)) => Classification::Success { fetch_ms, parse_ms },
        _ => Classification::MalformedSuccess("link durations are not non-negative numbers"),
    }
}

/// Reads a duration given as an integer, a float, or a numeric string
fn duration_ms(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(truncate_ms)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate_ms))
        }
        _ => None,
    }
}

/// Truncates a float duration, rejecting values a `u64` cannot hold
fn truncate_ms(ms: f64) -> Option<u64> {
    (ms.is_finite() && (0.0..u64::MAX as f64).contains(&ms)).then(|| ms as u64)
}

fn error_text(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Finds the first occurrence of `needle` in `haystack`
fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn preview(raw: &[u8]) -> String {
    let end = raw.len().min(LOG_PREVIEW_LEN);
    String::from_utf8_lossy(&raw[..end]).into_owned()
}

/// Result of handling one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Correlation key, when one could be extracted
    pub key: Option<String>,

    pub classification: Classification,
}

/// Matches responses to requests and records what they say
///
/// Duplicate deliveries are not filtered: the same response arriving twice
/// is counted twice.
pub struct Correlator {
    persister: ResultPersister,
}

impl Correlator {
    pub fn new(persister: ResultPersister) -> Self {
        Self { persister }
    }

    pub fn persister(&self) -> &ResultPersister {
        &self.persister
    }

    /// Handles one raw message, updating `stats`
    pub fn on_message(&mut self, raw: &[u8], stats: &mut RunStatistics) -> Outcome {
        let envelope = match extract_envelope(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                stats.record_unknown();
                tracing::warn!(marker = "unknown message", "Unknown result ({}): {}", e, preview(raw));
                return Outcome {
                    key: None,
                    classification: Classification::Unknown(e.to_string()),
                };
            }
        };

        let classification = classify(&envelope.payload);
        let key = envelope.key.as_str();

        match &classification {
            Classification::Success { fetch_ms, parse_ms } => {
                stats.record_response();
                stats.record_success(*fetch_ms, *parse_ms);
                tracing::debug!(key = key, fetch_ms, parse_ms, "Link succeeded");
                self.persister
                    .persist(key, &envelope.payload["response"][0]["link"]);
            }
            Classification::TransportError(error) => {
                stats.record_response();
                stats.record_transport_error();
                tracing::warn!(key = key, marker = classification.label(), "Fetch failed: {}", error);
            }
            Classification::MalformedSuccess(reason) => {
                stats.record_response();
                stats.record_malformed();
                tracing::warn!(key = key, marker = classification.label(), "{}: {}", reason, envelope.payload);
            }
            Classification::Unknown(reason) => {
                stats.record_unknown();
                tracing::warn!(key = key, marker = classification.label(), "{}: {}", reason, envelope.payload);
            }
        }

        Outcome {
            key: Some(envelope.key),
            classification,
        }
    }

    /// Flushes and closes any persisted output
    pub fn finish(&mut self) {
        self.persister.finish();
    }
}
