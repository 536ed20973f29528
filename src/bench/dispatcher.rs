//! Request shaping and dispatch
//!
//! This module handles:
//! - Building the links service request for each URL
//! - Rendering it as the raw HTTP text the queue consumer replays
//! - Publishing every request and counting accepted ones

use crate::bench::key::generate_key;
use crate::bench::links::LinkSet;
use crate::config::ServiceConfig;
use crate::output::RunStatistics;
use crate::transport::Publisher;
use crate::BenchError;
use serde_json::json;
use std::future::Future;
use std::pin::Pin;
use url::Url;

/// Header carrying the correlation key, in both directions
pub const EVENT_ID_HEADER: &str = "X-Bn-Event-Id";

/// Header carrying the client timeout hint
pub const TIMEOUT_HEADER: &str = "X-Bn-Timeout";

/// A fully shaped request for one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    /// The URL being benchmarked
    pub url: String,

    /// Correlation key derived from `url`
    pub key: String,

    /// Links service address the request is aimed at
    pub target: Url,

    /// Headers in the order they are rendered
    pub headers: Vec<(&'static str, String)>,

    /// JSON request body
    pub body: String,
}

impl OutboundRequest {
    /// Renders the request as HTTP/1.1 text
    ///
    /// The layout is: request line, `Host` line carrying the full service
    /// address, one line per header, a blank line, then the body. Lines are
    /// separated by a bare `\n`; the consumer on the other side of the queue
    /// expects exactly this.
    pub fn to_wire(&self) -> String {
        let headers = self
            .headers
            .iter()
            .map(|(name, value)| format!("{}: {}", name, value))
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "POST {} HTTP/1.1\nHost: {}\n{}\n\n{}",
            self.target.path(),
            self.target,
            headers,
            self.body
        )
    }
}

/// Builds the request for a single URL
pub fn build_request(
    target: &Url,
    service: &ServiceConfig,
    url: &str,
) -> Result<OutboundRequest, BenchError> {
    let key = generate_key(url);
    let body = serde_json::to_string(&json!({ "request": [{ "url": url }] }))?;

    let headers = vec![
        ("Content-Type", "application/json".to_string()),
        (EVENT_ID_HEADER, key.clone()),
        (TIMEOUT_HEADER, service.timeout_hint.clone()),
        ("User-Agent", service.user_agent.clone()),
        ("Accept-Encoding", "gzip".to_string()),
        ("Content-Length", body.len().to_string()),
    ];

    Ok(OutboundRequest {
        url: url.to_string(),
        key,
        target: target.clone(),
        headers,
        body,
    })
}

/// Outcome of dispatching a link set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Keys of requests the publisher accepted, in dispatch order
    pub accepted: Vec<String>,

    /// URLs that were not accepted and will never be answered
    pub rejected: Vec<String>,

    /// True when shutdown stopped dispatch before every URL was tried
    pub interrupted: bool,
}

/// Publishes one request per URL onto the request topic
pub struct Dispatcher<'a, P: Publisher> {
    publisher: &'a P,
    service: &'a ServiceConfig,
    target: Url,
    topic: &'a str,
}

impl<'a, P: Publisher> Dispatcher<'a, P> {
    /// Creates a dispatcher aimed at the configured service address
    pub fn new(publisher: &'a P, service: &'a ServiceConfig, topic: &'a str) -> Result<Self, BenchError> {
        let target = Url::parse(&service.address)?;
        Ok(Self {
            publisher,
            service,
            target,
            topic,
        })
    }

    /// Publishes every URL in order, one at a time
    ///
    /// Each accepted publish counts as an attempt. A rejected URL is logged
    /// and dropped; it is not retried.
    pub async fn dispatch(&self, links: &LinkSet, stats: &mut RunStatistics) -> DispatchReport {
        let shutdown = std::future::pending::<()>();
        tokio::pin!(shutdown);
        self.dispatch_until(links, stats, shutdown).await
    }

    /// Publishes URLs like [`Dispatcher::dispatch`] until `shutdown` resolves
    ///
    /// `shutdown` is polled before every publish, and a publish in progress
    /// is abandoned when it fires. URLs not yet published appear in neither
    /// list of the report, and `interrupted` is set.
    pub async fn dispatch_until<F>(
        &self,
        links: &LinkSet,
        stats: &mut RunStatistics,
        mut shutdown: Pin<&mut F>,
    ) -> DispatchReport
    where
        F: Future<Output = ()>,
    {
        let mut report = DispatchReport::default();

        for url in links.iter() {
            let sent = tokio::select! {
                biased;
                _ = shutdown.as_mut() => {
                    report.interrupted = true;
                    break;
                }
                sent = self.send(url) => sent,
            };

            match sent {
                Ok(key) => {
                    stats.record_attempt();
                    report.accepted.push(key);
                }
                Err(e) => {
                    tracing::warn!(url = url, "Request not accepted by queue: {}", e);
                    report.rejected.push(url.to_string());
                }
            }
        }

        if report.interrupted {
            tracing::warn!(
                "Dispatch interrupted after {} of {} links",
                report.accepted.len() + report.rejected.len(),
                links.len()
            );
        }
        tracing::info!(
            "Dispatched {} requests ({} rejected) to topic {}",
            report.accepted.len(),
            report.rejected.len(),
            self.topic
        );

        report
    }

    async fn send(&self, url: &str) -> Result<String, BenchError> {
        let request = build_request(&self.target, self.service, url)?;
        tracing::trace!(key = %request.key, "Publishing request for {}", url);
        self.publisher
            .publish(self.topic, request.to_wire().as_bytes())
            .await?;
        Ok(request.key)
    }
}
