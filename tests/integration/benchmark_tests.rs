//! Integration tests for the benchmark
//!
//! These tests drive full runs over the in-process channel transport and a
//! wiremock stand-in for nsqd's publish endpoint, then compare the stored
//! results of labelled runs.

use links_benchmark::bench::{BenchDriver, Classification, Correlator, Dispatcher, LinkSet, StopReason};
use links_benchmark::compare::compare;
use links_benchmark::config::Config;
use links_benchmark::output::{index_path, result_path, ResultPersister, RunStatistics};
use links_benchmark::transport::{channel, HttpPublisher, MemoryPublisher};
use links_benchmark::generate_key;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a response message as the links service would publish it
fn response_message(url: &str, body: &Value) -> String {
    format!(
        "HTTP/1.1 200 OK\nContent-Type: application/json\nX-Bn-Event-Id: {}\n\n{}",
        generate_key(url),
        body
    )
}

fn success_body(title: &str, fetch: u64, parse: u64) -> Value {
    json!({
        "response": [{
            "link": {
                "rootUrl": "http://a.test",
                "title": title,
                "fetchDuration": fetch,
                "parseDuration": parse
            }
        }]
    })
}

/// Writes a links file into `dir` and loads it
fn load_links(dir: &Path, lines: &[&str]) -> LinkSet {
    let file = dir.join("testlinks.txt");
    fs::write(&file, lines.join("\n")).unwrap();
    LinkSet::load(&file).unwrap()
}

/// Runs one labelled benchmark whose responses are queued up front
async fn labelled_run(dir: &Path, label: &str, links: &LinkSet, responses: &[String]) {
    let (publisher, _requests) = channel();
    let (responder, subscriber): (MemoryPublisher, _) = channel();
    for response in responses {
        responder.deliver(response.as_str()).unwrap();
    }

    let persister = ResultPersister::new(dir, Some(label)).unwrap();
    let outcome = BenchDriver::new(publisher, subscriber, persister, &Config::default())
        .run(links, std::future::pending())
        .await
        .unwrap();

    assert_eq!(outcome.reason, StopReason::Completed);
}

#[tokio::test]
async fn test_duplicate_links_dispatched_once() {
    let dir = TempDir::new().unwrap();
    let links = load_links(dir.path(), &["http://a.test", "http://a.test", "http://b.test"]);

    let (publisher, _subscriber) = channel();
    let config = Config::default();
    let mut stats = RunStatistics::new();

    let report = Dispatcher::new(&publisher, &config.service, "links")
        .unwrap()
        .dispatch(&links, &mut stats)
        .await;

    assert_eq!(stats.attempted(), 2);
    assert_eq!(
        report.accepted,
        vec![generate_key("http://a.test"), generate_key("http://b.test")]
    );
}

#[test]
fn test_success_response_records_durations() {
    let mut correlator = Correlator::new(ResultPersister::disabled());
    let mut stats = RunStatistics::new();

    let message = response_message(
        "http://a.test",
        &json!({"response": [{"link": {"fetchDuration": 120, "parseDuration": 30}}]}),
    );
    let outcome = correlator.on_message(message.as_bytes(), &mut stats);

    assert_eq!(
        outcome.classification,
        Classification::Success {
            fetch_ms: 120,
            parse_ms: 30
        }
    );
    assert_eq!(stats.fetch_durations(), &[120]);
    assert_eq!(stats.parse_durations(), &[30]);
}

#[test]
fn test_error_response_counts_as_response_only() {
    let mut correlator = Correlator::new(ResultPersister::disabled());
    let mut stats = RunStatistics::new();
    stats.record_attempt();

    let message = response_message("http://a.test", &json!({"response": {"error": "timeout"}}));
    let outcome = correlator.on_message(message.as_bytes(), &mut stats);

    assert!(matches!(outcome.classification, Classification::TransportError(_)));
    assert_eq!(stats.responded(), 1);
    assert_eq!(stats.succeeded(), 0);
}

#[test]
fn test_duplicate_delivery_counted_twice() {
    // Deliveries are at-least-once and nothing deduplicates them
    let mut correlator = Correlator::new(ResultPersister::disabled());
    let mut stats = RunStatistics::new();

    let message = response_message("http://a.test", &success_body("A", 10, 1));
    correlator.on_message(message.as_bytes(), &mut stats);
    correlator.on_message(message.as_bytes(), &mut stats);

    assert_eq!(stats.responded(), 2);
    assert_eq!(stats.succeeded(), 2);
}

#[tokio::test]
async fn test_labelled_runs_compare() {
    let dir = TempDir::new().unwrap();

    let links_a: LinkSet = ["http://k1.test", "http://k2.test"].into_iter().collect();
    labelled_run(
        dir.path(),
        "go",
        &links_a,
        &[
            response_message("http://k2.test", &success_body("v1", 50, 5)),
            response_message("http://k1.test", &success_body("one", 40, 4)),
        ],
    )
    .await;

    let links_b: LinkSet = ["http://k2.test", "http://k3.test"].into_iter().collect();
    labelled_run(
        dir.path(),
        "node",
        &links_b,
        &[
            response_message("http://k3.test", &success_body("three", 30, 3)),
            response_message("http://k2.test", &success_body("v2", 20, 2)),
        ],
    )
    .await;

    let k1 = generate_key("http://k1.test");
    let k2 = generate_key("http://k2.test");
    let k3 = generate_key("http://k3.test");

    assert!(index_path(dir.path(), "go").exists());
    assert!(result_path(dir.path(), &k2, "node").exists());

    let report = compare(dir.path(), "go", "node").unwrap();

    assert_eq!(report.missing.iter().collect::<Vec<_>>(), vec![&k1]);
    assert_eq!(report.unchecked.iter().collect::<Vec<_>>(), vec![&k3]);
    assert!(report.matched.is_empty());
    let mut expected = serde_json::Map::new();
    expected.insert(k2.clone(), json!({"title": ["v1", "v2"]}));
    assert_eq!(
        serde_json::to_value(&report.mismatches).unwrap(),
        Value::Object(expected)
    );

    let reverse = compare(dir.path(), "node", "go").unwrap();
    assert_eq!(report.missing, reverse.unchecked);
}

#[tokio::test]
async fn test_run_publishes_over_http() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pub"))
        .and(query_param("topic", "links"))
        .respond_with(ResponseTemplate::new(200).set_body_string("OK"))
        .expect(2)
        .mount(&mock_server)
        .await;

    let publisher = HttpPublisher::new(mock_server.uri()).unwrap();
    let (responder, subscriber) = channel();
    responder
        .deliver(response_message("http://a.test", &success_body("A", 100, 10)))
        .unwrap();
    responder
        .deliver(response_message("http://b.test", &success_body("B", 300, 30)))
        .unwrap();

    let links: LinkSet = ["http://a.test", "http://b.test"].into_iter().collect();
    let outcome = BenchDriver::new(
        publisher,
        subscriber,
        ResultPersister::disabled(),
        &Config::default(),
    )
    .run(&links, std::future::pending())
    .await
    .unwrap();

    assert_eq!(outcome.reason, StopReason::Completed);
    assert_eq!(outcome.summary.succeeded, 2);
    assert_eq!(outcome.summary.fetch.min, 100);
    assert_eq!(outcome.summary.fetch.max, 300);
    assert_eq!(outcome.summary.parse.sum, 40);

    let requests = mock_server.received_requests().await.unwrap();
    let body = String::from_utf8(requests[0].body.clone()).unwrap();
    assert!(body.starts_with("POST / HTTP/1.1\nHost: http://links:3000/\n"));
    assert!(body.contains(&format!("X-Bn-Event-Id: {}", generate_key("http://a.test"))));
}

#[tokio::test]
async fn test_rejected_publishes_end_run_immediately() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/pub"))
        .respond_with(ResponseTemplate::new(500).set_body_string("E_BAD_TOPIC"))
        .mount(&mock_server)
        .await;

    let publisher = HttpPublisher::new(mock_server.uri()).unwrap();
    let (_responder, subscriber) = channel();
    let links: LinkSet = ["http://a.test"].into_iter().collect();

    let outcome = BenchDriver::new(
        publisher,
        subscriber,
        ResultPersister::disabled(),
        &Config::default(),
    )
    .run(&links, std::future::pending())
    .await
    .unwrap();

    assert_eq!(outcome.reason, StopReason::NothingDispatched);
    assert_eq!(outcome.summary.attempted, 0);
}
