//! Run statistics aggregation
//!
//! This module accumulates request counts and per-request durations for one
//! benchmark run, and renders the summary printed at the end of a run or on
//! interrupt.

use chrono::{DateTime, Utc};
use std::fmt::Write;
use std::time::Duration;

/// Aggregate min/max/sum/average over a set of millisecond durations
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DurationStats {
    pub sum: u64,
    pub min: u64,
    pub max: u64,
    pub avg: f64,
}

impl DurationStats {
    /// Computes statistics over `samples`
    ///
    /// An empty sample set reports zero everywhere.
    pub fn from_samples(samples: &[u64]) -> Self {
        let (Some(&min), Some(&max)) = (samples.iter().min(), samples.iter().max()) else {
            return Self::default();
        };

        // Durations come from the service under test and may be absurd
        let sum = samples.iter().fold(0u64, |acc, &ms| acc.saturating_add(ms));
        let total: f64 = samples.iter().map(|&ms| ms as f64).sum();
        Self {
            sum,
            min,
            max,
            avg: total / samples.len() as f64,
        }
    }
}

/// Point-in-time view of a run's statistics
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Requests the publisher accepted
    pub attempted: u64,

    /// Responses that could be correlated and classified
    pub responded: u64,

    /// Responses carrying both durations
    pub succeeded: u64,

    /// Responses reporting a fetch error
    pub transport_errors: u64,

    /// Responses missing the link object or its durations
    pub malformed: u64,

    /// Messages that could not be correlated or parsed
    pub unknown: u64,

    /// Fetch duration statistics (milliseconds)
    pub fetch: DurationStats,

    /// Parse duration statistics (milliseconds)
    pub parse: DurationStats,

    /// Time from the start of the run to the most recent success
    pub elapsed: Duration,
}

/// Mutable statistics for a single benchmark run
///
/// Owned by the driver and lent to the dispatcher and correlator in turn;
/// there is exactly one writer at a time.
#[derive(Debug, Clone)]
pub struct RunStatistics {
    attempted: u64,
    responded: u64,
    succeeded: u64,
    transport_errors: u64,
    malformed: u64,
    unknown: u64,
    fetch_durations: Vec<u64>,
    parse_durations: Vec<u64>,
    started_at: DateTime<Utc>,
    last_success_at: DateTime<Utc>,
}

impl Default for RunStatistics {
    fn default() -> Self {
        Self::new()
    }
}

impl RunStatistics {
    /// Creates empty statistics starting now
    pub fn new() -> Self {
        Self::starting_at(Utc::now())
    }

    /// Creates empty statistics with an explicit start time
    pub fn starting_at(started_at: DateTime<Utc>) -> Self {
        Self {
            attempted: 0,
            responded: 0,
            succeeded: 0,
            transport_errors: 0,
            malformed: 0,
            unknown: 0,
            fetch_durations: Vec::new(),
            parse_durations: Vec::new(),
            started_at,
            last_success_at: started_at,
        }
    }

    /// Counts a request the publisher accepted
    pub fn record_attempt(&mut self) {
        self.attempted += 1;
    }

    /// Counts a correlated response of any classification
    pub fn record_response(&mut self) {
        self.responded += 1;
    }

    /// Records a successful response's durations, timestamped now
    pub fn record_success(&mut self, fetch_ms: u64, parse_ms: u64) {
        self.record_success_at(fetch_ms, parse_ms, Utc::now());
    }

    /// Records a successful response's durations with an explicit timestamp
    pub fn record_success_at(&mut self, fetch_ms: u64, parse_ms: u64, at: DateTime<Utc>) {
        self.succeeded += 1;
        self.fetch_durations.push(fetch_ms);
        self.parse_durations.push(parse_ms);
        self.last_success_at = at;
    }

    /// Counts a response that reported a fetch error
    pub fn record_transport_error(&mut self) {
        self.transport_errors += 1;
    }

    /// Counts a response without usable link durations
    pub fn record_malformed(&mut self) {
        self.malformed += 1;
    }

    /// Counts a message that could not be correlated or parsed
    pub fn record_unknown(&mut self) {
        self.unknown += 1;
    }

    pub fn attempted(&self) -> u64 {
        self.attempted
    }

    pub fn responded(&self) -> u64 {
        self.responded
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded
    }

    pub fn fetch_durations(&self) -> &[u64] {
        &self.fetch_durations
    }

    pub fn parse_durations(&self) -> &[u64] {
        &self.parse_durations
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Returns true once every attempted request has succeeded
    pub fn is_complete(&self) -> bool {
        self.succeeded >= self.attempted
    }

    /// Computes a summary without disturbing the running totals
    pub fn summary(&self) -> RunSummary {
        let elapsed = (self.last_success_at - self.started_at)
            .to_std()
            .unwrap_or_default();

        RunSummary {
            attempted: self.attempted,
            responded: self.responded,
            succeeded: self.succeeded,
            transport_errors: self.transport_errors,
            malformed: self.malformed,
            unknown: self.unknown,
            fetch: DurationStats::from_samples(&self.fetch_durations),
            parse: DurationStats::from_samples(&self.parse_durations),
            elapsed,
        }
    }
}

/// Renders a summary in the benchmark's report layout
pub fn format_summary(summary: &RunSummary) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Links attempted: {}", summary.attempted);
    let _ = writeln!(out, "  Responses: {}", summary.responded);
    let _ = writeln!(out, "  Successes: {}", summary.succeeded);
    let _ = writeln!(out, "  Transport errors: {}", summary.transport_errors);
    let _ = writeln!(out, "  Malformed: {}", summary.malformed);
    let _ = writeln!(out, "  Unknown: {}", summary.unknown);

    for (label, stats) in [("fetch", &summary.fetch), ("parse", &summary.parse)] {
        let _ = writeln!(out, "Total {} time: {}", label, stats.sum);
        let _ = writeln!(out, "  min: {} max: {}", stats.min, stats.max);
        let _ = writeln!(out, "  avg: {:.2}", stats.avg);
    }

    let total_secs = summary.elapsed.as_secs_f64();
    let mins = (total_secs / 60.0).floor();
    let secs = total_secs - mins * 60.0;
    let _ = writeln!(
        out,
        "Time from start to last success: {} mins {:.6} secs",
        mins as u64, secs
    );

    out
}

/// Prints a summary to stdout
pub fn print_summary(summary: &RunSummary) {
    print!("{}", format_summary(summary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_empty_summary_reports_zero() {
        let stats = RunStatistics::new();
        let summary = stats.summary();

        assert_eq!(summary.attempted, 0);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.fetch, DurationStats::default());
        assert_eq!(summary.parse.min, 0);
        assert_eq!(summary.parse.max, 0);
        assert_eq!(summary.parse.avg, 0.0);
        assert_eq!(summary.elapsed, Duration::ZERO);
    }

    #[test]
    fn test_record_success_appends_durations() {
        let mut stats = RunStatistics::new();
        for (fetch, parse) in [(120, 30), (80, 10), (100, 20)] {
            stats.record_response();
            stats.record_success(fetch, parse);
        }

        let summary = stats.summary();
        assert_eq!(summary.succeeded, 3);
        assert_eq!(stats.fetch_durations(), &[120, 80, 100]);
        assert_eq!(stats.parse_durations().len(), 3);
        assert_eq!(summary.fetch.sum, 300);
        assert_eq!(summary.fetch.min, 80);
        assert_eq!(summary.fetch.max, 120);
        assert!((summary.fetch.avg - 100.0).abs() < f64::EPSILON);
        assert!((summary.parse.avg - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_huge_durations_saturate_sum() {
        let huge = u64::MAX / 2 + 1;
        let mut stats = RunStatistics::new();
        stats.record_success(huge, 1);
        stats.record_success(huge, 1);

        let summary = stats.summary();
        assert_eq!(summary.fetch.sum, u64::MAX);
        assert_eq!(summary.fetch.max, huge);
        assert!((summary.fetch.avg - huge as f64).abs() < 1.0e6);
        assert!(format_summary(&summary).contains("Successes"));
    }

    #[test]
    fn test_elapsed_measures_time_to_last_success() {
        let start = Utc::now() - ChronoDuration::seconds(600);
        let mut stats = RunStatistics::starting_at(start);

        stats.record_success_at(10, 1, start + ChronoDuration::seconds(30));
        stats.record_success_at(10, 1, start + ChronoDuration::seconds(95));

        assert_eq!(stats.summary().elapsed, Duration::from_secs(95));
    }

    #[test]
    fn test_completion_tracks_attempts() {
        let mut stats = RunStatistics::new();
        assert!(stats.is_complete());

        stats.record_attempt();
        stats.record_attempt();
        assert!(!stats.is_complete());

        stats.record_success(1, 1);
        assert!(!stats.is_complete());
        stats.record_success(1, 1);
        assert!(stats.is_complete());
    }

    #[test]
    fn test_failure_counters_do_not_touch_success() {
        let mut stats = RunStatistics::new();
        stats.record_attempt();
        stats.record_response();
        stats.record_transport_error();
        stats.record_response();
        stats.record_malformed();
        stats.record_unknown();

        let summary = stats.summary();
        assert_eq!(summary.responded, 2);
        assert_eq!(summary.succeeded, 0);
        assert_eq!(summary.transport_errors, 1);
        assert_eq!(summary.malformed, 1);
        assert_eq!(summary.unknown, 1);
    }

    #[test]
    fn test_format_summary() {
        let start = Utc::now() - ChronoDuration::seconds(600);
        let mut stats = RunStatistics::starting_at(start);
        stats.record_attempt();
        stats.record_attempt();
        stats.record_response();
        stats.record_success_at(120, 30, start + ChronoDuration::milliseconds(61_500));

        let text = format_summary(&stats.summary());
        assert!(text.contains("Links attempted: 2\n"));
        assert!(text.contains("  Successes: 1\n"));
        assert!(text.contains("Total fetch time: 120\n"));
        assert!(text.contains("  min: 30 max: 30\n"));
        assert!(text.contains("  avg: 120.00\n"));
        assert!(text.contains("Time from start to last success: 1 mins 1.500000 secs"));
    }
}
