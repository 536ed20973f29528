//! Result comparison between two labelled runs
//!
//! Given the key indices and per-key results persisted by two runs, this
//! module reports which keys only one side answered and which shared keys
//! disagree on the checked fields. Every collection is sorted, so the
//! report does not depend on the order keys were written in.

use crate::output::{index_path, result_path};
use crate::BenchError;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Link fields compared between the two runs
pub const FIELDS_CHECK: [&str; 4] = ["rootUrl", "providerName", "title", "description"];

/// Per-key field differences: key -> field -> [value in A, value in B]
pub type MismatchMap = BTreeMap<String, BTreeMap<String, [Value; 2]>>;

/// Comparison of two labelled runs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompareReport {
    pub label_a: String,
    pub label_b: String,

    /// Number of entries in A's index
    pub keys_a: usize,

    /// Number of entries in B's index
    pub keys_b: usize,

    /// Keys in both indices whose checked fields agree
    pub matched: BTreeSet<String>,

    /// Keys in A's index but not B's
    pub missing: BTreeSet<String>,

    /// Keys in B's index but not A's
    pub unchecked: BTreeSet<String>,

    /// Field differences for keys in both indices
    pub mismatches: MismatchMap,
}

/// Loads a key index, one key per line
pub fn load_index(dir: &Path, label: &str) -> Result<Vec<String>, BenchError> {
    let path = index_path(dir, label);
    let content = fs::read_to_string(&path).map_err(|e| BenchError::file(&path, e))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(str::to_string)
        .collect())
}

/// Loads the stored link object for a key
///
/// A missing or unreadable file is treated as an empty object so that the
/// key surfaces as a mismatch on every field.
fn load_result(dir: &Path, key: &str, label: &str) -> Map<String, Value> {
    let path = result_path(dir, key, label);

    let parsed = fs::read_to_string(&path)
        .map_err(BenchError::from)
        .and_then(|content| {
            let line = content.lines().next().unwrap_or_default();
            Ok(serde_json::from_str::<Value>(line)?)
        });

    match parsed {
        Ok(Value::Object(fields)) => fields,
        Ok(other) => {
            tracing::warn!(key = key, "Result in {} is not an object: {}", path.display(), other);
            Map::new()
        }
        Err(e) => {
            tracing::warn!(key = key, "Cannot load {}: {}", path.display(), e);
            Map::new()
        }
    }
}

/// Compares the checked fields of two link objects
fn diff_fields(a: &Map<String, Value>, b: &Map<String, Value>) -> BTreeMap<String, [Value; 2]> {
    FIELDS_CHECK
        .iter()
        .filter_map(|&field| {
            let value_a = a.get(field).cloned().unwrap_or(Value::Null);
            let value_b = b.get(field).cloned().unwrap_or(Value::Null);
            (value_a != value_b).then(|| (field.to_string(), [value_a, value_b]))
        })
        .collect()
}

/// Compares two labelled runs stored under `dir`
pub fn compare(dir: &Path, label_a: &str, label_b: &str) -> Result<CompareReport, BenchError> {
    let index_a = load_index(dir, label_a)?;
    let index_b = load_index(dir, label_b)?;

    let set_a: BTreeSet<&str> = index_a.iter().map(String::as_str).collect();
    let set_b: BTreeSet<&str> = index_b.iter().map(String::as_str).collect();

    let mut report = CompareReport {
        label_a: label_a.to_string(),
        label_b: label_b.to_string(),
        keys_a: index_a.len(),
        keys_b: index_b.len(),
        ..CompareReport::default()
    };

    report.missing = set_a.difference(&set_b).map(|k| k.to_string()).collect();
    report.unchecked = set_b.difference(&set_a).map(|k| k.to_string()).collect();

    for key in set_a.intersection(&set_b) {
        let result_a = load_result(dir, key, label_a);
        let result_b = load_result(dir, key, label_b);

        let differences = diff_fields(&result_a, &result_b);
        if differences.is_empty() {
            report.matched.insert(key.to_string());
        } else {
            report.mismatches.insert(key.to_string(), differences);
        }
    }

    tracing::debug!(
        "Compared {} shared keys: {} matched, {} mismatched",
        report.matched.len() + report.mismatches.len(),
        report.matched.len(),
        report.mismatches.len()
    );

    Ok(report)
}

/// Writes the mismatch map as JSON
pub fn write_mismatches(report: &CompareReport, path: &Path) -> Result<(), BenchError> {
    let json = serde_json::to_string(&report.mismatches)?;
    fs::write(path, json).map_err(|e| BenchError::file(path, e))
}

/// Prints the comparison summary to stdout
pub fn print_report(report: &CompareReport, mismatch_path: &Path) {
    let join = |keys: &BTreeSet<String>| keys.iter().cloned().collect::<Vec<_>>().join(", ");

    println!("{} keys: {}", report.label_a, report.keys_a);
    println!("{} keys: {}", report.label_b, report.keys_b);
    println!("Matched: {}", report.matched.len());
    println!("Mismatched: {}", report.mismatches.len());
    println!(
        "Missing (in {}, not {}): [{}]",
        report.label_a,
        report.label_b,
        join(&report.missing)
    );
    println!(
        "Unchecked (in {}, not {}): [{}]",
        report.label_b,
        report.label_a,
        join(&report.unchecked)
    );
    println!("Mismatches saved in {}", mismatch_path.display());
}
