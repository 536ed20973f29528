//! Provider-name lookup table conversion
//!
//! Converts a flat `<urlOrDomain>, <providerName>` listing into an indented
//! JSON object keyed by domain.

use crate::BenchError;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Separator between the domain and the provider name
const SEPARATOR: &str = ", ";

/// Parses provider lines into a domain -> name map
///
/// Blank lines are ignored. Lines without the separator are logged and
/// skipped. A domain listed twice keeps its last name.
pub fn parse_providers<R: BufRead>(reader: R) -> Result<BTreeMap<String, String>, BenchError> {
    let mut providers = BTreeMap::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        match line.split_once(SEPARATOR) {
            Some((domain, name)) => {
                if let Some(previous) =
                    providers.insert(domain.trim().to_string(), name.trim().to_string())
                {
                    tracing::debug!("Line {}: replacing provider {} for {}", number + 1, previous, domain.trim());
                }
            }
            None => {
                tracing::warn!("Line {}: no \"{}\" separator, skipping: {}", number + 1, SEPARATOR, line);
            }
        }
    }

    Ok(providers)
}

/// Renders the provider map as JSON indented by four spaces
pub fn to_json(providers: &BTreeMap<String, String>) -> Result<String, BenchError> {
    let mut buffer = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    providers.serialize(&mut serializer)?;

    String::from_utf8(buffer).map_err(|e| BenchError::InvalidInput(e.to_string()))
}

/// Reads `input` and writes the JSON lookup table to `output`
///
/// # Returns
///
/// The number of providers written
pub fn convert(input: &Path, output: &Path) -> Result<usize, BenchError> {
    let file = File::open(input).map_err(|e| BenchError::file(input, e))?;
    let providers = parse_providers(BufReader::new(file))?;

    let json = to_json(&providers)?;
    fs::write(output, json).map_err(|e| BenchError::file(output, e))?;

    tracing::info!("Wrote {} providers to {}", providers.len(), output.display());
    Ok(providers.len())
}
