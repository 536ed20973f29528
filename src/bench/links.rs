//! Links file loading
//!
//! A links file holds one URL per line. Lines may be wrapped in double
//! quotes (as exported from JSON), blank, or the literal `null`; the latter
//! two are skipped. Duplicate URLs are collapsed so each URL is requested
//! exactly once.

use crate::BenchError;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Deduplicated URLs to benchmark, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSet {
    urls: Vec<String>,
    seen: HashSet<String>,
}

impl LinkSet {
    /// Loads a links file from disk
    pub fn load(path: &Path) -> Result<Self, BenchError> {
        let file = File::open(path).map_err(|e| BenchError::file(path, e))?;
        Self::from_reader(BufReader::new(file)).map_err(|e| BenchError::file(path, e))
    }

    /// Reads links from any line-oriented source
    pub fn from_reader<R: BufRead>(reader: R) -> std::io::Result<Self> {
        let mut set = Self::default();
        for line in reader.lines() {
            set.insert(&line?);
        }
        Ok(set)
    }

    /// Adds one raw line, returning true if it yielded a new URL
    pub fn insert(&mut self, raw: &str) -> bool {
        let Some(url) = clean_line(raw) else {
            return false;
        };

        if !self.seen.insert(url.to_string()) {
            return false;
        }
        self.urls.push(url.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.urls.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for LinkSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = Self::default();
        for raw in iter {
            set.insert(raw);
        }
        set
    }
}

/// Strips whitespace and surrounding quotes; `None` for lines to skip
fn clean_line(raw: &str) -> Option<&str> {
    let url = raw.trim().trim_matches('"');
    if url.is_empty() || url == "null" {
        None
    } else {
        Some(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_duplicates_collapse() {
        let links: LinkSet = ["http://a.test", "http://a.test", "http://b.test"]
            .into_iter()
            .collect();
        assert_eq!(links.len(), 2);
        assert_eq!(
            links.iter().collect::<Vec<_>>(),
            vec!["http://a.test", "http://b.test"]
        );
    }

    #[test]
    fn test_quotes_blank_and_null_skipped() {
        let input = "\"http://a.test\"\n\n  null  \n\"null\"\n  http://b.test  \n\"http://a.test\"\n";
        let links = LinkSet::from_reader(Cursor::new(input)).unwrap();
        assert_eq!(
            links.iter().collect::<Vec<_>>(),
            vec!["http://a.test", "http://b.test"]
        );
    }

    #[test]
    fn test_insert_reports_new_urls() {
        let mut links = LinkSet::default();
        assert!(links.insert("http://a.test"));
        assert!(!links.insert("\"http://a.test\""));
        assert!(!links.insert("   "));
        assert_eq!(links.len(), 1);
    }

    #[test]
    fn test_load_missing_file() {
        let result = LinkSet::load(Path::new("/nonexistent/links.txt"));
        assert!(matches!(result, Err(BenchError::File { .. })));
    }

    #[test]
    fn test_load_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("links.txt");
        std::fs::write(&path, "http://a.test\nhttp://b.test\nhttp://a.test\n").unwrap();

        let links = LinkSet::load(&path).unwrap();
        assert_eq!(links.len(), 2);
        assert!(!links.is_empty());
    }
}
