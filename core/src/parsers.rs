//! # Tool Output Parsers
//!
//! One parser per capability, each turning raw tool output into a concrete
//! record type. A malformed line is skipped on its own and recorded in
//! [`Parsed::skipped`]; it never aborts the rest of the parse.

use tracing::debug;

pub mod arp;
pub mod grepable;
pub mod nmap_xml;
pub mod reachability;
pub mod reverse;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub line: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed<T> {
    pub records: Vec<T>,
    pub skipped: Vec<Skipped>,
}

impl<T> Default for Parsed<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

/// Applies `parse_line` to every non-blank line of `raw`.
///
/// `Ok(None)` marks a line that is valid but carries no record (banners,
/// comments, summaries).
pub(crate) fn parse_lines<T, F>(source: &str, raw: &str, mut parse_line: F) -> Parsed<T>
where
    F: FnMut(&str) -> anyhow::Result<Option<T>>,
{
    let mut parsed = Parsed::default();

    for line in raw.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        match parse_line(line) {
            Ok(Some(record)) => parsed.records.push(record),
            Ok(None) => {}
            Err(e) => {
                debug!("Skipping {source} line {line:?}: {e}");
                parsed.skipped.push(Skipped {
                    line: line.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    parsed
}
