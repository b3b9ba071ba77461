//! Report map builder: external allowance report → IP lookup.

mod parse;

pub use parse::{parse_line, LineSkip, Remaining, ReportLine};

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The report cannot drive a report-mode run.
#[derive(Debug, Error)]
pub enum ReportParseError {
    #[error("read report {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("report has no valid entries ({lines} line(s) examined)")]
    NoEntries { lines: usize },
}

/// Result of parsing every line, kept for `check-report` output.
#[derive(Debug, Default)]
pub struct ParsedReport {
    /// Accepted lines with their 1-based line numbers, in file order.
    pub accepted: Vec<(usize, ReportLine)>,
    pub skipped: Vec<(usize, LineSkip)>,
}

pub fn parse_report(text: &str) -> ParsedReport {
    let mut parsed = ParsedReport::default();
    for (idx, line) in text.lines().enumerate() {
        match parse_line(line) {
            Ok(entry) => parsed.accepted.push((idx + 1, entry)),
            Err(LineSkip::Blank) => {}
            Err(reason) => {
                tracing::debug!(line = idx + 1, "report line skipped: {}", reason);
                parsed.skipped.push((idx + 1, reason));
            }
        }
    }
    parsed
}

/// IP → remaining allowance. Built once per run, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ReportMap {
    entries: HashMap<Ipv4Addr, Remaining>,
}

impl ReportMap {
    /// Builds the map from report text. Later lines overwrite earlier ones for the same IP.
    pub fn build(text: &str) -> Result<Self, ReportParseError> {
        let parsed = parse_report(text);
        let mut entries = HashMap::new();
        for (line_no, line) in parsed.accepted {
            for ip in line.ips {
                if let Some(prev) = entries.insert(ip, line.remaining.clone()) {
                    tracing::debug!(
                        %ip,
                        line = line_no,
                        previous = %prev,
                        "report entry overwritten"
                    );
                }
            }
        }
        if entries.is_empty() {
            return Err(ReportParseError::NoEntries {
                lines: text.lines().count(),
            });
        }
        tracing::info!(
            entries = entries.len(),
            skipped_lines = parsed.skipped.len(),
            "report map built"
        );
        Ok(Self { entries })
    }

    pub fn load(path: &Path) -> Result<Self, ReportParseError> {
        let text = std::fs::read_to_string(path).map_err(|source| ReportParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::build(&text)
    }

    pub fn get(&self, ip: &Ipv4Addr) -> Option<&Remaining> {
        self.entries.get(ip)
    }

    /// First IP in `ips` (list order) that has an entry.
    pub fn first_match(&self, ips: &[Ipv4Addr]) -> Option<(Ipv4Addr, &Remaining)> {
        ips.iter()
            .find_map(|ip| self.entries.get(ip).map(|r| (*ip, r)))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
