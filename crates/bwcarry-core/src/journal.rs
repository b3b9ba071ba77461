//! Run logs on disk: the verbose log (every unit's lines plus run header and
//! summary) and the change log (one line per confirmed mutation). Both are
//! append-only.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::aggregate::RunReport;
use crate::error::CarryError;

pub const VERBOSE_LOG: &str = "verbose.log";
pub const CHANGE_LOG: &str = "changes.log";

/// RFC 3339 UTC timestamp for log lines.
pub(crate) fn timestamp() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| now.unix_timestamp().to_string())
}

#[derive(Debug, Clone)]
pub struct RunJournal {
    verbose: PathBuf,
    changes: PathBuf,
}

impl RunJournal {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            verbose: dir.join(VERBOSE_LOG),
            changes: dir.join(CHANGE_LOG),
        }
    }

    pub fn verbose_path(&self) -> &Path {
        &self.verbose
    }

    pub fn change_path(&self) -> &Path {
        &self.changes
    }

    /// Appends the run's merged unit logs and change records.
    pub fn record(&self, report: &RunReport, header: &str) -> Result<(), CarryError> {
        let mut verbose = Vec::with_capacity(report.verbose_lines.len() + 2);
        verbose.push(format!("{} INFO  run start: {}", timestamp(), header));
        verbose.extend(report.verbose_lines.iter().cloned());
        verbose.push(format!("{} INFO  run summary: {}", timestamp(), report.summary));
        append_lines(&self.verbose, &verbose)?;
        if !report.change_lines.is_empty() {
            append_lines(&self.changes, &report.change_lines)?;
        }
        Ok(())
    }
}

fn append_lines(path: &Path, lines: &[String]) -> Result<(), CarryError> {
    let io_err = |source| CarryError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(io_err)?;
    let mut out = BufWriter::new(file);
    for line in lines {
        writeln!(out, "{}", line).map_err(io_err)?;
    }
    out.flush().map_err(io_err)
}
