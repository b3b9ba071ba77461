//! Outcome aggregator: classify every unit, merge logs, count.

use std::fmt;

use crate::journal::timestamp;
use crate::model::ServerId;
use crate::orchestrator::{UnitStatus, WorkerResult};

/// Final classification of one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Success,
    Skipped,
    Failed,
}

/// Aggregate counts. `succeeded + skipped + failed == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    /// The run failed whenever any unit failed.
    pub fn is_failure(&self) -> bool {
        self.failed > 0
    }

    fn count(&mut self, c: Classification) {
        self.total += 1;
        match c {
            Classification::Success => self.succeeded += 1,
            Classification::Skipped => self.skipped += 1,
            Classification::Failed => self.failed += 1,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "total={} succeeded={} skipped={} failed={}",
            self.total, self.succeeded, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitReport {
    pub server_id: ServerId,
    pub classification: Classification,
    /// Skip or failure reason.
    pub reason: Option<String>,
}

/// Everything the caller gets back from a run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub summary: RunSummary,
    /// Per unit, in worklist order.
    pub units: Vec<UnitReport>,
    /// Per-unit logs merged in worklist order.
    pub verbose_lines: Vec<String>,
    /// One line per confirmed mutation, in worklist order.
    pub change_lines: Vec<String>,
    pub pool_failed: bool,
    /// The pool's signal and the unit counts disagree.
    pub inconsistent: bool,
    /// Set when the verbose/change logs could not be written.
    pub journal_error: Option<String>,
}

/// Classifies one unit from its result. Anything unverifiable counts as failed.
pub fn classify(result: Option<&WorkerResult>) -> (Classification, Option<String>) {
    let Some(r) = result else {
        return (Classification::Failed, Some("no worker result".into()));
    };
    if r.log_lines.is_empty() {
        return (Classification::Failed, Some("empty unit log".into()));
    }
    match r.status {
        None => (Classification::Failed, Some("no status sentinel".into())),
        Some(UnitStatus::Failure) => (
            Classification::Failed,
            Some(r.error.clone().unwrap_or_else(|| "non-zero status".into())),
        ),
        Some(UnitStatus::Success) => match &r.skip_reason {
            Some(reason) => (Classification::Skipped, Some(reason.clone())),
            None => (Classification::Success, None),
        },
    }
}

/// Reduces worker results (in worklist order) to a [`RunReport`].
pub fn aggregate(entries: Vec<(ServerId, Option<WorkerResult>)>, pool_failed: bool) -> RunReport {
    let mut summary = RunSummary::default();
    let mut units = Vec::with_capacity(entries.len());
    let mut verbose_lines = Vec::new();
    let mut change_lines = Vec::new();

    for (server_id, result) in entries {
        let (classification, reason) = classify(result.as_ref());
        summary.count(classification);
        match classification {
            Classification::Failed => tracing::warn!(
                %server_id,
                reason = reason.as_deref().unwrap_or(""),
                "unit failed"
            ),
            Classification::Skipped => tracing::info!(%server_id, "unit skipped"),
            Classification::Success => tracing::debug!(%server_id, "unit succeeded"),
        }

        match result {
            Some(r) => {
                verbose_lines.extend(r.log_lines);
                if let Some(change) = r.change {
                    change_lines.push(change.to_string());
                }
            }
            None => verbose_lines.push(format!(
                "{} ERROR server={} no worker result; unit counted as failed",
                timestamp(),
                server_id
            )),
        }
        units.push(UnitReport {
            server_id,
            classification,
            reason,
        });
    }

    let inconsistent = pool_failed != summary.is_failure();
    if inconsistent {
        let msg = if pool_failed {
            "worker pool signalled failure but no unit is marked failed"
        } else {
            "units failed although the worker pool signalled success"
        };
        tracing::warn!(pool_failed, failed = summary.failed, "{}", msg);
        verbose_lines.push(format!("{} WARN  {}", timestamp(), msg));
    }

    RunReport {
        summary,
        units,
        verbose_lines,
        change_lines,
        pool_failed,
        inconsistent,
        journal_error: None,
    }
}
