//! Error taxonomy.
//!
//! [`CarryError`] is fatal: it aborts the run before any unit is dispatched.
//! [`UnitError`] is recorded against one server and never stops the others.

use std::path::PathBuf;
use thiserror::Error;

use crate::api::TransportError;
use crate::calculator::ValidationError;
use crate::config::ConfigError;
use crate::inventory::FetchError;
use crate::model::ServerId;
use crate::report::ReportParseError;

/// Fatal, run-level failure.
#[derive(Debug, Error)]
pub enum CarryError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    ReportParse(#[from] ReportParseError),
    /// A single-server run named an id that is not in the inventory snapshot.
    #[error("server {0} not found in inventory")]
    TargetNotFound(ServerId),
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of one unit of work.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The panel answered but its success flag was not set (or the body was not JSON).
    #[error("panel rejected {step}: {detail}")]
    Rejected { step: &'static str, detail: String },
}
