//! Bandwidth quota carry-over for servers managed by a hosting control panel.
//!
//! Pipeline: config → [`panel::PanelApi`] → [`inventory::fetch_all`] →
//! [`orchestrator::run`] (worker pool: [`calculator`] → reset → update) →
//! [`aggregate::aggregate`] → [`journal::RunJournal`].

pub mod aggregate;
pub mod api;
pub mod calculator;
pub mod config;
pub mod error;
pub mod inventory;
pub mod journal;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod panel;
pub mod report;

pub use aggregate::{Classification, RunReport, RunSummary};
pub use error::{CarryError, UnitError};
pub use model::{RunMode, ServerId, ServerRecord, Target, WorkItem};
pub use orchestrator::{run_batch, RunRequest};
