//! CLI command handlers, one per file.

mod check_report;
mod list;
mod run;

pub use check_report::run_check_report;
pub use list::run_list;
pub use run::run_carry_over;
