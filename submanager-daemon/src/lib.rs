//! Manage-cycle orchestration and the repeat loop.
//!
//! [`run_manage_once`] is the unit of work: it holds the dynamic-state lock,
//! runs the sync and thread managers, and saves state only if it changed.
//! [`run`] repeats it on a tokio interval until stopped.

mod cycle;
mod error;
mod runtime;

pub use cycle::{
    reset_state, run_cycle_threads, run_manage_once, CycleSummary, ItemReport, ManagerKind, RunOptions,
};
pub use error::DaemonError;
pub use runtime::{init_tracing, run, start_blocking, LoopOptions};
pub use submanager_thread::check_templates;
