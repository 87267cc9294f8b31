//! This library drives external simulation hosts through their automation
//! interface.
//!
//! Programming interface is centered around the [`Simulator`] structure,
//! which wraps a single automation session and exposes model loading,
//! variable access, table access and single runs. Batches of experiments are
//! executed with the [`ParallelRunner`], which spreads them over a bounded
//! pool of isolated sessions and hands results back in input order, or with
//! the [`SequentialRunner`] when only a single license seat is available.
//!
//! # Host boundary
//!
//! By itself, this library does not talk to any particular vendor
//! application. Hosts are reached through the [`AutomationSession`] and
//! [`SessionFactory`] traits. An in-memory host implementing these traits
//! lives in [`host::memory`], used for testing orchestration logic and for
//! dry runs of batch files.
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use simdrive_core::host::memory::MemoryHost;
//! use simdrive_core::{ExperimentSpec, SimConfig, Simulator};
//!
//! let config = SimConfig::from_path(Path::new("sim.toml")).unwrap();
//! let sim = Simulator::new(MemoryHost::new(4), config).unwrap();
//! let batch = vec![
//!     ExperimentSpec::single("inspection", false, "simulation"),
//!     ExperimentSpec::single("inspection", true, "simulation"),
//! ];
//! let results = sim.run_simulations_in_parallel(&batch, 2).unwrap();
//! ```
//!
//! [`Simulator`]: simulator/struct.Simulator.html
//! [`ParallelRunner`]: runner/struct.ParallelRunner.html
//! [`SequentialRunner`]: runner/struct.SequentialRunner.html
//! [`AutomationSession`]: host/trait.AutomationSession.html
//! [`SessionFactory`]: host/trait.SessionFactory.html
//! [`host::memory`]: host/memory/index.html

#[macro_use]
extern crate serde;
#[macro_use]
extern crate log;

// reexports
pub use batch::Batch;
pub use config::SimConfig;
pub use error::{Error, ErrorKind, Result};
pub use experiment::{ExperimentResult, ExperimentSpec, Status};
pub use handle::{HandleState, SimulationHandle};
pub use host::{AutomationSession, LicenseType, SessionFactory};
pub use report::BatchReport;
pub use runner::{CancelToken, ParallelRunner, SequentialRunner};
pub use simulator::Simulator;
pub use table::Table;
pub use value::{Value, ValueType};

pub mod batch;
pub mod config;
pub mod error;
pub mod experiment;
pub mod handle;
pub mod host;
pub mod report;
pub mod runner;
pub mod simulator;
pub mod table;
pub mod util;
pub mod value;

pub const VERSION: &'static str = env!("CARGO_PKG_VERSION");

/// Separator used between segments of object paths within the host.
pub const PATH_SEPARATOR: &str = ".";

/// Default period for polling the host for run completion, in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Name of a variable within the host's object tree. Either relative to the
/// current path context or absolute when starting with the path separator.
pub type VarName = String;

/// Joins a path context and a name, leaving absolute names untouched.
pub fn join_path(context: Option<&str>, name: &str) -> String {
    if name.starts_with(PATH_SEPARATOR) {
        return name.to_string();
    }
    match context {
        Some(ctx) => format!("{}{}{}", ctx, PATH_SEPARATOR, name),
        None => format!("{}{}", PATH_SEPARATOR, name),
    }
}

#[test]
fn join_relative_and_absolute_paths() {
    assert_eq!(
        join_path(Some(".Models.Frame"), "inspection"),
        ".Models.Frame.inspection"
    );
    assert_eq!(
        join_path(Some(".Models.Frame"), ".Models.Other.x"),
        ".Models.Other.x"
    );
    assert_eq!(join_path(None, "x"), ".x");
}
