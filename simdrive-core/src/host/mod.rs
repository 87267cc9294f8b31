//! Boundary between the orchestration engine and the external simulation
//! host.
//!
//! Definitions are kept generic so that different hosts can be plugged in.
//! A host is represented by a [`SessionFactory`] producing
//! [`AutomationSession`]s, each bound to a single license seat.
//!
//! [`SessionFactory`]: trait.SessionFactory.html
//! [`AutomationSession`]: trait.AutomationSession.html

pub mod memory;

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::value::Value;

/// License type requested when opening a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseType {
    Professional,
    Student,
    Viewer,
}

impl Default for LicenseType {
    fn default() -> Self {
        LicenseType::Professional
    }
}

impl fmt::Display for LicenseType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl FromStr for LicenseType {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "professional" => Ok(LicenseType::Professional),
            "student" => Ok(LicenseType::Student),
            "viewer" => Ok(LicenseType::Viewer),
            _ => Err(Error::InvalidConfig(format!("unknown license type: {}", s))),
        }
    }
}

/// Produces automation sessions against a single kind of host.
///
/// Factories are shared between pool workers, hence the `Sync` bound.
pub trait SessionFactory: Sync {
    type Session: AutomationSession;

    /// Launches or attaches to the host and acquires one license seat.
    ///
    /// Fails with `LicenseUnavailable` if no seat can be acquired and with
    /// `HostUnavailable` if the host cannot be reached.
    fn open(&self, version: &str, license: LicenseType) -> Result<Self::Session>;
}

/// Operations available on a single live connection to the host.
///
/// Names passed to variable and table operations resolve relative to the
/// current path context, unless they start with the path separator.
///
/// Table cells are addressed with 1-based column and row indices. Row 0
/// holds the column names.
pub trait AutomationSession: Send {
    fn set_visible(&mut self, visible: bool) -> Result<()>;
    fn set_trust_models(&mut self, trust: bool) -> Result<()>;

    fn load_model(&mut self, path: &Path) -> Result<()>;
    fn set_path_context(&mut self, path: &str) -> Result<()>;
    /// Checks that the event controller at the given absolute path exists.
    fn set_event_controller(&mut self, path: &str) -> Result<()>;

    fn get_value(&mut self, name: &str) -> Result<Value>;
    fn set_value(&mut self, name: &str, value: &Value) -> Result<()>;

    /// Returns `(columns, rows)` of the table, not counting the header row.
    fn table_dimensions(&mut self, table: &str) -> Result<(usize, usize)>;
    fn resize_table(&mut self, table: &str, columns: usize, rows: usize) -> Result<()>;
    fn get_table_cell(&mut self, table: &str, column: usize, row: usize) -> Result<Value>;
    fn set_table_cell(&mut self, table: &str, column: usize, row: usize, value: &Value)
        -> Result<()>;

    fn start_run(&mut self, event_controller: &str) -> Result<()>;
    fn is_running(&mut self) -> Result<bool>;
    /// Blocks until the current run finishes.
    fn wait_for_run_complete(&mut self, poll_interval: Duration) -> Result<()> {
        while self.is_running()? {
            thread::sleep(poll_interval);
        }
        Ok(())
    }
    fn reset_run(&mut self, event_controller: &str) -> Result<()>;

    /// Executes a host-native script command, optionally with a single
    /// parameter.
    fn execute_script(&mut self, command: &str, parameter: Option<&Value>)
        -> Result<Option<Value>>;

    /// Releases the session and its license seat. Calling it more than once
    /// is a no-op.
    fn close(&mut self) -> Result<()>;
}

#[test]
fn license_type_from_str() {
    assert_eq!(
        "student".parse::<LicenseType>().unwrap(),
        LicenseType::Student
    );
    assert_eq!(
        "Professional".parse::<LicenseType>().unwrap(),
        LicenseType::Professional
    );
    assert!("enterprise".parse::<LicenseType>().is_err());
}
