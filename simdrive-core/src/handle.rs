//! Exclusive handle on a single host session.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::host::{AutomationSession, LicenseType, SessionFactory};
use crate::table::{self, Table};
use crate::value::Value;
use crate::{join_path, DEFAULT_POLL_INTERVAL_MS};

/// Lifecycle state of a [`SimulationHandle`].
///
/// ```text
/// Opened -> ModelLoaded -> Configured -> (Running <-> Idle)* -> Closed
/// ```
///
/// [`SimulationHandle`]: struct.SimulationHandle.html
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Opened,
    ModelLoaded,
    Configured,
    Running,
    Idle,
    Closed,
}

impl fmt::Display for HandleState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Owns one live session with the host.
///
/// Operations take `&mut self`, so a handle is only ever driven by one
/// thread at a time. Failures while opening, loading or configuring close
/// the handle. The session is closed when the handle is dropped.
pub struct SimulationHandle<S: AutomationSession> {
    session: Option<S>,
    state: HandleState,
    model_path: Option<PathBuf>,
    path_context: Option<String>,
    /// Absolute path of the event controller
    event_controller: Option<String>,
    poll_interval: Duration,
}

impl<S: AutomationSession> SimulationHandle<S> {
    /// Acquires a session with one license seat.
    pub fn open<F>(factory: &F, version: &str, license: LicenseType) -> Result<Self>
    where
        F: SessionFactory<Session = S> + ?Sized,
    {
        let session = factory.open(version, license)?;
        debug!("opened session (version: '{}', license: {})", version, license);
        Ok(SimulationHandle {
            session: Some(session),
            state: HandleState::Opened,
            model_path: None,
            path_context: None,
            event_controller: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        })
    }

    /// Opens a session and brings it to the configured state described by
    /// the config.
    pub fn initialize<F>(factory: &F, config: &SimConfig) -> Result<Self>
    where
        F: SessionFactory<Session = S> + ?Sized,
    {
        let mut handle = Self::open(factory, &config.version, config.license_type)?;
        handle.poll_interval = Duration::from_millis(config.poll_interval_ms);
        handle.session()?.set_visible(config.visible)?;
        handle.session()?.set_trust_models(config.trust_models)?;
        handle.load_model(&config.model_path)?;
        if let Some(ctx) = &config.path_context {
            handle.set_path_context(ctx)?;
        }
        if let Some(ec) = &config.event_controller {
            handle.set_event_controller(ec)?;
        }
        Ok(handle)
    }

    pub fn state(&self) -> HandleState {
        self.state
    }

    pub fn model_path(&self) -> Option<&Path> {
        self.model_path.as_deref()
    }

    pub fn path_context(&self) -> Option<&str> {
        self.path_context.as_deref()
    }

    pub fn event_controller(&self) -> Option<&str> {
        self.event_controller.as_deref()
    }

    /// Whether the handle can run experiments.
    pub fn is_initialized(&self) -> bool {
        match self.state {
            HandleState::Configured | HandleState::Idle => true,
            _ => false,
        }
    }

    /// Read-only access to the underlying session.
    pub fn inner(&self) -> Option<&S> {
        self.session.as_ref()
    }

    pub fn load_model(&mut self, path: &Path) -> Result<()> {
        self.expect_state("load_model", &[
            HandleState::Opened,
            HandleState::ModelLoaded,
            HandleState::Configured,
            HandleState::Idle,
        ])?;
        let result = self.session()?.load_model(path);
        self.close_on_err(result)?;
        debug!("loaded model {}", path.to_string_lossy());
        self.model_path = Some(path.to_path_buf());
        self.path_context = None;
        self.event_controller = None;
        self.state = HandleState::ModelLoaded;
        Ok(())
    }

    /// Sets the path context. Any failure closes the handle.
    pub fn set_path_context(&mut self, path: &str) -> Result<()> {
        let result = self.apply_path_context(path);
        self.close_on_err(result)
    }

    /// Sets the event controller, given relative to the path context or as
    /// an absolute path. Any failure closes the handle.
    pub fn set_event_controller(&mut self, name: &str) -> Result<()> {
        let result = self.apply_event_controller(name);
        self.close_on_err(result)
    }

    pub fn write_variable(&mut self, name: &str, value: &Value) -> Result<()> {
        self.expect_loaded("write_variable")?;
        trace!("write {} = {}", name, value);
        self.session()?.set_value(name, value)
    }

    pub fn read_variable(&mut self, name: &str) -> Result<Value> {
        self.expect_loaded("read_variable")?;
        self.session()?.get_value(name)
    }

    pub fn read_table(&mut self, name: &str) -> Result<Table> {
        self.expect_loaded("read_table")?;
        table::to_table(self.session()?, name)
    }

    pub fn write_table(&mut self, name: &str, table: &Table) -> Result<()> {
        self.expect_loaded("write_table")?;
        table::from_table(self.session()?, name, table)
    }

    /// Starts a run without waiting for it to finish.
    pub fn start(&mut self) -> Result<()> {
        self.expect_state("start", &[HandleState::Configured, HandleState::Idle])?;
        let ec = self.configured_controller()?;
        self.session()?.start_run(&ec)?;
        self.state = HandleState::Running;
        Ok(())
    }

    /// Checks whether the current run is still going, moving to idle once
    /// it has finished.
    pub fn is_running(&mut self) -> Result<bool> {
        if self.state != HandleState::Running {
            return Ok(false);
        }
        let running = self.session()?.is_running();
        if let Ok(true) = running {
            return Ok(true);
        }
        self.state = HandleState::Idle;
        running
    }

    /// Blocks until the current run finishes.
    pub fn wait(&mut self) -> Result<()> {
        if self.state != HandleState::Running {
            return Ok(());
        }
        let poll = self.poll_interval;
        let result = self.session()?.wait_for_run_complete(poll);
        self.state = HandleState::Idle;
        result
    }

    /// Starts a run and waits for it to complete.
    pub fn run(&mut self) -> Result<()> {
        self.start()?;
        self.wait()
    }

    /// Resets the simulation run so that the next run starts from scratch.
    pub fn reset(&mut self) -> Result<()> {
        self.expect_state("reset", &[HandleState::Configured, HandleState::Idle])?;
        let ec = self.configured_controller()?;
        self.session()?.reset_run(&ec)?;
        self.state = HandleState::Configured;
        Ok(())
    }

    /// Loads the model again and reapplies path context and event
    /// controller.
    pub fn reload(&mut self) -> Result<()> {
        let path = match &self.model_path {
            Some(p) => p.clone(),
            None => {
                return Err(Error::CommandOrder {
                    command: "reload",
                    prerequisite: "load_model",
                })
            }
        };
        if self.state == HandleState::Running {
            // the run is abandoned, the reload discards its state anyway
            self.state = HandleState::Idle;
        }
        let ctx = self.path_context.clone();
        let ec = self.event_controller.clone();
        self.load_model(&path)?;
        if let Some(ctx) = ctx {
            self.set_path_context(&ctx)?;
        }
        if let Some(ec) = ec {
            self.set_event_controller(&ec)?;
        }
        debug!("reloaded model {}", path.to_string_lossy());
        Ok(())
    }

    /// Executes a script command. With `from_path_context` the command is
    /// addressed relative to the path context, otherwise from the root.
    pub fn execute_script(
        &mut self,
        command: &str,
        parameter: Option<&Value>,
        from_path_context: bool,
    ) -> Result<Option<Value>> {
        self.expect_loaded("execute_script")?;
        let command = match from_path_context {
            true => match &self.path_context {
                Some(ctx) => join_path(Some(ctx), command),
                None => {
                    return Err(Error::CommandOrder {
                        command: "execute_script",
                        prerequisite: "set_path_context",
                    })
                }
            },
            false => join_path(None, command),
        };
        self.session()?.execute_script(&command, parameter)
    }

    /// Releases the session. Closing an already closed handle is a no-op.
    pub fn close(&mut self) -> Result<()> {
        self.state = HandleState::Closed;
        match self.session.take() {
            Some(mut session) => {
                debug!("closing session");
                session.close()
            }
            None => Ok(()),
        }
    }

    fn apply_path_context(&mut self, path: &str) -> Result<()> {
        if self.state == HandleState::Opened {
            return Err(Error::CommandOrder {
                command: "set_path_context",
                prerequisite: "load_model",
            });
        }
        self.expect_state("set_path_context", &[
            HandleState::ModelLoaded,
            HandleState::Configured,
            HandleState::Idle,
        ])?;
        self.session()?.set_path_context(path)?;
        self.path_context = Some(path.to_string());
        Ok(())
    }

    fn apply_event_controller(&mut self, name: &str) -> Result<()> {
        let ctx = match &self.path_context {
            Some(ctx) => ctx.clone(),
            None => {
                return Err(Error::CommandOrder {
                    command: "set_event_controller",
                    prerequisite: "set_path_context",
                })
            }
        };
        self.expect_state("set_event_controller", &[
            HandleState::ModelLoaded,
            HandleState::Configured,
            HandleState::Idle,
        ])?;
        let path = join_path(Some(&ctx), name);
        self.session()?.set_event_controller(&path)?;
        self.event_controller = Some(path);
        self.state = HandleState::Configured;
        Ok(())
    }

    fn session(&mut self) -> Result<&mut S> {
        let state = self.state;
        self.session.as_mut().ok_or(Error::InvalidState {
            op: "session",
            state: state.to_string(),
        })
    }

    fn configured_controller(&self) -> Result<String> {
        self.event_controller.clone().ok_or(Error::CommandOrder {
            command: "start",
            prerequisite: "set_event_controller",
        })
    }

    fn expect_state(&self, op: &'static str, allowed: &[HandleState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(Error::InvalidState {
                op,
                state: self.state.to_string(),
            })
        }
    }

    fn expect_loaded(&self, op: &'static str) -> Result<()> {
        self.expect_state(op, &[
            HandleState::ModelLoaded,
            HandleState::Configured,
            HandleState::Idle,
        ])
    }

    fn close_on_err<T>(&mut self, result: Result<T>) -> Result<T> {
        if result.is_err() {
            if let Err(e) = self.close() {
                warn!("failed closing session: {}", e);
            }
        }
        result
    }
}

impl<S: AutomationSession> Drop for SimulationHandle<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("failed closing session: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::memory::{MemoryHost, MemoryModel, MemoryTable};

    const MODEL: &str = "line.spp";

    fn host() -> MemoryHost {
        MemoryHost::new(2).with_model(
            MODEL,
            MemoryModel::new()
                .frame(".Models.Frame")
                .event_controller(".Models.Frame.EventController")
                .variable(".Models.Frame.x", 1)
                .table(".Models.Frame.Data", MemoryTable::empty()),
        )
    }

    fn config() -> SimConfig {
        SimConfig::new(MODEL)
            .with_path_context(".Models.Frame")
            .with_event_controller("EventController")
    }

    #[test]
    fn initialize_reaches_configured() {
        let host = host();
        let handle = SimulationHandle::initialize(&host, &config()).unwrap();
        assert_eq!(handle.state(), HandleState::Configured);
        assert_eq!(
            handle.event_controller(),
            Some(".Models.Frame.EventController")
        );
        assert!(handle.is_initialized());
        drop(handle);
        assert_eq!(host.open_seats(), 0);
    }

    #[test]
    fn failed_load_closes_handle() {
        let host = host();
        let mut handle =
            SimulationHandle::open(&host, "", LicenseType::Professional).unwrap();
        assert!(handle.load_model(Path::new("missing.spp")).is_err());
        assert_eq!(handle.state(), HandleState::Closed);
        assert_eq!(host.open_seats(), 0);
        match handle.read_variable("x") {
            Err(Error::InvalidState { .. }) => (),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn event_controller_requires_path_context() {
        let host = host();
        let mut handle =
            SimulationHandle::open(&host, "", LicenseType::Professional).unwrap();
        handle.load_model(Path::new(MODEL)).unwrap();
        match handle.set_event_controller("EventController") {
            Err(Error::CommandOrder { .. }) => (),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(handle.state(), HandleState::Closed);
        assert_eq!(host.open_seats(), 0);
    }

    #[test]
    fn path_context_before_load_closes_handle() {
        let host = host();
        let mut handle =
            SimulationHandle::open(&host, "", LicenseType::Professional).unwrap();
        match handle.set_path_context(".Models.Frame") {
            Err(Error::CommandOrder { .. }) => (),
            other => panic!("unexpected: {:?}", other),
        }
        assert_eq!(handle.state(), HandleState::Closed);
        assert_eq!(host.open_seats(), 0);
    }

    #[test]
    fn unknown_event_controller_closes_handle() {
        let host = host();
        let mut handle =
            SimulationHandle::open(&host, "", LicenseType::Professional).unwrap();
        handle.load_model(Path::new(MODEL)).unwrap();
        handle.set_path_context(".Models.Frame").unwrap();
        assert!(handle.set_event_controller("Nowhere").is_err());
        assert_eq!(handle.state(), HandleState::Closed);
        assert_eq!(host.open_seats(), 0);
    }

    #[test]
    fn run_cycle_and_reset() {
        let host = host();
        let mut handle = SimulationHandle::initialize(&host, &config()).unwrap();
        handle.write_variable("x", &Value::Int(5)).unwrap();
        handle.run().unwrap();
        assert_eq!(handle.state(), HandleState::Idle);
        assert_eq!(handle.read_variable("x").unwrap(), Value::Int(5));
        handle.reset().unwrap();
        assert_eq!(handle.state(), HandleState::Configured);
        assert_eq!(handle.read_variable("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn run_requires_configuration() {
        let host = host();
        let mut handle =
            SimulationHandle::open(&host, "", LicenseType::Professional).unwrap();
        handle.load_model(Path::new(MODEL)).unwrap();
        match handle.run() {
            Err(Error::InvalidState { op: "start", .. }) => (),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn reload_keeps_configuration() {
        let host = host();
        let mut handle = SimulationHandle::initialize(&host, &config()).unwrap();
        handle.write_variable("x", &Value::Int(9)).unwrap();
        handle.reload().unwrap();
        assert_eq!(handle.state(), HandleState::Configured);
        assert_eq!(handle.read_variable("x").unwrap(), Value::Int(1));
        assert_eq!(handle.path_context(), Some(".Models.Frame"));
    }

    #[test]
    fn script_addressing() {
        let host = host();
        let mut handle = SimulationHandle::initialize(&host, &config()).unwrap();
        handle.execute_script("init", None, true).unwrap();
        handle.execute_script("Models.reset", None, false).unwrap();
        assert_eq!(
            handle.inner().unwrap().executed_scripts(),
            &[
                ".Models.Frame.init".to_string(),
                ".Models.reset".to_string()
            ]
        );
    }

    #[test]
    fn table_round_trip_through_handle() {
        let host = host();
        let mut handle = SimulationHandle::initialize(&host, &config()).unwrap();
        let table = Table::with_columns(
            &["Column1", "Column2"],
            vec![
                vec![Value::Int(1), Value::Int(3)],
                vec![Value::Int(2), Value::Int(4)],
            ],
        )
        .unwrap();
        handle.write_table("Data", &table).unwrap();
        assert_eq!(handle.read_table("Data").unwrap(), table);
    }
}
