//! Single experiment executor owning one handle.

use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::experiment::{ExperimentResult, ExperimentSpec};
use crate::handle::SimulationHandle;
use crate::host::{AutomationSession, SessionFactory};
use crate::value::Value;
use crate::VarName;

/// Runs experiments one at a time on the handle it owns.
///
/// After a successful experiment the run is reset. After a failure the
/// handle is recovered by reloading the model, or failing that by closing
/// it and opening a fresh one. A worker that cannot recover its handle is
/// retired.
pub(crate) struct Worker<'f, F: SessionFactory + ?Sized> {
    id: usize,
    factory: &'f F,
    config: &'f SimConfig,
    handle: Option<SimulationHandle<F::Session>>,
}

impl<'f, F: SessionFactory + ?Sized> Worker<'f, F> {
    /// Opens and configures a new handle for the worker.
    pub fn open(id: usize, factory: &'f F, config: &'f SimConfig) -> Result<Self> {
        let handle = SimulationHandle::initialize(factory, config)?;
        debug!("worker {}: session ready", id);
        Ok(Worker {
            id,
            factory,
            config,
            handle: Some(handle),
        })
    }

    /// Wraps an already configured handle.
    pub fn with_handle(
        id: usize,
        factory: &'f F,
        config: &'f SimConfig,
        handle: SimulationHandle<F::Session>,
    ) -> Self {
        Worker {
            id,
            factory,
            config,
            handle: Some(handle),
        }
    }

    pub fn into_handle(mut self) -> Option<SimulationHandle<F::Session>> {
        self.handle.take()
    }

    pub fn is_retired(&self) -> bool {
        self.handle.is_none()
    }

    /// Runs a single experiment. Failures are reported in the result.
    pub fn run_experiment(&mut self, spec: &ExperimentSpec) -> ExperimentResult {
        let handle = match self.handle.as_mut() {
            Some(h) => h,
            None => {
                return ExperimentResult::failed(&Error::HostUnavailable(format!(
                    "worker {} has no session",
                    self.id
                )))
            }
        };
        let (result, healthy) = match execute(handle, spec) {
            Ok(outputs) => match handle.reset() {
                Ok(()) => (ExperimentResult::success(outputs), true),
                Err(e) => {
                    warn!("worker {}: reset failed: {}", self.id, e);
                    (ExperimentResult::success(outputs), false)
                }
            },
            Err(e) => {
                warn!("worker {}: experiment failed: {}", self.id, e);
                (ExperimentResult::failed(&e), false)
            }
        };
        if !healthy {
            self.recover();
        }
        result
    }

    fn recover(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            match handle.reload() {
                Ok(()) => return,
                Err(e) => warn!("worker {}: reload failed: {}", self.id, e),
            }
        }
        // the old session goes first so its seat can be reused
        if let Some(mut handle) = self.handle.take() {
            if let Err(e) = handle.close() {
                warn!("worker {}: failed closing session: {}", self.id, e);
            }
        }
        match SimulationHandle::initialize(self.factory, self.config) {
            Ok(handle) => {
                info!("worker {}: session reopened", self.id);
                self.handle = Some(handle);
            }
            Err(e) => error!("worker {}: retiring, failed reopening session: {}", self.id, e),
        }
    }
}

/// Writes the inputs in order, runs, then reads the outputs in order.
fn execute<S: AutomationSession>(
    handle: &mut SimulationHandle<S>,
    spec: &ExperimentSpec,
) -> Result<Vec<(VarName, Value)>> {
    for (name, value) in spec.inputs() {
        handle.write_variable(name, value)?;
    }
    handle.run()?;
    let mut outputs = Vec::with_capacity(spec.output_variables().len());
    for name in spec.output_variables() {
        outputs.push((name.clone(), handle.read_variable(name)?));
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::host::memory::{MemoryHost, MemoryModel};

    const MODEL: &str = "line.spp";

    fn model() -> MemoryModel {
        MemoryModel::new()
            .frame(".Models.Frame")
            .event_controller(".Models.Frame.EventController")
            .variable(".Models.Frame.x", 0)
    }

    fn config() -> SimConfig {
        SimConfig::new(MODEL)
            .with_path_context(".Models.Frame")
            .with_event_controller("EventController")
    }

    #[test]
    fn failure_is_isolated_by_reload() {
        let host = MemoryHost::new(1).with_model(MODEL, model());
        let config = config();
        let mut worker = Worker::open(0, &host, &config).unwrap();

        let bad = ExperimentSpec::single("missing", 1, "x");
        let result = worker.run_experiment(&bad);
        assert_eq!(result.error_kind(), Some(ErrorKind::VariableNotFound));
        assert!(result.outputs.is_empty());
        assert!(!worker.is_retired());

        let good = ExperimentSpec::single("x", 3, "x");
        let result = worker.run_experiment(&good);
        assert_eq!(result.get("x"), Some(&Value::Int(3)));
        assert_eq!(host.opened_total(), 1);
    }

    #[test]
    fn reopens_when_reload_is_refused() {
        let host = MemoryHost::new(1).with_model(MODEL, model().reject_reload());
        let config = config();
        let mut worker = Worker::open(0, &host, &config).unwrap();
        let result = worker.run_experiment(&ExperimentSpec::single("x", "text", "x"));
        assert_eq!(result.error_kind(), Some(ErrorKind::TypeMismatch));
        assert!(!worker.is_retired());
        assert_eq!(host.opened_total(), 2);
        assert_eq!(host.open_seats(), 1);
    }

    #[test]
    fn retires_when_session_cannot_be_reopened() {
        let host = MemoryHost::new(1)
            .with_model(MODEL, model().reject_reload())
            .with_launch_limit(1);
        let config = config();
        let mut worker = Worker::open(0, &host, &config).unwrap();
        worker.run_experiment(&ExperimentSpec::single("x", "text", "x"));
        assert!(worker.is_retired());
        assert_eq!(host.open_seats(), 0);
        let result = worker.run_experiment(&ExperimentSpec::single("x", 1, "x"));
        assert_eq!(result.error_kind(), Some(ErrorKind::HostUnavailable));
    }
}
