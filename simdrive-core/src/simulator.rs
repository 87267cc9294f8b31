//! Caller-facing simulator interface.

use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::experiment::{ExperimentResult, ExperimentSpec};
use crate::handle::{HandleState, SimulationHandle};
use crate::host::SessionFactory;
use crate::runner::{self, CancelToken, ParallelRunner, Worker};
use crate::table::Table;
use crate::value::Value;

/// Single point of contact with a simulation host.
///
/// Holds the session factory, the configuration and a lazily opened handle
/// used for direct access to the model. Batch operations open their own
/// sessions as needed, except for the sequential one which reuses the
/// simulator's handle.
pub struct Simulator<F: SessionFactory> {
    factory: F,
    config: SimConfig,
    handle: Option<SimulationHandle<F::Session>>,
    cancel: CancelToken,
}

impl<F: SessionFactory> Simulator<F> {
    /// Creates a new simulator. No session is opened until it's needed.
    pub fn new(factory: F, config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Simulator {
            factory,
            config,
            handle: None,
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn is_initialized(&self) -> bool {
        self.handle
            .as_ref()
            .map(|h| h.is_initialized())
            .unwrap_or(false)
    }

    /// Opens the simulator's own session and configures it. Does nothing
    /// if it's already open.
    pub fn initialize(&mut self) -> Result<()> {
        self.handle_mut().map(|_| ())
    }

    pub fn get_value(&mut self, name: &str) -> Result<Value> {
        self.handle_mut()?.read_variable(name)
    }

    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        self.handle_mut()?.write_variable(name, &value.into())
    }

    pub fn get_table(&mut self, name: &str) -> Result<Table> {
        self.handle_mut()?.read_table(name)
    }

    pub fn set_table(&mut self, name: &str, table: &Table) -> Result<()> {
        self.handle_mut()?.write_table(name, table)
    }

    pub fn execute_script(
        &mut self,
        command: &str,
        parameter: Option<&Value>,
        from_path_context: bool,
    ) -> Result<Option<Value>> {
        self.handle_mut()?
            .execute_script(command, parameter, from_path_context)
    }

    pub fn start_simulation(&mut self) -> Result<()> {
        self.handle_mut()?.start()
    }

    pub fn is_simulation_running(&mut self) -> Result<bool> {
        match self.handle.as_mut() {
            Some(h) => h.is_running(),
            None => Ok(false),
        }
    }

    /// Blocks until the simulation started with `start_simulation`
    /// finishes.
    pub fn wait_for_simulation(&mut self) -> Result<()> {
        match self.handle.as_mut() {
            Some(h) => h.wait(),
            None => Ok(()),
        }
    }

    pub fn reset_simulation(&mut self) -> Result<()> {
        self.handle_mut()?.reset()
    }

    /// Runs a single experiment on the simulator's own session.
    ///
    /// Failures are reported in the result's status. A failed experiment
    /// leaves the session reloaded, or reopened when the reload is refused.
    pub fn run_simulation(&mut self, spec: &ExperimentSpec) -> ExperimentResult {
        let handle = match self.take_handle() {
            Ok(h) => h,
            Err(e) => return ExperimentResult::failed(&e),
        };
        let mut worker = Worker::with_handle(0, &self.factory, &self.config, handle);
        let result = worker.run_experiment(spec);
        self.handle = worker.into_handle();
        result
    }

    /// Runs the experiments over a pool of at most `max_concurrency`
    /// sessions, returning results in input order.
    pub fn run_simulations_in_parallel(
        &self,
        specs: &[ExperimentSpec],
        max_concurrency: usize,
    ) -> Result<Vec<ExperimentResult>> {
        let results = ParallelRunner::new(&self.factory, self.config.clone())
            .with_max_concurrency(max_concurrency)
            .with_cancel_token(self.cancel.clone())
            .run(specs);
        self.finish_batch();
        results
    }

    /// Runs the experiments one after another on the simulator's own
    /// session.
    pub fn run_simulations_sequentially(
        &mut self,
        specs: &[ExperimentSpec],
    ) -> Result<Vec<ExperimentResult>> {
        if specs.is_empty() {
            self.finish_batch();
            return Ok(Vec::new());
        }
        let handle = match self.take_handle() {
            Ok(h) => h,
            Err(e) => {
                self.finish_batch();
                return Err(e);
            }
        };
        let mut worker = Worker::with_handle(0, &self.factory, &self.config, handle);
        let results = runner::drive(&mut worker, specs, &self.cancel);
        self.handle = worker.into_handle();
        self.finish_batch();
        results
    }

    /// Token cancelling the batch currently running on this simulator.
    ///
    /// A cancellation lasts until the end of the batch it hits; the next
    /// batch starts with the token cleared.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Closes the simulator's session.
    pub fn quit(&mut self) -> Result<()> {
        match self.handle.take() {
            Some(mut h) => h.close(),
            None => Ok(()),
        }
    }

    /// Takes the simulator's own handle, opening it if needed.
    fn take_handle(&mut self) -> Result<SimulationHandle<F::Session>> {
        self.handle_mut()?;
        self.handle
            .take()
            .ok_or_else(|| Error::Other("simulator session missing".to_string()))
    }

    fn finish_batch(&self) {
        if self.cancel.is_cancelled() {
            debug!("clearing cancellation after batch");
            self.cancel.reset();
        }
    }

    fn handle_mut(&mut self) -> Result<&mut SimulationHandle<F::Session>> {
        let open = match &self.handle {
            Some(h) => h.state() != HandleState::Closed,
            None => false,
        };
        if !open {
            info!(
                "initializing session for model {}",
                self.config.model_path.to_string_lossy()
            );
            self.handle = None;
            self.handle = Some(SimulationHandle::initialize(&self.factory, &self.config)?);
        }
        match self.handle.as_mut() {
            Some(h) => Ok(h),
            None => Err(Error::Other("simulator session missing".to_string())),
        }
    }
}
