use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::experiment::{ExperimentResult, ExperimentSpec};
use crate::host::SessionFactory;
use crate::runner::{CancelToken, Worker};

/// Runs experiments one after another on a single session.
///
/// Used when only one license seat is available, and as the reference the
/// parallel runner is checked against.
pub struct SequentialRunner<'f, F: SessionFactory + ?Sized> {
    factory: &'f F,
    config: SimConfig,
    cancel: CancelToken,
}

impl<'f, F: SessionFactory + ?Sized> SequentialRunner<'f, F> {
    pub fn new(factory: &'f F, config: SimConfig) -> Self {
        SequentialRunner {
            factory,
            config,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Runs all experiments, returning their results in input order.
    pub fn run(&self, specs: &[ExperimentSpec]) -> Result<Vec<ExperimentResult>> {
        self.config.validate()?;
        if specs.is_empty() {
            return Ok(Vec::new());
        }
        let mut worker = Worker::open(0, self.factory, &self.config).map_err(|e| {
            Error::PoolInitializationFailed {
                requested: 1,
                opened: 0,
                reason: e.to_string(),
            }
        })?;
        drive(&mut worker, specs, &self.cancel)
    }
}

/// Feeds the experiments to a single worker in order.
pub(crate) fn drive<F: SessionFactory + ?Sized>(
    worker: &mut Worker<F>,
    specs: &[ExperimentSpec],
    cancel: &CancelToken,
) -> Result<Vec<ExperimentResult>> {
    let mut results = Vec::with_capacity(specs.len());
    for (n, spec) in specs.iter().enumerate() {
        if cancel.is_cancelled() {
            info!("batch cancelled, {} experiments not run", specs.len() - n);
            results.resize_with(specs.len(), ExperimentResult::cancelled);
            break;
        }
        if worker.is_retired() {
            return Err(Error::PoolExhausted {
                remaining: specs.len() - n,
            });
        }
        results.push(worker.run_experiment(spec));
    }
    Ok(results)
}
