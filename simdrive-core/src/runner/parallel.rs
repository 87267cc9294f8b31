use std::sync::{Mutex, PoisonError};
use std::thread;

use crossbeam_channel::Sender;

use crate::config::SimConfig;
use crate::error::{Error, Result};
use crate::experiment::{ExperimentResult, ExperimentSpec};
use crate::host::SessionFactory;
use crate::runner::gate::StartGate;
use crate::runner::{CancelToken, SequentialRunner, Worker};

/// Runs experiments over a bounded pool of sessions.
///
/// The pool holds `min(experiments, max_concurrency)` workers, each on its
/// own thread with its own session. Workers pull the next experiment index
/// from a shared counter, so a slow experiment never holds up the others.
/// Results are put back at their input index.
///
/// The pool only starts dispatching once every worker has opened its
/// session. If any of them fails, all opened sessions are closed and the
/// batch fails with `PoolInitializationFailed`.
pub struct ParallelRunner<'f, F: SessionFactory + ?Sized> {
    factory: &'f F,
    config: SimConfig,
    max_concurrency: usize,
    cancel: CancelToken,
}

impl<'f, F: SessionFactory + ?Sized> ParallelRunner<'f, F> {
    pub fn new(factory: &'f F, config: SimConfig) -> Self {
        let max_concurrency = config.max_concurrency;
        ParallelRunner {
            factory,
            config,
            max_concurrency,
            cancel: CancelToken::new(),
        }
    }

    /// Overrides the pool bound taken from the config.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
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
        if self.max_concurrency == 0 {
            return Err(Error::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        self.config.validate()?;
        if specs.is_empty() {
            return Ok(Vec::new());
        }

        let pool_size = specs.len().min(self.max_concurrency);
        if pool_size == 1 {
            return SequentialRunner::new(self.factory, self.config.clone())
                .with_cancel_token(self.cancel.clone())
                .run(specs);
        }
        info!(
            "running {} experiments on a pool of {} sessions",
            specs.len(),
            pool_size
        );

        let gate = StartGate::new(pool_size);
        let next = Mutex::new(0);
        let mut results: Vec<Option<ExperimentResult>> = vec![None; specs.len()];

        thread::scope(|scope| {
            let (sender, receiver) = crossbeam_channel::unbounded();
            for id in 0..pool_size {
                let pool = Pool {
                    factory: self.factory,
                    config: &self.config,
                    specs,
                    gate: &gate,
                    next: &next,
                    cancel: &self.cancel,
                };
                let sender = sender.clone();
                let spawned = thread::Builder::new()
                    .name(format!("simdrive-worker-{}", id))
                    .spawn_scoped(scope, move || pool.work(id, sender));
                if let Err(e) = spawned {
                    error!("failed spawning worker thread: {}", e);
                    gate.abort(format!("failed spawning worker thread: {}", e));
                    break;
                }
            }
            drop(sender);

            for (index, result) in receiver.iter() {
                results[index] = Some(result);
            }
        });

        if let Some((opened, reason)) = gate.failure() {
            return Err(Error::PoolInitializationFailed {
                requested: pool_size,
                opened,
                reason,
            });
        }

        let remaining = results.iter().filter(|r| r.is_none()).count();
        if remaining > 0 {
            if self.cancel.is_cancelled() {
                info!("batch cancelled, {} experiments not run", remaining);
            } else {
                return Err(Error::PoolExhausted { remaining });
            }
        }
        Ok(results
            .into_iter()
            .map(|r| r.unwrap_or_else(ExperimentResult::cancelled))
            .collect())
    }
}

/// State shared by all workers of one pool.
struct Pool<'a, F: SessionFactory + ?Sized> {
    factory: &'a F,
    config: &'a SimConfig,
    specs: &'a [ExperimentSpec],
    gate: &'a StartGate,
    next: &'a Mutex<usize>,
    cancel: &'a CancelToken,
}

impl<'a, F: SessionFactory + ?Sized> Pool<'a, F> {
    fn work(self, id: usize, sender: Sender<(usize, ExperimentResult)>) {
        let mut worker = match Worker::open(id, self.factory, self.config) {
            Ok(w) => w,
            Err(e) => {
                error!("worker {}: failed opening session: {}", id, e);
                self.gate.abort(e.to_string());
                return;
            }
        };
        if !self.gate.arrive() {
            debug!("worker {}: pool aborted, closing session", id);
            return;
        }

        while !self.cancel.is_cancelled() {
            let index = match self.next_index() {
                Some(i) => i,
                None => break,
            };
            trace!("worker {}: running experiment {}", id, index);
            let result = worker.run_experiment(&self.specs[index]);
            if sender.send((index, result)).is_err() {
                break;
            }
            if worker.is_retired() {
                warn!("worker {}: retired, leaving the rest to the pool", id);
                break;
            }
        }
    }

    fn next_index(&self) -> Option<usize> {
        let mut next = self.next.lock().unwrap_or_else(PoisonError::into_inner);
        if *next >= self.specs.len() {
            return None;
        }
        let index = *next;
        *next += 1;
        Some(index)
    }
}
