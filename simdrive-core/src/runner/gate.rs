//! Start barrier for pool workers.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

enum GateState {
    Pending { remaining: usize },
    Open,
    Aborted { reason: String },
}

/// Holds pool workers back until every one of them has opened its session.
///
/// A single failure aborts the gate, releasing all waiting workers with a
/// negative answer.
pub(crate) struct StartGate {
    state: Mutex<GateState>,
    opened: Mutex<usize>,
    cvar: Condvar,
}

impl StartGate {
    pub fn new(workers: usize) -> Self {
        StartGate {
            state: Mutex::new(match workers {
                0 => GateState::Open,
                n => GateState::Pending { remaining: n },
            }),
            opened: Mutex::new(0),
            cvar: Condvar::new(),
        }
    }

    /// Registers a successfully opened worker and blocks until all workers
    /// have arrived. Returns `false` if the gate was aborted.
    pub fn arrive(&self) -> bool {
        *self.opened.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        let mut state = self.lock();
        let last = match &mut *state {
            GateState::Pending { remaining } => {
                *remaining -= 1;
                *remaining == 0
            }
            _ => false,
        };
        if last {
            *state = GateState::Open;
            self.cvar.notify_all();
        }
        loop {
            let open = match &*state {
                GateState::Open => Some(true),
                GateState::Aborted { .. } => Some(false),
                GateState::Pending { .. } => None,
            };
            if let Some(open) = open {
                return open;
            }
            state = self
                .cvar
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Aborts the gate. The first reason given is kept.
    pub fn abort(&self, reason: String) {
        let mut state = self.lock();
        if let GateState::Aborted { .. } = &*state {
            return;
        }
        *state = GateState::Aborted { reason };
        self.cvar.notify_all();
    }

    /// Returns the number of sessions opened and the abort reason, if the
    /// gate was aborted.
    pub fn failure(&self) -> Option<(usize, String)> {
        match &*self.lock() {
            GateState::Aborted { reason } => Some((
                *self.opened.lock().unwrap_or_else(PoisonError::into_inner),
                reason.clone(),
            )),
            _ => None,
        }
    }

    fn lock(&self) -> MutexGuard<GateState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
