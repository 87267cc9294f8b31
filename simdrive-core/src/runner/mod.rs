//! Experiment execution over one or more host sessions.
//!
//! [`SequentialRunner`] drives all experiments through a single session.
//! [`ParallelRunner`] spreads them over a bounded pool of sessions, one per
//! worker thread. Both return one result per experiment, in input order.
//!
//! [`SequentialRunner`]: struct.SequentialRunner.html
//! [`ParallelRunner`]: struct.ParallelRunner.html

mod cancel;
mod gate;
mod parallel;
mod sequential;
mod worker;

pub use cancel::CancelToken;
pub use parallel::ParallelRunner;
pub use sequential::SequentialRunner;

pub(crate) use sequential::drive;
pub(crate) use worker::Worker;
