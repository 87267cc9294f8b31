use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag for a running batch.
///
/// Cancelling stops the dispatch of further experiments. Runs already in
/// progress finish normally; experiments never dispatched are reported as
/// cancelled.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clears the flag so the token can be used for another batch.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

#[test]
fn clones_share_flag() {
    let token = CancelToken::new();
    let other = token.clone();
    assert!(!other.is_cancelled());
    token.cancel();
    assert!(other.is_cancelled());
    other.reset();
    assert!(!token.is_cancelled());
}
