use std::sync::atomic::{AtomicBool, Ordering};

/// A cancellation signal polled by the training loop once per completed
/// epoch.
///
/// Raising the signal never interrupts an in-flight update; the loop
/// finishes the epoch it is in and returns the network as of that point.
pub trait CancelSource: Send + Sync {
    fn is_cancelled(&self) -> bool;
}

/// Lets an `Arc<AtomicBool>` shared with a signal handler act as the source.
impl CancelSource for AtomicBool {
    fn is_cancelled(&self) -> bool {
        self.load(Ordering::Acquire)
    }
}

/// A source that is never raised.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelSource for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}
