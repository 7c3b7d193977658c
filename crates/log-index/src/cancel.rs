//! Cooperative cancellation for range queries.

use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A cancellation signal shared between a query caller and the query's
/// coordinator.
///
/// Cancellation is cooperative: workers finish the map they are processing,
/// the coordinator stops feeding further epochs and the query returns
/// [`FilterError::Cancelled`](crate::FilterError::Cancelled). Cloned tokens
/// share the same signal.
#[derive(Debug, Clone)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
    tx: Sender<()>,
    rx: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        let (tx, rx) = bounded(1);
        Self { cancelled: Arc::new(AtomicBool::new(false)), tx, rx }
    }

    /// Signals cancellation. Idempotent.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::SeqCst) {
            let _ = self.tx.try_send(());
        }
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Channel the coordinator selects on alongside its task channels.
    ///
    /// The message is consumed by whichever selector observes it first;
    /// [`is_cancelled`](Self::is_cancelled) stays set for everyone else.
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.rx
    }
}
