use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Single-slot coalescing scheduler.
///
/// The first trigger of a burst sets the pending flag and queues one deferred
/// run; triggers arriving while the flag is set are absorbed. The worker waits
/// `delay`, runs the task to completion, then clears the flag. Runs never
/// overlap.
pub struct Coalescer {
    pending: Arc<AtomicBool>,
    tx: mpsc::Sender<()>,
    worker: JoinHandle<()>,
}

impl Coalescer {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn<F>(delay: Duration, mut task: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let pending = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&pending);

        let worker = tokio::spawn(async move {
            while rx.recv().await.is_some() {
                tokio::time::sleep(delay).await;
                task();
                flag.store(false, Ordering::Release);
            }
        });

        Self {
            pending,
            tx,
            worker,
        }
    }

    /// Request a run. Returns `true` if this call scheduled one, `false` if
    /// it was absorbed by a run already pending.
    pub fn trigger(&self) -> bool {
        if self.pending.swap(true, Ordering::AcqRel) {
            return false;
        }
        if self.tx.try_send(()).is_err() {
            // worker gone
            self.pending.store(false, Ordering::Release);
            return false;
        }
        true
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }
}

impl Drop for Coalescer {
    fn drop(&mut self) {
        self.worker.abort();
    }
}
