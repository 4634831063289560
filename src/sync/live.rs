use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::trace;

use crate::dom::tree::{MutationKind, MutationRecord, ObserveOptions};
use crate::sync::coalesce::Coalescer;
use crate::sync::engine::SyncEngine;
use crate::trace::trace::SyncReason;

pub(crate) fn lock_engine(engine: &Mutex<SyncEngine>) -> MutexGuard<'_, SyncEngine> {
    engine.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Change-driven re-synchronization, armed for the rest of the page lifetime.
///
/// Every mutation batch (except the engine's own identity stamps) triggers the
/// coalescer; one rebuild runs per burst. Dropping the handle disarms it.
pub struct LiveSync {
    observer_task: JoinHandle<()>,
    coalescer: Arc<Coalescer>,
}

impl LiveSync {
    /// Subscribe to the engine's document and start the rebuild worker.
    ///
    /// Must be called from within a tokio runtime.
    pub fn arm(engine: Arc<Mutex<SyncEngine>>, delay: Duration) -> Self {
        let (document, marker) = {
            let guard = lock_engine(&engine);
            (
                guard.document().clone(),
                guard.registry().attribute().to_string(),
            )
        };

        let mut observer = document.observe(ObserveOptions::all());
        let coalescer = Arc::new(Coalescer::spawn(delay, move || {
            lock_engine(&engine).sync(SyncReason::Mutation);
        }));

        let trigger = Arc::clone(&coalescer);
        let observer_task = tokio::spawn(async move {
            while let Some(batch) = observer.next_batch().await {
                if batch.iter().all(|record| is_identity_stamp(record, &marker)) {
                    continue;
                }
                let scheduled = trigger.trigger();
                trace!(records = batch.len(), scheduled, "mutation batch");
            }
        });

        Self {
            observer_task,
            coalescer,
        }
    }

    /// Whether a rebuild is scheduled but has not finished yet.
    pub fn is_pending(&self) -> bool {
        self.coalescer.is_pending()
    }
}

impl Drop for LiveSync {
    fn drop(&mut self) {
        self.observer_task.abort();
    }
}

fn is_identity_stamp(record: &MutationRecord, marker: &str) -> bool {
    matches!(&record.kind, MutationKind::Attributes { name } if name == marker)
}
