//! Removal of expired series outside the collection scan
//!
//! A collection only holds the shared lock, so it cannot remove the expired
//! series it finds. It hands their generation ids to a [`Sweeper`], which
//! applies them under the exclusive lock either on a per-vector worker
//! thread or on the collecting thread after the scan.

use std::sync::{Arc, OnceLock, Weak};
use std::thread;

use crossbeam_channel::{Sender, TrySendError};
use tracing::{debug, warn};

use crate::config::SweepMode;

/// Identifier of one creation of a label tuple within a vector
pub(crate) type GenerationId = u64;

/// Pending batches per worker; a full queue drops new batches
const QUEUE_CAPACITY: usize = 16;

/// Target of sweep batches
pub(crate) trait Sweep: Send + Sync + 'static {
    /// Remove the given generations, skipping any already gone
    fn sweep(&self, batch: &[GenerationId]);
}

pub(crate) struct Sweeper {
    mode: SweepMode,
    name: String,
    sender: OnceLock<Option<Sender<Vec<GenerationId>>>>,
    #[cfg(test)]
    paused: std::sync::atomic::AtomicBool,
}

impl Sweeper {
    pub(crate) fn new(mode: SweepMode, name: impl Into<String>) -> Self {
        Self {
            mode,
            name: name.into(),
            sender: OnceLock::new(),
            #[cfg(test)]
            paused: std::sync::atomic::AtomicBool::new(false),
        }
    }

    /// Stop applying batches; expired series stay until recreated
    #[cfg(test)]
    pub(crate) fn pause(&self) {
        self.paused.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    /// Schedule removal of `batch` from `target`
    ///
    /// Must be called without holding the target's lock.
    pub(crate) fn submit<S: Sweep>(&self, target: &Arc<S>, batch: Vec<GenerationId>) {
        #[cfg(test)]
        if self.paused.load(std::sync::atomic::Ordering::SeqCst) {
            return;
        }

        if self.mode == SweepMode::Inline {
            target.sweep(&batch);
            return;
        }

        let sender = self.sender.get_or_init(|| spawn_worker(&self.name, Arc::downgrade(target)));
        let Some(sender) = sender else {
            target.sweep(&batch);
            return;
        };

        match sender.try_send(batch) {
            Ok(()) => {}
            Err(TrySendError::Full(batch)) => {
                // Still expired on the next scan, which resubmits them.
                debug!(metric = %self.name, dropped = batch.len(), "sweep queue full");
            }
            Err(TrySendError::Disconnected(batch)) => target.sweep(&batch),
        }
    }
}

impl std::fmt::Debug for Sweeper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sweeper")
            .field("mode", &self.mode)
            .field("name", &self.name)
            .field("started", &self.sender.get().is_some())
            .finish()
    }
}

fn spawn_worker<S: Sweep>(name: &str, target: Weak<S>) -> Option<Sender<Vec<GenerationId>>> {
    let (sender, receiver) = crossbeam_channel::bounded::<Vec<GenerationId>>(QUEUE_CAPACITY);
    let metric = name.to_owned();

    let spawned = thread::Builder::new().name(format!("sweep:{name}")).spawn(move || {
        for batch in receiver.iter() {
            let Some(target) = target.upgrade() else { break };
            target.sweep(&batch);
        }
        debug!(metric = %metric, "sweep worker stopped");
    });

    match spawned {
        Ok(_) => {
            debug!(metric = %name, "sweep worker started");
            Some(sender)
        }
        Err(err) => {
            warn!(metric = %name, error = %err, "failed to start sweep worker, sweeping inline");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for sweep.
    use std::time::Duration;

    use parking_lot::Mutex;

    use super::*;
    use crate::testing::wait_for;

    #[derive(Default)]
    struct Recorder {
        swept: Mutex<Vec<GenerationId>>,
    }

    impl Sweep for Recorder {
        fn sweep(&self, batch: &[GenerationId]) {
            self.swept.lock().extend_from_slice(batch);
        }
    }

    fn settles(condition: impl FnMut() -> bool) -> bool {
        wait_for(Duration::from_secs(5), condition)
    }

    /// Validates inline sweeping.
    ///
    /// Assertions:
    /// - Confirms the batch is applied before `submit` returns.
    #[test]
    fn test_inline_sweep_is_synchronous() {
        let target = Arc::new(Recorder::default());
        let sweeper = Sweeper::new(SweepMode::Inline, "inline");

        sweeper.submit(&target, vec![1, 2]);

        assert_eq!(*target.swept.lock(), vec![1, 2]);
        assert!(sweeper.sender.get().is_none());
    }

    /// Validates background sweeping through the worker.
    ///
    /// Assertions:
    /// - Confirms every submitted id eventually reaches the target.
    #[test]
    fn test_background_sweep_reaches_target() {
        let target = Arc::new(Recorder::default());
        let sweeper = Sweeper::new(SweepMode::Background, "background");

        sweeper.submit(&target, vec![3]);
        sweeper.submit(&target, vec![4, 5]);

        assert!(settles(|| target.swept.lock().len() == 3));
        let mut swept = target.swept.lock().clone();
        swept.sort_unstable();
        assert_eq!(swept, vec![3, 4, 5]);
    }

    /// Validates that the worker only holds a weak reference.
    ///
    /// Assertions:
    /// - Ensures the target is dropped once the caller releases it.
    #[test]
    fn test_worker_does_not_keep_target_alive() {
        let target = Arc::new(Recorder::default());
        let sweeper = Sweeper::new(SweepMode::Background, "weak");
        sweeper.submit(&target, vec![1]);
        assert!(settles(|| target.swept.lock().len() == 1));

        let weak = Arc::downgrade(&target);
        drop(target);
        assert!(settles(|| weak.upgrade().is_none()));
    }

    /// Validates the paused test hook.
    ///
    /// Assertions:
    /// - Ensures nothing is swept while paused.
    #[test]
    fn test_paused_sweeper_ignores_batches() {
        let target = Arc::new(Recorder::default());
        let sweeper = Sweeper::new(SweepMode::Inline, "paused");
        sweeper.pause();

        sweeper.submit(&target, vec![1]);
        assert!(target.swept.lock().is_empty());
    }
}
