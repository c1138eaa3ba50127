use super::error::EngineError;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("Task pool has been shut down")]
    Closed,
    #[error("Failed to start worker threads: {0}")]
    Build(String),
}

#[derive(Default)]
struct Barrier {
    pending: Mutex<usize>,
    all_done: Condvar,
    first_error: Mutex<Option<EngineError>>,
}

impl Barrier {
    fn finish(&self, result: Result<(), EngineError>) {
        if let Err(error) = result {
            let mut slot = self.first_error.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(error);
            } else {
                debug!(%error, "Additional task error after the first one.");
            }
        }
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        *pending -= 1;
        if *pending == 0 {
            self.all_done.notify_all();
        }
    }
}

/// A fixed set of worker threads with a counting barrier.
///
/// Tasks run to completion; [`join`](Self::join) blocks until every task submitted so far
/// has finished and reports the first task error, so one generation can be drained before
/// the next is submitted.
pub struct TaskPool {
    pool: rayon::ThreadPool,
    barrier: Arc<Barrier>,
    closed: AtomicBool,
}

impl TaskPool {
    /// Starts `num_threads` workers; 0 picks one per available core.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Build`] if the threads cannot be spawned.
    pub fn new(num_threads: usize) -> Result<Self, PoolError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("ligrow-worker-{}", i))
            .build()
            .map_err(|e| PoolError::Build(e.to_string()))?;
        debug!(threads = pool.current_num_threads(), "Task pool started.");
        Ok(Self {
            pool,
            barrier: Arc::new(Barrier::default()),
            closed: AtomicBool::new(false),
        })
    }

    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Queues `task` on a worker thread.
    ///
    /// A panicking task is reported by [`join`](Self::join) as [`EngineError::Internal`].
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Closed`] after [`shutdown`](Self::shutdown).
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() -> Result<(), EngineError> + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(PoolError::Closed);
        }
        *self
            .barrier
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner) += 1;

        let barrier = Arc::clone(&self.barrier);
        self.pool.spawn(move || {
            let result = catch_unwind(AssertUnwindSafe(task))
                .unwrap_or_else(|payload| Err(EngineError::Internal(panic_message(payload))));
            barrier.finish(result);
        });
        Ok(())
    }

    /// Waits for every submitted task, then returns and clears the first task error.
    pub fn join(&self) -> Result<(), EngineError> {
        let pending = self
            .barrier
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let _pending = self
            .barrier
            .all_done
            .wait_while(pending, |n| *n > 0)
            .unwrap_or_else(PoisonError::into_inner);

        match self
            .barrier
            .first_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Refuses further submissions. Tasks already queued still run.
    pub fn shutdown(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("task panicked: {}", detail)
}
