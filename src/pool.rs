//! Fixed-size worker pool for CPU-bound page work.
//!
//! ## Why a dedicated rayon pool instead of `spawn_blocking`?
//!
//! Tokio's blocking pool grows on demand (up to 512 threads by default), so a
//! 300-page upload would start 300 pdfium workers at once. A rayon pool is
//! sized once at startup; jobs beyond its capacity wait in its queue, which
//! is the backpressure the service relies on.
//!
//! Jobs hand their results back through a `tokio::sync::oneshot` channel, so
//! awaiting a job never blocks a runtime thread.

use crate::error::PoolError;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use tokio::sync::oneshot;
use tracing::{debug, error};

/// Process-wide pool. Build it once and share it by `Arc`.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    workers: usize,
}

impl WorkerPool {
    /// Build a pool with exactly `workers` threads named `pdf2md-worker-N`.
    pub fn new(workers: usize) -> Result<Self, PoolError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pdf2md-worker-{i}"))
            .build()
            .map_err(|e| PoolError::Build(e.to_string()))?;
        debug!("Worker pool ready with {} threads", workers);
        Ok(Self { pool, workers })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Queue `job` on the pool and return a future for its result.
    ///
    /// A panic inside `job` resolves to [`PoolError::Panicked`] rather than
    /// taking the worker thread down.
    pub fn submit<F, T>(&self, job: F) -> impl Future<Output = Result<T, PoolError>> + Send + 'static
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.pool.spawn(move || {
            let result = panic::catch_unwind(AssertUnwindSafe(job)).map_err(|payload| {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                error!("Worker job panicked: {}", detail);
                PoolError::Panicked(detail)
            });
            // The receiver is gone if the request was dropped; nothing to do.
            let _ = tx.send(result);
        });

        async move { rx.await.map_err(|_| PoolError::WorkerLost)? }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("workers", &self.workers)
            .finish()
    }
}
