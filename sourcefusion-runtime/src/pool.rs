//! Bounded worker pool for CPU-bound batches
//!
//! Fusion and scoring are synchronous and CPU-bound. Running a large batch
//! of them inline would block the async executor, so the pool splits the
//! batch into chunks and runs each chunk on tokio's blocking pool, with a
//! semaphore capping how many chunks run at once.
//!
//! Results come back in input order whatever the batch size.

use std::sync::Arc;

use log::debug;
use tokio::sync::Semaphore;

use crate::errors::{Result, RuntimeError};
use crate::probe::panic_message;

/// Upper bound on the default pool size
///
/// Source: Diminishing returns past 32 concurrent fusion chunks on
/// commodity hosts
pub const MAX_DEFAULT_WORKERS: usize = 32;

/// Chunk size for a batch of `len` items
///
/// Small batches get small chunks so they still spread across workers;
/// large batches get larger chunks to amortize task overhead.
pub fn chunk_size(len: usize) -> usize {
    match len {
        0..=99 => 10,
        100..=499 => 20,
        500..=999 => 30,
        _ => 50,
    }
}

/// `min(2 × available parallelism, 32)`
pub fn default_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .saturating_mul(2)
        .min(MAX_DEFAULT_WORKERS)
}

/// Semaphore-bounded pool over tokio's blocking threads
#[derive(Debug, Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(default_size())
    }
}

impl WorkerPool {
    /// Pool running at most `size` chunks at once (at least one)
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Maximum concurrent chunks
    pub fn size(&self) -> usize {
        self.size
    }

    /// Chunks that could start right now
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Apply `f` to every item, preserving order
    pub async fn map<T, R, F>(&self, items: Vec<T>, f: F) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }
        let chunk = chunk_size(total);
        let f = Arc::new(f);

        let mut handles = Vec::with_capacity(total.div_ceil(chunk));
        let mut items = items.into_iter();
        loop {
            let batch: Vec<T> = items.by_ref().take(chunk).collect();
            if batch.is_empty() {
                break;
            }
            let permit = Arc::clone(&self.permits)
                .acquire_owned()
                .await
                .map_err(|_| RuntimeError::PoolClosed)?;
            let f = Arc::clone(&f);
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                batch.into_iter().map(|item| f(item)).collect::<Vec<R>>()
            }));
        }
        debug!("worker pool: {total} items in {} chunks of {chunk}", handles.len());

        let mut results = Vec::with_capacity(total);
        for handle in handles {
            let chunk_results = handle.await.map_err(|err| {
                if err.is_panic() {
                    RuntimeError::Worker(panic_message(err.into_panic().as_ref()))
                } else {
                    RuntimeError::Worker(err.to_string())
                }
            })?;
            results.extend(chunk_results);
        }
        Ok(results)
    }

    /// Stop handing out permits; queued and future `map` calls fail
    pub fn close(&self) {
        self.permits.close();
    }
}
