/// Worker pool for background skin fetches and persistence
use crate::error::{SkinError, SkinResult};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Duration, Instant};
use tracing::{info, warn};

/// Bounded pool for fetch and persistence tasks
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
    size: usize,
}

impl WorkerPool {
    /// At most `size` tasks run at the same time; the rest wait for a permit
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            tasks: Mutex::new(JoinSet::new()),
            closed: AtomicBool::new(false),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue a task. Fails once [`shutdown`](Self::shutdown) has started.
    pub fn spawn<F>(&self, task: F) -> SkinResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.closed.load(Ordering::Acquire) {
            return Err(SkinError::ShuttingDown);
        }

        let permits = Arc::clone(&self.permits);
        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| SkinError::Internal("Worker pool lock poisoned".to_string()))?;

        // Reap finished tasks so the set does not grow without bound
        while tasks.try_join_next().is_some() {}

        tasks.spawn(async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                // Semaphore closed: the pool is shutting down
                return;
            };
            task.await;
        });

        Ok(())
    }

    /// Stop accepting tasks, wait up to `grace` for running ones and abort the rest.
    ///
    /// Returns the number of tasks that had to be aborted.
    pub async fn shutdown(&self, grace: Duration) -> usize {
        if self.closed.swap(true, Ordering::AcqRel) {
            return 0;
        }
        info!("Shutting down worker pool");

        let mut tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };

        let deadline = Instant::now() + grace;
        loop {
            match timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Err(e))) if e.is_panic() => warn!("Worker task panicked: {}", e),
                Ok(Some(_)) => {}
                Ok(None) => break,
                Err(_) => {
                    let remaining = tasks.len();
                    warn!("Aborting {} worker tasks after {:?} grace period", remaining, grace);
                    tasks.abort_all();
                    while tasks.join_next().await.is_some() {}
                    self.permits.close();
                    return remaining;
                }
            }
        }

        self.permits.close();
        info!("Worker pool stopped");
        0
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}
