//! Fixed-size download worker pool over a bounded queue.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tracing::{Instrument, Span, debug, error, warn};

use crate::domain::entities::CacheKey;
use crate::domain::errors::{CacheError, CacheResult};

/// Default number of workers.
pub const DEFAULT_WORKERS: usize = 3;

/// Default queue capacity before producers are held back.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Work executed for every dequeued task.
#[async_trait]
pub trait DownloadHandler: Send + Sync + 'static {
    /// Ensures `url` is cached under `key`, returning the stored path.
    async fn handle(&self, url: &str, key: &CacheKey) -> CacheResult<PathBuf>;
}

/// Completion tracking for one group of tasks.
///
/// Each live [`DownloadTask`] counts as pending until it is dropped, so a task
/// finishes its batch whether it succeeded, failed, or was never delivered.
#[derive(Debug, Default)]
pub struct Batch {
    pending: AtomicUsize,
    failed: AtomicUsize,
    notify: Notify,
}

impl Batch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Tasks created for this batch that have not finished.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Tasks that finished with an error.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    /// Waits until no task of this batch is pending.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.pending() == 0 {
                return;
            }
            notified.await;
        }
    }

    fn start(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}

/// One deferred download.
#[derive(Debug)]
pub struct DownloadTask {
    /// Remote asset URL.
    pub url: String,
    /// Key to store the asset under.
    pub key: CacheKey,
    span: Span,
    batch: Arc<Batch>,
}

impl DownloadTask {
    /// Creates a task counted against `batch`, logging under `span`.
    #[must_use]
    pub fn new(url: String, key: CacheKey, batch: &Arc<Batch>, span: Span) -> Self {
        batch.start();
        Self {
            url,
            key,
            span,
            batch: Arc::clone(batch),
        }
    }
}

impl Drop for DownloadTask {
    fn drop(&mut self) {
        self.batch.finish();
    }
}

/// Sizing for the pool.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPoolConfig {
    /// Number of concurrent workers.
    pub workers: usize,
    /// Bounded queue capacity.
    pub queue_capacity: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Workers draining a bounded task queue.
///
/// Enqueueing waits while the queue is full. After `shutdown` the queue is
/// closed and new submissions fail with `CacheError::QueueClosed`.
pub struct WorkerPool {
    sender: Mutex<Option<mpsc::Sender<DownloadTask>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    config: WorkerPoolConfig,
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl WorkerPool {
    /// Spawns the workers on the current Tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    #[must_use]
    pub fn spawn(config: WorkerPoolConfig, handler: Arc<dyn DownloadHandler>) -> Self {
        let config = WorkerPoolConfig {
            workers: config.workers.max(1),
            queue_capacity: config.queue_capacity.max(1),
        };

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let receiver = Arc::new(AsyncMutex::new(receiver));

        let workers = (0..config.workers)
            .map(|id| tokio::spawn(run_worker(id, receiver.clone(), handler.clone())))
            .collect();

        debug!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "Download worker pool started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            workers: Mutex::new(workers),
            config,
        }
    }

    /// Returns the effective pool sizing.
    #[must_use]
    pub const fn config(&self) -> WorkerPoolConfig {
        self.config
    }

    /// Returns true once `shutdown` has closed the queue.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Returns a handle for enqueueing tasks.
    ///
    /// # Errors
    /// Returns `CacheError::QueueClosed` if the pool has been shut down.
    pub fn submitter(&self) -> CacheResult<Submitter> {
        self.sender
            .lock()
            .clone()
            .map(|sender| Submitter { sender })
            .ok_or(CacheError::QueueClosed)
    }

    /// Enqueues `tasks` in order from a background feeder task.
    ///
    /// The feeder waits for queue space as needed and never drops a task
    /// while workers are running. It keeps the queue open until every task
    /// is enqueued, so `shutdown` still drains all of them.
    ///
    /// # Errors
    /// Returns `CacheError::QueueClosed` if the pool has been shut down.
    pub fn submit_all(&self, tasks: Vec<DownloadTask>) -> CacheResult<()> {
        let submitter = self.submitter().inspect_err(|_| {
            error!(tasks = tasks.len(), "Downloads submitted after shutdown");
        })?;

        tokio::spawn(async move {
            for task in tasks {
                if let Err(e) = submitter.submit(task).await {
                    warn!(error = %e, "Download feeder stopped early");
                    break;
                }
            }
        });
        Ok(())
    }

    /// Closes the queue and waits for every worker to drain it and exit.
    ///
    /// Calling this more than once is a no-op.
    pub async fn shutdown(&self) {
        let Some(sender) = self.sender.lock().take() else {
            debug!("Worker pool already shut down");
            return;
        };
        drop(sender);

        let workers = std::mem::take(&mut *self.workers.lock());
        for result in join_all(workers).await {
            if let Err(e) = result {
                error!(error = %e, "Download worker terminated abnormally");
            }
        }

        debug!("Download worker pool stopped");
    }
}

/// Cloneable enqueue handle.
///
/// The queue stays open while any `Submitter` is alive.
#[derive(Debug, Clone)]
pub struct Submitter {
    sender: mpsc::Sender<DownloadTask>,
}

impl Submitter {
    /// Enqueues a task, waiting while the queue is full.
    ///
    /// # Errors
    /// Returns `CacheError::QueueClosed` once every worker has exited.
    pub async fn submit(&self, task: DownloadTask) -> CacheResult<()> {
        self.sender
            .send(task)
            .await
            .map_err(|_| CacheError::QueueClosed)
    }
}

async fn run_worker(
    id: usize,
    receiver: Arc<AsyncMutex<mpsc::Receiver<DownloadTask>>>,
    handler: Arc<dyn DownloadHandler>,
) {
    loop {
        let Some(task) = receiver.lock().await.recv().await else {
            break;
        };

        let span = task.span.clone();
        async {
            match handler.handle(&task.url, &task.key).await {
                Ok(path) => {
                    debug!(worker = id, key = %task.key, path = %path.display(), "Prewarmed asset");
                }
                Err(e) => {
                    task.batch.failed.fetch_add(1, Ordering::SeqCst);
                    warn!(
                        worker = id,
                        key = %task.key,
                        url = %task.url,
                        error = %e,
                        network = e.is_network_error(),
                        "Prewarm download failed"
                    );
                }
            }
        }
        .instrument(span)
        .await;
    }

    debug!(worker = id, "Download worker stopped");
}
