use std::{
    collections::VecDeque,
    fmt,
    sync::{Arc, Mutex},
};

use crate::{
    foundation::core::lock,
    foundation::error::{ShimmerError, ShimmerResult},
};

/// Unit of background work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs buffer initialization off the render thread.
pub trait TaskSpawner: Send + Sync {
    /// Schedule `task`. Must not block on the task's completion.
    fn spawn(&self, task: Task);
}

/// Spawner backed by rayon: the global pool, or a dedicated one.
#[derive(Clone, Default)]
pub struct RayonSpawner {
    pool: Option<Arc<rayon::ThreadPool>>,
}

impl RayonSpawner {
    /// Spawn onto rayon's global pool.
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Spawn onto a dedicated pool. `None` uses rayon's default thread count.
    pub fn with_threads(threads: Option<usize>) -> ShimmerResult<Self> {
        Ok(Self {
            pool: Some(Arc::new(build_thread_pool(threads)?)),
        })
    }
}

impl fmt::Debug for RayonSpawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RayonSpawner")
            .field("dedicated", &self.pool.is_some())
            .finish()
    }
}

impl TaskSpawner for RayonSpawner {
    fn spawn(&self, task: Task) {
        match &self.pool {
            Some(pool) => pool.spawn(task),
            None => rayon::spawn(task),
        }
    }
}

fn build_thread_pool(threads: Option<usize>) -> ShimmerResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(ShimmerError::validation(
            "spawner 'threads' must be >= 1 when set",
        ));
    }
    let mut builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("shimmer-{i}"));
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| ShimmerError::Other(anyhow::anyhow!("failed to build rayon thread pool: {e}")))
}

/// Runs each task on the calling thread as soon as it is spawned.
///
/// Results still travel through the completion channel, so they become visible on the next poll.
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineSpawner;

impl TaskSpawner for InlineSpawner {
    fn spawn(&self, task: Task) {
        task();
    }
}

/// Queues tasks until the host runs them explicitly.
///
/// Useful for hosts with their own idle-time executor and for deterministic tests.
#[derive(Clone, Default)]
pub struct ManualSpawner {
    queue: Arc<Mutex<VecDeque<Task>>>,
}

impl ManualSpawner {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks.
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Run the oldest queued task. Returns `false` when the queue was empty.
    pub fn run_one(&self) -> bool {
        // Pop before running so a task may spawn more work without deadlocking.
        let task = lock(&self.queue).pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run queued tasks until the queue is empty; returns how many ran.
    pub fn run_all(&self) -> usize {
        let mut n = 0;
        while self.run_one() {
            n += 1;
        }
        n
    }
}

impl fmt::Debug for ManualSpawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualSpawner")
            .field("pending", &self.pending())
            .finish()
    }
}

impl TaskSpawner for ManualSpawner {
    fn spawn(&self, task: Task) {
        lock(&self.queue).push_back(task);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/buffer/spawn.rs"]
mod tests;
