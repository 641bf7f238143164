//! Lazily built mask and scratch buffers shared by one sync group.
//!
//! Each buffer kind lives in a [`Slot`] that is exactly one of absent, pending, or ready. Builds
//! run on a [`TaskSpawner`] and report back through an `mpsc` channel that only the render thread
//! drains, so the render path never blocks on a build.

use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex, MutexGuard, mpsc},
};

use crate::{
    buffer::allocator::{BufferAllocator, PixelBuffer},
    buffer::mask::{MaskSpec, paint_band_mask},
    buffer::spawn::TaskSpawner,
    foundation::core::{PixelFormat, lock},
};

/// Which cached buffer a job builds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BufferKind {
    /// Painted band opacity profile.
    Mask,
    /// Transparent composition target of the same size.
    Scratch,
}

/// Shared handle to a cached buffer.
///
/// Clones refer to the same pixels. After the cache releases the buffer the handle reads as an
/// empty buffer.
#[derive(Clone)]
pub struct BufferHandle {
    id: u64,
    pixels: Arc<Mutex<PixelBuffer>>,
}

impl BufferHandle {
    fn new(id: u64, buffer: PixelBuffer) -> Self {
        Self {
            id,
            pixels: Arc::new(Mutex::new(buffer)),
        }
    }

    /// Identity of the cached buffer, unique within its cache.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// `true` when both handles refer to the same buffer instance.
    pub fn ptr_eq(&self, other: &BufferHandle) -> bool {
        Arc::ptr_eq(&self.pixels, &other.pixels)
    }

    /// Lock the pixels for reading or writing.
    pub fn pixels(&self) -> MutexGuard<'_, PixelBuffer> {
        lock(&self.pixels)
    }

    fn take(&self) -> PixelBuffer {
        std::mem::take(&mut *lock(&self.pixels))
    }
}

impl fmt::Debug for BufferHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferHandle").field("id", &self.id).finish()
    }
}

/// Result of asking the cache for a buffer.
#[derive(Clone, Debug)]
pub enum BufferState {
    /// The buffer is built; the same instance is returned until the cache is cleared.
    Ready(BufferHandle),
    /// A build is in flight (or was just scheduled).
    Pending,
    /// No buffer this frame: the cache just recovered from an allocation failure, or no geometry
    /// is configured.
    Unavailable,
}

impl BufferState {
    /// The handle when ready.
    pub fn ready(&self) -> Option<&BufferHandle> {
        match self {
            Self::Ready(h) => Some(h),
            _ => None,
        }
    }
}

enum Slot {
    Absent,
    Pending { generation: u64 },
    Ready(BufferHandle),
}

/// A buffer on its way from a job to the cache.
///
/// Dropping it unclaimed (stale result, closed channel) gives the buffer back to the allocator,
/// so every acquired buffer is released exactly once.
struct Acquired {
    buffer: Option<PixelBuffer>,
    allocator: Arc<dyn BufferAllocator>,
}

impl Acquired {
    fn claim(mut self) -> Option<PixelBuffer> {
        self.buffer.take()
    }
}

impl Drop for Acquired {
    fn drop(&mut self) {
        if let Some(buf) = self.buffer.take() {
            self.allocator.release(buf);
        }
    }
}

struct Completion {
    kind: BufferKind,
    generation: u64,
    buffer: Option<Acquired>,
}

/// What draining the completion channel changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Buffers that became ready.
    pub ready: usize,
    /// Results discarded because the cache was cleared after they were scheduled.
    pub stale: usize,
    /// An allocation failed; the cache has already released everything.
    pub low_memory: bool,
}

/// Counters for tests and diagnostics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Build jobs handed to the spawner.
    pub jobs_scheduled: u64,
    /// Low-memory recoveries performed.
    pub recoveries: u64,
    /// Current generation.
    pub generation: u64,
}

/// Owner of one group's mask and scratch buffers.
pub struct BufferCache {
    allocator: Arc<dyn BufferAllocator>,
    spawner: Arc<dyn TaskSpawner>,
    mask: Slot,
    scratch: Slot,
    generation: u64,
    next_id: u64,
    stats: CacheStats,
    tx: mpsc::Sender<Completion>,
    rx: mpsc::Receiver<Completion>,
}

impl BufferCache {
    /// Create an empty cache.
    pub fn new(allocator: Arc<dyn BufferAllocator>, spawner: Arc<dyn TaskSpawner>) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            allocator,
            spawner,
            mask: Slot::Absent,
            scratch: Slot::Absent,
            generation: 0,
            next_id: 0,
            stats: CacheStats::default(),
            tx,
            rx,
        }
    }

    /// Diagnostic counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            generation: self.generation,
            ..self.stats
        }
    }

    /// Mask buffer, scheduling its build on first request.
    pub fn mask(&mut self, spec: &MaskSpec) -> BufferState {
        self.get(BufferKind::Mask, spec)
    }

    /// Scratch buffer, scheduling its allocation on first request.
    pub fn scratch(&mut self, spec: &MaskSpec) -> BufferState {
        self.get(BufferKind::Scratch, spec)
    }

    /// `true` when either buffer is built or being built.
    pub fn is_active(&self) -> bool {
        !matches!(
            (&self.mask, &self.scratch),
            (Slot::Absent, Slot::Absent)
        )
    }

    fn slot_mut(&mut self, kind: BufferKind) -> &mut Slot {
        match kind {
            BufferKind::Mask => &mut self.mask,
            BufferKind::Scratch => &mut self.scratch,
        }
    }

    fn get(&mut self, kind: BufferKind, spec: &MaskSpec) -> BufferState {
        match self.slot_mut(kind) {
            Slot::Ready(h) => BufferState::Ready(h.clone()),
            Slot::Pending { .. } => BufferState::Pending,
            Slot::Absent => {
                self.schedule(kind, spec);
                BufferState::Pending
            }
        }
    }

    fn schedule(&mut self, kind: BufferKind, spec: &MaskSpec) {
        let generation = self.generation;
        *self.slot_mut(kind) = Slot::Pending { generation };
        self.stats.jobs_scheduled = self.stats.jobs_scheduled.saturating_add(1);
        tracing::debug!(?kind, generation, rect = ?spec.rect, "scheduling buffer build");

        let allocator = self.allocator.clone();
        let tx = self.tx.clone();
        let spec = spec.clone();
        self.spawner.spawn(Box::new(move || {
            let buffer = build_buffer(kind, &spec, &allocator);
            // A closed channel drops the completion, which releases the buffer.
            let _ = tx.send(Completion {
                kind,
                generation,
                buffer,
            });
        }));
    }

    /// Drain finished builds. Must be called on the render thread.
    pub fn poll(&mut self) -> PollReport {
        let mut report = PollReport::default();
        while let Ok(done) = self.rx.try_recv() {
            let current = matches!(
                self.slot_mut(done.kind),
                Slot::Pending { generation } if *generation == done.generation
            );
            if !current {
                report.stale += 1;
                tracing::trace!(kind = ?done.kind, generation = done.generation, "discarding stale buffer build");
                continue;
            }

            match done.buffer.and_then(Acquired::claim) {
                Some(buf) => {
                    let id = self.next_id;
                    self.next_id = self.next_id.wrapping_add(1);
                    *self.slot_mut(done.kind) = Slot::Ready(BufferHandle::new(id, buf));
                    report.ready += 1;
                }
                None => {
                    tracing::warn!(kind = ?done.kind, "buffer allocation failed, recovering");
                    self.release();
                    self.stats.recoveries = self.stats.recoveries.saturating_add(1);
                    report.low_memory = true;
                }
            }
        }
        report
    }

    /// Release every built buffer and forget pending builds.
    ///
    /// Builds still in flight are released when they report back.
    pub fn release(&mut self) {
        for kind in [BufferKind::Mask, BufferKind::Scratch] {
            let slot = std::mem::replace(self.slot_mut(kind), Slot::Absent);
            if let Slot::Ready(handle) = slot {
                self.allocator.release(handle.take());
            }
        }
        self.generation = self.generation.wrapping_add(1);
    }
}

impl Drop for BufferCache {
    fn drop(&mut self) {
        self.release();
        // Queued completions are dropped with the receiver and release their buffers.
    }
}

impl fmt::Debug for BufferCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = |s: &Slot| match s {
            Slot::Absent => "absent",
            Slot::Pending { .. } => "pending",
            Slot::Ready(_) => "ready",
        };
        f.debug_struct("BufferCache")
            .field("mask", &state(&self.mask))
            .field("scratch", &state(&self.scratch))
            .field("generation", &self.generation)
            .finish()
    }
}

fn build_buffer(
    kind: BufferKind,
    spec: &MaskSpec,
    allocator: &Arc<dyn BufferAllocator>,
) -> Option<Acquired> {
    let (w, h) = (spec.rect.width, spec.rect.height);
    // A panicking allocator counts as a failed allocation.
    let buffer = catch_unwind(AssertUnwindSafe(|| {
        allocator.acquire(w, h, PixelFormat::Rgba8Premul)
    }))
    .ok()
    .flatten()?;

    let mut acquired = Acquired {
        buffer: Some(buffer),
        allocator: allocator.clone(),
    };
    if kind == BufferKind::Mask
        && let Some(buf) = acquired.buffer.as_mut()
    {
        paint_band_mask(buf, spec);
    }
    Some(acquired)
}

#[cfg(test)]
#[path = "../../tests/unit/buffer/cache.rs"]
mod tests;
