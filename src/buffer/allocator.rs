use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU64, Ordering},
};

use crate::foundation::core::{PixelFormat, Rgba8Premul};

/// Tightly packed, row-major pixel storage.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    format: PixelFormat,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocate a transparent buffer, returning `None` instead of aborting when memory is short.
    pub fn try_new(width: u32, height: u32, format: PixelFormat) -> Option<Self> {
        let len = (width as usize)
            .checked_mul(height as usize)?
            .checked_mul(format.bytes_per_pixel())?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).ok()?;
        data.resize(len, 0);
        Some(Self {
            width,
            height,
            format,
            data,
        })
    }

    /// Allocate a transparent RGBA8 buffer with the global allocator.
    pub fn transparent(width: u32, height: u32) -> Self {
        let format = PixelFormat::Rgba8Premul;
        let len = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(format.bytes_per_pixel());
        Self {
            width,
            height,
            format,
            data: vec![0; len],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout.
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// Raw bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw bytes.
    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Size of the pixel storage in bytes.
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// `true` for a zero-sized (or released) buffer.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    fn index(&self, x: i64, y: i64) -> Option<usize> {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return None;
        }
        Some(((y as usize) * (self.width as usize) + (x as usize)) * 4)
    }

    /// Pixel at `(x, y)`, transparent outside the buffer.
    pub fn pixel(&self, x: i64, y: i64) -> Rgba8Premul {
        match self.index(x, y) {
            Some(i) => Rgba8Premul::from_array([
                self.data[i],
                self.data[i + 1],
                self.data[i + 2],
                self.data[i + 3],
            ]),
            None => Rgba8Premul::transparent(),
        }
    }

    /// Overwrite the pixel at `(x, y)`; out-of-range writes are ignored.
    pub fn set_pixel(&mut self, x: i64, y: i64, px: Rgba8Premul) {
        if let Some(i) = self.index(x, y) {
            self.data[i..i + 4].copy_from_slice(&px.to_array());
        }
    }
}

/// Caller-supplied source of pixel buffers.
///
/// `acquire` reports failure as `None` (for example under memory pressure) and must not panic for
/// transient failures. Every buffer handed out is given back through `release` exactly once.
pub trait BufferAllocator: Send + Sync {
    /// Create a transparent buffer, or `None` when allocation fails.
    fn acquire(&self, width: u32, height: u32, format: PixelFormat) -> Option<PixelBuffer>;

    /// Return a buffer obtained from [`BufferAllocator::acquire`].
    fn release(&self, buffer: PixelBuffer);
}

impl<A: BufferAllocator + ?Sized> BufferAllocator for Arc<A> {
    fn acquire(&self, width: u32, height: u32, format: PixelFormat) -> Option<PixelBuffer> {
        (**self).acquire(width, height, format)
    }

    fn release(&self, buffer: PixelBuffer) {
        (**self).release(buffer)
    }
}

/// Heap allocator using fallible reservation; released buffers are simply dropped.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemAllocator;

impl BufferAllocator for SystemAllocator {
    fn acquire(&self, width: u32, height: u32, format: PixelFormat) -> Option<PixelBuffer> {
        PixelBuffer::try_new(width, height, format)
    }

    fn release(&self, buffer: PixelBuffer) {
        drop(buffer);
    }
}

/// Snapshot of [`AllocCounters`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AllocStats {
    /// Successful `acquire` calls.
    pub acquired: u64,
    /// `release` calls.
    pub released: u64,
    /// `acquire` calls that returned `None`.
    pub failed: u64,
}

impl AllocStats {
    /// Buffers acquired but not yet released.
    pub fn outstanding(&self) -> u64 {
        self.acquired.saturating_sub(self.released)
    }
}

/// Shared counters fed by an [`InstrumentedAllocator`].
#[derive(Debug, Default)]
pub struct AllocCounters {
    acquired: AtomicU64,
    released: AtomicU64,
    failed: AtomicU64,
}

impl AllocCounters {
    /// Current values.
    pub fn snapshot(&self) -> AllocStats {
        AllocStats {
            acquired: self.acquired.load(Ordering::Acquire),
            released: self.released.load(Ordering::Acquire),
            failed: self.failed.load(Ordering::Acquire),
        }
    }
}

/// Allocator wrapper reporting acquire/release/failure counts into injected counters, with an
/// optional switch that simulates memory pressure.
pub struct InstrumentedAllocator<A> {
    inner: A,
    counters: Arc<AllocCounters>,
    low_memory: AtomicBool,
}

impl<A: BufferAllocator> InstrumentedAllocator<A> {
    /// Wrap `inner`, reporting into `counters`.
    pub fn new(inner: A, counters: Arc<AllocCounters>) -> Self {
        Self {
            inner,
            counters,
            low_memory: AtomicBool::new(false),
        }
    }

    /// When enabled, every `acquire` fails without reaching the inner allocator.
    pub fn set_simulate_low_memory(&self, enabled: bool) {
        self.low_memory.store(enabled, Ordering::Release);
    }

    /// Current counter values.
    pub fn stats(&self) -> AllocStats {
        self.counters.snapshot()
    }
}

impl<A: BufferAllocator> BufferAllocator for InstrumentedAllocator<A> {
    fn acquire(&self, width: u32, height: u32, format: PixelFormat) -> Option<PixelBuffer> {
        let result = if self.low_memory.load(Ordering::Acquire) {
            None
        } else {
            self.inner.acquire(width, height, format)
        };
        let counter = match result {
            Some(_) => &self.counters.acquired,
            None => &self.counters.failed,
        };
        counter.fetch_add(1, Ordering::AcqRel);
        result
    }

    fn release(&self, buffer: PixelBuffer) {
        self.counters.released.fetch_add(1, Ordering::AcqRel);
        self.inner.release(buffer);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/buffer/allocator.rs"]
mod tests;
