use std::{collections::HashMap, sync::Mutex};

use crate::{
    buffer::allocator::{BufferAllocator, PixelBuffer},
    foundation::core::{PixelFormat, lock},
};

/// Pool configuration for retained buffers.
#[derive(Debug, Clone, Copy)]
pub struct PoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained buffers per (w,h,format) bucket.
    pub max_buffers_per_bucket: usize,
}

impl Default for PoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 32 * 1024 * 1024,
            max_buffers_per_bucket: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BufferKey {
    w: u32,
    h: u32,
    format: PixelFormat,
}

impl BufferKey {
    fn byte_len(self) -> usize {
        (self.w as usize)
            .saturating_mul(self.h as usize)
            .saturating_mul(self.format.bytes_per_pixel())
    }
}

/// Counters describing pool reuse.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Buffers currently parked in the pool.
    pub retained_buffers: usize,
    /// Bytes currently parked in the pool.
    pub retained_bytes: usize,
    /// Fresh allocations performed.
    pub alloc_buffers: u64,
    /// Acquisitions served from the pool.
    pub reused_buffers: u64,
    /// Releases that did not fit the pool caps and were dropped.
    pub dropped_on_release: u64,
}

#[derive(Default)]
struct PoolState {
    stats: PoolStats,
    buckets: HashMap<BufferKey, Vec<PixelBuffer>>,
}

/// Bounded pooled allocator keyed by `(width, height, format)`.
///
/// Released buffers are parked for reuse up to the configured caps; reused buffers are cleared
/// to transparent before being handed out.
pub struct PooledAllocator {
    opts: PoolOpts,
    state: Mutex<PoolState>,
}

impl PooledAllocator {
    /// Create an empty pool.
    pub fn new(opts: PoolOpts) -> Self {
        Self {
            opts,
            state: Mutex::new(PoolState::default()),
        }
    }

    /// Current pool counters.
    pub fn stats(&self) -> PoolStats {
        lock(&self.state).stats
    }

    /// Drop every retained buffer.
    pub fn trim(&self) {
        let mut st = lock(&self.state);
        st.buckets.clear();
        st.stats.retained_buffers = 0;
        st.stats.retained_bytes = 0;
    }
}

impl BufferAllocator for PooledAllocator {
    fn acquire(&self, width: u32, height: u32, format: PixelFormat) -> Option<PixelBuffer> {
        let key = BufferKey {
            w: width,
            h: height,
            format,
        };
        {
            let mut st = lock(&self.state);
            let reused = st.buckets.get_mut(&key).and_then(Vec::pop);
            if let Some(mut buf) = reused {
                st.stats.retained_buffers = st.stats.retained_buffers.saturating_sub(1);
                st.stats.retained_bytes = st.stats.retained_bytes.saturating_sub(key.byte_len());
                st.stats.reused_buffers = st.stats.reused_buffers.saturating_add(1);
                drop(st);
                buf.clear();
                return Some(buf);
            }
        }

        let buf = PixelBuffer::try_new(width, height, format)?;
        let mut st = lock(&self.state);
        st.stats.alloc_buffers = st.stats.alloc_buffers.saturating_add(1);
        Some(buf)
    }

    fn release(&self, buffer: PixelBuffer) {
        let mut st = lock(&self.state);
        if self.opts.max_pool_bytes == 0 || self.opts.max_buffers_per_bucket == 0 {
            st.stats.dropped_on_release = st.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let key = BufferKey {
            w: buffer.width(),
            h: buffer.height(),
            format: buffer.format(),
        };
        let bytes = key.byte_len();
        if buffer.byte_len() != bytes
            || st.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes
        {
            st.stats.dropped_on_release = st.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bucket = st.buckets.entry(key).or_default();
        if bucket.len() >= self.opts.max_buffers_per_bucket {
            st.stats.dropped_on_release = st.stats.dropped_on_release.saturating_add(1);
            return;
        }
        bucket.push(buffer);
        st.stats.retained_buffers = st.stats.retained_buffers.saturating_add(1);
        st.stats.retained_bytes = st.stats.retained_bytes.saturating_add(bytes);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/buffer/pool.rs"]
mod tests;
