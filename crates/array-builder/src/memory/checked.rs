use crate::memory::{default_allocator, AllocError, Allocator, AllocatorRef};
use arrow_buffer::MutableBuffer;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::warn;


/// Allocator which keeps count of everything passing through it.
///
/// Live bytes are measured by buffer capacity. An optional limit turns requests
/// that would push live bytes above it into [AllocError::LimitExceeded].
pub struct CheckedAllocator {
    inner: AllocatorRef,
    limit: Option<usize>,
    live: AtomicUsize,
    allocations: AtomicUsize,
    releases: AtomicUsize,
    transfers: AtomicUsize
}


impl CheckedAllocator {
    pub fn new() -> Self {
        Self::wrap(default_allocator())
    }

    pub fn wrap(inner: AllocatorRef) -> Self {
        Self {
            inner,
            limit: None,
            live: AtomicUsize::new(0),
            allocations: AtomicUsize::new(0),
            releases: AtomicUsize::new(0),
            transfers: AtomicUsize::new(0)
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn live_bytes(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    pub fn allocations(&self) -> usize {
        self.allocations.load(Ordering::Acquire)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::Acquire)
    }

    pub fn transfers(&self) -> usize {
        self.transfers.load(Ordering::Acquire)
    }

    /// Number of buffers handed out and neither released nor transferred yet.
    pub fn outstanding(&self) -> usize {
        self.allocations() - self.releases() - self.transfers()
    }

    fn check_limit(&self, additional: usize) -> Result<(), AllocError> {
        if additional == 0 {
            return Ok(())
        }
        if let Some(limit) = self.limit {
            let requested = self.live_bytes().saturating_add(additional);
            if requested > limit {
                warn!(requested, limit, "allocation rejected");
                return Err(AllocError::LimitExceeded {
                    requested,
                    limit
                })
            }
        }
        Ok(())
    }
}


impl Default for CheckedAllocator {
    fn default() -> Self {
        Self::new()
    }
}


impl Allocator for CheckedAllocator {
    fn allocate(&self, len: usize) -> Result<MutableBuffer, AllocError> {
        self.check_limit(len)?;
        let buf = self.inner.allocate(len)?;
        self.live.fetch_add(buf.capacity(), Ordering::AcqRel);
        self.allocations.fetch_add(1, Ordering::AcqRel);
        Ok(buf)
    }

    fn resize(&self, buf: &mut MutableBuffer, new_len: usize) -> Result<(), AllocError> {
        let before = buf.capacity();
        self.check_limit(new_len.saturating_sub(before))?;
        self.inner.resize(buf, new_len)?;
        let after = buf.capacity();
        if after >= before {
            self.live.fetch_add(after - before, Ordering::AcqRel);
        } else {
            self.live.fetch_sub(before - after, Ordering::AcqRel);
        }
        Ok(())
    }

    fn zero_fill(&self, bytes: &mut [u8]) {
        self.inner.zero_fill(bytes)
    }

    fn release(&self, buf: MutableBuffer) {
        self.live.fetch_sub(buf.capacity(), Ordering::AcqRel);
        self.releases.fetch_add(1, Ordering::AcqRel);
        self.inner.release(buf)
    }

    fn transfer(&self, buf: &MutableBuffer) {
        self.live.fetch_sub(buf.capacity(), Ordering::AcqRel);
        self.transfers.fetch_add(1, Ordering::AcqRel);
        self.inner.transfer(buf)
    }
}
