use crate::memory::{check_len, default_allocator, AllocError, Allocator, AllocatorRef};
use arrow_buffer::MutableBuffer;
use parking_lot::Mutex;


/// Keeps released buffers around and hands them out again.
///
/// A request is served from the smallest pooled buffer whose capacity fits,
/// otherwise it goes to the inner allocator. At most `max_pooled` buffers are kept.
pub struct PoolAllocator {
    inner: AllocatorRef,
    max_pooled: usize,
    pool: Mutex<Vec<MutableBuffer>>
}


impl PoolAllocator {
    pub fn new(max_pooled: usize) -> Self {
        Self::wrap(default_allocator(), max_pooled)
    }

    pub fn wrap(inner: AllocatorRef, max_pooled: usize) -> Self {
        Self {
            inner,
            max_pooled,
            pool: Mutex::new(Vec::with_capacity(max_pooled))
        }
    }

    pub fn pooled(&self) -> usize {
        self.pool.lock().len()
    }

    fn take(&self, len: usize) -> Option<MutableBuffer> {
        let mut pool = self.pool.lock();
        let pos = pool.iter()
            .enumerate()
            .filter(|(_, buf)| buf.capacity() >= len)
            .min_by_key(|(_, buf)| buf.capacity())
            .map(|(pos, _)| pos)?;
        Some(pool.swap_remove(pos))
    }
}


impl Allocator for PoolAllocator {
    fn allocate(&self, len: usize) -> Result<MutableBuffer, AllocError> {
        check_len(len)?;
        if let Some(mut buf) = self.take(len) {
            buf.clear();
            buf.resize(len, 0);
            Ok(buf)
        } else {
            self.inner.allocate(len)
        }
    }

    fn resize(&self, buf: &mut MutableBuffer, new_len: usize) -> Result<(), AllocError> {
        self.inner.resize(buf, new_len)
    }

    fn zero_fill(&self, bytes: &mut [u8]) {
        self.inner.zero_fill(bytes)
    }

    fn release(&self, buf: MutableBuffer) {
        if buf.capacity() > 0 {
            let mut pool = self.pool.lock();
            if pool.len() < self.max_pooled {
                pool.push(buf);
                return;
            }
        }
        self.inner.release(buf)
    }

    fn transfer(&self, buf: &MutableBuffer) {
        self.inner.transfer(buf)
    }
}


#[cfg(test)]
mod tests {
    use super::*;


    #[test]
    fn released_buffers_are_reused() {
        let pool = PoolAllocator::new(1);
        let mut buf = pool.allocate(100).unwrap();
        buf.as_slice_mut().fill(1);
        let ptr = buf.as_ptr();
        pool.release(buf);
        assert_eq!(pool.pooled(), 1);

        let buf = pool.allocate(50).unwrap();
        assert_eq!(buf.as_ptr(), ptr);
        assert_eq!(buf.len(), 50);
        assert!(buf.as_slice().iter().all(|b| *b == 0));
        assert_eq!(pool.pooled(), 0);

        let other = pool.allocate(10).unwrap();
        pool.release(buf);
        pool.release(other);
        assert_eq!(pool.pooled(), 1);
    }
}
