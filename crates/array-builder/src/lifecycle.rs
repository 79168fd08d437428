use crate::builder::ArrayBuilder;
use arrow::array::ArrayRef;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::debug;


/// Explicit reference count starting at one.
///
/// Retaining or releasing a count which already dropped to zero is a programming error
/// and panics.
pub struct RefCount(AtomicUsize);


impl RefCount {
    pub fn new() -> Self {
        Self(AtomicUsize::new(1))
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    pub fn retain(&self) {
        let result = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| {
            if count == 0 {
                None
            } else {
                Some(count + 1)
            }
        });
        if result.is_err() {
            panic!("retain on a released reference")
        }
    }

    /// Drops one reference. Returns `true` when it was the last one.
    pub fn release(&self) -> bool {
        match self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |count| count.checked_sub(1)) {
            Ok(prev) => prev == 1,
            Err(_) => panic!("release on a released reference")
        }
    }
}


impl Default for RefCount {
    fn default() -> Self {
        Self::new()
    }
}


struct Shared<B> {
    refs: RefCount,
    builder: Mutex<Option<B>>
}


/// Builder handle with explicit retain/release semantics.
///
/// The final [SharedBuilder::release] drops the builder and returns all of its
/// buffers to their allocator. Cloning the handle does not change the count.
pub struct SharedBuilder<B> {
    inner: Arc<Shared<B>>
}


impl <B> Clone for SharedBuilder<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone()
        }
    }
}


impl <B: ArrayBuilder> SharedBuilder<B> {
    pub fn new(builder: B) -> Self {
        Self {
            inner: Arc::new(Shared {
                refs: RefCount::new(),
                builder: Mutex::new(Some(builder))
            })
        }
    }

    pub fn ref_count(&self) -> usize {
        self.inner.refs.get()
    }

    pub fn is_released(&self) -> bool {
        self.ref_count() == 0
    }

    pub fn retain(&self) {
        self.inner.refs.retain()
    }

    /// Returns `true` when this was the final release.
    pub fn release(&self) -> bool {
        if !self.inner.refs.release() {
            return false
        }
        let builder = self.inner.builder.lock().take();
        if let Some(builder) = builder.as_ref() {
            debug!(
                len = builder.len(),
                capacity = builder.capacity(),
                bytes = builder.byte_size(),
                "released shared builder"
            );
        }
        drop(builder);
        true
    }

    /// Exclusive access to the builder.
    pub fn lock(&self) -> MappedMutexGuard<'_, B> {
        MutexGuard::map(self.inner.builder.lock(), |builder| match builder.as_mut() {
            Some(builder) => builder,
            None => panic!("builder is used after its final release")
        })
    }

    pub fn finish(&self) -> ArrayRef {
        self.lock().finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Int32Builder;
    use crate::memory::CheckedAllocator;
    use std::sync::Arc;


    #[test]
    fn ref_count() {
        let refs = RefCount::new();
        refs.retain();
        assert_eq!(refs.get(), 2);
        assert!(!refs.release());
        assert!(refs.release());
        assert_eq!(refs.get(), 0);
    }

    #[test]
    #[should_panic(expected = "release on a released reference")]
    fn release_after_zero() {
        let refs = RefCount::new();
        refs.release();
        refs.release();
    }

    #[test]
    #[should_panic(expected = "retain on a released reference")]
    fn retain_after_zero() {
        let refs = RefCount::new();
        refs.release();
        refs.retain();
    }

    #[test]
    fn final_release_frees_buffers() -> anyhow::Result<()> {
        let allocator = Arc::new(CheckedAllocator::new());
        let shared = SharedBuilder::new(Int32Builder::new(allocator.clone()));
        shared.lock().append_values(&[1, 2, 3], None)?;
        assert!(allocator.live_bytes() > 0);

        for _ in 0..3 {
            shared.retain();
        }
        for _ in 0..3 {
            assert!(!shared.release());
            assert!(allocator.live_bytes() > 0);
        }
        assert!(shared.release());
        assert!(shared.is_released());
        assert_eq!(allocator.live_bytes(), 0);
        assert_eq!(allocator.outstanding(), 0);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "builder is used after its final release")]
    fn use_after_release() {
        let shared = SharedBuilder::new(Int32Builder::new(crate::memory::default_allocator()));
        shared.release();
        let _ = shared.lock().len();
    }

    #[test]
    fn concurrent_retain_release() -> anyhow::Result<()> {
        let allocator = Arc::new(CheckedAllocator::new());
        let shared = SharedBuilder::new(Int32Builder::new(allocator.clone()));
        shared.lock().append_value(7)?;

        let threads: Vec<_> = (0..8).map(|_| {
            let handle = shared.clone();
            handle.retain();
            std::thread::spawn(move || {
                for _ in 0..1000 {
                    handle.retain();
                    handle.lock().append_value(1).unwrap();
                    assert!(!handle.release());
                }
                handle.release()
            })
        }).collect();

        let mut last = 0;
        for t in threads {
            if t.join().unwrap() {
                last += 1;
            }
        }
        assert_eq!(last, 0);
        assert_eq!(shared.ref_count(), 1);
        assert_eq!(shared.lock().len(), 8001);

        assert!(shared.release());
        assert_eq!(allocator.live_bytes(), 0);
        Ok(())
    }
}
