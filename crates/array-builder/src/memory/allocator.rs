use arrow_buffer::MutableBuffer;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, OnceLock};


/// Largest byte length a single buffer may have.
///
/// `MutableBuffer` rounds every allocation up to a multiple of 64 bytes,
/// so the rounded size must still fit into an `isize`.
pub const MAX_BUFFER_LEN: usize = isize::MAX as usize - 63;


#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    CapacityOverflow {
        requested: usize
    },
    LimitExceeded {
        requested: usize,
        limit: usize
    }
}


impl Display for AllocError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocError::CapacityOverflow { requested } => {
                write!(f, "buffer capacity overflow: requested {} bytes", requested)
            },
            AllocError::LimitExceeded { requested, limit } => {
                write!(f, "allocation limit exceeded: requested {} bytes, limit is {} bytes", requested, limit)
            }
        }
    }
}


impl std::error::Error for AllocError {}


/// Source of every buffer a builder owns.
///
/// Builders never allocate on their own. They ask the allocator for a buffer,
/// grow it through the allocator and give it back with [Allocator::release]
/// once they are done with it, or report with [Allocator::transfer] that the
/// buffer left their custody as part of a finished array.
pub trait Allocator: Send + Sync {
    /// Returns a buffer of exactly `len` bytes. Contents are unspecified.
    fn allocate(&self, len: usize) -> Result<MutableBuffer, AllocError>;

    /// Sets the byte length of `buf` to `new_len`.
    ///
    /// Contents of newly added bytes are unspecified.
    /// On error `buf` is left untouched.
    fn resize(&self, buf: &mut MutableBuffer, new_len: usize) -> Result<(), AllocError>;

    fn zero_fill(&self, bytes: &mut [u8]) {
        bytes.fill(0)
    }

    fn release(&self, buf: MutableBuffer);

    fn transfer(&self, _buf: &MutableBuffer) {}
}


pub type AllocatorRef = Arc<dyn Allocator>;


/// Plain heap allocator backed by [MutableBuffer].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemAllocator;


impl Allocator for SystemAllocator {
    fn allocate(&self, len: usize) -> Result<MutableBuffer, AllocError> {
        check_len(len)?;
        Ok(MutableBuffer::from_len_zeroed(len))
    }

    fn resize(&self, buf: &mut MutableBuffer, new_len: usize) -> Result<(), AllocError> {
        check_len(new_len)?;
        buf.resize(new_len, 0);
        Ok(())
    }

    fn release(&self, buf: MutableBuffer) {
        drop(buf)
    }
}


/// Shared [SystemAllocator] used when a builder is created without an explicit allocator.
pub fn default_allocator() -> AllocatorRef {
    static DEFAULT: OnceLock<AllocatorRef> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(SystemAllocator)).clone()
}


#[inline]
pub fn check_len(len: usize) -> Result<(), AllocError> {
    if len > MAX_BUFFER_LEN {
        Err(AllocError::CapacityOverflow {
            requested: len
        })
    } else {
        Ok(())
    }
}


/// Byte length of a buffer holding `items` values of `item_size` bytes each.
#[inline]
pub fn bytes_for(items: usize, item_size: usize) -> Result<usize, AllocError> {
    let len = items.checked_mul(item_size).ok_or(AllocError::CapacityOverflow {
        requested: usize::MAX
    })?;
    check_len(len)?;
    Ok(len)
}


#[cfg(test)]
mod tests {
    use super::*;


    #[test]
    fn system_allocator_rejects_huge_requests() {
        let err = SystemAllocator.allocate(usize::MAX).unwrap_err();
        assert_eq!(err, AllocError::CapacityOverflow { requested: usize::MAX });

        let mut buf = SystemAllocator.allocate(16).unwrap();
        buf.as_slice_mut().fill(7);
        assert!(SystemAllocator.resize(&mut buf, usize::MAX / 2).is_err());
        assert_eq!(buf.as_slice(), &[7; 16]);
    }

    #[test]
    fn system_allocator_resizes() {
        let mut buf = SystemAllocator.allocate(3).unwrap();
        assert_eq!(buf.as_slice(), &[0, 0, 0]);
        SystemAllocator.resize(&mut buf, 100).unwrap();
        assert_eq!(buf.len(), 100);
        SystemAllocator.resize(&mut buf, 10).unwrap();
        assert_eq!(buf.len(), 10);
    }

    #[test]
    fn bytes_for_overflow() {
        assert_eq!(bytes_for(4, 8), Ok(32));
        assert!(bytes_for(usize::MAX / 4, 8).is_err());
    }
}
