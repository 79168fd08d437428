use crate::memory::{AllocError, AllocatorRef};
use arrow_buffer::{ArrowNativeType, Buffer, MutableBuffer};
use std::ops::Range;


/// Growable byte buffer which remembers the allocator it came from.
///
/// The buffer goes back to the allocator exactly once: either when it is dropped
/// or, if it ends up inside a finished array, through [ResizableBuffer::into_buffer].
pub struct ResizableBuffer {
    allocator: AllocatorRef,
    buffer: MutableBuffer,
    transferred: bool
}


impl ResizableBuffer {
    pub fn allocate(allocator: AllocatorRef, len: usize) -> Result<Self, AllocError> {
        let buffer = allocator.allocate(len)?;
        Ok(Self {
            allocator,
            buffer,
            transferred: false
        })
    }

    pub fn allocator(&self) -> &AllocatorRef {
        &self.allocator
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.buffer.capacity()
    }

    /// Sets the byte length to `len`. Shrinking never fails, the memory is kept.
    pub fn resize(&mut self, len: usize) -> Result<(), AllocError> {
        if len <= self.buffer.len() {
            self.buffer.truncate(len);
            return Ok(())
        }
        self.allocator.resize(&mut self.buffer, len)
    }

    pub fn zero_fill(&mut self, range: Range<usize>) {
        self.allocator.zero_fill(&mut self.buffer.as_slice_mut()[range])
    }

    /// Shortens the buffer without giving memory back to the allocator.
    pub fn truncate(&mut self, len: usize) {
        self.buffer.truncate(len)
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        self.buffer.as_slice()
    }

    #[inline]
    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        self.buffer.as_slice_mut()
    }

    #[inline]
    pub fn typed_data<T: ArrowNativeType>(&self) -> &[T] {
        self.buffer.typed_data()
    }

    #[inline]
    pub fn typed_data_mut<T: ArrowNativeType>(&mut self) -> &mut [T] {
        self.buffer.typed_data_mut()
    }

    /// Hands the memory over to an immutable [Buffer].
    pub fn into_buffer(mut self) -> Buffer {
        self.allocator.transfer(&self.buffer);
        self.transferred = true;
        std::mem::replace(&mut self.buffer, MutableBuffer::new(0)).into()
    }
}


impl Drop for ResizableBuffer {
    fn drop(&mut self) {
        if !self.transferred {
            let buffer = std::mem::replace(&mut self.buffer, MutableBuffer::new(0));
            self.allocator.release(buffer)
        }
    }
}


/// [ResizableBuffer] holding a fixed number of native values.
pub struct NativeBuffer<T> {
    buffer: ResizableBuffer,
    phantom: std::marker::PhantomData<T>
}


impl <T: ArrowNativeType> NativeBuffer<T> {
    pub fn allocate(allocator: AllocatorRef, capacity: usize) -> Result<Self, AllocError> {
        let len = super::bytes_for(capacity, size_of::<T>())?;
        Ok(Self {
            buffer: ResizableBuffer::allocate(allocator, len)?,
            phantom: std::marker::PhantomData
        })
    }

    pub fn capacity(&self) -> usize {
        self.buffer.len() / size_of::<T>()
    }

    pub fn byte_size(&self) -> usize {
        self.buffer.len()
    }

    pub fn resize(&mut self, capacity: usize) -> Result<(), AllocError> {
        let len = super::bytes_for(capacity, size_of::<T>())?;
        self.buffer.resize(len)
    }

    #[inline]
    pub fn get(&self, i: usize) -> T {
        self.buffer.typed_data::<T>()[i]
    }

    #[inline]
    pub fn set(&mut self, i: usize, value: T) {
        self.buffer.typed_data_mut::<T>()[i] = value
    }

    pub fn set_slice(&mut self, offset: usize, values: &[T]) {
        self.buffer.typed_data_mut::<T>()[offset..offset + values.len()].copy_from_slice(values)
    }

    /// Writes the raw native representation of a single value.
    pub fn set_bytes(&mut self, i: usize, bytes: &[u8]) {
        let size = size_of::<T>();
        assert_eq!(bytes.len(), size, "native value must be {} bytes wide", size);
        self.buffer.as_slice_mut()[i * size..(i + 1) * size].copy_from_slice(bytes)
    }

    pub fn as_slice(&self) -> &[T] {
        self.buffer.typed_data()
    }

    pub fn finish(mut self, len: usize) -> Buffer {
        self.buffer.truncate(len * size_of::<T>());
        self.buffer.into_buffer()
    }
}
