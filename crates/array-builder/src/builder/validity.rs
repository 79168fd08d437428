use crate::builder::MIN_BUILDER_CAPACITY;
use crate::memory::{AllocError, AllocatorRef, ResizableBuffer};
use crate::util::bit_tools;
use arrow_buffer::{bit_util, BooleanBuffer, NullBuffer};
use tracing::{debug, trace};


/// Bit-packed validity bitmap shared by every concrete builder.
///
/// Tracks the logical length, capacity and null count of the array being built.
/// Bits at positions `>= len` are always kept zero, so appending a null only
/// needs to bump the counters.
pub struct ValidityBuilder {
    allocator: AllocatorRef,
    bitmap: Option<ResizableBuffer>,
    nulls: usize,
    len: usize,
    capacity: usize
}


impl ValidityBuilder {
    pub fn new(allocator: AllocatorRef) -> Self {
        Self {
            allocator,
            bitmap: None,
            nulls: 0,
            len: 0,
            capacity: 0
        }
    }

    pub fn allocator(&self) -> &AllocatorRef {
        &self.allocator
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn null_count(&self) -> usize {
        self.nulls
    }

    pub fn is_initialized(&self) -> bool {
        self.bitmap.is_some()
    }

    pub fn byte_size(&self) -> usize {
        self.bitmap.as_ref().map_or(0, |b| b.len())
    }

    /// Bitmap bytes, including the unused tail up to the current capacity.
    pub fn as_slice(&self) -> &[u8] {
        self.bitmap.as_ref().map_or(&[], |b| b.as_slice())
    }

    pub fn is_valid(&self, i: usize) -> bool {
        assert!(i < self.len, "index {} is out of bounds for length {}", i, self.len);
        bit_util::get_bit(self.as_slice(), i)
    }

    /// Allocates a zeroed bitmap for `capacity` elements.
    pub fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        let byte_len = bit_util::ceil(capacity, 8);
        let mut bitmap = ResizableBuffer::allocate(self.allocator.clone(), byte_len)?;
        bitmap.zero_fill(0..byte_len);
        self.bitmap = Some(bitmap);
        self.capacity = capacity;
        Ok(())
    }

    /// Capacity the builder has to be resized to before `additional` more elements can be appended.
    ///
    /// Growth goes to the next power of two, but never below [MIN_BUILDER_CAPACITY].
    pub fn grow_target(&self, additional: usize) -> Result<Option<usize>, AllocError> {
        let required = self.len.checked_add(additional).ok_or(AllocError::CapacityOverflow {
            requested: usize::MAX
        })?;
        if required <= self.capacity {
            return Ok(None)
        }
        let capacity = required.checked_next_power_of_two().ok_or(AllocError::CapacityOverflow {
            requested: required
        })?;
        Ok(Some(std::cmp::max(capacity, MIN_BUILDER_CAPACITY)))
    }

    /// Sets the capacity to `capacity` elements.
    ///
    /// Shrinking below the current length truncates the bitmap and recounts nulls
    /// over the retained prefix.
    pub fn resize(&mut self, capacity: usize) -> Result<(), AllocError> {
        let bitmap = match self.bitmap.as_mut() {
            Some(bitmap) => bitmap,
            None => return self.init(capacity)
        };

        if capacity == self.capacity {
            return Ok(())
        }

        let old_byte_len = bitmap.len();
        let new_byte_len = bit_util::ceil(capacity, 8);
        bitmap.resize(new_byte_len)?;
        if new_byte_len > old_byte_len {
            bitmap.zero_fill(old_byte_len..new_byte_len);
        }
        self.capacity = capacity;

        if capacity < self.len {
            self.len = capacity;
            self.nulls = capacity - bit_tools::count_set_bits(bitmap.as_slice(), capacity);
            bit_tools::clear_trailing_bits(bitmap.as_slice_mut(), capacity);
            debug!(len = capacity, null_count = self.nulls, "truncated validity bitmap");
        } else {
            debug!(capacity, bytes = new_byte_len, "resized validity bitmap");
        }
        Ok(())
    }

    /// Bitmap bytes, checked to have room for `additional` more elements.
    #[inline]
    fn reserved_bits(&mut self, additional: usize) -> &mut [u8] {
        match self.bitmap.as_mut() {
            Some(bitmap) if self.len + additional <= self.capacity => bitmap.as_slice_mut(),
            _ => panic!(
                "validity bitmap has no room for {} more elements (len = {}, capacity = {})",
                additional,
                self.len,
                self.capacity
            )
        }
    }

    /// Appends a single element. Room must have been reserved.
    #[inline]
    pub fn append(&mut self, valid: bool) {
        let i = self.len;
        let bits = self.reserved_bits(1);
        if valid {
            bit_util::set_bit(bits, i);
        } else {
            self.nulls += 1;
        }
        self.len += 1
    }

    /// Appends `count` valid elements. Room must have been reserved.
    pub fn append_n_valid(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        let start = self.len;
        let end = start + count;
        let bits = self.reserved_bits(count);

        let pad = std::cmp::min((8 - start % 8) % 8, count);
        for i in start..start + pad {
            bit_util::set_bit(bits, i)
        }

        let first_byte = (start + pad) / 8;
        let full_bytes = (count - pad) / 8;
        bits[first_byte..first_byte + full_bytes].fill(0xFF);

        for i in start + pad + full_bytes * 8..end {
            bit_util::set_bit(bits, i)
        }

        self.len = end
    }

    /// Appends `count` nulls. Room must have been reserved.
    pub fn append_n_nulls(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        self.reserved_bits(count);
        self.nulls += count;
        self.len += count
    }

    /// Appends one element per entry of `valid`. Room must have been reserved.
    pub fn append_slice(&mut self, valid: &[bool]) {
        if valid.is_empty() {
            return;
        }
        let start = self.len;
        let bits = self.reserved_bits(valid.len());

        let mut byte_offset = start / 8;
        let mut bit_offset = start % 8;
        let mut acc = bits[byte_offset];
        let mut nulls = 0;

        for &is_valid in valid {
            if bit_offset == 8 {
                bits[byte_offset] = acc;
                byte_offset += 1;
                bit_offset = 0;
                acc = bits[byte_offset];
            }
            if is_valid {
                acc |= 1 << bit_offset;
            } else {
                acc &= !(1 << bit_offset);
                nulls += 1;
            }
            bit_offset += 1;
        }
        bits[byte_offset] = acc;

        self.nulls += nulls;
        self.len += valid.len()
    }

    /// Appends `count` elements, all valid when `validity` is `None`.
    pub fn append_bulk(&mut self, validity: Option<&[bool]>, count: usize) {
        match validity {
            Some(valid) => {
                assert_eq!(valid.len(), count, "validity length must match the number of appended values");
                self.append_slice(valid)
            },
            None => self.append_n_valid(count)
        }
    }

    /// Releases the bitmap and returns to the empty, unallocated state.
    pub fn reset(&mut self) {
        self.bitmap = None;
        self.nulls = 0;
        self.len = 0;
        self.capacity = 0
    }

    /// Moves the bitmap out as a [NullBuffer] and resets the builder.
    ///
    /// Returns `None` when there are no nulls, in which case the bitmap
    /// goes back to the allocator.
    pub fn finish(&mut self) -> Option<NullBuffer> {
        let len = self.len;
        let nulls = self.nulls;
        let bitmap = self.bitmap.take();
        self.reset();
        trace!(len, null_count = nulls, "finished validity bitmap");

        let mut bitmap = bitmap?;
        if nulls == 0 {
            return None
        }
        bitmap.truncate(bit_util::ceil(len, 8));
        let bits = BooleanBuffer::new(bitmap.into_buffer(), 0, len);
        Some(unsafe {
            // SAFETY: null count is maintained on every append and resize
            NullBuffer::new_unchecked(bits, nulls)
        })
    }
}
