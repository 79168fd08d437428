use crate::builder::{ArrayBuilder, ValidityBuilder};
use crate::memory::{AllocError, AllocatorRef, NativeBuffer, ResizableBuffer};
use crate::util::uninitialized_buffer_access;
use anyhow::anyhow;
use arrow::array::{ArrayRef, GenericByteArray};
use arrow::datatypes::{BinaryType, ByteArrayType, DataType, LargeBinaryType, LargeUtf8Type, Utf8Type};
use arrow_buffer::{ArrowNativeType, Buffer, MutableBuffer, OffsetBuffer, ScalarBuffer};
use std::sync::Arc;
use tracing::debug;


/// Smallest size of the value data buffer once it has to grow.
const MIN_DATA_CAPACITY: usize = 64;


pub type BinaryBuilder = GenericByteBuilder<BinaryType>;
pub type LargeBinaryBuilder = GenericByteBuilder<LargeBinaryType>;
pub type StringBuilder = GenericByteBuilder<Utf8Type>;
pub type LargeStringBuilder = GenericByteBuilder<LargeUtf8Type>;


/// Builder for variable length byte arrays.
///
/// Offsets are stored end-style: slot `i` spans `offsets[i]..offsets[i + 1]`,
/// with `offsets[0] == 0` written at initialization.
pub struct GenericByteBuilder<T: ByteArrayType> {
    validity: ValidityBuilder,
    offsets: Option<NativeBuffer<T::Offset>>,
    data: Option<ResizableBuffer>,
    data_len: usize
}


impl <T: ByteArrayType> GenericByteBuilder<T> {
    pub fn new(allocator: AllocatorRef) -> Self {
        Self {
            validity: ValidityBuilder::new(allocator),
            offsets: None,
            data: None,
            data_len: 0
        }
    }

    fn offsets_mut(&mut self) -> &mut NativeBuffer<T::Offset> {
        match self.offsets.as_mut() {
            Some(offsets) => offsets,
            None => uninitialized_buffer_access!()
        }
    }

    /// Total byte length of all appended values.
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    fn reserve_data(&mut self, additional: usize) -> Result<(), AllocError> {
        let required = self.data_len.checked_add(additional).ok_or(AllocError::CapacityOverflow {
            requested: usize::MAX
        })?;
        let data = match self.data.as_mut() {
            Some(data) => data,
            None => uninitialized_buffer_access!()
        };
        if required > data.len() {
            let len = required.checked_next_power_of_two().ok_or(AllocError::CapacityOverflow {
                requested: required
            })?;
            let len = std::cmp::max(len, MIN_DATA_CAPACITY);
            data.resize(len)?;
            debug!(bytes = len, "grew byte array data");
        }
        Ok(())
    }

    fn end_offset(&self, additional: usize) -> anyhow::Result<T::Offset> {
        let end = self.data_len.checked_add(additional);
        end.and_then(T::Offset::from_usize).ok_or_else(|| {
            anyhow!(
                "{} offset overflow: {} + {} bytes do not fit into the offset type",
                T::DATA_TYPE,
                self.data_len,
                additional
            )
        })
    }

    fn push(&mut self, bytes: &[u8], valid: bool) -> anyhow::Result<()> {
        let end = self.end_offset(bytes.len())?;
        self.reserve(1)?;
        self.reserve_data(bytes.len())?;
        if let Some(data) = self.data.as_mut() {
            data.as_slice_mut()[self.data_len..self.data_len + bytes.len()].copy_from_slice(bytes);
        }
        let i = self.validity.len();
        self.offsets_mut().set(i + 1, end);
        self.validity.append(valid);
        self.data_len += bytes.len();
        Ok(())
    }

    pub fn append_value(&mut self, value: impl AsRef<T::Native>) -> anyhow::Result<()> {
        let bytes: &[u8] = value.as_ref().as_ref();
        self.push(bytes, true)
    }

    pub fn append_option(&mut self, value: Option<impl AsRef<T::Native>>) -> anyhow::Result<()> {
        match value {
            Some(value) => self.append_value(value),
            None => self.push(&[], false)
        }
    }

    /// Appends raw bytes, validating them as UTF-8 for string types.
    pub fn append_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        if matches!(T::DATA_TYPE, DataType::Utf8 | DataType::LargeUtf8) {
            std::str::from_utf8(bytes)?;
        }
        self.push(bytes, true)
    }

    pub fn finish(&mut self) -> GenericByteArray<T> {
        let len = self.validity.len();
        let nulls = self.validity.finish();

        let offsets = match self.offsets.take() {
            Some(offsets) => {
                let offsets = ScalarBuffer::new(offsets.finish(len + 1), 0, len + 1);
                // SAFETY: offsets start at zero and never decrease
                unsafe { OffsetBuffer::new_unchecked(offsets) }
            },
            None => OffsetBuffer::new_empty()
        };

        let data: Buffer = match self.data.take() {
            Some(mut data) => {
                data.truncate(self.data_len);
                data.into_buffer()
            },
            None => MutableBuffer::new(0).into()
        };
        self.data_len = 0;

        // SAFETY: every offset points into `data`, strings were appended either as `&str`
        // or after UTF-8 validation
        unsafe {
            GenericByteArray::new_unchecked(offsets, data, nulls)
        }
    }
}


impl <T: ByteArrayType> ArrayBuilder for GenericByteBuilder<T> {
    fn data_type(&self) -> DataType {
        T::DATA_TYPE
    }

    fn validity(&self) -> &ValidityBuilder {
        &self.validity
    }

    fn validity_mut(&mut self) -> &mut ValidityBuilder {
        &mut self.validity
    }

    fn byte_size(&self) -> usize {
        self.validity.byte_size()
            + self.offsets.as_ref().map_or(0, |o| o.byte_size())
            + self.data.as_ref().map_or(0, |d| d.len())
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        let allocator = self.validity.allocator().clone();
        let offsets_len = capacity.checked_add(1).ok_or(AllocError::CapacityOverflow {
            requested: capacity
        })?;
        let mut offsets = NativeBuffer::allocate(allocator.clone(), offsets_len)?;
        offsets.set(0, T::Offset::usize_as(0));
        let data = ResizableBuffer::allocate(allocator, 0)?;
        self.validity.init(capacity)?;
        self.offsets = Some(offsets);
        self.data = Some(data);
        self.data_len = 0;
        Ok(())
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        let len = self.validity.len();
        let offsets_len = capacity.checked_add(1).ok_or(AllocError::CapacityOverflow {
            requested: capacity
        })?;
        if let Some(offsets) = self.offsets.as_mut() {
            offsets.resize(offsets_len)?;
            if capacity < len {
                self.data_len = offsets.get(capacity).as_usize();
            }
        }
        Ok(())
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        self.push(&[], false)
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        self.push(&[], true)
    }

    fn append_value_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.append_bytes(bytes)
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(self.finish())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{default_allocator, Allocator, CheckedAllocator};
    use arrow::array::{Array, BinaryArray, LargeStringArray, StringArray};


    /// Grows buffers as usual, but refuses to give any memory back.
    struct KeepingAllocator;


    impl Allocator for KeepingAllocator {
        fn allocate(&self, len: usize) -> Result<MutableBuffer, AllocError> {
            default_allocator().allocate(len)
        }

        fn resize(&self, buf: &mut MutableBuffer, new_len: usize) -> Result<(), AllocError> {
            if new_len < buf.len() {
                return Err(AllocError::LimitExceeded {
                    requested: new_len,
                    limit: 0
                })
            }
            default_allocator().resize(buf, new_len)
        }

        fn release(&self, buf: MutableBuffer) {
            drop(buf)
        }
    }


    #[test]
    fn build_strings() -> anyhow::Result<()> {
        let mut builder = StringBuilder::new(default_allocator());
        builder.append_value("foo")?;
        builder.append_null()?;
        builder.append_option(Some("bar"))?;
        builder.append_empty_value()?;
        builder.append_bytes(b"baz")?;
        assert_eq!(builder.len(), 5);
        assert_eq!(builder.null_count(), 1);
        assert_eq!(builder.data_len(), 9);

        let array = builder.finish();
        assert_eq!(array, StringArray::from(vec![Some("foo"), None, Some("bar"), Some(""), Some("baz")]));
        assert_eq!(builder.len(), 0);
        assert_eq!(builder.data_len(), 0);
        Ok(())
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut builder = LargeStringBuilder::new(default_allocator());
        assert!(builder.append_bytes(&[0xff, 0xfe]).is_err());
        assert_eq!(builder.len(), 0);
        assert_eq!(builder.finish(), LargeStringArray::from(Vec::<&str>::new()));
    }

    #[test]
    fn large_values_grow_data() -> anyhow::Result<()> {
        let mut builder = BinaryBuilder::new(default_allocator());
        let big = vec![7u8; 1000];
        builder.append_value(&big)?;
        builder.append_value(b"x")?;
        let array = builder.finish();
        assert_eq!(array.value(0), big.as_slice());
        assert_eq!(array.value(1), b"x");
        assert!(array.nulls().is_none());
        Ok(())
    }

    #[test]
    fn shrink_drops_trailing_data() -> anyhow::Result<()> {
        let mut builder = BinaryBuilder::new(default_allocator());
        builder.append_value(b"ab")?;
        builder.append_null()?;
        builder.append_value(b"cde")?;
        builder.resize(2)?;
        assert_eq!(builder.data_len(), 2);
        builder.append_value(b"f")?;
        assert_eq!(
            builder.finish(),
            BinaryArray::from(vec![Some(b"ab".as_ref()), None, Some(b"f".as_ref())])
        );
        Ok(())
    }

    #[test]
    fn shrink_does_not_depend_on_the_allocator() -> anyhow::Result<()> {
        let mut builder = StringBuilder::new(Arc::new(KeepingAllocator));
        builder.append_value("ab")?;
        builder.append_null()?;
        builder.append_value("cde")?;
        builder.append_value("fg")?;
        builder.resize(2)?;
        assert_eq!(builder.len(), 2);
        assert_eq!(builder.data_len(), 2);
        builder.append_value("h")?;
        assert_eq!(builder.finish(), StringArray::from(vec![Some("ab"), None, Some("h")]));
        Ok(())
    }

    #[test]
    fn finish_empty() {
        let mut builder = StringBuilder::new(default_allocator());
        let array = builder.finish();
        assert_eq!(array.len(), 0);
        assert_eq!(array.value_offsets(), &[0]);
    }

    #[test]
    fn buffers_are_accounted() -> anyhow::Result<()> {
        let allocator = Arc::new(CheckedAllocator::new());
        let mut builder = StringBuilder::new(allocator.clone());
        builder.append_value("hello")?;
        let array = builder.finish();
        assert_eq!(array.value(0), "hello");
        // bitmap was released since there are no nulls, offsets and data were transferred
        assert_eq!(allocator.outstanding(), 0);
        assert_eq!(allocator.transfers(), 2);
        Ok(())
    }
}
