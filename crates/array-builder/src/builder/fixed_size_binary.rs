use crate::builder::{ArrayBuilder, ValidityBuilder};
use crate::memory::{bytes_for, AllocError, AllocatorRef, ResizableBuffer};
use crate::util::uninitialized_buffer_access;
use arrow::array::{ArrayData, ArrayRef, FixedSizeBinaryArray};
use arrow::datatypes::DataType;
use arrow_buffer::{Buffer, MutableBuffer};
use std::sync::Arc;


pub struct FixedSizeBinaryBuilder {
    byte_width: usize,
    validity: ValidityBuilder,
    values: Option<ResizableBuffer>
}


impl FixedSizeBinaryBuilder {
    pub fn new(allocator: AllocatorRef, byte_width: i32) -> Self {
        assert!(byte_width >= 0, "byte width must be non-negative, got {}", byte_width);
        Self {
            byte_width: byte_width as usize,
            validity: ValidityBuilder::new(allocator),
            values: None
        }
    }

    pub fn byte_width(&self) -> usize {
        self.byte_width
    }

    fn slot_mut(&mut self, i: usize) -> &mut [u8] {
        let width = self.byte_width;
        match self.values.as_mut() {
            Some(values) => &mut values.as_slice_mut()[i * width..(i + 1) * width],
            None => uninitialized_buffer_access!()
        }
    }

    pub fn append_value(&mut self, value: impl AsRef<[u8]>) -> anyhow::Result<()> {
        let value = value.as_ref();
        anyhow::ensure!(
            value.len() == self.byte_width,
            "expected a {} bytes wide value, got {} bytes",
            self.byte_width,
            value.len()
        );
        self.reserve(1)?;
        let i = self.validity.len();
        self.slot_mut(i).copy_from_slice(value);
        self.validity.append(true);
        Ok(())
    }

    pub fn append_option(&mut self, value: Option<impl AsRef<[u8]>>) -> anyhow::Result<()> {
        match value {
            Some(value) => self.append_value(value),
            None => self.push_zeroed(false)
        }
    }

    fn push_zeroed(&mut self, valid: bool) -> anyhow::Result<()> {
        self.reserve(1)?;
        let i = self.validity.len();
        self.slot_mut(i).fill(0);
        self.validity.append(valid);
        Ok(())
    }

    pub fn finish(&mut self) -> FixedSizeBinaryArray {
        let len = self.validity.len();
        let nulls = self.validity.finish();
        let values: Buffer = match self.values.take() {
            Some(mut values) => {
                values.truncate(len * self.byte_width);
                values.into_buffer()
            },
            None => MutableBuffer::new(0).into()
        };
        let data = ArrayData::builder(self.data_type())
            .len(len)
            .nulls(nulls)
            .add_buffer(values);
        // SAFETY: there are exactly `len` slots of `byte_width` bytes
        FixedSizeBinaryArray::from(unsafe { data.build_unchecked() })
    }
}


impl ArrayBuilder for FixedSizeBinaryBuilder {
    fn data_type(&self) -> DataType {
        DataType::FixedSizeBinary(self.byte_width as i32)
    }

    fn validity(&self) -> &ValidityBuilder {
        &self.validity
    }

    fn validity_mut(&mut self) -> &mut ValidityBuilder {
        &mut self.validity
    }

    fn byte_size(&self) -> usize {
        self.validity.byte_size() + self.values.as_ref().map_or(0, |v| v.len())
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        let len = bytes_for(capacity, self.byte_width)?;
        let values = ResizableBuffer::allocate(self.validity.allocator().clone(), len)?;
        self.validity.init(capacity)?;
        self.values = Some(values);
        Ok(())
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        let len = bytes_for(capacity, self.byte_width)?;
        if let Some(values) = self.values.as_mut() {
            values.resize(len)?;
        }
        Ok(())
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        self.push_zeroed(false)
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        self.push_zeroed(true)
    }

    fn append_value_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.append_value(bytes)
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(self.finish())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::default_allocator;
    use arrow::array::Array;


    #[test]
    fn build_fixed_size_binary() -> anyhow::Result<()> {
        let mut builder = FixedSizeBinaryBuilder::new(default_allocator(), 3);
        builder.append_value(b"abc")?;
        builder.append_null()?;
        builder.append_option(Some([1u8, 2, 3]))?;
        builder.append_empty_value()?;

        let array = builder.finish();
        let expected = FixedSizeBinaryArray::try_from_sparse_iter_with_size(
            vec![Some(b"abc".to_vec()), None, Some(vec![1, 2, 3]), Some(vec![0, 0, 0])].into_iter(),
            3
        )?;
        assert_eq!(array.to_data(), expected.to_data());
        Ok(())
    }

    #[test]
    fn wrong_width_is_rejected() {
        let mut builder = FixedSizeBinaryBuilder::new(default_allocator(), 4);
        let err = builder.append_value(b"ab").unwrap_err();
        assert!(err.to_string().contains("4 bytes wide"));
        assert_eq!(builder.len(), 0);
    }
}
