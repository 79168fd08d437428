use crate::builder::{ArrayBuilder, ValidityBuilder};
use crate::memory::{AllocError, AllocatorRef, ResizableBuffer};
use crate::util::uninitialized_buffer_access;
use arrow::array::{ArrayRef, BooleanArray};
use arrow::datatypes::DataType;
use arrow_buffer::{bit_util, BooleanBuffer};
use std::sync::Arc;


pub struct BooleanBuilder {
    validity: ValidityBuilder,
    values: Option<ResizableBuffer>
}


impl BooleanBuilder {
    pub fn new(allocator: AllocatorRef) -> Self {
        Self {
            validity: ValidityBuilder::new(allocator),
            values: None
        }
    }

    fn values_mut(&mut self) -> &mut [u8] {
        match self.values.as_mut() {
            Some(values) => values.as_slice_mut(),
            None => uninitialized_buffer_access!()
        }
    }

    #[inline]
    fn set(&mut self, i: usize, val: bool) {
        if val {
            bit_util::set_bit(self.values_mut(), i)
        } else {
            bit_util::unset_bit(self.values_mut(), i)
        }
    }

    pub fn append_value(&mut self, val: bool) -> Result<(), AllocError> {
        self.reserve(1)?;
        self.set(self.validity.len(), val);
        self.validity.append(true);
        Ok(())
    }

    pub fn append_option(&mut self, val: Option<bool>) -> Result<(), AllocError> {
        self.reserve(1)?;
        self.set(self.validity.len(), val.unwrap_or(false));
        self.validity.append(val.is_some());
        Ok(())
    }

    pub fn append_values(&mut self, values: &[bool], validity: Option<&[bool]>) -> Result<(), AllocError> {
        self.reserve(values.len())?;
        let offset = self.validity.len();
        for (i, val) in values.iter().enumerate() {
            self.set(offset + i, *val)
        }
        self.validity.append_bulk(validity, values.len());
        Ok(())
    }

    pub fn finish(&mut self) -> BooleanArray {
        let len = self.validity.len();
        let values = match self.values.take() {
            Some(mut values) => {
                values.truncate(bit_util::ceil(len, 8));
                BooleanBuffer::new(values.into_buffer(), 0, len)
            },
            None => BooleanBuffer::new_unset(0)
        };
        BooleanArray::new(values, self.validity.finish())
    }
}


impl ArrayBuilder for BooleanBuilder {
    fn data_type(&self) -> DataType {
        DataType::Boolean
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
        let byte_len = bit_util::ceil(capacity, 8);
        let values = ResizableBuffer::allocate(self.validity.allocator().clone(), byte_len)?;
        self.validity.init(capacity)?;
        self.values = Some(values);
        Ok(())
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        if let Some(values) = self.values.as_mut() {
            values.resize(bit_util::ceil(capacity, 8))?;
        }
        Ok(())
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        self.append_option(None)?;
        Ok(())
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        self.append_value(false)?;
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(self.finish())
    }
}
