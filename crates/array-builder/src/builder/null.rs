use crate::builder::{ArrayBuilder, ValidityBuilder};
use crate::memory::{AllocError, AllocatorRef};
use arrow::array::{ArrayRef, NullArray};
use arrow::datatypes::DataType;
use std::sync::Arc;


pub struct NullBuilder {
    validity: ValidityBuilder
}


impl NullBuilder {
    pub fn new(allocator: AllocatorRef) -> Self {
        Self {
            validity: ValidityBuilder::new(allocator)
        }
    }

    pub fn finish(&mut self) -> NullArray {
        let len = self.validity.len();
        self.validity.reset();
        NullArray::new(len)
    }
}


impl ArrayBuilder for NullBuilder {
    fn data_type(&self) -> DataType {
        DataType::Null
    }

    fn validity(&self) -> &ValidityBuilder {
        &self.validity
    }

    fn validity_mut(&mut self) -> &mut ValidityBuilder {
        &mut self.validity
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        self.validity.init(capacity)
    }

    fn resize_values(&mut self, _capacity: usize) -> Result<(), AllocError> {
        Ok(())
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        self.reserve(1)?;
        self.validity.append(false);
        Ok(())
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        self.append_null()
    }

    fn append_nulls(&mut self, n: usize) -> anyhow::Result<()> {
        self.reserve(n)?;
        self.validity.append_n_nulls(n);
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(self.finish())
    }
}
