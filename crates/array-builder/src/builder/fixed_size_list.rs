use crate::builder::{append_to_children, grow_child, AnyBuilder, ArrayBuilder, ValidityBuilder};
use crate::factory::make_field_builder;
use crate::memory::{AllocError, AllocatorRef};
use arrow::array::{ArrayData, ArrayRef, FixedSizeListArray};
use arrow::datatypes::{DataType, FieldRef};
use std::sync::Arc;


pub struct FixedSizeListBuilder {
    field: FieldRef,
    size: usize,
    validity: ValidityBuilder,
    values: Box<AnyBuilder>
}


impl FixedSizeListBuilder {
    pub fn new(allocator: AllocatorRef, field: FieldRef, size: i32) -> Self {
        assert!(size >= 0, "list size must be non-negative, got {}", size);
        let values = make_field_builder(allocator.clone(), &field);
        Self {
            field,
            size: size as usize,
            validity: ValidityBuilder::new(allocator),
            values: Box::new(values)
        }
    }

    pub fn value_length(&self) -> usize {
        self.size
    }

    pub fn values(&mut self) -> &mut AnyBuilder {
        &mut self.values
    }

    /// Closes the current list. Exactly `size` child values must have been appended for it.
    pub fn append(&mut self, valid: bool) -> anyhow::Result<()> {
        let expected = (self.validity.len() + 1) * self.size;
        anyhow::ensure!(
            self.values.len() == expected,
            "fixed size list expects {} child values, but got {}",
            expected,
            self.values.len()
        );
        self.reserve(1)?;
        self.validity.append(valid);
        Ok(())
    }

    fn child_capacity(&self, capacity: usize) -> Result<usize, AllocError> {
        capacity.checked_mul(self.size).ok_or(AllocError::CapacityOverflow {
            requested: capacity
        })
    }

    pub fn finish(&mut self) -> FixedSizeListArray {
        let len = self.validity.len();
        let nulls = self.validity.finish();
        let values = ArrayBuilder::finish(self.values.as_mut());
        let data = ArrayData::builder(self.data_type())
            .len(len)
            .nulls(nulls)
            .add_child_data(values.to_data());
        // SAFETY: `append` checks that the child holds `size` values per slot
        FixedSizeListArray::from(unsafe { data.build_unchecked() })
    }
}


impl ArrayBuilder for FixedSizeListBuilder {
    fn data_type(&self) -> DataType {
        DataType::FixedSizeList(self.field.clone(), self.size as i32)
    }

    fn validity(&self) -> &ValidityBuilder {
        &self.validity
    }

    fn validity_mut(&mut self) -> &mut ValidityBuilder {
        &mut self.validity
    }

    fn byte_size(&self) -> usize {
        self.validity.byte_size() + self.values.byte_size()
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        let child_capacity = self.child_capacity(capacity)?;
        grow_child(&mut self.values, child_capacity)?;
        self.validity.init(capacity)
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        let child_capacity = self.child_capacity(capacity)?;
        if capacity < self.validity.len() {
            if child_capacity < self.values.len() {
                self.values.resize(child_capacity)?;
            }
        } else {
            grow_child(&mut self.values, child_capacity)?;
        }
        Ok(())
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        self.reserve(1)?;
        let size = self.size;
        let nullable = self.field.is_nullable();
        append_to_children(std::slice::from_mut(self.values.as_mut()), |_, values| {
            if nullable {
                values.append_nulls(size)
            } else {
                values.append_empty_values(size)
            }
        })?;
        self.validity.append(false);
        Ok(())
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        self.reserve(1)?;
        let size = self.size;
        append_to_children(std::slice::from_mut(self.values.as_mut()), |_, values| {
            values.append_empty_values(size)
        })?;
        self.validity.append(true);
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(self.finish())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Int32Builder;
    use crate::memory::{default_allocator, CheckedAllocator};
    use arrow::array::Array;
    use arrow::datatypes::{Field, Int32Type};


    fn pairs() -> FixedSizeListBuilder {
        FixedSizeListBuilder::new(default_allocator(), Arc::new(Field::new("item", DataType::Int32, true)), 2)
    }

    #[test]
    fn build_fixed_size_list() -> anyhow::Result<()> {
        let mut builder = pairs();
        builder.values().downcast_mut::<Int32Builder>().unwrap().append_values(&[1, 2], None)?;
        builder.append(true)?;
        builder.append_null()?;
        builder.append_empty_value()?;

        let array = builder.finish();
        let expected = FixedSizeListArray::from_iter_primitive::<Int32Type, _, _>(
            vec![
                Some(vec![Some(1), Some(2)]),
                None,
                Some(vec![Some(0), Some(0)])
            ],
            2
        );
        assert_eq!(array.to_data(), expected.to_data());
        Ok(())
    }

    #[test]
    fn wrong_child_length_is_rejected() -> anyhow::Result<()> {
        let mut builder = pairs();
        builder.values().downcast_mut::<Int32Builder>().unwrap().append_value(1)?;
        assert!(builder.append(true).is_err());
        assert_eq!(builder.len(), 0);
        Ok(())
    }

    #[test]
    fn shrink_truncates_child() -> anyhow::Result<()> {
        let mut builder = pairs();
        builder.append_empty_values(3)?;
        builder.resize(1)?;
        assert_eq!(builder.values().len(), 2);
        assert_eq!(builder.finish().len(), 1);
        Ok(())
    }

    #[test]
    fn failed_append_keeps_child_in_step() {
        let field = Arc::new(Field::new("item", DataType::Int32, true));
        let allocator = Arc::new(CheckedAllocator::new().with_limit(264));
        let mut builder = FixedSizeListBuilder::new(allocator, field, 2);
        assert!(builder.append_null().is_err());
        assert_eq!(builder.len(), 0);
        assert_eq!(builder.values().len(), 0);
        assert_eq!(builder.finish().len(), 0);
    }
}
