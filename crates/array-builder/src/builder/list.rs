use crate::builder::{AnyBuilder, ArrayBuilder, ValidityBuilder};
use crate::factory::make_field_builder;
use crate::memory::{AllocError, AllocatorRef, NativeBuffer};
use crate::util::uninitialized_buffer_access;
use anyhow::anyhow;
use arrow::array::{ArrayRef, GenericListArray, OffsetSizeTrait};
use arrow::datatypes::{DataType, FieldRef};
use arrow_buffer::{OffsetBuffer, ScalarBuffer};
use std::sync::Arc;


pub type ListBuilder = GenericListBuilder<i32>;
pub type LargeListBuilder = GenericListBuilder<i64>;


/// Builder for variable length lists.
///
/// Child values are appended to [GenericListBuilder::values] first,
/// then [GenericListBuilder::append] closes the list.
pub struct GenericListBuilder<O: OffsetSizeTrait> {
    field: FieldRef,
    validity: ValidityBuilder,
    offsets: Option<NativeBuffer<O>>,
    values: Box<AnyBuilder>
}


impl <O: OffsetSizeTrait> GenericListBuilder<O> {
    pub fn new(allocator: AllocatorRef, field: FieldRef) -> Self {
        let values = make_field_builder(allocator.clone(), &field);
        Self {
            field,
            validity: ValidityBuilder::new(allocator),
            offsets: None,
            values: Box::new(values)
        }
    }

    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    pub fn values(&mut self) -> &mut AnyBuilder {
        &mut self.values
    }

    /// Closes the current list, which spans all child values appended since the previous one.
    pub fn append(&mut self, valid: bool) -> anyhow::Result<()> {
        let end = O::from_usize(self.values.len()).ok_or_else(|| {
            anyhow!("list offset overflow: {} child values", self.values.len())
        })?;
        self.reserve(1)?;
        let i = self.validity.len();
        match self.offsets.as_mut() {
            Some(offsets) => offsets.set(i + 1, end),
            None => uninitialized_buffer_access!()
        }
        self.validity.append(valid);
        Ok(())
    }

    pub fn finish(&mut self) -> GenericListArray<O> {
        let len = self.validity.len();
        let nulls = self.validity.finish();
        let offsets = match self.offsets.take() {
            Some(offsets) => {
                let offsets = ScalarBuffer::new(offsets.finish(len + 1), 0, len + 1);
                // SAFETY: offsets start at zero and follow the growing child length
                unsafe { OffsetBuffer::new_unchecked(offsets) }
            },
            None => OffsetBuffer::new_empty()
        };
        let values = ArrayBuilder::finish(self.values.as_mut());
        GenericListArray::new(self.field.clone(), offsets, values, nulls)
    }
}


impl <O: OffsetSizeTrait> ArrayBuilder for GenericListBuilder<O> {
    fn data_type(&self) -> DataType {
        if O::IS_LARGE {
            DataType::LargeList(self.field.clone())
        } else {
            DataType::List(self.field.clone())
        }
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
            + self.values.byte_size()
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        let offsets_len = capacity.checked_add(1).ok_or(AllocError::CapacityOverflow {
            requested: capacity
        })?;
        let mut offsets = NativeBuffer::allocate(self.validity.allocator().clone(), offsets_len)?;
        offsets.set(0, O::usize_as(0));
        self.validity.init(capacity)?;
        self.offsets = Some(offsets);
        Ok(())
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        let offsets_len = capacity.checked_add(1).ok_or(AllocError::CapacityOverflow {
            requested: capacity
        })?;
        let offsets = match self.offsets.as_mut() {
            Some(offsets) => offsets,
            None => return Ok(())
        };
        offsets.resize(offsets_len)?;
        if capacity < self.validity.len() {
            let child_len = offsets.get(capacity).as_usize();
            if child_len < self.values.len() {
                self.values.resize(child_len)?;
            }
        }
        Ok(())
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        self.append(false)
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        self.append(true)
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(self.finish())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::default_allocator;
    use arrow::array::{Array, ListArray};
    use crate::builder::Int32Builder;
    use arrow::datatypes::{Field, Int32Type};


    fn int_list() -> ListBuilder {
        ListBuilder::new(default_allocator(), Arc::new(Field::new("item", DataType::Int32, true)))
    }

    #[test]
    fn build_list() -> anyhow::Result<()> {
        let mut builder = int_list();
        let values = builder.values().downcast_mut::<Int32Builder>().unwrap();
        values.append_values(&[1, 2, 3], None)?;
        builder.append(true)?;
        builder.append_null()?;
        builder.append_empty_value()?;
        builder.values().downcast_mut::<Int32Builder>().unwrap().append_option(None)?;
        builder.append(true)?;

        let array = builder.finish();
        let expected = ListArray::from_iter_primitive::<Int32Type, _, _>(vec![
            Some(vec![Some(1), Some(2), Some(3)]),
            None,
            Some(vec![]),
            Some(vec![None])
        ]);
        assert_eq!(array, expected);
        assert_eq!(builder.len(), 0);
        assert_eq!(builder.values().len(), 0);
        Ok(())
    }

    #[test]
    fn shrink_truncates_child() -> anyhow::Result<()> {
        let mut builder = int_list();
        builder.values().downcast_mut::<Int32Builder>().unwrap().append_values(&[1, 2], None)?;
        builder.append(true)?;
        builder.values().downcast_mut::<Int32Builder>().unwrap().append_values(&[3, 4, 5], None)?;
        builder.append(true)?;

        builder.resize(1)?;
        assert_eq!(builder.len(), 1);
        assert_eq!(builder.values().len(), 2);

        let array = builder.finish();
        assert_eq!(array.len(), 1);
        assert_eq!(array.value(0).len(), 2);
        Ok(())
    }

    #[test]
    fn large_list_type() {
        let field = Arc::new(Field::new("item", DataType::Utf8, true));
        let builder = LargeListBuilder::new(default_allocator(), field.clone());
        assert_eq!(builder.data_type(), DataType::LargeList(field));
    }
}
