use crate::builder::{append_to_children, grow_child, AnyBuilder, ArrayBuilder, ValidityBuilder};
use crate::factory::make_field_builder;
use crate::memory::{AllocError, AllocatorRef};
use arrow::array::{ArrayRef, StructArray};
use arrow::datatypes::{DataType, Fields};
use std::sync::Arc;


/// Builder for struct arrays.
///
/// Values go to the field builders, [StructBuilder::append] then marks
/// the validity of the row. All field builders must be kept at the same length.
pub struct StructBuilder {
    fields: Fields,
    validity: ValidityBuilder,
    columns: Vec<AnyBuilder>
}


impl StructBuilder {
    pub fn new(allocator: AllocatorRef, fields: Fields) -> Self {
        let columns = fields.iter()
            .map(|f| make_field_builder(allocator.clone(), f))
            .collect();
        Self {
            fields,
            validity: ValidityBuilder::new(allocator),
            columns
        }
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn num_fields(&self) -> usize {
        self.columns.len()
    }

    pub fn field_builder(&mut self, i: usize) -> &mut AnyBuilder {
        &mut self.columns[i]
    }

    pub fn field_builder_as<B: 'static>(&mut self, i: usize) -> Option<&mut B> {
        self.columns[i].downcast_mut()
    }

    pub fn append(&mut self, valid: bool) -> anyhow::Result<()> {
        self.reserve(1)?;
        self.validity.append(valid);
        Ok(())
    }

    pub fn finish(&mut self) -> StructArray {
        let len = self.validity.len();
        for (field, column) in self.fields.iter().zip(self.columns.iter()) {
            assert_eq!(
                column.len(),
                len,
                "struct field {} holds {} values, but the struct has {} rows",
                field.name(),
                column.len(),
                len
            );
        }
        let nulls = self.validity.finish();
        if self.fields.is_empty() {
            return StructArray::new_empty_fields(len, nulls)
        }
        let columns = self.columns.iter_mut()
            .map(|c| ArrayBuilder::finish(c))
            .collect();
        StructArray::new(self.fields.clone(), columns, nulls)
    }
}


impl ArrayBuilder for StructBuilder {
    fn data_type(&self) -> DataType {
        DataType::Struct(self.fields.clone())
    }

    fn validity(&self) -> &ValidityBuilder {
        &self.validity
    }

    fn validity_mut(&mut self) -> &mut ValidityBuilder {
        &mut self.validity
    }

    fn byte_size(&self) -> usize {
        self.validity.byte_size() + self.columns.iter().map(|c| c.byte_size()).sum::<usize>()
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        for c in self.columns.iter_mut() {
            grow_child(c, capacity)?;
        }
        self.validity.init(capacity)
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        let shrink = capacity < self.validity.len();
        for c in self.columns.iter_mut() {
            if shrink && capacity < c.len() {
                c.resize(capacity)?;
            } else {
                grow_child(c, capacity)?;
            }
        }
        Ok(())
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        self.reserve(1)?;
        let fields = &self.fields;
        append_to_children(&mut self.columns, |i, column| {
            if fields[i].is_nullable() {
                column.append_null()
            } else {
                column.append_empty_value()
            }
        })?;
        self.validity.append(false);
        Ok(())
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        self.reserve(1)?;
        append_to_children(&mut self.columns, |_, column| column.append_empty_value())?;
        self.validity.append(true);
        Ok(())
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(self.finish())
    }
}
