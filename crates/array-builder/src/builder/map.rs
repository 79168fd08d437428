use crate::builder::{AnyBuilder, ArrayBuilder, ValidityBuilder};
use crate::factory::make_field_builder;
use crate::memory::{AllocError, AllocatorRef, NativeBuffer};
use crate::util::uninitialized_buffer_access;
use anyhow::anyhow;
use arrow::array::{ArrayRef, MapArray, StructArray};
use arrow::datatypes::{DataType, FieldRef, Fields};
use arrow_buffer::{OffsetBuffer, ScalarBuffer};
use std::sync::Arc;


/// Builder for map arrays.
///
/// Entries are appended pairwise to [MapBuilder::keys] and [MapBuilder::items],
/// then [MapBuilder::append] closes the map.
pub struct MapBuilder {
    entries: FieldRef,
    entry_fields: Fields,
    keys_sorted: bool,
    validity: ValidityBuilder,
    offsets: Option<NativeBuffer<i32>>,
    keys: Box<AnyBuilder>,
    items: Box<AnyBuilder>
}


impl MapBuilder {
    /// `entries` must be a struct field with exactly two children: keys and items.
    pub fn new(allocator: AllocatorRef, entries: FieldRef, keys_sorted: bool) -> Self {
        let entry_fields = match entries.data_type() {
            DataType::Struct(fields) if fields.len() == 2 => fields.clone(),
            ty => panic!("map entries must be a struct of keys and items, got {}", ty)
        };
        let keys = make_field_builder(allocator.clone(), &entry_fields[0]);
        let items = make_field_builder(allocator.clone(), &entry_fields[1]);
        Self {
            entries,
            entry_fields,
            keys_sorted,
            validity: ValidityBuilder::new(allocator),
            offsets: None,
            keys: Box::new(keys),
            items: Box::new(items)
        }
    }

    pub fn keys(&mut self) -> &mut AnyBuilder {
        &mut self.keys
    }

    pub fn items(&mut self) -> &mut AnyBuilder {
        &mut self.items
    }

    pub fn keys_sorted(&self) -> bool {
        self.keys_sorted
    }

    /// Closes the current map, which holds all entries appended since the previous one.
    pub fn append(&mut self, valid: bool) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.keys.len() == self.items.len(),
            "map keys and items are out of step: {} keys, {} items",
            self.keys.len(),
            self.items.len()
        );
        let end = i32::try_from(self.keys.len()).map_err(|_| {
            anyhow!("map offset overflow: {} entries", self.keys.len())
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

    pub fn finish(&mut self) -> MapArray {
        let len = self.validity.len();
        let nulls = self.validity.finish();
        let offsets = match self.offsets.take() {
            Some(offsets) => {
                let offsets = ScalarBuffer::new(offsets.finish(len + 1), 0, len + 1);
                // SAFETY: offsets start at zero and follow the growing number of entries
                unsafe { OffsetBuffer::new_unchecked(offsets) }
            },
            None => OffsetBuffer::new_empty()
        };
        let keys = ArrayBuilder::finish(self.keys.as_mut());
        let items = ArrayBuilder::finish(self.items.as_mut());
        let entries = StructArray::new(self.entry_fields.clone(), vec![keys, items], None);
        MapArray::new(self.entries.clone(), offsets, entries, nulls, self.keys_sorted)
    }
}


impl ArrayBuilder for MapBuilder {
    fn data_type(&self) -> DataType {
        DataType::Map(self.entries.clone(), self.keys_sorted)
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
            + self.keys.byte_size()
            + self.items.byte_size()
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        let offsets_len = capacity.checked_add(1).ok_or(AllocError::CapacityOverflow {
            requested: capacity
        })?;
        let mut offsets = NativeBuffer::allocate(self.validity.allocator().clone(), offsets_len)?;
        offsets.set(0, 0);
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
            let entries = offsets.get(capacity) as usize;
            if entries < self.keys.len() {
                self.keys.resize(entries)?;
            }
            if entries < self.items.len() {
                self.items.resize(entries)?;
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
