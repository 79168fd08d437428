use crate::builder::{append_to_children, grow_child, AnyBuilder, ArrayBuilder, ValidityBuilder};
use crate::factory::make_field_builder;
use crate::memory::{AllocError, AllocatorRef, NativeBuffer};
use crate::util::uninitialized_buffer_access;
use anyhow::anyhow;
use arrow::array::{ArrayRef, UnionArray};
use arrow::datatypes::{DataType, UnionFields, UnionMode};
use arrow_buffer::ScalarBuffer;
use std::sync::Arc;


/// Builder for sparse and dense unions.
///
/// Unions have no validity buffer of their own. The engine still counts
/// nulls appended through [ArrayBuilder::append_null], which go to the
/// first child.
pub struct UnionBuilder {
    fields: UnionFields,
    mode: UnionMode,
    type_codes: Vec<i8>,
    nullable: Vec<bool>,
    validity: ValidityBuilder,
    type_ids: Option<NativeBuffer<i8>>,
    offsets: Option<NativeBuffer<i32>>,
    children: Vec<AnyBuilder>
}


impl UnionBuilder {
    pub fn new(allocator: AllocatorRef, fields: UnionFields, mode: UnionMode) -> Self {
        let mut type_codes = Vec::with_capacity(fields.len());
        let mut nullable = Vec::with_capacity(fields.len());
        let mut children = Vec::with_capacity(fields.len());
        for (type_id, field) in fields.iter() {
            type_codes.push(type_id);
            nullable.push(field.is_nullable());
            children.push(make_field_builder(allocator.clone(), field));
        }
        Self {
            fields,
            mode,
            type_codes,
            nullable,
            validity: ValidityBuilder::new(allocator),
            type_ids: None,
            offsets: None,
            children
        }
    }

    pub fn mode(&self) -> UnionMode {
        self.mode
    }

    fn child_index(&self, type_id: i8) -> usize {
        match self.type_codes.iter().position(|c| *c == type_id) {
            Some(i) => i,
            None => panic!("unknown union type id {}", type_id)
        }
    }

    pub fn child(&mut self, type_id: i8) -> &mut AnyBuilder {
        let i = self.child_index(type_id);
        &mut self.children[i]
    }

    /// Starts a new slot of variant `type_id` and returns the child builder
    /// which must receive exactly one value for it.
    pub fn append(&mut self, type_id: i8) -> anyhow::Result<&mut AnyBuilder> {
        let child = self.child_index(type_id);
        self.push_slot(child, true, |_| Ok(()))?;
        Ok(&mut self.children[child])
    }

    /// Records a slot of `child`. `fill` appends to the selected child,
    /// sparse siblings receive a placeholder. Nothing changes when any of it fails.
    fn push_slot<F>(&mut self, child: usize, valid: bool, fill: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut AnyBuilder) -> anyhow::Result<()>
    {
        let offset = match self.mode {
            UnionMode::Dense => {
                let len = self.children[child].len();
                let offset = i32::try_from(len).map_err(|_| {
                    anyhow!("dense union offset overflow: child {} holds {} values", child, len)
                })?;
                Some(offset)
            },
            UnionMode::Sparse => None
        };

        self.reserve(1)?;

        let sparse = self.mode == UnionMode::Sparse;
        let nullable = &self.nullable;
        let mut fill = Some(fill);
        append_to_children(&mut self.children, |i, c| {
            if i == child {
                fill.take().map_or(Ok(()), |fill| fill(c))
            } else if !sparse {
                Ok(())
            } else if nullable[i] {
                c.append_null()
            } else {
                c.append_empty_value()
            }
        })?;

        let i = self.validity.len();
        match self.type_ids.as_mut() {
            Some(type_ids) => type_ids.set(i, self.type_codes[child]),
            None => uninitialized_buffer_access!()
        }
        if let (Some(offsets), Some(offset)) = (self.offsets.as_mut(), offset) {
            offsets.set(i, offset)
        }
        self.validity.append(valid);
        Ok(())
    }

    fn first_child(&self) -> usize {
        assert!(!self.children.is_empty(), "union without variants can't hold values");
        0
    }

    fn check_children(&self) {
        let len = self.validity.len();
        match self.mode {
            UnionMode::Sparse => {
                for (i, c) in self.children.iter().enumerate() {
                    assert_eq!(
                        c.len(),
                        len,
                        "sparse union child {} holds {} values, but the union has {} slots",
                        self.type_codes[i],
                        c.len(),
                        len
                    );
                }
            },
            UnionMode::Dense => {
                let (type_ids, offsets) = match (self.type_ids.as_ref(), self.offsets.as_ref()) {
                    (Some(type_ids), Some(offsets)) => (type_ids, offsets),
                    _ => return
                };
                let slots = type_ids.as_slice()[..len].iter().zip(&offsets.as_slice()[..len]);
                for (type_id, offset) in slots {
                    let child_len = self.children[self.child_index(*type_id)].len();
                    assert!(
                        (*offset as usize) < child_len,
                        "dense union slot points at value {} of child {}, which holds {} values",
                        offset,
                        type_id,
                        child_len
                    );
                }
            }
        }
    }

    /// Panics when a child did not receive its value for every slot.
    pub fn finish(&mut self) -> UnionArray {
        self.check_children();
        let len = self.validity.len();
        self.validity.reset();

        let type_ids = match self.type_ids.take() {
            Some(type_ids) => ScalarBuffer::new(type_ids.finish(len), 0, len),
            None => ScalarBuffer::from(Vec::new())
        };
        let offsets = match self.mode {
            UnionMode::Dense => Some(match self.offsets.take() {
                Some(offsets) => ScalarBuffer::new(offsets.finish(len), 0, len),
                None => ScalarBuffer::from(Vec::new())
            }),
            UnionMode::Sparse => None
        };
        let children = self.children.iter_mut()
            .map(|c| ArrayBuilder::finish(c))
            .collect();

        // SAFETY: type ids come from the union fields, the child lengths were checked above
        unsafe {
            UnionArray::new_unchecked(self.fields.clone(), type_ids, offsets, children)
        }
    }
}


impl ArrayBuilder for UnionBuilder {
    fn data_type(&self) -> DataType {
        DataType::Union(self.fields.clone(), self.mode)
    }

    fn validity(&self) -> &ValidityBuilder {
        &self.validity
    }

    fn validity_mut(&mut self) -> &mut ValidityBuilder {
        &mut self.validity
    }

    fn byte_size(&self) -> usize {
        self.validity.byte_size()
            + self.type_ids.as_ref().map_or(0, |t| t.byte_size())
            + self.offsets.as_ref().map_or(0, |o| o.byte_size())
            + self.children.iter().map(|c| c.byte_size()).sum::<usize>()
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        let allocator = self.validity.allocator().clone();
        let type_ids = NativeBuffer::allocate(allocator.clone(), capacity)?;
        let offsets = match self.mode {
            UnionMode::Dense => Some(NativeBuffer::allocate(allocator, capacity)?),
            UnionMode::Sparse => None
        };
        if self.mode == UnionMode::Sparse {
            for c in self.children.iter_mut() {
                grow_child(c, capacity)?;
            }
        }
        self.validity.init(capacity)?;
        self.type_ids = Some(type_ids);
        self.offsets = offsets;
        Ok(())
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        let type_ids = match self.type_ids.as_mut() {
            Some(type_ids) => type_ids,
            None => return Ok(())
        };
        type_ids.resize(capacity)?;
        if let Some(offsets) = self.offsets.as_mut() {
            offsets.resize(capacity)?;
        }

        if capacity >= self.validity.len() {
            if self.mode == UnionMode::Sparse {
                for c in self.children.iter_mut() {
                    grow_child(c, capacity)?;
                }
            }
            return Ok(())
        }
        match self.mode {
            UnionMode::Sparse => {
                for c in self.children.iter_mut() {
                    if capacity < c.len() {
                        c.resize(capacity)?;
                    }
                }
            },
            UnionMode::Dense => {
                let mut counts = vec![0; self.children.len()];
                for type_id in &type_ids.as_slice()[..capacity] {
                    if let Some(i) = self.type_codes.iter().position(|c| c == type_id) {
                        counts[i] += 1;
                    }
                }
                for (c, count) in self.children.iter_mut().zip(counts) {
                    if count < c.len() {
                        c.resize(count)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        let child = self.first_child();
        self.push_slot(child, false, |c| c.append_null())
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        let child = self.first_child();
        self.push_slot(child, true, |c| c.append_empty_value())
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(self.finish())
    }
}
