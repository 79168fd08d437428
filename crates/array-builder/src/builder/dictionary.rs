use crate::builder::{AnyBuilder, ArrayBuilder, ValidityBuilder};
use crate::factory::make_builder;
use crate::memory::{AllocError, AllocatorRef, NativeBuffer};
use crate::util::uninitialized_buffer_access;
use anyhow::anyhow;
use arrow::array::{ArrayRef, DictionaryArray, PrimitiveArray};
use arrow::datatypes::{ArrowDictionaryKeyType, DataType};
use arrow_buffer::{ArrowNativeType, ScalarBuffer, ToByteSlice};
use std::collections::HashMap;
use std::sync::Arc;


/// Whether dictionary values of type `ty` can be memoized by their byte representation.
pub fn is_memoizable(ty: &DataType) -> bool {
    matches!(
        ty,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Binary | DataType::LargeBinary | DataType::FixedSizeBinary(_)
    ) || ty.primitive_width().is_some()
}


/// Builder for dictionary encoded arrays.
///
/// Every distinct value is stored once in the value builder, keys
/// point at it. Values are identified by their raw bytes.
pub struct DictionaryBuilder<K: ArrowDictionaryKeyType> {
    validity: ValidityBuilder,
    keys: Option<NativeBuffer<K::Native>>,
    values: Box<AnyBuilder>,
    memo: HashMap<Box<[u8]>, K::Native>,
    empty_value: Box<[u8]>
}


impl <K: ArrowDictionaryKeyType> DictionaryBuilder<K> {
    pub fn new(allocator: AllocatorRef, value_type: &DataType) -> Self {
        assert!(
            is_memoizable(value_type),
            "unsupported arrow type - {}",
            DataType::Dictionary(Box::new(K::DATA_TYPE), Box::new(value_type.clone()))
        );
        let empty_value = match value_type {
            DataType::FixedSizeBinary(width) => vec![0; *width as usize],
            ty => vec![0; ty.primitive_width().unwrap_or(0)]
        };
        Self {
            validity: ValidityBuilder::new(allocator.clone()),
            keys: None,
            values: Box::new(make_builder(allocator, value_type)),
            memo: HashMap::new(),
            empty_value: empty_value.into_boxed_slice()
        }
    }

    pub fn value_type(&self) -> DataType {
        self.values.data_type()
    }

    /// Number of distinct values seen since the last finish.
    pub fn dictionary_len(&self) -> usize {
        self.values.len()
    }

    fn lookup_or_insert(&mut self, bytes: &[u8]) -> anyhow::Result<K::Native> {
        if let Some(key) = self.memo.get(bytes) {
            return Ok(*key)
        }
        let key = K::Native::from_usize(self.values.len()).ok_or_else(|| {
            anyhow!("dictionary key overflow: {} can't index {} values", K::DATA_TYPE, self.values.len())
        })?;
        self.values.append_value_bytes(bytes)?;
        self.memo.insert(bytes.into(), key);
        Ok(key)
    }

    fn push_key(&mut self, key: K::Native, valid: bool) -> anyhow::Result<()> {
        self.reserve(1)?;
        let i = self.validity.len();
        match self.keys.as_mut() {
            Some(keys) => keys.set(i, key),
            None => uninitialized_buffer_access!()
        }
        self.validity.append(valid);
        Ok(())
    }

    /// Appends a value given by its raw bytes and returns its dictionary key.
    pub fn append_value(&mut self, bytes: &[u8]) -> anyhow::Result<K::Native> {
        let key = self.lookup_or_insert(bytes)?;
        self.push_key(key, true)?;
        Ok(key)
    }

    pub fn append_str(&mut self, value: &str) -> anyhow::Result<K::Native> {
        self.append_value(value.as_bytes())
    }

    /// Appends a fixed-width native value.
    pub fn append_native<T: ArrowNativeType>(&mut self, value: T) -> anyhow::Result<K::Native> {
        self.append_value(value.to_byte_slice())
    }

    pub fn append_option(&mut self, bytes: Option<&[u8]>) -> anyhow::Result<()> {
        match bytes {
            Some(bytes) => self.append_value(bytes).map(|_| ()),
            None => self.push_key(K::Native::default(), false)
        }
    }

    pub fn finish(&mut self) -> DictionaryArray<K> {
        let len = self.validity.len();
        let nulls = self.validity.finish();
        let keys = match self.keys.take() {
            Some(keys) => ScalarBuffer::new(keys.finish(len), 0, len),
            None => ScalarBuffer::from(Vec::new())
        };
        let keys = PrimitiveArray::<K>::new(keys, nulls);
        let values = ArrayBuilder::finish(self.values.as_mut());
        self.memo.clear();
        // SAFETY: every valid key was handed out for a value present in `values`,
        // null slots hold the zero key
        unsafe {
            DictionaryArray::new_unchecked(keys, values)
        }
    }
}


impl <K: ArrowDictionaryKeyType> ArrayBuilder for DictionaryBuilder<K> {
    fn data_type(&self) -> DataType {
        DataType::Dictionary(Box::new(K::DATA_TYPE), Box::new(self.values.data_type()))
    }

    fn validity(&self) -> &ValidityBuilder {
        &self.validity
    }

    fn validity_mut(&mut self) -> &mut ValidityBuilder {
        &mut self.validity
    }

    fn byte_size(&self) -> usize {
        self.validity.byte_size()
            + self.keys.as_ref().map_or(0, |k| k.byte_size())
            + self.values.byte_size()
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        let keys = NativeBuffer::allocate(self.validity.allocator().clone(), capacity)?;
        self.validity.init(capacity)?;
        self.keys = Some(keys);
        Ok(())
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        if let Some(keys) = self.keys.as_mut() {
            keys.resize(capacity)?;
        }
        Ok(())
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        self.push_key(K::Native::default(), false)
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        let empty = self.empty_value.clone();
        self.append_value(&empty).map(|_| ())
    }

    fn append_value_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.append_value(bytes).map(|_| ())
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(self.finish())
    }
}
