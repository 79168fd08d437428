use crate::builder::{AnyBuilder, ArrayBuilder, ValidityBuilder};
use crate::memory::AllocError;
use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, FieldRef};


/// Field metadata key naming the extension type of a field.
pub const EXTENSION_TYPE_NAME_KEY: &str = "ARROW:extension:name";

/// Field metadata key holding the serialized extension type parameters.
pub const EXTENSION_TYPE_METADATA_KEY: &str = "ARROW:extension:metadata";


/// Builder for a field of an extension type.
///
/// All values go to the builder of the storage type. The extension itself
/// lives in the field metadata, which is kept alongside.
pub struct ExtensionBuilder {
    field: FieldRef,
    storage: Box<AnyBuilder>
}


impl ExtensionBuilder {
    pub fn new(field: FieldRef, storage: AnyBuilder) -> Self {
        assert!(
            field.metadata().contains_key(EXTENSION_TYPE_NAME_KEY),
            "field {} is not of an extension type",
            field.name()
        );
        assert_eq!(
            field.data_type(),
            &storage.data_type(),
            "storage builder must build the field type"
        );
        Self {
            field,
            storage: Box::new(storage)
        }
    }

    pub fn extension_name(&self) -> &str {
        self.field.metadata()
            .get(EXTENSION_TYPE_NAME_KEY)
            .map(|s| s.as_str())
            .unwrap_or_default()
    }

    pub fn extension_metadata(&self) -> Option<&str> {
        self.field.metadata().get(EXTENSION_TYPE_METADATA_KEY).map(|s| s.as_str())
    }

    pub fn field(&self) -> &FieldRef {
        &self.field
    }

    pub fn storage(&mut self) -> &mut AnyBuilder {
        &mut self.storage
    }

    /// Finishes the storage array together with the field describing its extension type.
    pub fn finish_field(&mut self) -> (FieldRef, ArrayRef) {
        (self.field.clone(), self.storage.finish())
    }
}


impl ArrayBuilder for ExtensionBuilder {
    fn data_type(&self) -> DataType {
        self.storage.data_type()
    }

    fn validity(&self) -> &ValidityBuilder {
        self.storage.validity()
    }

    fn validity_mut(&mut self) -> &mut ValidityBuilder {
        self.storage.validity_mut()
    }

    fn byte_size(&self) -> usize {
        self.storage.byte_size()
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        self.storage.init(capacity)
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        self.storage.resize_values(capacity)
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        self.storage.append_null()
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        self.storage.append_empty_value()
    }

    fn append_nulls(&mut self, n: usize) -> anyhow::Result<()> {
        self.storage.append_nulls(n)
    }

    fn append_value_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.storage.append_value_bytes(bytes)
    }

    fn finish(&mut self) -> ArrayRef {
        self.storage.finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::FixedSizeBinaryBuilder;
    use crate::memory::default_allocator;
    use arrow::array::{Array, FixedSizeBinaryArray};
    use arrow::datatypes::Field;
    use std::collections::HashMap;
    use std::sync::Arc;


    fn uuid_field() -> FieldRef {
        let metadata = HashMap::from([(EXTENSION_TYPE_NAME_KEY.to_string(), "arrow.uuid".to_string())]);
        Arc::new(Field::new("id", DataType::FixedSizeBinary(16), true).with_metadata(metadata))
    }

    #[test]
    fn delegates_to_storage() -> anyhow::Result<()> {
        let storage = FixedSizeBinaryBuilder::new(default_allocator(), 16);
        let mut builder = ExtensionBuilder::new(uuid_field(), storage.into());
        assert_eq!(builder.extension_name(), "arrow.uuid");
        assert_eq!(builder.extension_metadata(), None);

        builder.append_value_bytes(&[7; 16])?;
        builder.append_null()?;
        assert_eq!(builder.len(), 2);
        assert_eq!(builder.null_count(), 1);

        let (field, array) = builder.finish_field();
        assert_eq!(field, uuid_field());
        let array = array.as_any().downcast_ref::<FixedSizeBinaryArray>().unwrap();
        assert_eq!(array.value(0), &[7; 16]);
        assert!(array.is_null(1));
        assert_eq!(builder.len(), 0);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "is not of an extension type")]
    fn requires_extension_metadata() {
        let field = Arc::new(Field::new("id", DataType::FixedSizeBinary(16), true));
        ExtensionBuilder::new(field, FixedSizeBinaryBuilder::new(default_allocator(), 16).into());
    }
}
