use crate::builder::{ArrayBuilder, ValidityBuilder};
use crate::memory::{AllocError, AllocatorRef, NativeBuffer};
use crate::util::uninitialized_buffer_access;
use arrow::array::{ArrayRef, PrimitiveArray};
use arrow::datatypes::{ArrowPrimitiveType, DataType};
use arrow_buffer::ScalarBuffer;
use std::sync::Arc;


pub struct PrimitiveBuilder<T: ArrowPrimitiveType> {
    data_type: DataType,
    validity: ValidityBuilder,
    values: Option<NativeBuffer<T::Native>>
}


impl <T: ArrowPrimitiveType> PrimitiveBuilder<T> {
    pub fn new(allocator: AllocatorRef) -> Self {
        Self {
            data_type: T::DATA_TYPE,
            validity: ValidityBuilder::new(allocator),
            values: None
        }
    }

    /// Overrides the logical type, e.g. to set a timezone or decimal precision and scale.
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        assert!(
            is_compatible(&T::DATA_TYPE, &data_type),
            "{} is not compatible with {}",
            data_type,
            T::DATA_TYPE
        );
        self.data_type = data_type;
        self
    }

    fn values_mut(&mut self) -> &mut NativeBuffer<T::Native> {
        match self.values.as_mut() {
            Some(values) => values,
            None => uninitialized_buffer_access!()
        }
    }

    pub fn values_slice(&self) -> &[T::Native] {
        match self.values.as_ref() {
            Some(values) => &values.as_slice()[..self.validity.len()],
            None => &[]
        }
    }

    pub fn append_value(&mut self, val: T::Native) -> Result<(), AllocError> {
        self.reserve(1)?;
        let i = self.validity.len();
        self.values_mut().set(i, val);
        self.validity.append(true);
        Ok(())
    }

    pub fn append_option(&mut self, val: Option<T::Native>) -> Result<(), AllocError> {
        self.reserve(1)?;
        let i = self.validity.len();
        self.values_mut().set(i, val.unwrap_or_default());
        self.validity.append(val.is_some());
        Ok(())
    }

    /// Appends `values`, all of them valid unless `validity` says otherwise.
    pub fn append_values(&mut self, values: &[T::Native], validity: Option<&[bool]>) -> Result<(), AllocError> {
        if values.is_empty() {
            return Ok(())
        }
        self.reserve(values.len())?;
        let offset = self.validity.len();
        self.values_mut().set_slice(offset, values);
        self.validity.append_bulk(validity, values.len());
        Ok(())
    }

    /// Appends a single valid value given as its raw little-endian representation.
    pub fn append_native_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        anyhow::ensure!(
            bytes.len() == size_of::<T::Native>(),
            "{} value must be {} bytes wide, got {}",
            self.data_type,
            size_of::<T::Native>(),
            bytes.len()
        );
        self.reserve(1)?;
        let i = self.validity.len();
        self.values_mut().set_bytes(i, bytes);
        self.validity.append(true);
        Ok(())
    }

    pub fn finish(&mut self) -> PrimitiveArray<T> {
        let len = self.validity.len();
        let values = match self.values.take() {
            Some(values) => ScalarBuffer::new(values.finish(len), 0, len),
            None => ScalarBuffer::from(Vec::new())
        };
        PrimitiveArray::new(values, self.validity.finish()).with_data_type(self.data_type.clone())
    }
}


impl <T: ArrowPrimitiveType> ArrayBuilder for PrimitiveBuilder<T> {
    fn data_type(&self) -> DataType {
        self.data_type.clone()
    }

    fn validity(&self) -> &ValidityBuilder {
        &self.validity
    }

    fn validity_mut(&mut self) -> &mut ValidityBuilder {
        &mut self.validity
    }

    fn byte_size(&self) -> usize {
        self.validity.byte_size() + self.values.as_ref().map_or(0, |v| v.byte_size())
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        let values = NativeBuffer::allocate(self.validity.allocator().clone(), capacity)?;
        self.validity.init(capacity)?;
        self.values = Some(values);
        Ok(())
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        if let Some(values) = self.values.as_mut() {
            values.resize(capacity)?;
        }
        Ok(())
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        self.append_option(None)?;
        Ok(())
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        self.append_value(T::Native::default())?;
        Ok(())
    }

    fn append_value_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.append_native_bytes(bytes)
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(self.finish())
    }
}


fn is_compatible(native: &DataType, data_type: &DataType) -> bool {
    match (native, data_type) {
        (DataType::Timestamp(a, _), DataType::Timestamp(b, _)) => a == b,
        (DataType::Decimal128(_, _), DataType::Decimal128(_, _)) => true,
        (DataType::Decimal256(_, _), DataType::Decimal256(_, _)) => true,
        (a, b) => a == b
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{default_allocator, CheckedAllocator};
    use arrow::array::{Array, Decimal128Array, Int32Array, TimestampMillisecondArray};
    use arrow::datatypes::{Decimal128Type, Int32Type, TimestampMillisecondType};


    #[test]
    fn build_int32() -> anyhow::Result<()> {
        let mut builder = PrimitiveBuilder::<Int32Type>::new(default_allocator());
        builder.append_value(1)?;
        builder.append_null()?;
        builder.append_values(&[3, 4, 5], Some(&[true, false, true]))?;
        builder.append_option(Some(6))?;
        builder.append_empty_value()?;
        builder.append_native_bytes(&8i32.to_le_bytes())?;
        assert_eq!(builder.len(), 8);
        assert_eq!(builder.null_count(), 2);
        assert_eq!(builder.capacity(), 32);

        let array = builder.finish();
        assert_eq!(
            array,
            Int32Array::from(vec![Some(1), None, Some(3), None, Some(5), Some(6), Some(0), Some(8)])
        );
        Ok(())
    }

    #[test]
    fn native_bytes_width_is_checked() {
        let mut builder = PrimitiveBuilder::<Int32Type>::new(default_allocator());
        assert!(builder.append_native_bytes(&[1, 2]).is_err());
        assert_eq!(builder.len(), 0);
    }

    #[test]
    fn all_valid_array_has_no_null_buffer() -> anyhow::Result<()> {
        let mut builder = PrimitiveBuilder::<Int32Type>::new(default_allocator());
        builder.append_values(&[1, 2, 3], None)?;
        let array = builder.finish();
        assert!(array.nulls().is_none());
        assert_eq!(array.values().as_ref(), &[1, 2, 3]);
        Ok(())
    }

    #[test]
    fn timestamp_keeps_timezone() -> anyhow::Result<()> {
        let data_type = DataType::Timestamp(arrow::datatypes::TimeUnit::Millisecond, Some("UTC".into()));
        let mut builder = PrimitiveBuilder::<TimestampMillisecondType>::new(default_allocator())
            .with_data_type(data_type.clone());
        builder.append_value(1000)?;
        let array = builder.finish();
        assert_eq!(array.data_type(), &data_type);
        assert_eq!(array, TimestampMillisecondArray::from(vec![1000]).with_timezone("UTC"));
        Ok(())
    }

    #[test]
    fn decimal_keeps_precision_and_scale() -> anyhow::Result<()> {
        let mut builder = PrimitiveBuilder::<Decimal128Type>::new(default_allocator())
            .with_data_type(DataType::Decimal128(10, 2));
        builder.append_value(12345)?;
        let array = builder.finish();
        assert_eq!(array.data_type(), &DataType::Decimal128(10, 2));
        assert_eq!(array, Decimal128Array::from(vec![12345]).with_precision_and_scale(10, 2)?);
        Ok(())
    }

    #[test]
    #[should_panic(expected = "is not compatible")]
    fn incompatible_data_type() {
        let _ = PrimitiveBuilder::<Int32Type>::new(default_allocator()).with_data_type(DataType::Int64);
    }

    #[test]
    fn shrink_truncates_values() -> anyhow::Result<()> {
        let mut builder = PrimitiveBuilder::<Int32Type>::new(default_allocator());
        builder.append_values(&[1, 2, 3, 4, 5], Some(&[true, false, true, false, true]))?;
        builder.resize(3)?;
        assert_eq!(builder.len(), 3);
        assert_eq!(builder.capacity(), 3);
        assert_eq!(builder.null_count(), 1);
        builder.append_value(9)?;
        assert_eq!(builder.capacity(), 32);
        assert_eq!(builder.finish(), Int32Array::from(vec![Some(1), None, Some(3), Some(9)]));
        Ok(())
    }

    #[test]
    fn failed_reserve_keeps_state() -> anyhow::Result<()> {
        let allocator = Arc::new(CheckedAllocator::new().with_limit(1024));
        let mut builder = PrimitiveBuilder::<Int32Type>::new(allocator.clone());
        builder.append_values(&[1, 2, 3], Some(&[true, false, true]))?;

        let err = builder.reserve(1 << 20).unwrap_err();
        assert!(matches!(err, AllocError::LimitExceeded { .. }));
        assert_eq!(builder.len(), 3);
        assert_eq!(builder.capacity(), 32);
        assert_eq!(builder.null_count(), 1);

        let err = builder.append_values(&vec![0; 1 << 20], None).unwrap_err();
        assert!(matches!(err, AllocError::LimitExceeded { .. }));
        assert_eq!(builder.values_slice(), &[1, 2, 3]);

        drop(builder);
        assert_eq!(allocator.live_bytes(), 0);
        assert_eq!(allocator.outstanding(), 0);
        Ok(())
    }
}
