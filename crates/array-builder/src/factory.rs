use crate::builder::*;
use crate::memory::{default_allocator, AllocError, AllocatorRef};
use arrow::datatypes::{
    DataType, FieldRef, Int16Type, Int32Type, Int64Type, Int8Type, IntervalUnit, TimeUnit,
    UInt16Type, UInt32Type, UInt64Type, UInt8Type
};


/// Creates an empty builder for `data_type`.
///
/// Panics on types without a builder.
pub fn make_builder(allocator: AllocatorRef, data_type: &DataType) -> AnyBuilder {
    match data_type {
        DataType::Null => NullBuilder::new(allocator).into(),
        DataType::Boolean => BooleanBuilder::new(allocator).into(),
        DataType::Int8 => Int8Builder::new(allocator).into(),
        DataType::Int16 => Int16Builder::new(allocator).into(),
        DataType::Int32 => Int32Builder::new(allocator).into(),
        DataType::Int64 => Int64Builder::new(allocator).into(),
        DataType::UInt8 => UInt8Builder::new(allocator).into(),
        DataType::UInt16 => UInt16Builder::new(allocator).into(),
        DataType::UInt32 => UInt32Builder::new(allocator).into(),
        DataType::UInt64 => UInt64Builder::new(allocator).into(),
        DataType::Float16 => Float16Builder::new(allocator).into(),
        DataType::Float32 => Float32Builder::new(allocator).into(),
        DataType::Float64 => Float64Builder::new(allocator).into(),
        DataType::Date32 => Date32Builder::new(allocator).into(),
        DataType::Date64 => Date64Builder::new(allocator).into(),
        DataType::Time32(TimeUnit::Second) => Time32SecondBuilder::new(allocator).into(),
        DataType::Time32(TimeUnit::Millisecond) => Time32MillisecondBuilder::new(allocator).into(),
        DataType::Time64(TimeUnit::Microsecond) => Time64MicrosecondBuilder::new(allocator).into(),
        DataType::Time64(TimeUnit::Nanosecond) => Time64NanosecondBuilder::new(allocator).into(),
        DataType::Timestamp(unit, _) => {
            let ty = data_type.clone();
            match unit {
                TimeUnit::Second => TimestampSecondBuilder::new(allocator).with_data_type(ty).into(),
                TimeUnit::Millisecond => TimestampMillisecondBuilder::new(allocator).with_data_type(ty).into(),
                TimeUnit::Microsecond => TimestampMicrosecondBuilder::new(allocator).with_data_type(ty).into(),
                TimeUnit::Nanosecond => TimestampNanosecondBuilder::new(allocator).with_data_type(ty).into()
            }
        },
        DataType::Duration(unit) => match unit {
            TimeUnit::Second => DurationSecondBuilder::new(allocator).into(),
            TimeUnit::Millisecond => DurationMillisecondBuilder::new(allocator).into(),
            TimeUnit::Microsecond => DurationMicrosecondBuilder::new(allocator).into(),
            TimeUnit::Nanosecond => DurationNanosecondBuilder::new(allocator).into()
        },
        DataType::Interval(unit) => match unit {
            IntervalUnit::YearMonth => IntervalYearMonthBuilder::new(allocator).into(),
            IntervalUnit::DayTime => IntervalDayTimeBuilder::new(allocator).into(),
            IntervalUnit::MonthDayNano => IntervalMonthDayNanoBuilder::new(allocator).into()
        },
        DataType::Decimal128(_, _) => {
            Decimal128Builder::new(allocator).with_data_type(data_type.clone()).into()
        },
        DataType::Decimal256(_, _) => {
            Decimal256Builder::new(allocator).with_data_type(data_type.clone()).into()
        },
        DataType::Binary => BinaryBuilder::new(allocator).into(),
        DataType::LargeBinary => LargeBinaryBuilder::new(allocator).into(),
        DataType::Utf8 => StringBuilder::new(allocator).into(),
        DataType::LargeUtf8 => LargeStringBuilder::new(allocator).into(),
        DataType::FixedSizeBinary(width) => FixedSizeBinaryBuilder::new(allocator, *width).into(),
        DataType::List(f) => ListBuilder::new(allocator, f.clone()).into(),
        DataType::LargeList(f) => LargeListBuilder::new(allocator, f.clone()).into(),
        DataType::FixedSizeList(f, size) => FixedSizeListBuilder::new(allocator, f.clone(), *size).into(),
        DataType::Struct(fields) => StructBuilder::new(allocator, fields.clone()).into(),
        DataType::Map(entries, keys_sorted) => MapBuilder::new(allocator, entries.clone(), *keys_sorted).into(),
        DataType::Union(fields, mode) => UnionBuilder::new(allocator, fields.clone(), *mode).into(),
        DataType::Dictionary(key, value) => match key.as_ref() {
            DataType::Int8 => DictionaryBuilder::<Int8Type>::new(allocator, value).into(),
            DataType::Int16 => DictionaryBuilder::<Int16Type>::new(allocator, value).into(),
            DataType::Int32 => DictionaryBuilder::<Int32Type>::new(allocator, value).into(),
            DataType::Int64 => DictionaryBuilder::<Int64Type>::new(allocator, value).into(),
            DataType::UInt8 => DictionaryBuilder::<UInt8Type>::new(allocator, value).into(),
            DataType::UInt16 => DictionaryBuilder::<UInt16Type>::new(allocator, value).into(),
            DataType::UInt32 => DictionaryBuilder::<UInt32Type>::new(allocator, value).into(),
            DataType::UInt64 => DictionaryBuilder::<UInt64Type>::new(allocator, value).into(),
            _ => unsupported(data_type)
        },
        DataType::RunEndEncoded(run_ends, values) => match run_ends.data_type() {
            DataType::Int16 => RunEndEncodedBuilder::<Int16Type>::new(allocator, values.clone())
                .with_run_ends_field(run_ends.clone())
                .into(),
            DataType::Int32 => RunEndEncodedBuilder::<Int32Type>::new(allocator, values.clone())
                .with_run_ends_field(run_ends.clone())
                .into(),
            DataType::Int64 => RunEndEncodedBuilder::<Int64Type>::new(allocator, values.clone())
                .with_run_ends_field(run_ends.clone())
                .into(),
            _ => unsupported(data_type)
        },
        ty => unsupported(ty)
    }
}


fn unsupported(ty: &DataType) -> ! {
    panic!("unsupported arrow type - {}", ty)
}


/// Like [make_builder], but also recognizes extension types in the field metadata.
pub fn make_field_builder(allocator: AllocatorRef, field: &FieldRef) -> AnyBuilder {
    let storage = make_builder(allocator, field.data_type());
    if field.metadata().contains_key(EXTENSION_TYPE_NAME_KEY) {
        ExtensionBuilder::new(field.clone(), storage).into()
    } else {
        storage
    }
}


/// Builder construction settings: the allocator to draw memory from
/// and the number of elements to pre-size builders for.
#[derive(Clone)]
pub struct BuilderFactory {
    allocator: AllocatorRef,
    capacity: usize
}


impl BuilderFactory {
    pub fn new(allocator: AllocatorRef) -> Self {
        Self {
            allocator,
            capacity: 0
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn allocator(&self) -> &AllocatorRef {
        &self.allocator
    }

    pub fn make(&self, data_type: &DataType) -> Result<AnyBuilder, AllocError> {
        self.presize(make_builder(self.allocator.clone(), data_type))
    }

    pub fn make_field(&self, field: &FieldRef) -> Result<AnyBuilder, AllocError> {
        self.presize(make_field_builder(self.allocator.clone(), field))
    }

    fn presize(&self, builder: AnyBuilder) -> Result<AnyBuilder, AllocError> {
        if self.capacity == 0 {
            Ok(builder)
        } else {
            builder.with_capacity(self.capacity)
        }
    }
}


impl Default for BuilderFactory {
    fn default() -> Self {
        Self::new(default_allocator())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::CheckedAllocator;
    use std::sync::Arc;


    #[test]
    fn presized_builder() -> anyhow::Result<()> {
        let allocator = Arc::new(CheckedAllocator::new());
        let builder = BuilderFactory::new(allocator.clone()).with_capacity(100).make(&DataType::Int64)?;
        assert_eq!(builder.capacity(), 128);
        assert_eq!(builder.len(), 0);
        assert!(builder.downcast_ref::<Int64Builder>().is_some());
        assert_eq!(allocator.live_bytes(), 128 * 8 + 16);
        Ok(())
    }

    #[test]
    fn lazy_builder() {
        let builder = BuilderFactory::default().make(&DataType::Utf8).unwrap();
        assert_eq!(builder.capacity(), 0);
        assert_eq!(builder.byte_size(), 0);
    }

    #[test]
    #[should_panic(expected = "unsupported arrow type - Utf8View")]
    fn view_types_are_unsupported() {
        make_builder(default_allocator(), &DataType::Utf8View);
    }

    #[test]
    #[should_panic(expected = "unsupported arrow type")]
    fn sub_millisecond_time32_is_unsupported() {
        make_builder(default_allocator(), &DataType::Time32(TimeUnit::Microsecond));
    }
}
