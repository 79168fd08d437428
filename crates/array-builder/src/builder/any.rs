use crate::builder::*;
use crate::factory::make_builder;
use crate::memory::{default_allocator, AllocError};
use arrow::array::ArrayRef;
use arrow::datatypes::{DataType, Int16Type, Int32Type, Int64Type, Int8Type, UInt16Type, UInt32Type, UInt64Type, UInt8Type};
use std::any::Any;


/// Builder of any supported arrow type.
///
/// This is what [crate::factory::make_builder] returns and what nested
/// builders hold for their children.
pub enum AnyBuilder {
    Null(NullBuilder),
    Boolean(BooleanBuilder),
    Int8(Int8Builder),
    Int16(Int16Builder),
    Int32(Int32Builder),
    Int64(Int64Builder),
    UInt8(UInt8Builder),
    UInt16(UInt16Builder),
    UInt32(UInt32Builder),
    UInt64(UInt64Builder),
    Float16(Float16Builder),
    Float32(Float32Builder),
    Float64(Float64Builder),
    Date32(Date32Builder),
    Date64(Date64Builder),
    Time32Second(Time32SecondBuilder),
    Time32Millisecond(Time32MillisecondBuilder),
    Time64Microsecond(Time64MicrosecondBuilder),
    Time64Nanosecond(Time64NanosecondBuilder),
    TimestampSecond(TimestampSecondBuilder),
    TimestampMillisecond(TimestampMillisecondBuilder),
    TimestampMicrosecond(TimestampMicrosecondBuilder),
    TimestampNanosecond(TimestampNanosecondBuilder),
    DurationSecond(DurationSecondBuilder),
    DurationMillisecond(DurationMillisecondBuilder),
    DurationMicrosecond(DurationMicrosecondBuilder),
    DurationNanosecond(DurationNanosecondBuilder),
    IntervalYearMonth(IntervalYearMonthBuilder),
    IntervalDayTime(IntervalDayTimeBuilder),
    IntervalMonthDayNano(IntervalMonthDayNanoBuilder),
    Decimal128(Decimal128Builder),
    Decimal256(Decimal256Builder),
    Binary(BinaryBuilder),
    LargeBinary(LargeBinaryBuilder),
    String(StringBuilder),
    LargeString(LargeStringBuilder),
    FixedSizeBinary(FixedSizeBinaryBuilder),
    List(ListBuilder),
    LargeList(LargeListBuilder),
    FixedSizeList(FixedSizeListBuilder),
    Struct(StructBuilder),
    Map(MapBuilder),
    Union(UnionBuilder),
    DictionaryInt8(DictionaryBuilder<Int8Type>),
    DictionaryInt16(DictionaryBuilder<Int16Type>),
    DictionaryInt32(DictionaryBuilder<Int32Type>),
    DictionaryInt64(DictionaryBuilder<Int64Type>),
    DictionaryUInt8(DictionaryBuilder<UInt8Type>),
    DictionaryUInt16(DictionaryBuilder<UInt16Type>),
    DictionaryUInt32(DictionaryBuilder<UInt32Type>),
    DictionaryUInt64(DictionaryBuilder<UInt64Type>),
    RunEndEncodedInt16(RunEndEncodedBuilder<Int16Type>),
    RunEndEncodedInt32(RunEndEncodedBuilder<Int32Type>),
    RunEndEncodedInt64(RunEndEncodedBuilder<Int64Type>),
    Extension(ExtensionBuilder)
}


macro_rules! with_builder {
    ($this:expr, $b:ident => $body:expr) => {
        match $this {
            AnyBuilder::Null($b) => $body,
            AnyBuilder::Boolean($b) => $body,
            AnyBuilder::Int8($b) => $body,
            AnyBuilder::Int16($b) => $body,
            AnyBuilder::Int32($b) => $body,
            AnyBuilder::Int64($b) => $body,
            AnyBuilder::UInt8($b) => $body,
            AnyBuilder::UInt16($b) => $body,
            AnyBuilder::UInt32($b) => $body,
            AnyBuilder::UInt64($b) => $body,
            AnyBuilder::Float16($b) => $body,
            AnyBuilder::Float32($b) => $body,
            AnyBuilder::Float64($b) => $body,
            AnyBuilder::Date32($b) => $body,
            AnyBuilder::Date64($b) => $body,
            AnyBuilder::Time32Second($b) => $body,
            AnyBuilder::Time32Millisecond($b) => $body,
            AnyBuilder::Time64Microsecond($b) => $body,
            AnyBuilder::Time64Nanosecond($b) => $body,
            AnyBuilder::TimestampSecond($b) => $body,
            AnyBuilder::TimestampMillisecond($b) => $body,
            AnyBuilder::TimestampMicrosecond($b) => $body,
            AnyBuilder::TimestampNanosecond($b) => $body,
            AnyBuilder::DurationSecond($b) => $body,
            AnyBuilder::DurationMillisecond($b) => $body,
            AnyBuilder::DurationMicrosecond($b) => $body,
            AnyBuilder::DurationNanosecond($b) => $body,
            AnyBuilder::IntervalYearMonth($b) => $body,
            AnyBuilder::IntervalDayTime($b) => $body,
            AnyBuilder::IntervalMonthDayNano($b) => $body,
            AnyBuilder::Decimal128($b) => $body,
            AnyBuilder::Decimal256($b) => $body,
            AnyBuilder::Binary($b) => $body,
            AnyBuilder::LargeBinary($b) => $body,
            AnyBuilder::String($b) => $body,
            AnyBuilder::LargeString($b) => $body,
            AnyBuilder::FixedSizeBinary($b) => $body,
            AnyBuilder::List($b) => $body,
            AnyBuilder::LargeList($b) => $body,
            AnyBuilder::FixedSizeList($b) => $body,
            AnyBuilder::Struct($b) => $body,
            AnyBuilder::Map($b) => $body,
            AnyBuilder::Union($b) => $body,
            AnyBuilder::DictionaryInt8($b) => $body,
            AnyBuilder::DictionaryInt16($b) => $body,
            AnyBuilder::DictionaryInt32($b) => $body,
            AnyBuilder::DictionaryInt64($b) => $body,
            AnyBuilder::DictionaryUInt8($b) => $body,
            AnyBuilder::DictionaryUInt16($b) => $body,
            AnyBuilder::DictionaryUInt32($b) => $body,
            AnyBuilder::DictionaryUInt64($b) => $body,
            AnyBuilder::RunEndEncodedInt16($b) => $body,
            AnyBuilder::RunEndEncodedInt32($b) => $body,
            AnyBuilder::RunEndEncodedInt64($b) => $body,
            AnyBuilder::Extension($b) => $body,
        }
    };
}


impl AnyBuilder {
    /// Builder for `data_type` backed by the default allocator.
    pub fn new(data_type: &DataType) -> Self {
        make_builder(default_allocator(), data_type)
    }

    pub fn downcast_ref<B: 'static>(&self) -> Option<&B> {
        with_builder!(self, b => (b as &dyn Any).downcast_ref())
    }

    pub fn downcast_mut<B: 'static>(&mut self) -> Option<&mut B> {
        with_builder!(self, b => (b as &mut dyn Any).downcast_mut())
    }
}


impl ArrayBuilder for AnyBuilder {
    fn data_type(&self) -> DataType {
        with_builder!(self, b => b.data_type())
    }

    fn validity(&self) -> &ValidityBuilder {
        with_builder!(self, b => b.validity())
    }

    fn validity_mut(&mut self) -> &mut ValidityBuilder {
        with_builder!(self, b => b.validity_mut())
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        with_builder!(self, b => b.init(capacity))
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        with_builder!(self, b => b.resize_values(capacity))
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        with_builder!(self, b => b.append_null())
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        with_builder!(self, b => b.append_empty_value())
    }

    fn finish(&mut self) -> ArrayRef {
        with_builder!(self, b => ArrayBuilder::finish(b))
    }

    fn byte_size(&self) -> usize {
        with_builder!(self, b => b.byte_size())
    }

    fn append_nulls(&mut self, n: usize) -> anyhow::Result<()> {
        with_builder!(self, b => b.append_nulls(n))
    }

    fn append_empty_values(&mut self, n: usize) -> anyhow::Result<()> {
        with_builder!(self, b => b.append_empty_values(n))
    }

    fn append_value_bytes(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        with_builder!(self, b => b.append_value_bytes(bytes))
    }
}


macro_rules! impl_from {
    ($kind:ident, $ty:ty) => {
        impl From<$ty> for AnyBuilder {
            fn from(value: $ty) -> Self {
                AnyBuilder::$kind(value)
            }
        }
    };
}
impl_from!(Null, NullBuilder);
impl_from!(Boolean, BooleanBuilder);
impl_from!(Int8, Int8Builder);
impl_from!(Int16, Int16Builder);
impl_from!(Int32, Int32Builder);
impl_from!(Int64, Int64Builder);
impl_from!(UInt8, UInt8Builder);
impl_from!(UInt16, UInt16Builder);
impl_from!(UInt32, UInt32Builder);
impl_from!(UInt64, UInt64Builder);
impl_from!(Float16, Float16Builder);
impl_from!(Float32, Float32Builder);
impl_from!(Float64, Float64Builder);
impl_from!(Date32, Date32Builder);
impl_from!(Date64, Date64Builder);
impl_from!(Time32Second, Time32SecondBuilder);
impl_from!(Time32Millisecond, Time32MillisecondBuilder);
impl_from!(Time64Microsecond, Time64MicrosecondBuilder);
impl_from!(Time64Nanosecond, Time64NanosecondBuilder);
impl_from!(TimestampSecond, TimestampSecondBuilder);
impl_from!(TimestampMillisecond, TimestampMillisecondBuilder);
impl_from!(TimestampMicrosecond, TimestampMicrosecondBuilder);
impl_from!(TimestampNanosecond, TimestampNanosecondBuilder);
impl_from!(DurationSecond, DurationSecondBuilder);
impl_from!(DurationMillisecond, DurationMillisecondBuilder);
impl_from!(DurationMicrosecond, DurationMicrosecondBuilder);
impl_from!(DurationNanosecond, DurationNanosecondBuilder);
impl_from!(IntervalYearMonth, IntervalYearMonthBuilder);
impl_from!(IntervalDayTime, IntervalDayTimeBuilder);
impl_from!(IntervalMonthDayNano, IntervalMonthDayNanoBuilder);
impl_from!(Decimal128, Decimal128Builder);
impl_from!(Decimal256, Decimal256Builder);
impl_from!(Binary, BinaryBuilder);
impl_from!(LargeBinary, LargeBinaryBuilder);
impl_from!(String, StringBuilder);
impl_from!(LargeString, LargeStringBuilder);
impl_from!(FixedSizeBinary, FixedSizeBinaryBuilder);
impl_from!(List, ListBuilder);
impl_from!(LargeList, LargeListBuilder);
impl_from!(FixedSizeList, FixedSizeListBuilder);
impl_from!(Struct, StructBuilder);
impl_from!(Map, MapBuilder);
impl_from!(Union, UnionBuilder);
impl_from!(DictionaryInt8, DictionaryBuilder<Int8Type>);
impl_from!(DictionaryInt16, DictionaryBuilder<Int16Type>);
impl_from!(DictionaryInt32, DictionaryBuilder<Int32Type>);
impl_from!(DictionaryInt64, DictionaryBuilder<Int64Type>);
impl_from!(DictionaryUInt8, DictionaryBuilder<UInt8Type>);
impl_from!(DictionaryUInt16, DictionaryBuilder<UInt16Type>);
impl_from!(DictionaryUInt32, DictionaryBuilder<UInt32Type>);
impl_from!(DictionaryUInt64, DictionaryBuilder<UInt64Type>);
impl_from!(RunEndEncodedInt16, RunEndEncodedBuilder<Int16Type>);
impl_from!(RunEndEncodedInt32, RunEndEncodedBuilder<Int32Type>);
impl_from!(RunEndEncodedInt64, RunEndEncodedBuilder<Int64Type>);
impl_from!(Extension, ExtensionBuilder);
