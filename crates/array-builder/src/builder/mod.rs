use crate::memory::AllocError;
use arrow::array::{ArrayData, ArrayRef};
use arrow::datatypes::DataType;


mod aliases;
mod any;
mod binary;
mod boolean;
mod dictionary;
mod extension;
mod fixed_size_binary;
mod fixed_size_list;
mod list;
mod map;
mod null;
mod primitive;
mod run_end;
mod r#struct;
mod union;
pub mod validity;


pub use aliases::*;
pub use any::*;
pub use binary::*;
pub use boolean::*;
pub use dictionary::*;
pub use extension::*;
pub use fixed_size_binary::*;
pub use fixed_size_list::*;
pub use list::*;
pub use map::*;
pub use null::*;
pub use primitive::*;
pub use r#struct::*;
pub use run_end::*;
pub use union::*;
pub use validity::ValidityBuilder;


/// Smallest capacity a builder is ever sized to.
pub const MIN_BUILDER_CAPACITY: usize = 1 << 5;


/// Runs `append` on every child. When one of them fails, children which already
/// grew are cut back to their previous length before the error is returned.
pub(crate) fn append_to_children<F>(children: &mut [AnyBuilder], mut append: F) -> anyhow::Result<()>
where
    F: FnMut(usize, &mut AnyBuilder) -> anyhow::Result<()>
{
    let lens: Vec<usize> = children.iter().map(|c| c.len()).collect();
    for i in 0..children.len() {
        if let Err(err) = append(i, &mut children[i]) {
            for (c, len) in children.iter_mut().zip(lens) {
                if c.len() > len {
                    c.resize(len)?;
                }
            }
            return Err(err)
        }
    }
    Ok(())
}


/// Grows `child` so that it holds room for at least `capacity` elements.
pub(crate) fn grow_child(child: &mut AnyBuilder, capacity: usize) -> Result<(), AllocError> {
    if child.capacity() < capacity {
        child.resize(capacity)?;
    }
    Ok(())
}


/// Common surface of all array builders.
///
/// Every builder owns a [ValidityBuilder] which tracks length, capacity and nulls.
/// Concrete builders only provide the hooks that size their own value buffers;
/// growth policy and the bookkeeping around it live in the provided methods.
pub trait ArrayBuilder {
    fn data_type(&self) -> DataType;

    fn validity(&self) -> &ValidityBuilder;

    fn validity_mut(&mut self) -> &mut ValidityBuilder;

    /// First-time sizing: allocates value buffers for `capacity` elements,
    /// then initializes the validity bitmap.
    fn init(&mut self, capacity: usize) -> Result<(), AllocError>;

    /// Resizes value buffers of an initialized builder to `capacity` elements.
    ///
    /// Called before the validity bitmap is resized, so `self.len()` still holds
    /// the length before a possible truncation.
    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError>;

    fn append_null(&mut self) -> anyhow::Result<()>;

    /// Appends a valid zero value of the builder's type.
    fn append_empty_value(&mut self) -> anyhow::Result<()>;

    /// Moves accumulated buffers into an immutable array and resets the builder.
    fn finish(&mut self) -> ArrayRef;

    fn finish_data(&mut self) -> ArrayData {
        self.finish().to_data()
    }

    #[inline]
    fn len(&self) -> usize {
        self.validity().len()
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.validity().capacity()
    }

    #[inline]
    fn null_count(&self) -> usize {
        self.validity().null_count()
    }

    fn byte_size(&self) -> usize {
        self.validity().byte_size()
    }

    /// Makes room for `additional` more elements.
    fn reserve(&mut self, additional: usize) -> Result<(), AllocError> {
        match self.validity().grow_target(additional)? {
            Some(capacity) => self.resize(capacity),
            None => Ok(())
        }
    }

    /// Sets the capacity to `capacity` elements, truncating the builder when
    /// `capacity` is below its length.
    fn resize(&mut self, capacity: usize) -> Result<(), AllocError> {
        if !self.validity().is_initialized() {
            return self.init(std::cmp::max(capacity, MIN_BUILDER_CAPACITY))
        }
        self.resize_values(capacity)?;
        self.validity_mut().resize(capacity)
    }

    fn append_nulls(&mut self, n: usize) -> anyhow::Result<()> {
        self.reserve(n)?;
        for _ in 0..n {
            self.append_null()?;
        }
        Ok(())
    }

    fn append_empty_values(&mut self, n: usize) -> anyhow::Result<()> {
        self.reserve(n)?;
        for _ in 0..n {
            self.append_empty_value()?;
        }
        Ok(())
    }

    /// Appends a single valid value given by its raw byte representation.
    ///
    /// Supported by byte-like and fixed-width builders, which is what dictionary
    /// memoization relies on.
    fn append_value_bytes(&mut self, _bytes: &[u8]) -> anyhow::Result<()> {
        anyhow::bail!("{} values can't be appended from raw bytes", self.data_type())
    }

    /// Pre-sizes a fresh builder for `capacity` elements.
    fn with_capacity(mut self, capacity: usize) -> Result<Self, AllocError> where Self: Sized {
        self.reserve(capacity)?;
        Ok(self)
    }
}
