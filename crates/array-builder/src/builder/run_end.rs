use crate::builder::{append_to_children, AnyBuilder, ArrayBuilder, ValidityBuilder, MIN_BUILDER_CAPACITY};
use crate::factory::make_field_builder;
use crate::memory::{AllocError, AllocatorRef, NativeBuffer};
use crate::util::uninitialized_buffer_access;
use anyhow::anyhow;
use arrow::array::{Array, ArrayData, ArrayRef, PrimitiveArray, RunArray};
use arrow::datatypes::{DataType, Field, FieldRef, RunEndIndexType};
use arrow_buffer::{bit_util, ArrowNativeType, ScalarBuffer};
use std::sync::Arc;


/// Builder for run-end encoded arrays.
///
/// The engine tracks the logical length: a run of `n` elements counts `n` times.
/// Every run holds exactly one value in [RunEndEncodedBuilder::values].
/// Run-end encoded arrays have no validity of their own, consecutive
/// nulls collapse into a single null run.
pub struct RunEndEncodedBuilder<R: RunEndIndexType> {
    run_ends_field: FieldRef,
    values_field: FieldRef,
    validity: ValidityBuilder,
    run_ends: Option<NativeBuffer<R::Native>>,
    runs: usize,
    last_run_null: bool,
    values: Box<AnyBuilder>
}


impl <R: RunEndIndexType> RunEndEncodedBuilder<R> {
    pub fn new(allocator: AllocatorRef, values_field: FieldRef) -> Self {
        let values = make_field_builder(allocator.clone(), &values_field);
        Self {
            run_ends_field: Arc::new(Field::new("run_ends", R::DATA_TYPE, false)),
            values_field,
            validity: ValidityBuilder::new(allocator),
            run_ends: None,
            runs: 0,
            last_run_null: false,
            values: Box::new(values)
        }
    }

    pub fn with_run_ends_field(mut self, field: FieldRef) -> Self {
        assert_eq!(field.data_type(), &R::DATA_TYPE, "run ends field must be of {}", R::DATA_TYPE);
        self.run_ends_field = field;
        self
    }

    pub fn values(&mut self) -> &mut AnyBuilder {
        &mut self.values
    }

    pub fn num_runs(&self) -> usize {
        self.runs
    }

    fn run_end(&self, len: usize) -> anyhow::Result<R::Native> {
        R::Native::from_usize(len).ok_or_else(|| {
            anyhow!("run end overflow: {} does not fit into {}", len, R::DATA_TYPE)
        })
    }

    fn reserve_runs(&mut self, additional: usize) -> Result<(), AllocError> {
        let required = self.runs + additional;
        match self.run_ends.as_mut() {
            Some(run_ends) if run_ends.capacity() >= required => Ok(()),
            Some(run_ends) => {
                let capacity = std::cmp::max(required.next_power_of_two(), MIN_BUILDER_CAPACITY);
                run_ends.resize(capacity)
            },
            None => {
                let capacity = std::cmp::max(required.next_power_of_two(), MIN_BUILDER_CAPACITY);
                let run_ends = NativeBuffer::allocate(self.validity.allocator().clone(), capacity)?;
                self.run_ends = Some(run_ends);
                Ok(())
            }
        }
    }

    /// Records a run of `len` elements, `fill` appends its value.
    fn push_run<F>(&mut self, len: usize, valid: bool, fill: F) -> anyhow::Result<()>
    where
        F: FnOnce(&mut AnyBuilder) -> anyhow::Result<()>
    {
        anyhow::ensure!(len > 0, "runs must not be empty");
        let end = self.validity.len().checked_add(len).ok_or_else(|| anyhow!("run end overflow"))?;
        let end = self.run_end(end)?;
        self.reserve(len)?;
        self.reserve_runs(1)?;
        let mut fill = Some(fill);
        append_to_children(std::slice::from_mut(self.values.as_mut()), |_, c| {
            fill.take().map_or(Ok(()), |fill| fill(c))
        })?;
        match self.run_ends.as_mut() {
            Some(run_ends) => run_ends.set(self.runs, end),
            None => uninitialized_buffer_access!()
        }
        self.runs += 1;
        if valid {
            self.validity.append_n_valid(len);
        } else {
            self.validity.append_n_nulls(len);
        }
        self.last_run_null = !valid;
        Ok(())
    }

    /// Starts a run of `len` elements and returns the value builder,
    /// which must receive exactly one value for it.
    pub fn append_run(&mut self, len: usize) -> anyhow::Result<&mut AnyBuilder> {
        self.push_run(len, true, |_| Ok(()))?;
        Ok(&mut self.values)
    }

    /// Extends the last run by `n` elements.
    pub fn continue_run(&mut self, n: usize) -> anyhow::Result<()> {
        anyhow::ensure!(self.runs > 0, "there is no run to continue");
        if n == 0 {
            return Ok(())
        }
        let end = self.validity.len().checked_add(n).ok_or_else(|| anyhow!("run end overflow"))?;
        let end = self.run_end(end)?;
        self.reserve(n)?;
        match self.run_ends.as_mut() {
            Some(run_ends) => run_ends.set(self.runs - 1, end),
            None => uninitialized_buffer_access!()
        }
        if self.last_run_null {
            self.validity.append_n_nulls(n);
        } else {
            self.validity.append_n_valid(n);
        }
        Ok(())
    }

    /// Panics when some run did not receive its value.
    pub fn finish(&mut self) -> RunArray<R> {
        assert_eq!(
            self.values.len(),
            self.runs,
            "run-end encoded array holds {} values for {} runs",
            self.values.len(),
            self.runs
        );
        let len = self.validity.len();
        let runs = self.runs;
        self.validity.reset();
        self.runs = 0;
        self.last_run_null = false;

        let run_ends = match self.run_ends.take() {
            Some(run_ends) => ScalarBuffer::new(run_ends.finish(runs), 0, runs),
            None => ScalarBuffer::from(Vec::new())
        };
        let run_ends = PrimitiveArray::<R>::new(run_ends, None);
        let values = ArrayBuilder::finish(self.values.as_mut());

        let data = ArrayData::builder(self.data_type())
            .len(len)
            .add_child_data(run_ends.to_data())
            .add_child_data(values.to_data());
        // SAFETY: run ends are positive, strictly increasing, end at `len`
        // and the value count was checked above
        RunArray::from(unsafe { data.build_unchecked() })
    }
}


impl <R: RunEndIndexType> ArrayBuilder for RunEndEncodedBuilder<R> {
    fn data_type(&self) -> DataType {
        DataType::RunEndEncoded(self.run_ends_field.clone(), self.values_field.clone())
    }

    fn validity(&self) -> &ValidityBuilder {
        &self.validity
    }

    fn validity_mut(&mut self) -> &mut ValidityBuilder {
        &mut self.validity
    }

    fn byte_size(&self) -> usize {
        self.validity.byte_size()
            + self.run_ends.as_ref().map_or(0, |r| r.byte_size())
            + self.values.byte_size()
    }

    fn init(&mut self, capacity: usize) -> Result<(), AllocError> {
        self.validity.init(capacity)
    }

    fn resize_values(&mut self, capacity: usize) -> Result<(), AllocError> {
        if capacity >= self.validity.len() {
            return Ok(())
        }
        let run_ends = match self.run_ends.as_mut() {
            Some(run_ends) => run_ends,
            None => return Ok(())
        };
        // first run reaching past the new length becomes the last one
        let kept = run_ends.as_slice()[..self.runs]
            .partition_point(|end| end.as_usize() < capacity);
        if capacity == 0 {
            self.runs = 0;
        } else {
            run_ends.set(kept, R::Native::usize_as(capacity));
            self.runs = kept + 1;
            self.last_run_null = !bit_util::get_bit(self.validity.as_slice(), capacity - 1);
        }
        if self.runs < self.values.len() {
            self.values.resize(self.runs)?;
        }
        Ok(())
    }

    fn append_null(&mut self) -> anyhow::Result<()> {
        if self.runs > 0 && self.last_run_null {
            return self.continue_run(1)
        }
        self.push_run(1, false, |c| c.append_null())
    }

    fn append_empty_value(&mut self) -> anyhow::Result<()> {
        self.push_run(1, true, |c| c.append_empty_value())
    }

    fn append_nulls(&mut self, n: usize) -> anyhow::Result<()> {
        if n == 0 {
            return Ok(())
        }
        if self.runs > 0 && self.last_run_null {
            return self.continue_run(n)
        }
        self.push_run(n, false, |c| c.append_null())
    }

    fn finish(&mut self) -> ArrayRef {
        Arc::new(self.finish())
    }
}
