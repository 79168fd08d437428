use arrow::array::Int32Array;
use proptest::prelude::*;
use sqd_array_builder::builder::{ArrayBuilder, Int32Builder, ValidityBuilder};
use sqd_array_builder::default_allocator;
use sqd_array_builder::memory::CheckedAllocator;
use std::sync::Arc;


#[derive(Debug, Clone)]
enum Op {
    Append(Option<i32>),
    Nulls(usize),
    Values(Vec<(i32, bool)>)
}


fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        any::<Option<i32>>().prop_map(Op::Append),
        (0usize..40).prop_map(Op::Nulls),
        proptest::collection::vec((any::<i32>(), any::<bool>()), 0..70).prop_map(Op::Values)
    ]
}


fn apply(builder: &mut Int32Builder, model: &mut Vec<Option<i32>>, op: &Op) {
    match op {
        Op::Append(val) => {
            builder.append_option(*val).unwrap();
            model.push(*val);
        },
        Op::Nulls(n) => {
            builder.append_nulls(*n).unwrap();
            model.extend(std::iter::repeat(None).take(*n));
        },
        Op::Values(items) => {
            let values: Vec<i32> = items.iter().map(|(v, _)| *v).collect();
            let validity: Vec<bool> = items.iter().map(|(_, valid)| *valid).collect();
            builder.append_values(&values, Some(&validity)).unwrap();
            model.extend(items.iter().map(|(v, valid)| valid.then_some(*v)));
        }
    }
}


fn reserve(b: &mut ValidityBuilder, additional: usize) {
    if let Some(capacity) = b.grow_target(additional).unwrap() {
        b.resize(capacity).unwrap()
    }
}


fn set_bits(bytes: &[u8], len: usize) -> usize {
    (0..len).filter(|i| arrow_buffer::bit_util::get_bit(bytes, *i)).count()
}


proptest! {
    #[test]
    fn builder_follows_model(ops in proptest::collection::vec(op(), 0..30)) {
        let allocator = Arc::new(CheckedAllocator::new());
        let mut builder = Int32Builder::new(allocator.clone());
        let mut model = Vec::new();

        for op in ops.iter() {
            apply(&mut builder, &mut model, op);
            prop_assert_eq!(builder.len(), model.len());
            prop_assert_eq!(builder.null_count(), model.iter().filter(|v| v.is_none()).count());
            prop_assert!(builder.capacity() >= builder.len());
            if builder.capacity() > 0 {
                prop_assert!(builder.capacity().is_power_of_two());
                prop_assert!(builder.capacity() >= 32);
            }
        }

        let array = builder.finish();
        prop_assert_eq!(array, Int32Array::from(model));
        prop_assert_eq!(builder.len(), 0);
        prop_assert_eq!(builder.capacity(), 0);
        prop_assert_eq!(builder.null_count(), 0);
        prop_assert_eq!(allocator.live_bytes(), 0);
        prop_assert_eq!(allocator.outstanding(), 0);
    }

    #[test]
    fn finished_builder_is_reusable(
        first in proptest::collection::vec(any::<Option<i32>>(), 0..100),
        second in proptest::collection::vec(any::<Option<i32>>(), 0..100)
    ) {
        let mut builder = Int32Builder::new(default_allocator());
        for val in first.iter() {
            builder.append_option(*val).unwrap();
        }
        prop_assert_eq!(builder.finish(), Int32Array::from(first));

        for val in second.iter() {
            builder.append_option(*val).unwrap();
        }
        prop_assert_eq!(builder.null_count(), second.iter().filter(|v| v.is_none()).count());
        prop_assert_eq!(builder.finish(), Int32Array::from(second));
    }

    #[test]
    fn slice_append_matches_single_appends(
        prefix in proptest::collection::vec(any::<bool>(), 0..16),
        valid in proptest::collection::vec(any::<bool>(), 0..200)
    ) {
        let mut single = ValidityBuilder::new(default_allocator());
        let mut bulk = ValidityBuilder::new(default_allocator());
        reserve(&mut single, prefix.len() + valid.len());
        reserve(&mut bulk, prefix.len() + valid.len());

        bulk.append_slice(&prefix);
        for &v in prefix.iter().chain(valid.iter()) {
            single.append(v);
        }
        bulk.append_slice(&valid);

        prop_assert_eq!(single.len(), bulk.len());
        prop_assert_eq!(single.null_count(), bulk.null_count());
        prop_assert_eq!(single.as_slice(), bulk.as_slice());
    }

    #[test]
    fn bulk_valid_matches_single_appends(
        prefix in proptest::collection::vec(any::<bool>(), 0..16),
        count in 0usize..200
    ) {
        let mut single = ValidityBuilder::new(default_allocator());
        let mut bulk = ValidityBuilder::new(default_allocator());
        reserve(&mut single, prefix.len() + count);
        reserve(&mut bulk, prefix.len() + count);

        bulk.append_slice(&prefix);
        for &v in prefix.iter() {
            single.append(v);
        }
        for _ in 0..count {
            single.append(true);
        }
        bulk.append_n_valid(count);

        prop_assert_eq!(single.len(), bulk.len());
        prop_assert_eq!(single.null_count(), bulk.null_count());
        prop_assert_eq!(single.as_slice(), bulk.as_slice());
    }

    #[test]
    fn shrink_recounts_retained_prefix(
        valid in proptest::collection::vec(any::<bool>(), 1..300),
        cut in any::<prop::sample::Index>()
    ) {
        let mut b = ValidityBuilder::new(default_allocator());
        reserve(&mut b, valid.len());
        b.append_slice(&valid);

        let capacity = cut.index(valid.len() + 1);
        b.resize(capacity).unwrap();

        prop_assert_eq!(b.len(), capacity);
        prop_assert_eq!(b.capacity(), capacity);
        prop_assert_eq!(b.null_count(), capacity - set_bits(b.as_slice(), capacity));
        prop_assert_eq!(b.null_count(), valid[..capacity].iter().filter(|v| !**v).count());
        // nothing survives past the new length
        prop_assert_eq!(set_bits(b.as_slice(), b.as_slice().len() * 8), set_bits(b.as_slice(), capacity));
    }

    #[test]
    fn growth_targets_next_power_of_two(additional in 1usize..100_000) {
        let mut b = ValidityBuilder::new(default_allocator());
        reserve(&mut b, additional);
        prop_assert_eq!(b.capacity(), std::cmp::max(additional.next_power_of_two(), 32));
        prop_assert!(b.as_slice().iter().all(|byte| *byte == 0));
    }
}


#[test]
fn initial_growth_steps() {
    let mut b = ValidityBuilder::new(default_allocator());
    reserve(&mut b, 3);
    assert_eq!(b.capacity(), 32);

    let mut b = ValidityBuilder::new(default_allocator());
    reserve(&mut b, 40);
    assert_eq!(b.capacity(), 64);
}
