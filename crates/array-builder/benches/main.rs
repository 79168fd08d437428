use arrow::datatypes::DataType;
use criterion::{criterion_group, criterion_main, Criterion};
use sqd_array_builder::builder::{ArrayBuilder, Int64Builder, ValidityBuilder};
use sqd_array_builder::{default_allocator, make_builder};
use std::hint::black_box;


const N: usize = 64 * 1024;


fn presized() -> ValidityBuilder {
    let mut b = ValidityBuilder::new(default_allocator());
    b.init(N).unwrap();
    b
}


fn validity_setup(c: &mut Criterion) {
    let pattern: Vec<bool> = (0..N).map(|i| i % 5 != 0).collect();

    c.bench_function("validity: single appends", |bench| {
        bench.iter(|| {
            let mut b = presized();
            for &valid in pattern.iter() {
                b.append(valid)
            }
            black_box(b.finish())
        })
    });

    c.bench_function("validity: append_slice", |bench| {
        bench.iter(|| {
            let mut b = presized();
            b.append_slice(&pattern);
            black_box(b.finish())
        })
    });

    c.bench_function("validity: append_n_valid", |bench| {
        bench.iter(|| {
            let mut b = presized();
            b.append(false);
            b.append_n_valid(N - 1);
            black_box(b.finish())
        })
    });
}


fn builder_setup(c: &mut Criterion) {
    let values: Vec<i64> = (0..N as i64).collect();

    c.bench_function("int64: append_value with growth", |bench| {
        bench.iter(|| {
            let mut b = Int64Builder::new(default_allocator());
            for v in values.iter() {
                b.append_value(*v).unwrap();
            }
            black_box(b.finish())
        })
    });

    c.bench_function("utf8: append_value_bytes through AnyBuilder", |bench| {
        bench.iter(|| {
            let mut b = make_builder(default_allocator(), &DataType::Utf8);
            for _ in 0..N / 16 {
                b.append_value_bytes(b"3NgFNFJBp7GAZDgm9vinbowrEvj7f4wepKVzKeqhcDFN").unwrap();
            }
            black_box(b.finish())
        })
    });
}


criterion_group!(benches, validity_setup, builder_setup);
criterion_main!(benches);
