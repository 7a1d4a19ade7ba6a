use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndstride::{assign, transpose, DType, NdArray, Order};

fn bench_assign(c: &mut Criterion) {
    let x = NdArray::zeros(DType::Float64, &[512, 512], Order::RowMajor);
    let y = NdArray::zeros(DType::Float64, &[512, 512], Order::RowMajor);
    c.bench_function("assign contiguous 512x512", |b| {
        b.iter(|| assign(black_box(&x), black_box(&y)).unwrap())
    });

    let xt = transpose(&x).unwrap();
    let yt = NdArray::zeros(DType::Float64, &[512, 512], Order::RowMajor);
    c.bench_function("assign transposed 512x512", |b| {
        b.iter(|| assign(black_box(&xt), black_box(&yt)).unwrap())
    });

    let xi = NdArray::zeros(DType::Int16, &[512, 512], Order::RowMajor);
    let yf = NdArray::zeros(DType::Float64, &[512, 512], Order::RowMajor);
    c.bench_function("assign cast int16->float64 512x512", |b| {
        b.iter(|| assign(black_box(&xi), black_box(&yf)).unwrap())
    });
}

criterion_group!(benches, bench_assign);
criterion_main!(benches);
