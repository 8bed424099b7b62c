// Copyright (c) 2026 Bountyy Oy. All rights reserved.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pagewire::bridge::{decode, encode};
use pagewire::{CallbackHandle, CallbackRegistry, RequestDescriptor};

fn registry_churn_benchmark(c: &mut Criterion) {
    c.bench_function("register_invoke_churn", |b| {
        let mut registry: CallbackRegistry<u64> = CallbackRegistry::new();
        b.iter(|| {
            let handles: Vec<_> = (0..64)
                .map(|_| {
                    registry.register(Box::new(|payload| {
                        black_box(payload);
                    }))
                })
                .collect();
            for handle in handles.into_iter().rev() {
                registry.invoke(handle, 1).unwrap();
            }
        })
    });
}

fn payload_decode_benchmark(c: &mut Criterion) {
    let body = encode(vec![0xa5u8; 64 * 1024]);

    c.bench_function("decode_64k_body", |b| {
        b.iter(|| black_box(decode(black_box(&body)).unwrap()))
    });
}

fn descriptor_benchmark(c: &mut Criterion) {
    let request = RequestDescriptor::fetch("/pkg/client_bg.wasm", CallbackHandle::new(3, 1));

    c.bench_function("descriptor_to_json", |b| {
        b.iter(|| black_box(request.to_json().unwrap()))
    });
}

criterion_group!(
    benches,
    registry_churn_benchmark,
    payload_decode_benchmark,
    descriptor_benchmark
);
criterion_main!(benches);
