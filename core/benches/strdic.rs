use carbon_core::{AsyncDic, StrDic, SyncDic};
use criterion::{criterion_group, criterion_main, Criterion};

fn corpus(n: usize) -> Vec<Vec<u8>> {
    (0..n).map(|i| format!("bench-string-{}", i).into_bytes()).collect()
}

fn bench_sync_insert(c: &mut Criterion) {
    let strings = corpus(10_000);
    c.bench_function("sync_insert_10k", |b| {
        b.iter(|| {
            let dic = SyncDic::default();
            let refs = strings.iter().map(|s| s.as_slice()).collect::<Vec<_>>();
            dic.insert(&refs).unwrap()
        })
    });
}

fn bench_async_insert(c: &mut Criterion) {
    let strings = corpus(10_000);
    c.bench_function("async_insert_10k_8carriers", |b| {
        b.iter(|| {
            let dic = AsyncDic::default();
            let refs = strings.iter().map(|s| s.as_slice()).collect::<Vec<_>>();
            dic.insert(&refs).unwrap()
        })
    });
}

fn bench_locate(c: &mut Criterion) {
    let strings = corpus(10_000);
    let dic = SyncDic::default();
    let refs = strings.iter().map(|s| s.as_slice()).collect::<Vec<_>>();
    dic.insert(&refs).unwrap();
    c.bench_function("sync_locate_10k", |b| {
        b.iter(|| dic.locate_safe(&refs).unwrap())
    });
}

criterion_group!(benches, bench_sync_insert, bench_async_insert, bench_locate);
criterion_main!(benches);
