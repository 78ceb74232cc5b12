use carbon::{json, Key, Revise};
use criterion::{criterion_group, criterion_main, Criterion};

fn sample_json(rows: usize) -> String {
    let series = (0..rows).map(|i| i.to_string()).collect::<Vec<_>>().join(",");
    format!(
        r#"{{"name": "bench", "series": [{}], "meta": {{"ok": true}}}}"#,
        series
    )
}

fn bench_build(c: &mut Criterion) {
    let json_doc = sample_json(1000);
    c.bench_function("build_1k_cells", |b| {
        b.iter(|| json::from_json_str(Key::Auto, &json_doc).unwrap())
    });
}

fn bench_find(c: &mut Criterion) {
    let doc = json::from_json_str(Key::Auto, &sample_json(1000)).unwrap();
    c.bench_function("find_column_cell", |b| {
        b.iter(|| doc.find("series.500").unwrap().unsigned().unwrap())
    });
}

fn bench_revise(c: &mut Criterion) {
    let doc = json::from_json_str(Key::Auto, &sample_json(1000)).unwrap();
    c.bench_function("revise_update_cell", |b| {
        b.iter(|| {
            let mut rev = Revise::begin(&doc);
            rev.update_set_u16("series.500", 9).unwrap();
            rev.end().unwrap()
        })
    });
}

criterion_group!(benches, bench_build, bench_find, bench_revise);
criterion_main!(benches);
