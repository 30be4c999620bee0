use criterion::{criterion_group, criterion_main, Criterion};
use devradar::fingerprint::{classify, extract_title};
use reqwest::header::{HeaderMap, HeaderValue};
use std::hint::black_box;

fn page(marker: &str) -> String {
    let filler = "<div class=\"row\"><span>lorem ipsum dolor sit amet</span></div>\n".repeat(400);
    format!("<html><head><title>Dashboard</title></head><body>{filler}{marker}</body></html>")
}

fn criterion_benchmark(c: &mut Criterion) {
    let no_headers = HeaderMap::new();
    let mut kestrel = HeaderMap::new();
    kestrel.insert("server", HeaderValue::from_static("Kestrel"));

    let next = page("<script src=\"/_next/static/chunks/main.js\"></script>");
    let go = page("<footer>go server</footer>");
    let unknown = page("<footer>nothing to see</footer>");

    c.bench_function("classify first rule", |b| {
        b.iter(|| classify(black_box(&next), &no_headers));
    });

    c.bench_function("classify last rule", |b| {
        b.iter(|| classify(black_box(&go), &no_headers));
    });

    c.bench_function("classify unknown", |b| {
        b.iter(|| classify(black_box(&unknown), &no_headers));
    });

    c.bench_function("classify by header", |b| {
        b.iter(|| classify(black_box(&unknown), &kestrel));
    });

    c.bench_function("extract title", |b| {
        b.iter(|| extract_title(black_box(&unknown)));
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
