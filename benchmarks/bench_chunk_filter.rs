use std::hint::black_box;
use std::io::Cursor;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use bro_awk::chunker::{Chunk, ChunkedLineSource};
use bro_awk::config::BroAwkConfig;
use bro_awk::fields::{FieldIndex, Projection};
use bro_awk::filters::{FilterSet, ValueMatch};
use bro_awk::processor::RowProcessor;
use bro_awk::runner::run_pipeline;

const FIELDS: [&str; 8] = [
    "ts",
    "uid",
    "id.orig_h",
    "id.orig_p",
    "id.resp_h",
    "id.resp_p",
    "proto",
    "service",
];

fn conn_rows(rows: usize) -> Vec<u8> {
    let mut data = String::with_capacity(rows * 80);
    for i in 0..rows {
        let (proto, service) = [("tcp", "http"), ("udp", "dns"), ("tcp", "ssl"), ("icmp", "-")][i % 4];
        data.push_str(&format!(
            "1704067200.{:06}\tC{:x}\t10.0.{}.{}\t{}\t192.168.{}.{}\t{}\t{}\t{}\n",
            i % 1_000_000,
            i,
            (i / 256) % 256,
            i % 256,
            40000 + i % 20000,
            (i / 7) % 256,
            i % 251,
            [80, 53, 443, 0][i % 4],
            proto,
            service
        ));
    }
    data.into_bytes()
}

fn processor(rules: &[&str], print_fields: Option<&[&str]>) -> RowProcessor {
    let index = FieldIndex::from_header(FIELDS);
    let filters = FilterSet::parse(rules)
        .expect("benchmark rules parse")
        .compile(&index, ValueMatch::All)
        .expect("benchmark rules resolve");
    let projection =
        print_fields.map(|fields| Projection::resolve(fields, &index).expect("projection resolves"));
    RowProcessor::new(filters, projection)
}

fn bench_chunking(c: &mut Criterion) {
    let data = conn_rows(20_000);
    let mut group = c.benchmark_group("chunking");
    group.throughput(Throughput::Bytes(data.len() as u64));

    for block_size in [4096usize, 8192, 65536] {
        group.bench_with_input(
            BenchmarkId::from_parameter(block_size),
            &block_size,
            |b, &block_size| {
                b.iter(|| {
                    let source = ChunkedLineSource::new(Cursor::new(black_box(&data[..])), block_size);
                    black_box(source.map(|chunk| chunk.map(|c| c.len()).unwrap_or(0)).sum::<usize>());
                });
            },
        );
    }
    group.finish();
}

fn bench_row_processing(c: &mut Criterion) {
    let data = conn_rows(5_000);
    let chunk = Chunk::new(data.strip_suffix(b"\n").unwrap_or(&data).to_vec());

    let cases: [(&str, RowProcessor); 4] = [
        ("equals", processor(&["proto=tcp"], None)),
        ("not_equals_multi_field", processor(&["id.orig_h,id.resp_h!=10.0.0.1"], None)),
        ("regex", processor(&["service~^(http|ssl)$"], None)),
        ("regex_projection", processor(&["id.resp_h~^192\\.168\\.1\\."], Some(&["ts", "uid"][..]))),
    ];

    let mut group = c.benchmark_group("row_processing");
    group.throughput(Throughput::Bytes(chunk.len() as u64));
    for (name, processor) in &cases {
        group.bench_function(*name, |b| {
            b.iter(|| black_box(processor.process(black_box(&chunk))));
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let data = conn_rows(50_000);
    let processor = processor(&["proto=udp"], None);

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.sample_size(20);

    for threads in [1usize, 2, 4] {
        let mut config = BroAwkConfig::default();
        config.performance.threads = threads;

        group.bench_with_input(BenchmarkId::new("threads", threads), &threads, |b, _| {
            b.iter(|| {
                let source =
                    ChunkedLineSource::new(Cursor::new(&data[..]), config.performance.block_size);
                let mut sink = Vec::with_capacity(data.len() / 4);
                let stats = run_pipeline(&config, source, &processor, &mut sink)
                    .expect("in-memory pipeline succeeds");
                black_box((stats, sink))
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_chunking, bench_row_processing, bench_pipeline);
criterion_main!(benches);
