//! Benchmarks for log bandwidth aggregation
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use mailroom::logs::{parse_line, Aggregator, BucketZone, Report};

const FUNCTIONS: [&str; 8] = [
    "messages:list",
    "messages:send",
    "newsletters:get",
    "newsletters:publish",
    "subscribers:import",
    "subscribers:list",
    "users:current",
    "analytics:daily",
];

fn create_test_lines(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let ts = 1_700_000_000_000i64 + i as i64 * 1_500;
            let function = FUNCTIONS[i % FUNCTIONS.len()];
            if i % 50 == 0 {
                return "not json at all".to_string();
            }
            format!(
                r#"{{"topic":"function_execution","timestamp":{},"function":{{"path":"{}","type":"query"}},"execution_time_ms":{},"usage":{{"database_read_bytes":{},"database_write_bytes":{}}}}}"#,
                ts,
                function,
                i % 40,
                (i * 37) % 100_000,
                (i * 11) % 4_000
            )
        })
        .collect()
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let lines = create_test_lines(1000);

    group.throughput(Throughput::Elements(lines.len() as u64));
    group.bench_function("parse_line_1000", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(parse_line(black_box(line)));
            }
        })
    });

    group.finish();
}

fn bench_aggregate(c: &mut Criterion) {
    let mut group = c.benchmark_group("aggregate");

    for size in [1_000, 10_000, 100_000] {
        let lines = create_test_lines(size);
        group.throughput(Throughput::Elements(size as u64));

        group.bench_function(format!("ingest_{}", size), |b| {
            b.iter(|| {
                let mut agg = Aggregator::new(BucketZone::Utc);
                for line in &lines {
                    agg.ingest_line(line);
                }
                agg
            })
        });

        let mut agg = Aggregator::new(BucketZone::Utc);
        for line in &lines {
            agg.ingest_line(line);
        }

        group.bench_function(format!("report_{}", size), |b| {
            b.iter(|| Report::build(black_box(&agg), 5))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_aggregate);
criterion_main!(benches);
