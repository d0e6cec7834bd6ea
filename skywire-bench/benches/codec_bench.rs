//! Query encoding and response decoding benchmarks.

use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use skywire_protocol::{Query, Response, ResponseDecoder, Row, Table, Value};

fn create_test_query(param_count: usize) -> Query {
    let placeholders = vec!["?"; param_count].join(", ");
    let mut query = Query::new(format!("INSERT INTO bench.t({})", placeholders));
    for i in 0..param_count {
        match i % 3 {
            0 => query.push_param(i as u64),
            1 => query.push_param(-(i as i64)),
            _ => query.push_param(format!("value-{}", i)),
        }
    }
    query
}

fn create_test_table(rows: usize) -> Vec<u8> {
    let rows = (0..rows)
        .map(|i| {
            Row::new(vec![
                Value::UInt(i as u64),
                Value::Text(format!("user-{}", i)),
                Value::Float(i as f64 * 0.5),
                Value::List(vec![Value::Bool(i % 2 == 0), Value::Null]),
            ])
        })
        .collect();
    let mut buf = BytesMut::new();
    Response::Table(Table::new(4, rows)).encode(&mut buf);
    buf.to_vec()
}

fn bench_query_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_encode");

    for count in [1, 10, 100] {
        let query = create_test_query(count);

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(count), &query, |b, query| {
            b.iter(|| black_box(query.encode().unwrap()));
        });
    }

    group.finish();
}

fn bench_table_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_decode");

    for rows in [10, 100, 1000] {
        let encoded = create_test_table(rows);

        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &encoded, |b, encoded| {
            b.iter(|| {
                let mut decoder = ResponseDecoder::new();
                decoder.extend(encoded);
                black_box(decoder.decode().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_table_decode_chunked(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_decode_chunked");
    let encoded = create_test_table(1000);

    for chunk in [1, 64, 1024] {
        group.throughput(Throughput::Bytes(encoded.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut decoder = ResponseDecoder::new();
                let mut response = None;
                for piece in encoded.chunks(chunk) {
                    decoder.extend(piece);
                    response = decoder.decode().unwrap();
                }
                black_box(response)
            });
        });
    }

    group.finish();
}

fn bench_large_string_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_decode");

    for size in [100, 10000, 1000000] {
        let mut buf = BytesMut::new();
        Value::Text("x".repeat(size)).encode(&mut buf);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &buf, |b, buf| {
            b.iter(|| black_box(skywire_protocol::decode_response(buf).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_query_encode,
    bench_table_decode,
    bench_table_decode_chunked,
    bench_large_string_decode,
);

criterion_main!(benches);
