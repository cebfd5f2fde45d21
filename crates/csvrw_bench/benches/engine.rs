//! Reader and writer benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use csvrw_bench::utils::{encode_document, generate_records};
use csvrw_core::{CsvReader, CsvWriter, ReadFlags, WriteFlags};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::io::Cursor;
use tempfile::TempDir;

const BUFFER_SIZES: [usize; 4] = [64, 512, 4096, 65536];

/// Benchmark sequential reads from memory at several buffer sizes.
fn bench_sequential_read(c: &mut Criterion) {
    let document = encode_document(&generate_records(2000, 6, 20));
    let mut group = c.benchmark_group("sequential_read");
    group.throughput(Throughput::Bytes(document.len() as u64));

    for size in BUFFER_SIZES.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let mut source = Cursor::new(document.as_slice());
                let mut reader = CsvReader::new();
                reader.resize_buffer(size).unwrap();
                reader.associate(&mut source, ReadFlags::none()).unwrap();
                let mut fields = 0;
                while reader.read_record().unwrap().is_record() {
                    fields += reader.fields().len();
                }
                black_box(fields);
            });
        });
    }

    group.finish();
}

/// Benchmark reading records in shuffled order once all are indexed.
fn bench_random_access(c: &mut Criterion) {
    let records = 2000u64;
    let document = encode_document(&generate_records(records as usize, 6, 20));
    let mut order: Vec<u64> = (1..=records).collect();
    order.shuffle(&mut rand::rngs::StdRng::seed_from_u64(7));

    let mut group = c.benchmark_group("random_access");
    group.throughput(Throughput::Elements(records));

    for size in BUFFER_SIZES.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut source = Cursor::new(document.as_slice());
            let mut reader = CsvReader::new();
            reader.resize_buffer(size).unwrap();
            reader.associate(&mut source, ReadFlags::none()).unwrap();
            // Index every record up front.
            while reader.read_record().unwrap().is_record() {}

            b.iter(|| {
                for &n in &order {
                    assert!(reader.read_record_at(black_box(n)).unwrap().is_record());
                }
            });
        });
    }

    group.finish();
}

/// Benchmark writing to memory at several buffer sizes.
fn bench_write(c: &mut Criterion) {
    let records = generate_records(2000, 6, 20);
    let expected = encode_document(&records).len();
    let mut group = c.benchmark_group("write");
    group.throughput(Throughput::Bytes(expected as u64));

    for size in BUFFER_SIZES.iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let mut out = Vec::with_capacity(expected);
            b.iter(|| {
                out.clear();
                let mut writer = CsvWriter::new();
                writer.resize_buffer(size).unwrap();
                writer.associate(&mut out, WriteFlags::none()).unwrap();
                for record in &records {
                    writer.write_record(black_box(record), true).unwrap();
                }
                writer.close().unwrap();
            });
        });
    }

    group.finish();
}

/// Benchmark a write then read through a file.
fn bench_file_round_trip(c: &mut Criterion) {
    let records = generate_records(1000, 6, 20);
    let mut group = c.benchmark_group("file_round_trip");
    group.sample_size(20);

    group.bench_function("1000x6", |b| {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("bench.csv");
        let mut writer = CsvWriter::new();
        let mut reader = CsvReader::new();

        b.iter(|| {
            writer.open(&path, WriteFlags::none().truncate(true)).unwrap();
            for record in &records {
                writer.write_record(record, true).unwrap();
            }
            writer.close().unwrap();

            reader.open(&path, ReadFlags::none()).unwrap();
            let mut count = 0;
            while reader.read_record().unwrap().is_record() {
                count += 1;
            }
            reader.close().unwrap();
            black_box(count);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_sequential_read,
    bench_random_access,
    bench_write,
    bench_file_round_trip
);
criterion_main!(benches);
