//! Stream dispatch over the in-memory firmware.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use posix_uefi_bench::{bench_firmware, wide};
use posix_uefi_core::{Arg, Stdio, Whence};

fn bench_file_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_round_trip");
    for len in [64usize, 4096, 65536] {
        let payload = vec![0x5au8; len];
        let mut back = vec![0u8; len];
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &payload, |b, payload| {
            let mut io = Stdio::new(bench_firmware());
            b.iter(|| {
                let mut file = io.open("/bench/data.bin", "w+").expect("open");
                io.write(&mut file, payload).expect("write");
                io.seek(&mut file, 0, Whence::Set).expect("seek");
                let n = io.read(&mut file, &mut back).expect("read");
                io.close(file).expect("close");
                criterion::black_box(n)
            });
        });
    }
    group.finish();
}

fn bench_block_transfer(c: &mut Criterion) {
    let payload = vec![0xa5u8; 4096];
    c.bench_function("block_write_4k", |b| {
        let mut io = Stdio::new(bench_firmware());
        b.iter(|| {
            let mut disk = io.open("/dev/disk0", "r+").expect("open");
            criterion::black_box(io.write(&mut disk, &payload).expect("write"))
        });
    });
}

fn bench_fprintf_file(c: &mut Criterion) {
    let fmt = wide("entry %d: %S\n");
    c.bench_function("fprintf_file", |b| {
        let mut io = Stdio::new(bench_firmware());
        let mut file = io.open("/bench/log.txt", "w").expect("open");
        b.iter(|| {
            let args = [Arg::Int(42), Arg::from("payload")];
            criterion::black_box(io.fprintf(&mut file, &fmt, &args).expect("fprintf"))
        });
    });
}

criterion_group!(
    benches,
    bench_file_round_trip,
    bench_block_transfer,
    bench_fprintf_file
);
criterion_main!(benches);
