//! Formatter throughput.
//!
//! Measures rendering of typical log lines, long strings that hit the
//! buffer limit and hex dumps.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use posix_uefi_bench::wide;
use posix_uefi_core::printf::BUFSIZ;
use posix_uefi_core::{Arg, MemoryView, render};

fn bench_log_line(c: &mut Criterion) {
    let fmt = wide("[%08x] %s: status=%d (%S)\n");
    let module = wide("registry");
    let args = [
        Arg::Uint(0x1234),
        Arg::from(&module[..]),
        Arg::Int(-14),
        Arg::from("not found"),
    ];
    let mut buf = vec![0u16; BUFSIZ];
    c.bench_function("render_log_line", |b| {
        b.iter(|| criterion::black_box(render(&mut buf, BUFSIZ, &fmt, &args)));
    });
}

fn bench_string_lengths(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_string");
    let fmt = wide("%s");
    let mut buf = vec![0u16; BUFSIZ];
    for len in [16usize, 256, 4096, 16384] {
        let text = wide(&"x".repeat(len));
        group.throughput(Throughput::Elements(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &text, |b, text| {
            let args = [Arg::from(&text[..])];
            b.iter(|| criterion::black_box(render(&mut buf, BUFSIZ, &fmt, &args)));
        });
    }
    group.finish();
}

fn bench_dump(c: &mut Criterion) {
    let data: Vec<u8> = (0..=255).collect();
    let fmt = wide("%16D");
    let mut buf = vec![0u16; BUFSIZ];
    c.bench_function("render_dump_256", |b| {
        let args = [Arg::from(MemoryView::new(&data))];
        b.iter(|| criterion::black_box(render(&mut buf, BUFSIZ, &fmt, &args)));
    });
}

criterion_group!(benches, bench_log_line, bench_string_lengths, bench_dump);
criterion_main!(benches);
