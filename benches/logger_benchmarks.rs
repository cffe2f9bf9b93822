//! Criterion benchmarks for rust_field_logger

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rust_field_logger::core::{EncoderConfig, TimestampFormat};
use rust_field_logger::prelude::*;
use std::time::Duration;

fn discard_logger(formatter: &str, caller: bool) -> Logger {
    let config = match formatter {
        "json" => EncoderConfig::json(),
        _ => EncoderConfig::plain(),
    };
    Logger::builder()
        .formatter(formatter)
        .encoder_config(config)
        .level(LogLevel::Info)
        .enable_caller(caller)
        .sink(WriterSink::new(std::io::sink()))
        .build()
        .unwrap()
}

// ============================================================================
// Level Gate Benchmarks
// ============================================================================

fn bench_disabled_level(c: &mut Criterion) {
    let mut group = c.benchmark_group("disabled_level");
    group.throughput(Throughput::Elements(1));

    let logger = discard_logger("plain", true);

    group.bench_function("method", |b| {
        b.iter(|| {
            logger.debug(black_box("Debug message"));
        });
    });

    group.bench_function("macro_with_args", |b| {
        b.iter(|| {
            rust_field_logger::debug!(logger, "value {} of {}", black_box(7), black_box(9));
        });
    });

    group.bench_function("enabled_check", |b| {
        b.iter(|| black_box(logger.enabled(black_box(LogLevel::Debug))));
    });

    group.finish();
}

// ============================================================================
// Encoding Benchmarks
// ============================================================================

fn bench_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");
    group.throughput(Throughput::Elements(1));

    for formatter in ["plain", "json"] {
        let logger = discard_logger(formatter, false);
        group.bench_function(format!("{}_message", formatter), |b| {
            b.iter(|| {
                logger.info(black_box("Info message"));
            });
        });

        let with_caller = discard_logger(formatter, true);
        group.bench_function(format!("{}_message_caller", formatter), |b| {
            b.iter(|| {
                with_caller.info(black_box("Info message"));
            });
        });

        group.bench_function(format!("{}_five_fields", formatter), |b| {
            b.iter(|| {
                logger.log_fields(
                    LogLevel::Info,
                    "request done",
                    vec![
                        Field::string("method", "GET"),
                        Field::string("path", "/api/users"),
                        Field::int("status", 200),
                        Field::float("ratio", 0.75),
                        Field::duration("elapsed", Duration::from_micros(1234)),
                    ],
                );
            });
        });

        group.bench_function(format!("{}_escaped_message", formatter), |b| {
            b.iter(|| {
                logger.info(black_box("line one\nline \"two\"\tend"));
            });
        });
    }

    group.finish();
}

// ============================================================================
// Context Benchmarks
// ============================================================================

fn bench_context(c: &mut Criterion) {
    let mut group = c.benchmark_group("context");
    group.throughput(Throughput::Elements(1));

    let logger = discard_logger("json", false);
    let preset = logger
        .with_field("service", "api")
        .with_field("version", 3)
        .with_field("region", "eu-west-1");

    group.bench_function("with_fields_derive", |b| {
        b.iter(|| {
            let child = logger
                .with_field("service", "api")
                .with_field("version", 3)
                .with_field("region", "eu-west-1");
            black_box(child)
        });
    });

    group.bench_function("log_with_preset_fields", |b| {
        b.iter(|| {
            preset.info(black_box("preset"));
        });
    });

    let ctx = RequestContext::with_correlation_id("bench-request-id");
    group.bench_function("for_context", |b| {
        b.iter(|| {
            logger.for_context(&ctx).info(black_box("scoped"));
        });
    });

    group.finish();
}

// ============================================================================
// Sink Benchmarks
// ============================================================================

fn bench_sinks(c: &mut Criterion) {
    let mut group = c.benchmark_group("sinks");
    group.throughput(Throughput::Elements(1));

    let memory = MemorySink::new();
    let logger = Logger::builder()
        .encoder_config(EncoderConfig::plain().with_time_format(TimestampFormat::Custom("T".into())))
        .enable_caller(false)
        .sink(memory.clone())
        .build()
        .unwrap();

    group.bench_function("memory_sink", |b| {
        b.iter(|| {
            logger.info(black_box("to memory"));
        });
        memory.clear();
    });

    let temp_dir = tempfile::TempDir::new().unwrap();
    let file_logger = Logger::builder()
        .enable_caller(false)
        .sink(FileSink::new(temp_dir.path().join("bench.log")).unwrap())
        .build()
        .unwrap();

    group.bench_function("file_sink", |b| {
        b.iter(|| {
            file_logger.info(black_box("to file"));
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_disabled_level,
    bench_encoding,
    bench_context,
    bench_sinks
);
criterion_main!(benches);
