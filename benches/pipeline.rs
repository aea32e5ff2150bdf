//! Benchmarks for AIN pipeline performance

use ain_monitor::{
    format_report, ChangeDetector, ConfigUpdate, Destination, ManualTimer, MemorySink, Monitor,
    MonitorConfig, MonitorSettings, ReportContext, ReportKind, Scaler, SequenceSampler,
};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_samples(count: usize) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(0xA1C);
    let mut raw: i64 = 2048;
    (0..count)
        .map(|_| {
            raw = (raw + rng.gen_range(-8..=8)).clamp(0, 4095);
            raw as u32
        })
        .collect()
}

fn bench_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("detection");

    let samples = generate_samples(1000);
    let config = MonitorConfig {
        scale_k: 3.3 / 4095.0,
        threshold: 0.05,
        report_every: 10,
        ..Default::default()
    };
    let scaler = Scaler::from_config(&config);

    group.throughput(Throughput::Elements(1000));

    group.bench_function("scale_and_detect_1000", |b| {
        b.iter(|| {
            let mut detector = ChangeDetector::new();
            for raw in &samples {
                let value = scaler.scale(*raw);
                black_box(detector.evaluate(value, &config));
            }
        })
    });

    group.finish();
}

fn bench_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("ticks");

    let samples = generate_samples(1000);
    group.throughput(Throughput::Elements(1000));

    for destination in [
        Destination::None,
        Destination::TimeSeries,
        Destination::ThresholdAlert,
    ] {
        let config = MonitorConfig {
            scale_k: 3.3 / 4095.0,
            threshold: 0.05,
            report_every: 10,
            destination,
            low: 1.0,
            hi: 2.0,
            ..Default::default()
        };

        group.bench_function(format!("tick_1000_{:?}", destination), |b| {
            b.iter(|| {
                let mut monitor = Monitor::new(
                    config.clone(),
                    MonitorSettings::default(),
                    SequenceSampler::new(samples.iter().copied()),
                    ManualTimer::new(),
                    MemorySink::new(),
                );
                for _ in 0..samples.len() {
                    black_box(monitor.tick());
                }
            })
        });
    }

    group.finish();
}

fn bench_formatting(c: &mut Criterion) {
    let mut group = c.benchmark_group("formatting");

    let config = MonitorConfig::default();
    let reading = Scaler::from_config(&config).convert(2048);
    let ctx = ReportContext {
        config: &config,
        reading: &reading,
        device_name: "node-AIN",
        running: true,
        api_key: "KEY",
    };

    for kind in [ReportKind::Measurement, ReportKind::Config] {
        group.bench_function(format!("format_{:?}", kind), |b| {
            b.iter(|| black_box(format_report(&ctx, kind, false)))
        });
    }

    let body = r#"{"Auto": 1, "Refresh": 5, "Each": 10, "Thr": 0.5, "ScK": 0.01,
        "ScY": 0, "Name": "tank", "Low": 1, "Hi": 9, "Post_type": 2, "Dec": 2}"#;
    group.bench_function("parse_update", |b| {
        b.iter(|| black_box(ConfigUpdate::parse(body)))
    });

    group.finish();
}

criterion_group!(benches, bench_detection, bench_ticks, bench_formatting);
criterion_main!(benches);
