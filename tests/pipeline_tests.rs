// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! End-to-end tests of the sampling pipeline
//!
//! Each test drives a [`Monitor`] with in-memory collaborators and checks
//! what reached the sink.

use ain_monitor::*;
use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

type TestMonitor<S> = Monitor<S, ManualTimer, MemorySink>;

fn settings() -> MonitorSettings {
    MonitorSettings {
        node_name: "node".to_string(),
        webhook: WebhookConfig {
            host: "hooks.example.com".to_string(),
            path: "/trigger/ain".to_string(),
            token: "TOKEN".to_string(),
            ..Default::default()
        },
    }
}

fn build<S: Sampler>(config: MonitorConfig, sampler: S) -> TestMonitor<S> {
    let mut monitor = Monitor::new(
        config,
        settings(),
        sampler,
        ManualTimer::new(),
        MemorySink::new(),
    );
    monitor.init(&mut DeviceDirectory::new(), true);
    monitor
}

/// Deliver `count` ticks through the armed timer, returning the tick
/// numbers (1-based) that produced a report
fn run<S: Sampler>(monitor: &mut TestMonitor<S>, count: usize) -> Vec<usize> {
    let mut reported = Vec::new();
    for tick in 1..=count {
        let handle = monitor.timer().current().expect("timer armed");
        let outcome = monitor.on_timer(handle).expect("current handle");
        if outcome.is_report() {
            reported.push(tick);
        }
    }
    reported
}

#[test]
fn test_constant_input_reports_once() {
    let config = MonitorConfig {
        scale_k: 1.0,
        scale_y: 0.0,
        decimals: 2,
        threshold: 0.5,
        report_every: 10,
        ..Default::default()
    };
    let mut monitor = build(config, FixedSampler(100));

    let reported = run(&mut monitor, 15);

    assert_eq!(reported, vec![1]);
    assert_eq!(monitor.sink().events().len(), 1);
    assert!(monitor.sink().events()[0].1.contains(r#""Value":100.00"#));
    assert_eq!(monitor.reading().text, "100.00");
    assert_eq!(monitor.ticks_since_report(), 14);
}

#[test]
fn test_alert_latch_sequence() {
    let config = MonitorConfig {
        destination: Destination::ThresholdAlert,
        low: 10.0,
        hi: 20.0,
        threshold: 1.0,
        decimals: 0,
        ..Default::default()
    };
    let mut monitor = build(config, SequenceSampler::new([15, 25, 25, 14]));

    let outcome = monitor.tick();
    assert!(matches!(
        outcome,
        TickOutcome::Reported {
            alert: AlertTransition::Unchanged,
            ..
        }
    ));

    let outcome = monitor.tick();
    assert!(matches!(
        outcome,
        TickOutcome::Reported {
            alert: AlertTransition::Raised,
            ..
        }
    ));
    assert!(monitor.is_latched());
    assert_eq!(monitor.sink().posts().len(), 1);
    assert_eq!(
        monitor.sink().posts()[0].payload,
        r#"{"value1":"AIN","value2":"25"}"#
    );

    monitor.tick();
    assert_eq!(monitor.sink().posts().len(), 1);
    assert!(monitor.is_latched());

    let outcome = monitor.tick();
    assert!(matches!(
        outcome,
        TickOutcome::Reported {
            alert: AlertTransition::Cleared,
            ..
        }
    ));
    assert!(!monitor.is_latched());
    assert_eq!(monitor.sink().posts().len(), 1);
    assert_eq!(monitor.metrics().alerts_raised, 1);
    assert_eq!(monitor.metrics().alerts_cleared, 1);
}

#[test]
fn test_start_with_zero_refresh_stays_stopped() {
    let mut monitor = build(MonitorConfig::default(), FixedSampler(0));
    assert_eq!(monitor.run_state(), RunState::Running);

    let response = monitor
        .handle(&Request::update(r#"{"Refresh": 0, "Start": 1}"#))
        .unwrap();

    assert_eq!(monitor.run_state(), RunState::Stopped);
    assert!(monitor.timer().armed().is_empty());
    assert!(response.contains(r#""Status":"Stop""#));
    assert!(response.contains(r#""Refresh":0"#));
}

#[test]
fn test_fault_overrides_every_response() {
    let mut monitor = build(MonitorConfig::default(), FixedSampler(777));
    monitor.tick();

    let expected = r#"{"Device":"node-AIN","Status":"Fault"}"#;
    for request in [
        Request::read(),
        Request::query(),
        Request::update(r#"{"Each": 3}"#),
    ] {
        let response = monitor.handle(&request.with_fault(true)).unwrap();
        assert_eq!(response, expected);
    }
}

#[test]
fn test_scheduled_reports_respect_spacing() {
    // Scaled values stay below the threshold, so only the schedule and the
    // ceiling can trigger.
    let config = MonitorConfig {
        scale_k: 0.001,
        threshold: 0.5,
        decimals: 3,
        report_every: 7,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(42);
    let samples: Vec<u32> = (0..2000).map(|_| rng.gen_range(0..400)).collect();
    let mut monitor = build(config, SequenceSampler::new(samples));

    let reported = run(&mut monitor, 2000);

    assert!(!reported.is_empty());
    let mut previous = 0;
    for tick in reported {
        assert!(tick - previous >= 7, "report at {} after {}", tick, previous);
        previous = tick;
    }
}

#[test]
fn test_flat_signal_forced_at_ceiling() {
    let config = MonitorConfig {
        report_every: 1000,
        ..Default::default()
    };
    let mut monitor = build(config, FixedSampler(0));

    let reported = run(&mut monitor, 600);

    assert_eq!(reported, vec![255, 510]);
    assert_eq!(monitor.metrics().reports_forced, 2);
    assert_eq!(monitor.ticks_since_report(), 90);
}

#[test]
fn test_oscillation_around_bound_alerts_once() {
    let config = MonitorConfig {
        destination: Destination::ThresholdAlert,
        scale_k: 0.5,
        decimals: 1,
        threshold: 1.0,
        report_every: 1,
        low: 10.0,
        hi: 20.0,
        ..Default::default()
    };
    // 19.5, 20.5, 19.5, ...
    let samples = (0..40).map(|i| if i % 2 == 0 { 39 } else { 41 });
    let mut monitor = build(config, SequenceSampler::new(samples));

    let reported = run(&mut monitor, 40);

    assert_eq!(reported.len(), 40);
    assert_eq!(monitor.sink().posts().len(), 1);
    assert_eq!(monitor.metrics().alerts_raised, 1);
    assert!(monitor.is_latched());
}

#[test]
fn test_narrow_band_never_alerts() {
    let config = MonitorConfig {
        destination: Destination::ThresholdAlert,
        low: 10.0,
        hi: 10.05,
        threshold: 0.0,
        ..Default::default()
    };
    let mut rng = StdRng::seed_from_u64(7);
    let samples: Vec<u32> = (0..500).map(|_| rng.gen_range(0..1000)).collect();
    let mut monitor = build(config, SequenceSampler::new(samples));

    run(&mut monitor, 500);

    assert!(monitor.sink().posts().is_empty());
    assert!(!monitor.is_latched());
    assert!(monitor.metrics().reports > 0);
}

#[test]
fn test_time_series_reports_every_report() {
    let config = MonitorConfig {
        destination: Destination::TimeSeries,
        label: "field2".to_string(),
        decimals: 1,
        ..Default::default()
    };
    let mut monitor = build(config, SequenceSampler::new([10, 10, 30]));

    run(&mut monitor, 3);

    let posts = monitor.sink().posts();
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[1].payload, r#"{"api_key":"TOKEN","field2":30.0}"#);
    assert_eq!(posts[1].port, 80);
    assert_eq!(posts[1].path, "/trigger/ain");
    assert_eq!(monitor.sink().events().len(), 2);
}

#[test]
fn test_update_idempotent() {
    let body = r#"{"Auto": 0, "Refresh": 2, "Each": 4, "Thr": 0.3, "ScK": 2.5,
        "ScY": 1, "Name": "pressure", "Low": 1, "Hi": 5, "Post_type": 2, "Dec": 2}"#;
    let mut monitor = build(MonitorConfig::default(), FixedSampler(0));

    let first = monitor.handle(&Request::update(body)).unwrap();
    let config = monitor.config().clone();
    let second = monitor.handle(&Request::update(body)).unwrap();

    assert_eq!(first, second);
    assert_eq!(monitor.config(), &config);
    assert_relative_eq!(config.scale_k, 2.5);
    assert_eq!(config.refresh_ms, 2_000);
    assert_eq!(config.label, "pressure");
}

#[test]
fn test_refresh_change_needs_start() {
    let mut monitor = build(MonitorConfig::default(), FixedSampler(0));
    let original = monitor.timer_handle();

    monitor
        .handle(&Request::update(r#"{"Refresh": 5}"#))
        .unwrap();
    assert_eq!(monitor.timer_handle(), original);
    assert_eq!(
        monitor.timer().armed()[0].1,
        Duration::from_millis(10_000)
    );

    monitor
        .handle(&Request::update(r#"{"Start": 1}"#))
        .unwrap();
    assert_ne!(monitor.timer_handle(), original);
    assert_eq!(monitor.timer().armed().len(), 1);
    assert_eq!(monitor.timer().armed()[0].1, Duration::from_millis(5_000));
}

#[test]
fn test_stale_handle_does_not_tick() {
    let mut monitor = build(MonitorConfig::default(), FixedSampler(100));
    let stale = monitor.timer_handle().unwrap();
    monitor
        .handle(&Request::update(r#"{"Start": 1}"#))
        .unwrap();

    assert_eq!(monitor.on_timer(stale), None);
    assert_eq!(monitor.metrics().ticks, 0);
    assert_eq!(monitor.reading(), &Reading::default());
}

/// Sink that drops everything, as if the network were down
#[derive(Default)]
struct DeadSink;

impl ReportSink for DeadSink {
    fn raise_event(&mut self, _route: &str, _payload: &str) {}
    fn post(&mut self, _request: WebhookRequest) {}
}

#[test]
fn test_lost_posts_do_not_roll_back() {
    let config = MonitorConfig {
        destination: Destination::TimeSeries,
        ..Default::default()
    };
    let mut monitor = Monitor::new(
        config,
        settings(),
        SequenceSampler::new([50, 50]),
        ManualTimer::new(),
        DeadSink,
    );

    assert!(monitor.tick().is_report());
    assert_eq!(monitor.last_reported(), 50.0);
    assert_eq!(monitor.ticks_since_report(), 0);
    assert!(!monitor.tick().is_report());
    assert_eq!(monitor.metrics().webhook_posts, 1);
}

#[test]
fn test_engineering_value_is_linear() {
    let config = MonitorConfig {
        scale_k: 0.0125,
        scale_y: -3.0,
        decimals: 4,
        ..Default::default()
    };
    let mut monitor = build(config, SequenceSampler::new([0, 800, 4095]));

    for raw in [0u32, 800, 4095] {
        monitor.tick();
        let reading = monitor.reading();
        assert_eq!(reading.raw, raw);
        assert_relative_eq!(reading.value, f64::from(raw) * 0.0125 - 3.0);
        let parsed: f64 = reading.text.parse().unwrap();
        assert!((parsed - reading.value).abs() <= 1e-4);
    }
}

#[test]
fn test_device_registered_at_init() {
    let mut directory = DeviceDirectory::new();
    let mut monitor = Monitor::new(
        MonitorConfig::default(),
        MonitorSettings::with_node_name("pump"),
        FixedSampler(0),
        ManualTimer::new(),
        MemorySink::new(),
    );
    monitor.init(&mut directory, false);

    let device = directory.lookup("pump-AIN").unwrap();
    assert_eq!(device.kind, DeviceKind::Native);
    assert_eq!(device.route, AIN_ROUTE);
}
