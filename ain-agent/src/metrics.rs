// AIN Agent - HTTP host for the AIN monitor
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Prometheus metrics for the AIN agent.
//!
//! Monitor counters are mirrored into gauges from a driver snapshot each
//! time `/metrics` is scraped. Webhook outcomes are counted directly by the
//! delivery tasks.

use crate::driver::Snapshot;
use crate::error::AgentError;
use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_gauge_vec, CounterVec, Encoder, Gauge, GaugeVec,
    TextEncoder,
};

lazy_static! {
    // ============================================================
    // Current reading
    // ============================================================

    /// Latest raw ADC sample.
    pub static ref RAW_VALUE: Gauge = register_gauge!(
        "ain_raw_value",
        "Latest raw ADC sample"
    ).unwrap();

    /// Latest engineering value.
    pub static ref VALUE: Gauge = register_gauge!(
        "ain_value",
        "Latest scaled engineering value"
    ).unwrap();

    /// Sampling state (1 = running, 0 = stopped).
    pub static ref RUNNING: Gauge = register_gauge!(
        "ain_running",
        "Sampling timer armed (1=running, 0=stopped)"
    ).unwrap();

    /// Alert latch state (1 = latched).
    pub static ref ALERT_LATCHED: Gauge = register_gauge!(
        "ain_alert_latched",
        "Out-of-bounds alert outstanding (1=latched, 0=armed)"
    ).unwrap();

    // ============================================================
    // Monitor counters (mirrored from MonitorMetrics)
    // ============================================================

    pub static ref TICKS_TOTAL: Gauge = register_gauge!(
        "ain_ticks_total",
        "Ticks processed"
    ).unwrap();

    pub static ref STALE_TICKS_TOTAL: Gauge = register_gauge!(
        "ain_stale_ticks_total",
        "Ticks dropped because their timer was no longer armed"
    ).unwrap();

    /// Reports by trigger (threshold, scheduled, forced).
    pub static ref REPORTS_TOTAL: GaugeVec = register_gauge_vec!(
        "ain_reports_total",
        "Reports emitted by trigger",
        &["reason"]
    ).unwrap();

    /// Latch transitions (raised, cleared).
    pub static ref ALERTS_TOTAL: GaugeVec = register_gauge_vec!(
        "ain_alerts_total",
        "Alert latch transitions",
        &["transition"]
    ).unwrap();

    pub static ref WEBHOOK_POSTS_TOTAL: Gauge = register_gauge!(
        "ain_webhook_posts_total",
        "Webhook requests handed to delivery"
    ).unwrap();

    pub static ref EVENTS_TOTAL: Gauge = register_gauge!(
        "ain_events_total",
        "Local events raised"
    ).unwrap();

    pub static ref REQUESTS_TOTAL: Gauge = register_gauge!(
        "ain_requests_total",
        "Requests handled"
    ).unwrap();

    /// Configuration fields by outcome (applied, rejected).
    pub static ref CONFIG_FIELDS_TOTAL: GaugeVec = register_gauge_vec!(
        "ain_config_fields_total",
        "Configuration fields by outcome",
        &["outcome"]
    ).unwrap();

    pub static ref PAYLOAD_ERRORS_TOTAL: Gauge = register_gauge!(
        "ain_payload_errors_total",
        "Payloads that could not be built"
    ).unwrap();

    // ============================================================
    // Delivery
    // ============================================================

    /// Webhook deliveries by result (ok, error).
    pub static ref WEBHOOK_DELIVERIES_TOTAL: CounterVec = register_counter_vec!(
        "ain_webhook_deliveries_total",
        "Webhook delivery attempts by result",
        &["result"]
    ).unwrap();
}

/// Mirror a driver snapshot into the gauges.
pub fn update_from_snapshot(snapshot: &Snapshot) {
    RAW_VALUE.set(f64::from(snapshot.raw));
    VALUE.set(snapshot.value);
    RUNNING.set(if snapshot.running { 1.0 } else { 0.0 });
    ALERT_LATCHED.set(if snapshot.latched { 1.0 } else { 0.0 });

    let m = &snapshot.metrics;
    TICKS_TOTAL.set(m.ticks as f64);
    STALE_TICKS_TOTAL.set(m.stale_ticks as f64);
    REPORTS_TOTAL
        .with_label_values(&["threshold"])
        .set(m.reports_threshold as f64);
    REPORTS_TOTAL
        .with_label_values(&["scheduled"])
        .set(m.reports_scheduled as f64);
    REPORTS_TOTAL
        .with_label_values(&["forced"])
        .set(m.reports_forced as f64);
    ALERTS_TOTAL
        .with_label_values(&["raised"])
        .set(m.alerts_raised as f64);
    ALERTS_TOTAL
        .with_label_values(&["cleared"])
        .set(m.alerts_cleared as f64);
    WEBHOOK_POSTS_TOTAL.set(m.webhook_posts as f64);
    EVENTS_TOTAL.set(m.events_raised as f64);
    REQUESTS_TOTAL.set(m.requests as f64);
    CONFIG_FIELDS_TOTAL
        .with_label_values(&["applied"])
        .set(m.fields_applied as f64);
    CONFIG_FIELDS_TOTAL
        .with_label_values(&["rejected"])
        .set(m.fields_rejected as f64);
    PAYLOAD_ERRORS_TOTAL.set(m.payload_errors as f64);
}

/// Count one webhook delivery outcome.
pub fn record_webhook_result(ok: bool) {
    WEBHOOK_DELIVERIES_TOTAL
        .with_label_values(&[if ok { "ok" } else { "error" }])
        .inc();
}

/// Encode all metrics to Prometheus text format.
pub fn encode_metrics() -> Result<String, AgentError> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ain_monitor::MonitorMetrics;

    #[test]
    fn test_encode_metrics() {
        let snapshot = Snapshot {
            device_name: "node-AIN".to_string(),
            raw: 512,
            value: 1.65,
            text: "1.650".to_string(),
            running: true,
            latched: false,
            metrics: MonitorMetrics {
                ticks: 10,
                reports: 2,
                reports_threshold: 2,
                ..Default::default()
            },
        };
        update_from_snapshot(&snapshot);
        record_webhook_result(false);

        let output = encode_metrics().unwrap();
        assert!(output.contains("ain_raw_value 512"));
        assert!(output.contains("ain_ticks_total 10"));
        assert!(output.contains(r#"ain_reports_total{reason="threshold"} 2"#));
        assert!(output.contains("ain_webhook_deliveries_total"));
    }
}
