//! Pipeline counters
//!
//! Plain counters updated by the monitor as it works. Hosts read them to
//! export whatever observability surface they have.

use crate::detector::ReportReason;
use crate::hysteresis::AlertTransition;

/// Monitor activity counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorMetrics {
    /// Ticks processed
    pub ticks: u64,
    /// Ticks from a timer that is no longer armed
    pub stale_ticks: u64,
    /// Reports emitted
    pub reports: u64,
    /// Reports triggered by the threshold
    pub reports_threshold: u64,
    /// Reports triggered by the schedule
    pub reports_scheduled: u64,
    /// Reports forced by the tick ceiling
    pub reports_forced: u64,
    /// Alerts raised
    pub alerts_raised: u64,
    /// Alerts cleared
    pub alerts_cleared: u64,
    /// Webhook requests handed to the sink
    pub webhook_posts: u64,
    /// Local events raised
    pub events_raised: u64,
    /// Requests handled
    pub requests: u64,
    /// Configuration fields applied
    pub fields_applied: u64,
    /// Configuration fields rejected
    pub fields_rejected: u64,
    /// Payloads that could not be built
    pub payload_errors: u64,
}

impl MonitorMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a processed tick
    pub fn record_tick(&mut self) {
        self.ticks += 1;
    }

    /// Record a tick from a cancelled timer
    pub fn record_stale_tick(&mut self) {
        self.stale_ticks += 1;
    }

    /// Record an emitted report
    pub fn record_report(&mut self, reason: &ReportReason) {
        self.reports += 1;
        match reason {
            ReportReason::ThresholdExceeded { .. } => self.reports_threshold += 1,
            ReportReason::Scheduled { .. } => self.reports_scheduled += 1,
            ReportReason::Forced => self.reports_forced += 1,
        }
    }

    /// Record a latch transition
    pub fn record_alert(&mut self, transition: AlertTransition) {
        match transition {
            AlertTransition::Raised => self.alerts_raised += 1,
            AlertTransition::Cleared => self.alerts_cleared += 1,
            AlertTransition::Unchanged => {}
        }
    }

    /// Record a webhook request
    pub fn record_post(&mut self) {
        self.webhook_posts += 1;
    }

    /// Record a local event
    pub fn record_event(&mut self) {
        self.events_raised += 1;
    }

    /// Record a handled request and its field outcome
    pub fn record_request(&mut self, applied: usize, rejected: usize) {
        self.requests += 1;
        self.fields_applied += applied as u64;
        self.fields_rejected += rejected as u64;
    }

    /// Record a payload build failure
    pub fn record_payload_error(&mut self) {
        self.payload_errors += 1;
    }

    /// Share of ticks that produced a report (0.0 - 1.0)
    pub fn report_rate(&self) -> f64 {
        if self.ticks == 0 {
            return 0.0;
        }
        self.reports as f64 / self.ticks as f64
    }

    /// Reset all counters
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
