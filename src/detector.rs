// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Change detection
//!
//! Decides, once per tick, whether the current engineering value differs
//! enough from the last *reported* value to be worth a report.
//!
//! Three triggers are checked in order:
//!
//! 1. the change exceeds `threshold` (always wins)
//! 2. `report_every` ticks have passed and the change is visible at the
//!    configured precision
//! 3. [`FORCED_REPORT_TICKS`] ticks have passed, whatever the value

use crate::config::MonitorConfig;
use crate::scaler::epsilon;

/// Tick ceiling after which a report is emitted unconditionally
pub const FORCED_REPORT_TICKS: u8 = u8::MAX;

/// Why a report was emitted
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportReason {
    /// Change exceeded the configured threshold
    ThresholdExceeded { delta: f64 },
    /// `report_every` ticks elapsed with a visible change
    Scheduled { ticks: u8 },
    /// Tick ceiling reached
    Forced,
}

impl ReportReason {
    /// Short label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ThresholdExceeded { .. } => "threshold",
            Self::Scheduled { .. } => "scheduled",
            Self::Forced => "forced",
        }
    }
}

/// Per-channel change detector state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeDetector {
    last_reported: f64,
    ticks: u8,
}

impl ChangeDetector {
    /// Create a detector with nothing reported yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate one tick
    ///
    /// Returns the trigger when a report is due. In that case the reported
    /// value is remembered and the tick counter restarts.
    pub fn evaluate(&mut self, value: f64, config: &MonitorConfig) -> Option<ReportReason> {
        self.ticks = self.ticks.saturating_add(1);
        let delta = (value - self.last_reported).abs();

        let reason = if delta > config.threshold {
            ReportReason::ThresholdExceeded { delta }
        } else if u32::from(self.ticks) >= config.report_every && delta > epsilon(config.decimals)
        {
            ReportReason::Scheduled { ticks: self.ticks }
        } else if self.ticks >= FORCED_REPORT_TICKS {
            ReportReason::Forced
        } else {
            return None;
        };

        self.last_reported = value;
        self.ticks = 0;
        Some(reason)
    }

    /// Value at the last report
    pub fn last_reported(&self) -> f64 {
        self.last_reported
    }

    /// Ticks since the last report
    pub fn ticks(&self) -> u8 {
        self.ticks
    }
}
