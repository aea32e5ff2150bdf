// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Out-of-bounds alert latch
//!
//! The latch raises once when a reported value leaves `[low, hi]` and stays
//! raised until the value comes back inside `(low + threshold, hi - threshold)`.
//! Values oscillating around a single bound therefore notify only once.

use crate::config::MonitorConfig;

/// Minimum band width for alerting to be enabled
pub const MIN_ALERT_BAND: f64 = 0.1;

/// Result of evaluating the latch against a reported value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTransition {
    /// Value left the bounds, notification due
    Raised,
    /// Value re-entered the reset band, silently re-armed
    Cleared,
    /// Nothing changed
    Unchanged,
}

/// Whether the configured bounds are wide enough to alert on
pub fn band_enabled(low: f64, hi: f64) -> bool {
    (hi - low).abs() > MIN_ALERT_BAND
}

/// Hysteresis latch for threshold alerts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertLatch {
    latched: bool,
}

impl AlertLatch {
    /// Create an armed latch
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate a reported value
    pub fn evaluate(&mut self, value: f64, config: &MonitorConfig) -> AlertTransition {
        if !band_enabled(config.low, config.hi) {
            return AlertTransition::Unchanged;
        }

        if !self.latched {
            if value < config.low || value > config.hi {
                self.latched = true;
                return AlertTransition::Raised;
            }
        } else if value > config.low + config.threshold && value < config.hi - config.threshold {
            self.latched = false;
            return AlertTransition::Cleared;
        }

        AlertTransition::Unchanged
    }

    /// Re-arm unconditionally
    pub fn clear(&mut self) {
        self.latched = false;
    }

    /// Whether an alert is outstanding
    pub fn is_latched(&self) -> bool {
        self.latched
    }
}
