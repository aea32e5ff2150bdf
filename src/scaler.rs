// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Raw sample scaling
//!
//! Converts ADC counts into engineering units with a linear transform and
//! renders the result at the configured precision.

use crate::config::MonitorConfig;

/// One scaled sample
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    /// Raw ADC counts
    pub raw: u32,
    /// Engineering value
    pub value: f64,
    /// Value rendered with the configured number of decimals
    pub text: String,
}

/// Linear transform from raw counts to engineering units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scaler {
    /// Scale factor
    pub k: f64,
    /// Offset
    pub y: f64,
    /// Fractional digits
    pub decimals: u8,
}

impl Scaler {
    /// Create a scaler
    pub fn new(k: f64, y: f64, decimals: u8) -> Self {
        Self { k, y, decimals }
    }

    /// Build from the current configuration
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(config.scale_k, config.scale_y, config.decimals)
    }

    /// Engineering value for a raw sample
    pub fn scale(&self, raw: u32) -> f64 {
        f64::from(raw) * self.k + self.y
    }

    /// Scale and render a raw sample
    pub fn convert(&self, raw: u32) -> Reading {
        let value = self.scale(raw);
        Reading {
            raw,
            value,
            text: format_fixed(value, self.decimals),
        }
    }
}

/// Render a value with exactly `decimals` fractional digits
pub fn format_fixed(value: f64, decimals: u8) -> String {
    format!("{:.*}", usize::from(decimals), value)
}

/// Smallest change visible at the given precision
pub fn epsilon(decimals: u8) -> f64 {
    1.0 / 10f64.powi(i32::from(decimals))
}
