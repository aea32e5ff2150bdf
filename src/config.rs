// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Configuration types for the analog input monitor
//!
//! [`MonitorConfig`] is the runtime-mutable configuration that every
//! pipeline stage reads. It is only ever changed field by field through
//! [`ConfigUpdate`](crate::update::ConfigUpdate). [`MonitorSettings`] holds
//! the static identity and webhook target, fixed for the process lifetime.

pub mod store;

use crate::error::{MonitorError, Result};
use serde::{Deserialize, Serialize};

/// Maximum number of fractional digits in formatted values
pub const MAX_DECIMALS: u8 = 6;

/// Maximum label length in characters
pub const MAX_LABEL_LEN: usize = 15;

/// Port used for plain HTTP webhooks
pub const WEBHOOK_PORT: u16 = 80;

/// Port used for TLS webhooks
pub const WEBHOOK_TLS_PORT: u16 = 443;

/// Where (and in which shape) significant changes are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Destination {
    /// Local event only
    #[default]
    None,
    /// Time-series ingestion service (one field per channel)
    TimeSeries,
    /// Threshold notification service (two-value webhook)
    ThresholdAlert,
}

impl Destination {
    /// Wire tag used by the `Post_type` key
    pub fn tag(self) -> u8 {
        match self {
            Self::None => 0,
            Self::TimeSeries => 1,
            Self::ThresholdAlert => 2,
        }
    }

    /// Convert from a wire tag
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(Self::None),
            1 => Some(Self::TimeSeries),
            2 => Some(Self::ThresholdAlert),
            _ => None,
        }
    }
}

/// Runtime configuration of the analog input channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Start sampling at init
    pub autostart: bool,

    /// Tick period in milliseconds (0 = disabled)
    pub refresh_ms: u32,

    /// Report after this many ticks if the value moved more than epsilon
    pub report_every: u32,

    /// Fractional digits of formatted values
    pub decimals: u8,

    /// Minimum absolute change that always triggers a report
    pub threshold: f64,

    /// Linear scale factor
    pub scale_k: f64,

    /// Linear offset
    pub scale_y: f64,

    /// Optional channel label
    pub label: String,

    /// Report destination
    pub destination: Destination,

    /// Lower alert bound
    pub low: f64,

    /// Upper alert bound
    pub hi: f64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            autostart: true,
            refresh_ms: 10_000,
            report_every: 60,
            decimals: 3,
            threshold: 1.0,
            scale_k: 1.0,
            scale_y: 0.0,
            label: String::new(),
            destination: Destination::None,
            low: 0.0,
            hi: 0.0,
        }
    }
}

impl MonitorConfig {
    /// Check that every field is usable by the pipeline
    ///
    /// Used when loading persisted records; runtime updates validate
    /// each field on its own instead.
    pub fn validate(&self) -> Result<()> {
        if self.decimals > MAX_DECIMALS {
            return Err(MonitorError::invalid_field(
                "decimals",
                format!("{} exceeds maximum {}", self.decimals, MAX_DECIMALS),
            ));
        }
        if self.label.chars().count() > MAX_LABEL_LEN {
            return Err(MonitorError::invalid_field(
                "label",
                format!("longer than {} characters", MAX_LABEL_LEN),
            ));
        }
        for (key, value) in [
            ("threshold", self.threshold),
            ("scale_k", self.scale_k),
            ("scale_y", self.scale_y),
            ("low", self.low),
            ("hi", self.hi),
        ] {
            if !value.is_finite() {
                return Err(MonitorError::invalid_field(key, "not a finite number"));
            }
        }
        Ok(())
    }

    /// Tick period, `None` when sampling is disabled
    pub fn refresh_period(&self) -> Option<std::time::Duration> {
        (self.refresh_ms > 0).then(|| std::time::Duration::from_millis(u64::from(self.refresh_ms)))
    }
}

/// Outgoing webhook target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Use TLS
    pub tls: bool,
    /// Basic auth user (empty = no auth)
    pub user: String,
    /// Basic auth password
    pub password: String,
    /// Target host (empty = webhooks disabled)
    pub host: String,
    /// Request path
    pub path: String,
    /// API key for the time-series service
    pub token: String,
}

impl WebhookConfig {
    /// Whether a webhook target is configured at all
    pub fn is_enabled(&self) -> bool {
        !self.host.is_empty()
    }

    /// Port derived from the TLS flag
    pub fn port(&self) -> u16 {
        if self.tls {
            WEBHOOK_TLS_PORT
        } else {
            WEBHOOK_PORT
        }
    }
}

/// Static settings fixed for the process lifetime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Node name, prefixed to the device name
    pub node_name: String,
    /// Webhook target
    pub webhook: WebhookConfig,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            node_name: "node".to_string(),
            webhook: WebhookConfig::default(),
        }
    }
}

impl MonitorSettings {
    /// Create settings for a named node
    pub fn with_node_name(node_name: impl Into<String>) -> Self {
        Self {
            node_name: node_name.into(),
            ..Default::default()
        }
    }

    /// Create settings with a webhook target
    pub fn with_webhook(webhook: WebhookConfig) -> Self {
        Self {
            webhook,
            ..Default::default()
        }
    }
}
