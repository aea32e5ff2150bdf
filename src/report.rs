// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Report payload shaping
//!
//! Every outgoing payload is built here from a read-only view of the
//! monitor. The shape depends on the fault flag, the report kind and the
//! configured [`Destination`]:
//!
//! | Context                    | Shape                                          |
//! |----------------------------|------------------------------------------------|
//! | fault                      | `{"Device", "Status": "Fault"}`                |
//! | [`ReportKind::Config`]     | device, status and the full `Config` section   |
//! | `Event` + `TimeSeries`     | `{"api_key", "<label>": value}`                |
//! | `Event` + `ThresholdAlert` | `{"value1": signal, "value2": "value"}`        |
//! | `Event` + `None`, `Measurement` | device, status and the `Data.ADC` section |
//!
//! Floating point values are emitted as JSON numbers carrying exactly the
//! configured number of decimals.

use crate::config::{Destination, MonitorConfig};
use crate::error::{MonitorError, Result};
use crate::scaler::{format_fixed, Reading};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::value::RawValue;

/// Suffix appended to the node name to form the device name
pub const DEVICE_SUFFIX: &str = "AIN";

/// Field name used by time-series reports when no label is set
pub const DEFAULT_FIELD_NAME: &str = "field1";

/// Signal name used by alert reports when no label is set
pub const DEFAULT_SIGNAL_NAME: &str = "AIN";

/// Operational status carried by device payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceStatus {
    /// Sampling timer armed
    #[serde(rename = "OK")]
    Ok,
    /// Sampling stopped
    Stop,
    /// Sensor fault reported by the caller
    Fault,
}

impl DeviceStatus {
    /// Status derived from the timer state
    pub fn from_running(running: bool) -> Self {
        if running {
            Self::Ok
        } else {
            Self::Stop
        }
    }
}

/// What the payload is answering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    /// Current settings (query or update response)
    Config,
    /// Device-shaped measurement (plain reads and local events)
    Measurement,
    /// Destination-shaped event for the webhook
    Event,
}

/// Read-only view of everything a payload may contain
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    /// Current configuration
    pub config: &'a MonitorConfig,
    /// Latest reading
    pub reading: &'a Reading,
    /// Full device name
    pub device_name: &'a str,
    /// Whether the sampling timer is armed
    pub running: bool,
    /// API key for the time-series service
    pub api_key: &'a str,
}

/// Full device name for a node
pub fn full_device_name(node_name: &str) -> String {
    format!("{}-{}", node_name, DEVICE_SUFFIX)
}

/// Build a payload
pub fn format_report(ctx: &ReportContext<'_>, kind: ReportKind, fault: bool) -> Result<String> {
    if fault {
        return to_json(&StatusPayload {
            device: ctx.device_name,
            status: DeviceStatus::Fault,
        });
    }

    match kind {
        ReportKind::Config => config_payload(ctx),
        ReportKind::Measurement => measurement_payload(ctx),
        ReportKind::Event => match ctx.config.destination {
            Destination::None => measurement_payload(ctx),
            Destination::TimeSeries => time_series_payload(ctx),
            Destination::ThresholdAlert => alert_payload(ctx),
        },
    }
}

fn config_payload(ctx: &ReportContext<'_>) -> Result<String> {
    let config = ctx.config;
    let fixed = |value: f64| number(format_fixed(value, config.decimals));

    to_json(&ConfigPayload {
        device: ctx.device_name,
        status: DeviceStatus::from_running(ctx.running),
        config: ConfigSection {
            auto: u8::from(config.autostart),
            refresh: config.refresh_ms,
            each: config.report_every,
            dec: config.decimals,
            thr: fixed(config.threshold)?,
            sc_k: fixed(config.scale_k)?,
            sc_y: fixed(config.scale_y)?,
            name: &config.label,
            post_type: config.destination.tag(),
            low: fixed(config.low)?,
            hi: fixed(config.hi)?,
        },
    })
}

fn measurement_payload(ctx: &ReportContext<'_>) -> Result<String> {
    to_json(&DataPayload {
        device: ctx.device_name,
        status: DeviceStatus::from_running(ctx.running),
        data: DataSection {
            adc: AdcSection {
                value_raw: ctx.reading.raw,
                value: number(ctx.reading.text.clone())?,
            },
        },
    })
}

fn time_series_payload(ctx: &ReportContext<'_>) -> Result<String> {
    to_json(&TimeSeriesPayload {
        api_key: ctx.api_key,
        field: label_or(&ctx.config.label, DEFAULT_FIELD_NAME),
        value: number(ctx.reading.text.clone())?,
    })
}

fn alert_payload(ctx: &ReportContext<'_>) -> Result<String> {
    to_json(&AlertPayload {
        value1: label_or(&ctx.config.label, DEFAULT_SIGNAL_NAME),
        value2: &ctx.reading.text,
    })
}

fn label_or<'a>(label: &'a str, default: &'a str) -> &'a str {
    if label.is_empty() {
        default
    } else {
        label
    }
}

/// Pre-formatted text as a JSON number
fn number(text: String) -> Result<Box<RawValue>> {
    RawValue::from_string(text)
        .map_err(|e| MonitorError::Payload(format!("value is not a JSON number: {}", e)))
}

fn to_json<T: Serialize>(payload: &T) -> Result<String> {
    Ok(serde_json::to_string(payload)?)
}

#[derive(Serialize)]
struct StatusPayload<'a> {
    #[serde(rename = "Device")]
    device: &'a str,
    #[serde(rename = "Status")]
    status: DeviceStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ConfigPayload<'a> {
    device: &'a str,
    status: DeviceStatus,
    config: ConfigSection<'a>,
}

#[derive(Serialize)]
struct ConfigSection<'a> {
    #[serde(rename = "Auto")]
    auto: u8,
    #[serde(rename = "Refresh")]
    refresh: u32,
    #[serde(rename = "Each")]
    each: u32,
    #[serde(rename = "Dec")]
    dec: u8,
    #[serde(rename = "Thr")]
    thr: Box<RawValue>,
    #[serde(rename = "ScK")]
    sc_k: Box<RawValue>,
    #[serde(rename = "ScY")]
    sc_y: Box<RawValue>,
    #[serde(rename = "Name")]
    name: &'a str,
    #[serde(rename = "Post_type")]
    post_type: u8,
    #[serde(rename = "Low")]
    low: Box<RawValue>,
    #[serde(rename = "Hi")]
    hi: Box<RawValue>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct DataPayload<'a> {
    device: &'a str,
    status: DeviceStatus,
    data: DataSection,
}

#[derive(Serialize)]
struct DataSection {
    #[serde(rename = "ADC")]
    adc: AdcSection,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct AdcSection {
    value_raw: u32,
    value: Box<RawValue>,
}

#[derive(Serialize)]
struct AlertPayload<'a> {
    value1: &'a str,
    value2: &'a str,
}

// The field name is the channel label, so this one is a map.
struct TimeSeriesPayload<'a> {
    api_key: &'a str,
    field: &'a str,
    value: Box<RawValue>,
}

impl Serialize for TimeSeriesPayload<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("api_key", self.api_key)?;
        map.serialize_entry(self.field, &self.value)?;
        map.end()
    }
}
