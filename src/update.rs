// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Structured configuration updates
//!
//! An update is a flat JSON object carrying any subset of the recognized
//! keys. Every field is validated on its own: a bad value is rejected and
//! reported, the remaining fields still apply. Unknown keys are ignored.
//!
//! | Key         | Field          | Conversion                     |
//! |-------------|----------------|--------------------------------|
//! | `Auto`      | `autostart`    | `1` enables                    |
//! | `Refresh`   | `refresh_ms`   | seconds × 1000                 |
//! | `Each`      | `report_every` |                                |
//! | `Thr`       | `threshold`    |                                |
//! | `ScK`       | `scale_k`      |                                |
//! | `ScY`       | `scale_y`      |                                |
//! | `Name`      | `label`        | truncated to 15 chars          |
//! | `Low`, `Hi` | `low`, `hi`    |                                |
//! | `Post_type` | `destination`  | wire tag                       |
//! | `Dec`       | `decimals`     | 0..=6                          |
//! | `Start`     | (command)      | `1` starts, anything else stops |

use crate::config::{Destination, MonitorConfig, MAX_DECIMALS, MAX_LABEL_LEN};
use crate::error::{MonitorError, Result};
use log::{debug, trace, warn};
use serde_json::{Map, Value};

/// One validated configuration field
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigField {
    /// `Auto`
    Autostart(bool),
    /// `Refresh`, already converted to milliseconds
    RefreshMs(u32),
    /// `Each`
    ReportEvery(u32),
    /// `Thr`
    Threshold(f64),
    /// `ScK`
    ScaleK(f64),
    /// `ScY`
    ScaleY(f64),
    /// `Name`
    Label(String),
    /// `Low`
    Low(f64),
    /// `Hi`
    Hi(f64),
    /// `Post_type`
    Destination(Destination),
    /// `Dec`
    Decimals(u8),
}

impl ConfigField {
    /// Write this field into a configuration
    pub fn apply(&self, config: &mut MonitorConfig) {
        match self {
            Self::Autostart(v) => config.autostart = *v,
            Self::RefreshMs(v) => config.refresh_ms = *v,
            Self::ReportEvery(v) => config.report_every = *v,
            Self::Threshold(v) => config.threshold = *v,
            Self::ScaleK(v) => config.scale_k = *v,
            Self::ScaleY(v) => config.scale_y = *v,
            Self::Label(v) => config.label = v.clone(),
            Self::Low(v) => config.low = *v,
            Self::Hi(v) => config.hi = *v,
            Self::Destination(v) => config.destination = *v,
            Self::Decimals(v) => config.decimals = *v,
        }
    }
}

/// A parsed update request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigUpdate {
    /// Valid fields, ordered by key name
    pub fields: Vec<ConfigField>,
    /// Lifecycle command, if the request carried one
    pub start: Option<bool>,
    /// Fields that were recognized but rejected
    pub rejected: Vec<MonitorError>,
}

impl ConfigUpdate {
    /// Parse a request body
    ///
    /// Fails only when the body is not a JSON object at all; individual
    /// bad fields end up in [`ConfigUpdate::rejected`].
    pub fn parse(body: &str) -> Result<Self> {
        let object: Map<String, Value> = serde_json::from_str(body)
            .map_err(|e| MonitorError::InvalidRequest(format!("expected a JSON object: {}", e)))?;
        Ok(Self::from_object(&object))
    }

    /// Build from an already decoded object
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let mut update = Self::default();

        for (key, value) in object {
            let parsed = match key.as_str() {
                "Auto" => int_value(key, value).map(|v| Some(ConfigField::Autostart(v == 1))),
                "Refresh" => non_negative(key, value).map(|secs| {
                    Some(ConfigField::RefreshMs(
                        u32::try_from(secs.saturating_mul(1000)).unwrap_or(u32::MAX),
                    ))
                }),
                "Each" => non_negative(key, value).map(|v| {
                    Some(ConfigField::ReportEvery(
                        u32::try_from(v).unwrap_or(u32::MAX),
                    ))
                }),
                "Thr" => float_value(key, value).map(|v| Some(ConfigField::Threshold(v))),
                "ScK" => float_value(key, value).map(|v| Some(ConfigField::ScaleK(v))),
                "ScY" => float_value(key, value).map(|v| Some(ConfigField::ScaleY(v))),
                "Name" => label_value(key, value).map(|v| Some(ConfigField::Label(v))),
                "Low" => float_value(key, value).map(|v| Some(ConfigField::Low(v))),
                "Hi" => float_value(key, value).map(|v| Some(ConfigField::Hi(v))),
                "Post_type" => int_value(key, value).and_then(|tag| {
                    Destination::from_tag(tag)
                        .map(|d| Some(ConfigField::Destination(d)))
                        .ok_or_else(|| {
                            MonitorError::invalid_field(key, format!("unknown destination {}", tag))
                        })
                }),
                "Dec" => int_value(key, value).and_then(|dec| {
                    u8::try_from(dec)
                        .ok()
                        .filter(|d| *d <= MAX_DECIMALS)
                        .map(|d| Some(ConfigField::Decimals(d)))
                        .ok_or_else(|| {
                            MonitorError::invalid_field(
                                key,
                                format!("{} not in 0..={}", dec, MAX_DECIMALS),
                            )
                        })
                }),
                "Start" => int_value(key, value).map(|v| {
                    update.start = Some(v == 1);
                    None
                }),
                _ => {
                    trace!("Ignoring unknown config key '{}'", key);
                    Ok(None)
                }
            };

            match parsed {
                Ok(Some(field)) => update.fields.push(field),
                Ok(None) => {}
                Err(e) => {
                    warn!("Config field rejected: {}", e);
                    update.rejected.push(e);
                }
            }
        }

        update
    }

    /// Apply every valid field, returning the lifecycle command if any
    pub fn apply(&self, config: &mut MonitorConfig) -> Option<bool> {
        for field in &self.fields {
            field.apply(config);
            debug!("AIN config: {:?}", field);
        }
        self.start
    }

    /// Whether the request carried nothing usable
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.start.is_none()
    }
}

fn int_value(key: &str, value: &Value) -> Result<i64> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                .map(|f| f.trunc() as i64)
        }),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite() && f.abs() < i64::MAX as f64)
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    };
    parsed.ok_or_else(|| MonitorError::invalid_field(key, format!("not an integer: {}", value)))
}

fn non_negative(key: &str, value: &Value) -> Result<u64> {
    let v = int_value(key, value)?;
    u64::try_from(v).map_err(|_| MonitorError::invalid_field(key, format!("negative: {}", v)))
}

fn float_value(key: &str, value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed
        .filter(|f| f.is_finite())
        .ok_or_else(|| MonitorError::invalid_field(key, format!("not a finite number: {}", value)))
}

fn label_value(key: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.chars().take(MAX_LABEL_LEN).collect()),
        other => Err(MonitorError::invalid_field(
            key,
            format!("not a string: {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(body: &str, config: &mut MonitorConfig) -> (ConfigUpdate, Option<bool>) {
        let update = ConfigUpdate::parse(body).unwrap();
        let start = update.apply(config);
        (update, start)
    }

    #[test]
    fn test_all_fields() {
        let mut config = MonitorConfig::default();
        let body = r#"{
            "Auto": 0, "Refresh": 5, "Each": 12, "Thr": 0.25, "ScK": 0.5,
            "ScY": -2, "Name": "tank", "Low": 1.5, "Hi": 9.5, "Post_type": 2, "Dec": 1
        }"#;
        let (update, start) = apply(body, &mut config);
        assert!(update.rejected.is_empty());
        assert_eq!(start, None);
        assert_eq!(
            config,
            MonitorConfig {
                autostart: false,
                refresh_ms: 5_000,
                report_every: 12,
                decimals: 1,
                threshold: 0.25,
                scale_k: 0.5,
                scale_y: -2.0,
                label: "tank".to_string(),
                destination: Destination::ThresholdAlert,
                low: 1.5,
                hi: 9.5,
            }
        );
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let mut config = MonitorConfig::default();
        let (update, _) = apply(r#"{"Colour": "red", "Each": 3}"#, &mut config);
        assert!(update.rejected.is_empty());
        assert_eq!(update.fields, vec![ConfigField::ReportEvery(3)]);
        assert_eq!(config.report_every, 3);
    }

    #[test]
    fn test_bad_field_does_not_block_others() {
        let mut config = MonitorConfig::default();
        let (update, _) = apply(
            r#"{"Dec": 9, "Thr": "abc", "Post_type": 7, "Name": 5, "Each": 4}"#,
            &mut config,
        );
        assert_eq!(update.rejected.len(), 4);
        assert_eq!(config.report_every, 4);
        assert_eq!(config.decimals, MonitorConfig::default().decimals);
        assert_eq!(config.threshold, MonitorConfig::default().threshold);
    }

    #[test]
    fn test_refresh_seconds_to_ms() {
        let mut config = MonitorConfig::default();
        apply(r#"{"Refresh": 0}"#, &mut config);
        assert_eq!(config.refresh_ms, 0);
        apply(r#"{"Refresh": "30"}"#, &mut config);
        assert_eq!(config.refresh_ms, 30_000);
        apply(r#"{"Refresh": 99999999}"#, &mut config);
        assert_eq!(config.refresh_ms, u32::MAX);
    }

    #[test]
    fn test_negative_refresh_rejected() {
        let mut config = MonitorConfig::default();
        let (update, _) = apply(r#"{"Refresh": -1}"#, &mut config);
        assert_eq!(update.rejected.len(), 1);
        assert_eq!(config.refresh_ms, 10_000);
    }

    #[test]
    fn test_start_command() {
        let mut config = MonitorConfig::default();
        let (_, start) = apply(r#"{"Start": 1}"#, &mut config);
        assert_eq!(start, Some(true));
        let (_, start) = apply(r#"{"Start": 0}"#, &mut config);
        assert_eq!(start, Some(false));
        let (_, start) = apply(r#"{"Start": 2}"#, &mut config);
        assert_eq!(start, Some(false));
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_label_truncated() {
        let mut config = MonitorConfig::default();
        apply(r#"{"Name": "a-very-long-channel-name"}"#, &mut config);
        assert_eq!(config.label, "a-very-long-cha");
        assert_eq!(config.label.chars().count(), MAX_LABEL_LEN);
    }

    #[test]
    fn test_integer_fields_accept_floats() {
        let mut config = MonitorConfig::default();
        apply(r#"{"Each": 7.9, "Dec": "2"}"#, &mut config);
        assert_eq!(config.report_every, 7);
        assert_eq!(config.decimals, 2);
    }

    #[test]
    fn test_idempotent() {
        let body = r#"{"Refresh": 3, "ScK": 0.1, "Name": "x", "Post_type": 1}"#;
        let mut once = MonitorConfig::default();
        apply(body, &mut once);
        let mut twice = once.clone();
        apply(body, &mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_not_an_object() {
        assert!(matches!(
            ConfigUpdate::parse("[1, 2]"),
            Err(MonitorError::InvalidRequest(_))
        ));
        assert!(matches!(
            ConfigUpdate::parse("Refresh=5"),
            Err(MonitorError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_duplicate_key_last_wins() {
        let mut config = MonitorConfig::default();
        let (update, _) = apply(r#"{"Each": 3, "Thr": 0.5, "Each": 9}"#, &mut config);
        assert_eq!(config.report_every, 9);
        assert_eq!(
            update
                .fields
                .iter()
                .filter(|f| matches!(f, ConfigField::ReportEvery(_)))
                .count(),
            1
        );
    }

    #[test]
    fn test_fields_in_key_order() {
        let update = ConfigUpdate::parse(r#"{"Thr": 0.5, "Each": 3}"#).unwrap();
        assert_eq!(
            update.fields,
            vec![ConfigField::ReportEvery(3), ConfigField::Threshold(0.5)]
        );
    }

    #[test]
    fn test_is_empty() {
        assert!(ConfigUpdate::parse("{}").unwrap().is_empty());
        assert!(!ConfigUpdate::parse(r#"{"Start": 0}"#).unwrap().is_empty());
    }
}
