//! # AIN Monitor
//!
//! Monitoring for a single analog input channel on a networked node.
//!
//! ## Key Features
//!
//! - **Linear scaling**: raw ADC counts to engineering units at a fixed precision
//! - **Change detection**: report on threshold jumps, on schedule, or at a tick ceiling
//! - **Hysteresis alerts**: one notification per excursion outside `[low, hi]`
//! - **Live configuration**: field-by-field JSON updates with immediate effect
//!
//! ## Quick Start
//!
//! ```rust
//! use ain_monitor::{
//!     Destination, DeviceDirectory, ManualTimer, MemorySink, Monitor, MonitorConfig,
//!     MonitorSettings, Request, SequenceSampler, WebhookConfig,
//! };
//!
//! let config = MonitorConfig {
//!     destination: Destination::ThresholdAlert,
//!     low: 10.0,
//!     hi: 20.0,
//!     ..Default::default()
//! };
//! let settings = MonitorSettings {
//!     node_name: "greenhouse".to_string(),
//!     webhook: WebhookConfig {
//!         host: "hooks.example.com".to_string(),
//!         ..Default::default()
//!     },
//! };
//!
//! let mut monitor = Monitor::new(
//!     config,
//!     settings,
//!     SequenceSampler::new([15, 25]),
//!     ManualTimer::new(),
//!     MemorySink::new(),
//! );
//! monitor.init(&mut DeviceDirectory::new(), true);
//!
//! monitor.tick();
//! monitor.tick();
//! assert!(monitor.is_latched());
//! assert_eq!(monitor.sink().posts().len(), 1);
//!
//! monitor.handle(&Request::update(r#"{"Thr": 0.5, "Start": 1}"#)).unwrap();
//! assert!(!monitor.is_latched());
//! ```
//!
//! ## Modules
//!
//! - [`scaler`]: Raw to engineering value conversion
//! - [`detector`]: Change detection
//! - [`hysteresis`]: Alert latch
//! - [`report`]: Payload shaping
//! - [`update`]: Configuration updates
//! - [`lifecycle`]: Sampling timer
//! - [`monitor`]: The context tying it all together
//! - [`config`]: Configuration types and persisted records

// Modules
pub mod config;
pub mod detector;
pub mod error;
pub mod hysteresis;
pub mod lifecycle;
pub mod metrics;
pub mod monitor;
pub mod registry;
pub mod report;
pub mod sampler;
pub mod scaler;
pub mod sink;
pub mod update;

// Re-exports for convenient access
pub use config::store::{
    decode_record, encode_record, load_or_default, persist, ConfigStore, FileConfigStore,
    MemoryConfigStore,
};
pub use config::{Destination, MonitorConfig, MonitorSettings, WebhookConfig};
pub use detector::{ChangeDetector, ReportReason, FORCED_REPORT_TICKS};
pub use error::{MonitorError, RecordError, Result};
pub use hysteresis::{AlertLatch, AlertTransition};
pub use lifecycle::{Lifecycle, ManualTimer, RunState, Timer, TimerHandle};
pub use metrics::MonitorMetrics;
pub use monitor::{Monitor, Request, RequestKind, TickOutcome};
pub use registry::{DeviceDirectory, DeviceEntry, DeviceKind, Registry, AIN_ROUTE};
pub use report::{format_report, DeviceStatus, ReportContext, ReportKind};
pub use sampler::{FixedSampler, Sampler, SequenceSampler};
pub use scaler::{Reading, Scaler};
pub use sink::{Credentials, MemorySink, ReportSink, WebhookRequest};
pub use update::{ConfigField, ConfigUpdate};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
