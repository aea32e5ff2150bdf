// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! The monitor context
//!
//! [`Monitor`] owns the configuration, the sampling state and the host
//! collaborators. Ticks and requests are handled one at a time through
//! `&mut self`; a multi-threaded host must serialize calls.
//!
//! ```rust
//! use ain_monitor::{
//!     DeviceDirectory, FixedSampler, ManualTimer, MemorySink, Monitor, MonitorConfig,
//!     MonitorSettings, Request,
//! };
//!
//! let mut monitor = Monitor::new(
//!     MonitorConfig::default(),
//!     MonitorSettings::with_node_name("node"),
//!     FixedSampler(512),
//!     ManualTimer::new(),
//!     MemorySink::new(),
//! );
//! monitor.init(&mut DeviceDirectory::new(), false);
//! monitor.tick();
//!
//! let response = monitor.handle(&Request::read()).unwrap();
//! assert!(response.contains("\"ValueRaw\":512"));
//! ```

use crate::config::{Destination, MonitorConfig, MonitorSettings};
use crate::detector::{ChangeDetector, ReportReason};
use crate::error::Result;
use crate::hysteresis::{AlertLatch, AlertTransition};
use crate::lifecycle::{Lifecycle, RunState, Timer, TimerHandle};
use crate::metrics::MonitorMetrics;
use crate::registry::{DeviceEntry, DeviceKind, Registry, AIN_ROUTE};
use crate::report::{format_report, full_device_name, ReportContext, ReportKind};
use crate::sampler::Sampler;
use crate::scaler::{Reading, Scaler};
use crate::sink::{ReportSink, WebhookRequest};
use crate::update::ConfigUpdate;
use log::{debug, trace, warn};

/// Kind of inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// Plain measurement read
    Read,
    /// Configuration read
    Query,
    /// Configuration update
    Update,
}

/// An inbound request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    /// What is asked
    pub kind: RequestKind,
    /// Sensor fault reported by the caller
    pub fault: bool,
    /// JSON body for updates
    pub body: Option<&'a str>,
}

impl<'a> Request<'a> {
    /// Measurement read
    pub fn read() -> Self {
        Self {
            kind: RequestKind::Read,
            fault: false,
            body: None,
        }
    }

    /// Configuration read
    pub fn query() -> Self {
        Self {
            kind: RequestKind::Query,
            fault: false,
            body: None,
        }
    }

    /// Configuration update
    pub fn update(body: &'a str) -> Self {
        Self {
            kind: RequestKind::Update,
            fault: false,
            body: Some(body),
        }
    }

    /// Mark the sensor as faulty
    pub fn with_fault(mut self, fault: bool) -> Self {
        self.fault = fault;
        self
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// No report due
    Quiet {
        /// Ticks since the last report
        ticks: u8,
    },
    /// A report was emitted
    Reported {
        /// Trigger
        reason: ReportReason,
        /// Latch transition (always `Unchanged` outside alert mode)
        alert: AlertTransition,
    },
}

impl TickOutcome {
    /// Whether a report was emitted
    pub fn is_report(&self) -> bool {
        matches!(self, Self::Reported { .. })
    }
}

/// Analog input monitor
#[derive(Debug)]
pub struct Monitor<S, T, K> {
    config: MonitorConfig,
    settings: MonitorSettings,
    device_name: String,
    reading: Reading,
    detector: ChangeDetector,
    latch: AlertLatch,
    lifecycle: Lifecycle,
    metrics: MonitorMetrics,
    sampler: S,
    timer: T,
    sink: K,
}

impl<S: Sampler, T: Timer, K: ReportSink> Monitor<S, T, K> {
    /// Create a stopped monitor
    pub fn new(
        config: MonitorConfig,
        settings: MonitorSettings,
        sampler: S,
        timer: T,
        sink: K,
    ) -> Self {
        let device_name = full_device_name(&settings.node_name);
        Self {
            config,
            settings,
            device_name,
            reading: Reading::default(),
            detector: ChangeDetector::new(),
            latch: AlertLatch::new(),
            lifecycle: Lifecycle::new(),
            metrics: MonitorMetrics::new(),
            sampler,
            timer,
            sink,
        }
    }

    /// Register with the host and start sampling if requested
    ///
    /// Sampling starts when `start_reading` is set or the configuration
    /// has autostart enabled.
    pub fn init<R: Registry + ?Sized>(
        &mut self,
        registry: &mut R,
        start_reading: bool,
    ) -> RunState {
        registry.register_route(AIN_ROUTE);
        registry.register_device(DeviceEntry {
            kind: DeviceKind::Native,
            index: 0,
            name: self.device_name.clone(),
            route: AIN_ROUTE.to_string(),
        });

        if start_reading || self.config.autostart {
            self.lifecycle
                .start(&mut self.timer, self.config.refresh_ms, true)
        } else {
            self.lifecycle.state()
        }
    }

    /// Deliver a timer tick
    ///
    /// Ticks from a timer other than the armed one are dropped.
    pub fn on_timer(&mut self, handle: TimerHandle) -> Option<TickOutcome> {
        if self.lifecycle.handle() != Some(handle) {
            debug!("Dropping tick from stale timer {:?}", handle);
            self.metrics.record_stale_tick();
            return None;
        }
        Some(self.tick())
    }

    /// Sample, scale and report if the change is significant
    pub fn tick(&mut self) -> TickOutcome {
        let raw = self.sampler.read_raw();
        self.reading = Scaler::from_config(&self.config).convert(raw);
        self.metrics.record_tick();

        let Some(reason) = self.detector.evaluate(self.reading.value, &self.config) else {
            trace!(
                "AIN {} quiet ({} ticks)",
                self.reading.text,
                self.detector.ticks()
            );
            return TickOutcome::Quiet {
                ticks: self.detector.ticks(),
            };
        };

        debug!("AIN report {} ({})", self.reading.text, reason.as_str());
        self.metrics.record_report(&reason);

        let alert = match self.config.destination {
            Destination::ThresholdAlert => {
                let transition = self.latch.evaluate(self.reading.value, &self.config);
                self.metrics.record_alert(transition);
                if transition == AlertTransition::Raised {
                    self.post_event();
                }
                transition
            }
            Destination::TimeSeries => {
                self.post_event();
                AlertTransition::Unchanged
            }
            Destination::None => AlertTransition::Unchanged,
        };

        self.raise_local_event();
        TickOutcome::Reported { reason, alert }
    }

    /// Answer a request
    ///
    /// Updates are applied before the response is built, even when the
    /// caller reports a fault.
    pub fn handle(&mut self, request: &Request<'_>) -> Result<String> {
        let kind = match request.kind {
            RequestKind::Read => {
                self.metrics.record_request(0, 0);
                ReportKind::Measurement
            }
            RequestKind::Query => {
                self.metrics.record_request(0, 0);
                ReportKind::Config
            }
            RequestKind::Update => {
                self.apply_update(request.body);
                ReportKind::Config
            }
        };

        let response = format_report(&self.context(), kind, request.fault);
        if let Err(e) = &response {
            warn!("AIN response failed: {}", e);
            self.metrics.record_payload_error();
        }
        response
    }

    fn apply_update(&mut self, body: Option<&str>) {
        let update = match body.map(ConfigUpdate::parse) {
            Some(Ok(update)) => update,
            Some(Err(e)) => {
                warn!("Ignoring AIN config request: {}", e);
                self.metrics.record_request(0, 0);
                return;
            }
            None => {
                debug!("AIN config request without body");
                self.metrics.record_request(0, 0);
                return;
            }
        };

        let start = update.apply(&mut self.config);
        self.metrics
            .record_request(update.fields.len(), update.rejected.len());

        if let Some(start) = start {
            self.latch.clear();
            self.lifecycle
                .start(&mut self.timer, self.config.refresh_ms, start);
        }
    }

    fn post_event(&mut self) {
        if !self.settings.webhook.is_enabled() {
            debug!("No webhook host configured, skipping post");
            return;
        }

        match format_report(&self.context(), ReportKind::Event, false) {
            Ok(payload) => {
                self.sink
                    .post(WebhookRequest::new(&self.settings.webhook, payload));
                self.metrics.record_post();
            }
            Err(e) => {
                warn!("AIN webhook payload failed: {}", e);
                self.metrics.record_payload_error();
            }
        }
    }

    fn raise_local_event(&mut self) {
        match format_report(&self.context(), ReportKind::Measurement, false) {
            Ok(payload) => {
                self.sink.raise_event(AIN_ROUTE, &payload);
                self.metrics.record_event();
            }
            Err(e) => {
                warn!("AIN event payload failed: {}", e);
                self.metrics.record_payload_error();
            }
        }
    }

    fn context(&self) -> ReportContext<'_> {
        ReportContext {
            config: &self.config,
            reading: &self.reading,
            device_name: &self.device_name,
            running: self.lifecycle.is_running(),
            api_key: &self.settings.webhook.token,
        }
    }

    /// Current configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Static settings
    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Full device name
    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Latest reading
    pub fn reading(&self) -> &Reading {
        &self.reading
    }

    /// Value at the last report
    pub fn last_reported(&self) -> f64 {
        self.detector.last_reported()
    }

    /// Ticks since the last report
    pub fn ticks_since_report(&self) -> u8 {
        self.detector.ticks()
    }

    /// Whether an alert is outstanding
    pub fn is_latched(&self) -> bool {
        self.latch.is_latched()
    }

    /// Sampling state
    pub fn run_state(&self) -> RunState {
        self.lifecycle.state()
    }

    /// Handle of the armed timer
    pub fn timer_handle(&self) -> Option<TimerHandle> {
        self.lifecycle.handle()
    }

    /// Activity counters
    pub fn metrics(&self) -> &MonitorMetrics {
        &self.metrics
    }

    /// Sample source
    pub fn sampler_mut(&mut self) -> &mut S {
        &mut self.sampler
    }

    /// Timer facility
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Report sink
    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Mutable report sink
    pub fn sink_mut(&mut self) -> &mut K {
        &mut self.sink
    }
}
