// AIN Agent - HTTP host for the AIN monitor
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Monitor driver task.
//!
//! The monitor is owned by a single task that consumes a command queue.
//! Timer tasks and HTTP handlers only ever talk to it through a
//! [`DriverHandle`], so ticks and requests are strictly serialized.

use crate::error::AgentError;
use ain_monitor::{
    persist, ConfigStore, Monitor, MonitorError, MonitorMetrics, ReportSink, Request,
    RequestKind, RunState, Sampler, Timer, TimerHandle,
};
use std::ops::ControlFlow;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Depth of the command queue.
pub const COMMAND_QUEUE_DEPTH: usize = 256;

/// Work for the driver.
#[derive(Debug)]
pub enum Command {
    /// A timer fired.
    Tick(TimerHandle),
    /// An inbound request.
    Request {
        kind: RequestKind,
        fault: bool,
        body: Option<String>,
        reply: oneshot::Sender<Result<String, MonitorError>>,
    },
    /// Read the current state.
    Snapshot(oneshot::Sender<Snapshot>),
    /// Stop the driver, dropping the monitor and its timers.
    Shutdown,
}

/// Point-in-time view of the monitor.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub device_name: String,
    pub raw: u32,
    pub value: f64,
    pub text: String,
    pub running: bool,
    pub latched: bool,
    pub metrics: MonitorMetrics,
}

/// Cloneable sender side of the driver.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    tx: mpsc::Sender<Command>,
}

impl DriverHandle {
    pub fn new(tx: mpsc::Sender<Command>) -> Self {
        Self { tx }
    }

    /// Deliver a timer tick.
    pub async fn tick(&self, handle: TimerHandle) -> Result<(), AgentError> {
        self.tx
            .send(Command::Tick(handle))
            .await
            .map_err(|_| AgentError::DriverGone)
    }

    /// Run a request and wait for the response payload.
    pub async fn request(
        &self,
        kind: RequestKind,
        fault: bool,
        body: Option<String>,
    ) -> Result<String, AgentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Request {
                kind,
                fault,
                body,
                reply,
            })
            .await
            .map_err(|_| AgentError::DriverGone)?;
        let result = rx.await.map_err(|_| AgentError::DriverGone)?;
        Ok(result?)
    }

    /// Read the current state.
    pub async fn snapshot(&self) -> Result<Snapshot, AgentError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Command::Snapshot(reply))
            .await
            .map_err(|_| AgentError::DriverGone)?;
        rx.await.map_err(|_| AgentError::DriverGone)
    }

    /// Ask the driver to stop after the commands already queued.
    pub async fn shutdown(&self) -> Result<(), AgentError> {
        self.tx
            .send(Command::Shutdown)
            .await
            .map_err(|_| AgentError::DriverGone)
    }
}

/// Owns the monitor and the optional config store.
pub struct Driver<S, T, K> {
    monitor: Monitor<S, T, K>,
    store: Option<Box<dyn ConfigStore + Send>>,
    rx: mpsc::Receiver<Command>,
}

impl<S: Sampler, T: Timer, K: ReportSink> Driver<S, T, K> {
    pub fn new(
        monitor: Monitor<S, T, K>,
        store: Option<Box<dyn ConfigStore + Send>>,
        rx: mpsc::Receiver<Command>,
    ) -> Self {
        Self { monitor, store, rx }
    }

    /// Process commands until a [`Command::Shutdown`] arrives.
    ///
    /// A `TokioTimer` owned by the monitor keeps a handle, so the queue
    /// does not close on its own while the driver runs.
    pub async fn run(mut self) {
        info!(device = %self.monitor.device_name(), "Monitor driver started");

        while let Some(command) = self.rx.recv().await {
            if self.dispatch(command).is_break() {
                break;
            }
        }

        info!("Monitor driver stopped");
    }

    fn dispatch(&mut self, command: Command) -> ControlFlow<()> {
        match command {
            Command::Tick(handle) => {
                if let Some(outcome) = self.monitor.on_timer(handle) {
                    debug!(?outcome, "Tick processed");
                }
            }
            Command::Request {
                kind,
                fault,
                body,
                reply,
            } => {
                let request = Request {
                    kind,
                    fault,
                    body: body.as_deref(),
                };
                let result = self.monitor.handle(&request);
                if kind == RequestKind::Update {
                    self.save_config();
                }
                if reply.send(result).is_err() {
                    debug!("Requester went away before the response");
                }
            }
            Command::Snapshot(reply) => {
                if reply.send(self.snapshot()).is_err() {
                    debug!("Requester went away before the snapshot");
                }
            }
            Command::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn save_config(&mut self) {
        let Some(store) = self.store.as_mut() else {
            return;
        };
        match persist(store.as_mut(), self.monitor.config()) {
            Ok(()) => debug!("Config saved"),
            Err(e) => warn!(error = %e, "Failed to save config"),
        }
    }

    fn snapshot(&self) -> Snapshot {
        let reading = self.monitor.reading();
        Snapshot {
            device_name: self.monitor.device_name().to_string(),
            raw: reading.raw,
            value: reading.value,
            text: reading.text.clone(),
            running: self.monitor.run_state() == RunState::Running,
            latched: self.monitor.is_latched(),
            metrics: self.monitor.metrics().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ain_monitor::{
        load_or_default, DeviceDirectory, FileConfigStore, FixedSampler, ManualTimer,
        MemorySink, MonitorConfig, MonitorSettings,
    };
    use tempfile::tempdir;

    fn spawn_driver(store: Option<Box<dyn ConfigStore + Send>>) -> (DriverHandle, TimerHandle) {
        let mut monitor = Monitor::new(
            MonitorConfig::default(),
            MonitorSettings::with_node_name("test"),
            FixedSampler(321),
            ManualTimer::new(),
            MemorySink::new(),
        );
        monitor.init(&mut DeviceDirectory::new(), true);
        let armed = monitor.timer_handle().unwrap();

        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        tokio::spawn(Driver::new(monitor, store, rx).run());
        (DriverHandle::new(tx), armed)
    }

    #[tokio::test]
    async fn test_tick_then_read() {
        let (handle, armed) = spawn_driver(None);
        handle.tick(armed).await.unwrap();

        let response = handle
            .request(RequestKind::Read, false, None)
            .await
            .unwrap();
        assert!(response.contains(r#""ValueRaw":321"#));

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.device_name, "test-AIN");
        assert_eq!(snapshot.metrics.ticks, 1);
        assert_eq!(snapshot.text, "321.000");
        assert!(snapshot.running);
    }

    #[tokio::test]
    async fn test_stale_tick_counted() {
        let (handle, armed) = spawn_driver(None);
        handle
            .request(RequestKind::Update, false, Some(r#"{"Start": 1}"#.to_string()))
            .await
            .unwrap();
        handle.tick(armed).await.unwrap();

        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.metrics.stale_ticks, 1);
        assert_eq!(snapshot.metrics.ticks, 0);
    }

    #[tokio::test]
    async fn test_update_is_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ain.cfg");
        let store = FileConfigStore::new(&path);
        let (handle, _) = spawn_driver(Some(Box::new(store)));

        handle
            .request(
                RequestKind::Update,
                false,
                Some(r#"{"Each": 5, "Name": "tank"}"#.to_string()),
            )
            .await
            .unwrap();

        let reloaded = load_or_default(&FileConfigStore::new(&path));
        assert_eq!(reloaded.report_every, 5);
        assert_eq!(reloaded.label, "tank");
    }

    #[tokio::test]
    async fn test_payload_error_is_returned() {
        let (handle, armed) = spawn_driver(None);
        handle
            .request(
                RequestKind::Update,
                false,
                Some(r#"{"ScK": 1e308, "ScY": 1e308}"#.to_string()),
            )
            .await
            .unwrap();
        handle.tick(armed).await.unwrap();

        let err = handle
            .request(RequestKind::Read, false, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Monitor(MonitorError::Payload(_))));
    }

    #[tokio::test]
    async fn test_dropped_snapshot_reply_keeps_driver_alive() {
        let (handle, armed) = spawn_driver(None);
        let (reply, rx) = oneshot::channel();
        drop(rx);
        handle.tx.send(Command::Snapshot(reply)).await.unwrap();

        handle.tick(armed).await.unwrap();
        let snapshot = handle.snapshot().await.unwrap();
        assert_eq!(snapshot.metrics.ticks, 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_driver() {
        let mut monitor = Monitor::new(
            MonitorConfig::default(),
            MonitorSettings::with_node_name("test"),
            FixedSampler(1),
            ManualTimer::new(),
            MemorySink::new(),
        );
        monitor.init(&mut DeviceDirectory::new(), true);
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let handle = DriverHandle::new(tx);
        let task = tokio::spawn(Driver::new(monitor, None, rx).run());

        handle.shutdown().await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .unwrap()
            .unwrap();

        // The handle outlives the driver; further commands fail cleanly.
        assert!(matches!(
            handle.snapshot().await,
            Err(AgentError::DriverGone)
        ));
    }
}
