// AIN Agent - HTTP host for the AIN monitor
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Periodic timers on the tokio runtime.
//!
//! Each armed timer is a task that feeds `Tick(handle)` commands to the
//! driver. Stopping a timer aborts its task; a tick already queued still
//! reaches the driver, which drops it as stale.

use crate::driver::DriverHandle;
use ain_monitor::{Timer, TimerHandle};
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::debug;

/// Timer facility backed by tokio tasks.
pub struct TokioTimer {
    driver: DriverHandle,
    next_id: u64,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
}

impl TokioTimer {
    pub fn new(driver: DriverHandle) -> Self {
        Self {
            driver,
            next_id: 0,
            tasks: HashMap::new(),
        }
    }

    /// Number of timers currently armed.
    pub fn active(&self) -> usize {
        self.tasks.len()
    }
}

impl Timer for TokioTimer {
    fn start(&mut self, period: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let driver = self.driver.clone();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if driver.tick(handle).await.is_err() {
                    break;
                }
            }
        });

        debug!(?handle, ?period, "Timer armed");
        self.tasks.insert(handle, task);
        handle
    }

    fn stop(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
            debug!(?handle, "Timer stopped");
        }
    }
}

impl Drop for TokioTimer {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
