// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Sampling timer lifecycle
//!
//! At most one periodic timer is armed at any time. Every (re)start cancels
//! the previous timer first, so a refresh change takes effect on the next
//! start and never leaves two timers running.

use log::info;
use std::time::Duration;

/// Identifies one armed timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerHandle(pub u64);

/// Timer facility provided by the host
pub trait Timer {
    /// Arm a periodic timer
    fn start(&mut self, period: Duration) -> TimerHandle;

    /// Cancel a timer; unknown handles are ignored
    fn stop(&mut self, handle: TimerHandle);
}

/// Timer that only records what was asked of it
///
/// Ticks are delivered by the caller, which makes tests deterministic.
#[derive(Debug, Default)]
pub struct ManualTimer {
    next_id: u64,
    armed: Vec<(TimerHandle, Duration)>,
    stopped: Vec<TimerHandle>,
}

impl ManualTimer {
    /// Create a timer with nothing armed
    pub fn new() -> Self {
        Self::default()
    }

    /// Timers currently armed
    pub fn armed(&self) -> &[(TimerHandle, Duration)] {
        &self.armed
    }

    /// Every handle that was cancelled
    pub fn stopped(&self) -> &[TimerHandle] {
        &self.stopped
    }

    /// Handle of the most recently armed timer still running
    pub fn current(&self) -> Option<TimerHandle> {
        self.armed.last().map(|(handle, _)| *handle)
    }

    /// Total number of timers ever armed
    pub fn started_count(&self) -> u64 {
        self.next_id
    }
}

impl Timer for ManualTimer {
    fn start(&mut self, period: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.armed.push((handle, period));
        handle
    }

    fn stop(&mut self, handle: TimerHandle) {
        let before = self.armed.len();
        self.armed.retain(|(h, _)| *h != handle);
        if self.armed.len() != before {
            self.stopped.push(handle);
        }
    }
}

/// Whether the channel is sampling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// No timer armed
    Stopped,
    /// Timer armed
    Running,
}

/// Owns the single sampling timer
#[derive(Debug, Default)]
pub struct Lifecycle {
    handle: Option<TimerHandle>,
}

impl Lifecycle {
    /// Create a stopped lifecycle
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any running timer, then arm a new one if allowed
    ///
    /// A timer is armed only when `start` is set and `refresh_ms` is
    /// non-zero.
    pub fn start<T: Timer + ?Sized>(
        &mut self,
        timer: &mut T,
        refresh_ms: u32,
        start: bool,
    ) -> RunState {
        self.stop(timer);

        if !start || refresh_ms == 0 {
            info!("AIN sampling stopped");
            return RunState::Stopped;
        }

        let handle = timer.start(Duration::from_millis(u64::from(refresh_ms)));
        info!("AIN sampling every {} ms ({:?})", refresh_ms, handle);
        self.handle = Some(handle);
        RunState::Running
    }

    /// Cancel the running timer, if any
    pub fn stop<T: Timer + ?Sized>(&mut self, timer: &mut T) {
        if let Some(handle) = self.handle.take() {
            timer.stop(handle);
        }
    }

    /// Handle of the armed timer
    pub fn handle(&self) -> Option<TimerHandle> {
        self.handle
    }

    /// Whether a timer is armed
    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Current state
    pub fn state(&self) -> RunState {
        if self.is_running() {
            RunState::Running
        } else {
            RunState::Stopped
        }
    }
}
