// AIN Agent - HTTP host for the AIN monitor
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Report delivery.
//!
//! Local events go to a bounded in-memory log served at `/events`.
//! Webhook requests are sent by spawned tasks; the outcome is logged and
//! counted, never retried and never reported back to the monitor.

use crate::metrics::record_webhook_result;
use ain_monitor::{ReportSink, WebhookRequest};
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use serde_json::value::RawValue;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Number of local events kept for `/events`.
pub const EVENT_LOG_CAPACITY: usize = 64;

/// HTTP request timeout for a single webhook delivery.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One local event.
#[derive(Debug, Clone, Serialize)]
pub struct EventRecord {
    pub seq: u64,
    pub route: String,
    pub payload: Box<RawValue>,
}

#[derive(Debug, Default)]
struct EventLogInner {
    next_seq: u64,
    events: VecDeque<EventRecord>,
}

/// Bounded, shareable log of local events.
#[derive(Debug, Clone)]
pub struct EventLog {
    inner: Arc<Mutex<EventLogInner>>,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(EventLogInner::default())),
            capacity,
        }
    }

    /// Append an event, dropping the oldest when full.
    pub fn push(&self, route: &str, payload: &str) {
        let payload = match RawValue::from_string(payload.to_string()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "Dropping event with invalid JSON payload");
                return;
            }
        };

        let Ok(mut inner) = self.inner.lock() else {
            warn!("Event log lock poisoned");
            return;
        };
        inner.next_seq += 1;
        let seq = inner.next_seq;
        if inner.events.len() == self.capacity {
            inner.events.pop_front();
        }
        inner.events.push_back(EventRecord {
            seq,
            route: route.to_string(),
            payload,
        });
    }

    /// Events currently held, oldest first.
    pub fn snapshot(&self) -> Vec<EventRecord> {
        self.inner
            .lock()
            .map(|inner| inner.events.iter().cloned().collect())
            .unwrap_or_default()
    }
}

/// Sink used by the agent.
pub struct AgentSink {
    events: EventLog,
    client: reqwest::Client,
}

impl AgentSink {
    pub fn new(events: EventLog) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { events, client })
    }
}

impl ReportSink for AgentSink {
    fn raise_event(&mut self, route: &str, payload: &str) {
        info!(route, payload, "AIN event");
        self.events.push(route, payload);
    }

    fn post(&mut self, request: WebhookRequest) {
        let client = self.client.clone();
        tokio::spawn(async move {
            let url = request.url();
            let result = deliver(&client, request).await;
            match &result {
                Ok(status) => debug!(url = %url, status, "Webhook delivered"),
                Err(e) => warn!(url = %url, error = %e, "Webhook delivery failed"),
            }
            record_webhook_result(result.is_ok());
        });
    }
}

async fn deliver(client: &reqwest::Client, request: WebhookRequest) -> Result<u16, reqwest::Error> {
    let mut builder = client
        .post(request.url())
        .header(CONTENT_TYPE, "application/json")
        .body(request.payload);
    if let Some(credentials) = request.credentials {
        builder = builder.basic_auth(credentials.user, Some(credentials.password));
    }

    let response = builder.send().await?.error_for_status()?;
    Ok(response.status().as_u16())
}
