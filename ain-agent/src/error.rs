// AIN Agent - HTTP host for the AIN monitor
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Agent error type.

use crate::replay::ReplayError;
use ain_monitor::MonitorError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised by the agent.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Monitor error: {0}")]
    Monitor(#[from] MonitorError),

    #[error("Replay error: {0}")]
    Replay(#[from] ReplayError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Monitor driver is not running")]
    DriverGone,
}

impl AgentError {
    /// HTTP status reported for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            AgentError::Monitor(MonitorError::InvalidRequest(_))
            | AgentError::Monitor(MonitorError::InvalidField { .. }) => StatusCode::BAD_REQUEST,
            AgentError::DriverGone => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Request failed");
        (self.status(), self.to_string()).into_response()
    }
}
