// AIN Agent - HTTP host for the AIN monitor
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! # AIN Agent
//!
//! Hosts one analog input monitor behind an HTTP API, delivers webhooks
//! and exports Prometheus metrics.
//!
//! ## Usage
//!
//! ```bash
//! # Replay a CSV column, start sampling immediately
//! ain-agent --csv samples.csv --csv-column raw --start
//!
//! # Constant input, persisted config, time-series webhook target
//! ain-agent --raw 512 --config-file ain.cfg \
//!     --webhook-host api.example.com --webhook-path /update --api-key KEY
//! ```

mod driver;
mod error;
mod metrics;
mod replay;
mod sink;
mod timer;

use ain_monitor::{
    load_or_default, ConfigStore, DeviceDirectory, FileConfigStore, FixedSampler, Monitor,
    MonitorConfig, MonitorSettings, RequestKind, Sampler, WebhookConfig, AIN_ROUTE,
};
use axum::{
    extract::{Query, State},
    http::{header::CONTENT_TYPE, StatusCode},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use clap::Parser;
use driver::{Driver, DriverHandle, COMMAND_QUEUE_DEPTH};
use error::AgentError;
use metrics::{encode_metrics, update_from_snapshot};
use replay::CsvSampler;
use serde::{Deserialize, Serialize};
use sink::{AgentSink, EventLog, EventRecord, EVENT_LOG_CAPACITY};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use timer::TokioTimer;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;

/// AIN monitoring agent
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Node name (device name is "<node>-AIN")
    #[arg(short, long, default_value = "node")]
    node: String,

    /// Start sampling even if autostart is disabled
    #[arg(long)]
    start: bool,

    /// Persisted configuration file
    #[arg(long)]
    config_file: Option<PathBuf>,

    /// CSV file to replay raw samples from
    #[arg(short, long)]
    csv: Option<PathBuf>,

    /// CSV column holding raw samples
    #[arg(long, default_value = "raw")]
    csv_column: String,

    /// Constant raw sample when no CSV is given
    #[arg(long, default_value = "0")]
    raw: u32,

    /// Webhook host (empty disables webhooks)
    #[arg(long, default_value = "")]
    webhook_host: String,

    /// Webhook path
    #[arg(long, default_value = "")]
    webhook_path: String,

    /// Use TLS for webhooks
    #[arg(long)]
    webhook_tls: bool,

    /// Webhook basic auth user
    #[arg(long, default_value = "")]
    webhook_user: String,

    /// Webhook basic auth password
    #[arg(long, default_value = "")]
    webhook_password: String,

    /// API key for the time-series service
    #[arg(long, default_value = "")]
    api_key: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn settings(&self) -> MonitorSettings {
        MonitorSettings {
            node_name: self.node.clone(),
            webhook: WebhookConfig {
                tls: self.webhook_tls,
                user: self.webhook_user.clone(),
                password: self.webhook_password.clone(),
                host: self.webhook_host.clone(),
                path: self.webhook_path.clone(),
                token: self.api_key.clone(),
            },
        }
    }

    fn sampler(&self) -> Result<Box<dyn Sampler + Send>, AgentError> {
        match &self.csv {
            Some(path) => Ok(Box::new(CsvSampler::from_path(path, &self.csv_column)?)),
            None => {
                info!("No dataset specified, sampling constant raw value {}", self.raw);
                Ok(Box::new(FixedSampler(self.raw)))
            }
        }
    }
}

/// Application state shared across handlers.
struct AppState {
    driver: DriverHandle,
    events: EventLog,
    devices: Vec<DeviceInfo>,
    start_time: std::time::Instant,
}

/// Registered device, as listed by `/devices`.
#[derive(Debug, Clone, Serialize)]
struct DeviceInfo {
    kind: String,
    index: u32,
    name: String,
    route: String,
}

#[tokio::main]
async fn main() -> Result<(), AgentError> {
    let args = Args::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match args.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("AIN Agent v{}", env!("CARGO_PKG_VERSION"));

    // Load persisted configuration
    let store = args.config_file.clone().map(FileConfigStore::new);
    let config = match &store {
        Some(store) => {
            info!("Config file: {}", store.path().display());
            load_or_default(store)
        }
        None => MonitorConfig::default(),
    };
    let store = store.map(|s| Box::new(s) as Box<dyn ConfigStore + Send>);

    // Wire up the monitor
    let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
    let driver_handle = DriverHandle::new(tx);
    let events = EventLog::new(EVENT_LOG_CAPACITY);

    let mut monitor = Monitor::new(
        config,
        args.settings(),
        args.sampler()?,
        TokioTimer::new(driver_handle.clone()),
        AgentSink::new(events.clone())?,
    );

    let mut directory = DeviceDirectory::new();
    let state = monitor.init(&mut directory, args.start);
    info!(device = %monitor.device_name(), ?state, "Monitor initialized");
    if !args.webhook_host.is_empty() {
        info!(
            "Webhooks to {}://{}{}",
            if args.webhook_tls { "https" } else { "http" },
            args.webhook_host,
            args.webhook_path
        );
    }

    let driver_task = tokio::spawn(Driver::new(monitor, store, rx).run());

    // Create app state
    let devices = directory
        .devices()
        .into_iter()
        .map(|d| DeviceInfo {
            kind: format!("{:?}", d.kind),
            index: d.index,
            name: d.name.clone(),
            route: d.route.clone(),
        })
        .collect();

    let state = Arc::new(AppState {
        driver: driver_handle.clone(),
        events,
        devices,
        start_time: std::time::Instant::now(),
    });

    // Build router
    let app = Router::new()
        .route("/", get(root_handler))
        .route(AIN_ROUTE, get(read_handler).post(update_handler))
        .route("/ain/config", get(query_handler))
        .route("/events", get(events_handler))
        .route("/devices", get(devices_handler))
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    info!("Starting server on http://{}", addr);
    info!("Channel endpoint: http://{}{}", addr, AIN_ROUTE);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    driver_handle.shutdown().await?;
    if let Err(e) = driver_task.await {
        warn!(error = %e, "Monitor driver task failed");
    }

    info!("AIN Agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// `?fault=1` marks the sensor as faulty.
#[derive(Debug, Default, Deserialize)]
struct FaultQuery {
    #[serde(default)]
    fault: u8,
}

impl FaultQuery {
    fn is_fault(&self) -> bool {
        self.fault == 1
    }
}

fn json_response(payload: String) -> impl IntoResponse {
    (StatusCode::OK, [(CONTENT_TYPE, "application/json")], payload)
}

/// Plain measurement read.
async fn read_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FaultQuery>,
) -> Result<impl IntoResponse, AgentError> {
    let payload = state
        .driver
        .request(RequestKind::Read, query.is_fault(), None)
        .await?;
    Ok(json_response(payload))
}

/// Configuration read.
async fn query_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FaultQuery>,
) -> Result<impl IntoResponse, AgentError> {
    let payload = state
        .driver
        .request(RequestKind::Query, query.is_fault(), None)
        .await?;
    Ok(json_response(payload))
}

/// Configuration update; the body is a flat JSON object.
async fn update_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<FaultQuery>,
    body: String,
) -> Result<impl IntoResponse, AgentError> {
    let body = (!body.trim().is_empty()).then_some(body);
    let payload = state
        .driver
        .request(RequestKind::Update, query.is_fault(), body)
        .await?;
    Ok(json_response(payload))
}

/// Recent local events, oldest first.
async fn events_handler(State(state): State<Arc<AppState>>) -> Json<Vec<EventRecord>> {
    Json(state.events.snapshot())
}

/// Registered devices.
async fn devices_handler(State(state): State<Arc<AppState>>) -> Json<Vec<DeviceInfo>> {
    Json(state.devices.clone())
}

/// Metrics handler - returns Prometheus text format.
async fn metrics_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AgentError> {
    let snapshot = state.driver.snapshot().await?;
    update_from_snapshot(&snapshot);
    let metrics = encode_metrics()?;
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, "text/plain; charset=utf-8")],
        metrics,
    ))
}

/// Health check handler.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Status information response.
#[derive(Serialize)]
struct StatusResponse {
    version: String,
    uptime_secs: u64,
    device: String,
    running: bool,
    latched: bool,
    value: String,
    raw: u32,
}

/// Status handler - returns JSON status information.
async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<StatusResponse>, AgentError> {
    let snapshot = state.driver.snapshot().await?;
    Ok(Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        device: snapshot.device_name,
        running: snapshot.running,
        latched: snapshot.latched,
        value: snapshot.text,
        raw: snapshot.raw,
    }))
}

/// Root handler - shows a simple HTML page.
async fn root_handler() -> Html<&'static str> {
    Html(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>AIN Agent</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }
        .endpoints { background: #f8f9fa; padding: 20px; border-radius: 8px; margin: 20px 0; }
        .endpoint { margin: 10px 0; }
        code { background: #e9ecef; padding: 2px 6px; border-radius: 4px; }
    </style>
</head>
<body>
    <h1>AIN Agent</h1>
    <p>Analog input monitor with change detection, hysteresis alerts and webhook delivery.</p>

    <div class="endpoints">
        <h2>Endpoints</h2>
        <div class="endpoint"><code>GET</code> <a href="/ain">/ain</a> - Current measurement (<code>?fault=1</code> reports a sensor fault)</div>
        <div class="endpoint"><code>GET</code> <a href="/ain/config">/ain/config</a> - Current configuration</div>
        <div class="endpoint"><code>POST</code> /ain - Update configuration (JSON body)</div>
        <div class="endpoint"><code>GET</code> <a href="/events">/events</a> - Recent local events</div>
        <div class="endpoint"><code>GET</code> <a href="/devices">/devices</a> - Registered devices</div>
        <div class="endpoint"><code>GET</code> <a href="/metrics">/metrics</a> - Prometheus metrics</div>
        <div class="endpoint"><code>GET</code> <a href="/health">/health</a> - Health check</div>
        <div class="endpoint"><code>GET</code> <a href="/status">/status</a> - Status information (JSON)</div>
    </div>

    <h2>Configuration keys</h2>
    <p><code>Auto</code>, <code>Refresh</code> (s), <code>Each</code>, <code>Thr</code>, <code>ScK</code>, <code>ScY</code>,
    <code>Name</code>, <code>Low</code>, <code>Hi</code>, <code>Post_type</code> (0 none, 1 time-series, 2 alert), <code>Dec</code>,
    <code>Start</code> (1 start, 0 stop)</p>
</body>
</html>"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        let args = Args::parse_from(["ain-agent"]);
        assert_eq!(args.port, 8080);
        assert_eq!(args.node, "node");
        assert!(!args.start);
        assert!(!args.settings().webhook.is_enabled());
    }

    #[test]
    fn test_args_webhook() {
        let args = Args::parse_from([
            "ain-agent",
            "--webhook-host",
            "maker.example.com",
            "--webhook-tls",
            "--webhook-user",
            "admin",
            "--api-key",
            "KEY",
        ]);
        let settings = args.settings();
        assert!(settings.webhook.is_enabled());
        assert_eq!(settings.webhook.port(), 443);
        assert_eq!(settings.webhook.user, "admin");
        assert_eq!(settings.webhook.token, "KEY");
    }

    #[test]
    fn test_constant_sampler() {
        let args = Args::parse_from(["ain-agent", "--raw", "900"]);
        let mut sampler = args.sampler().unwrap();
        assert_eq!(sampler.read_raw(), 900);
    }

    #[test]
    fn test_fault_query() {
        assert!(FaultQuery { fault: 1 }.is_fault());
        assert!(!FaultQuery::default().is_fault());
    }
}
