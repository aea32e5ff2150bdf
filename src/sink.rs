// AIN Monitor - Analog input monitoring
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Report sinks
//!
//! A sink receives local events and outgoing webhook requests. Both are
//! fire-and-forget: the monitor never waits for, nor looks at, the outcome.

use crate::config::WebhookConfig;

/// Basic authentication pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    /// User name
    pub user: String,
    /// Password
    pub password: String,
}

/// One outgoing webhook POST
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookRequest {
    /// Use TLS
    pub use_tls: bool,
    /// Basic auth, when a user is configured
    pub credentials: Option<Credentials>,
    /// Target host
    pub host: String,
    /// Target port
    pub port: u16,
    /// Request path
    pub path: String,
    /// JSON body
    pub payload: String,
}

impl WebhookRequest {
    /// Build a request for the configured target
    pub fn new(webhook: &WebhookConfig, payload: String) -> Self {
        let credentials = (!webhook.user.is_empty()).then(|| Credentials {
            user: webhook.user.clone(),
            password: webhook.password.clone(),
        });

        Self {
            use_tls: webhook.tls,
            credentials,
            host: webhook.host.clone(),
            port: webhook.port(),
            path: webhook.path.clone(),
            payload,
        }
    }

    /// Full request URL
    pub fn url(&self) -> String {
        let scheme = if self.use_tls { "https" } else { "http" };
        let path = self.path.trim_start_matches('/');
        format!("{}://{}:{}/{}", scheme, self.host, self.port, path)
    }
}

/// Destination for everything the monitor emits
pub trait ReportSink {
    /// Publish a local event on a route
    fn raise_event(&mut self, route: &str, payload: &str);

    /// Send a webhook request
    fn post(&mut self, request: WebhookRequest);
}

/// In-memory sink for testing
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Vec<(String, String)>,
    posts: Vec<WebhookRequest>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Events raised so far, as `(route, payload)`
    pub fn events(&self) -> &[(String, String)] {
        &self.events
    }

    /// Webhook requests sent so far
    pub fn posts(&self) -> &[WebhookRequest] {
        &self.posts
    }

    /// Drop everything recorded
    pub fn clear(&mut self) {
        self.events.clear();
        self.posts.clear();
    }
}

impl ReportSink for MemorySink {
    fn raise_event(&mut self, route: &str, payload: &str) {
        self.events.push((route.to_string(), payload.to_string()));
    }

    fn post(&mut self, request: WebhookRequest) {
        self.posts.push(request);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn webhook(tls: bool, user: &str) -> WebhookConfig {
        WebhookConfig {
            tls,
            user: user.to_string(),
            password: "secret".to_string(),
            host: "hooks.example.com".to_string(),
            path: "/trigger/ain".to_string(),
            token: String::new(),
        }
    }

    #[test]
    fn test_request_without_auth() {
        let request = WebhookRequest::new(&webhook(false, ""), "{}".to_string());
        assert_eq!(request.credentials, None);
        assert_eq!(request.port, 80);
        assert_eq!(request.url(), "http://hooks.example.com:80/trigger/ain");
    }

    #[test]
    fn test_request_with_tls_and_auth() {
        let request = WebhookRequest::new(&webhook(true, "admin"), "{}".to_string());
        assert_eq!(request.port, 443);
        assert_eq!(
            request.credentials,
            Some(Credentials {
                user: "admin".to_string(),
                password: "secret".to_string()
            })
        );
        assert!(request.url().starts_with("https://"));
    }

    #[test]
    fn test_memory_sink_records() {
        let mut sink = MemorySink::new();
        sink.raise_event("/ain", "{\"a\":1}");
        sink.post(WebhookRequest::new(&webhook(false, ""), "x".to_string()));
        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.events()[0].0, "/ain");
        assert_eq!(sink.posts()[0].payload, "x");
        sink.clear();
        assert!(sink.events().is_empty());
        assert!(sink.posts().is_empty());
    }
}
