//! Registration report - a snapshot of what `build()` wired up.
//!
//! Lists every request type with its handler and decorator chain, and every
//! notification key with its subscribers. Useful for startup logs and for
//! asserting wiring in tests.
//!
//! # Example
//!
//! ```
//! use mediator_builder::report::RegistrationReport;
//!
//! let mut report = RegistrationReport::new();
//! report.add_request("app::Ping", "app::Pong", "app::PingHandler", vec!["logging".into(), "handler".into()]);
//! report.add_subscriber("app::Note", "app::NoteHandler");
//!
//! let json = report.to_json();
//! assert!(json.contains("app::PingHandler"));
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

/// Route of one request type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestRoute {
    /// Response type name.
    pub response: String,
    /// Innermost handler type name.
    pub handler: String,
    /// Link keys from outermost decorator to the handler.
    pub chain: Vec<String>,
}

/// Snapshot of the finalised registrations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RegistrationReport {
    /// Routes by request type name.
    pub requests: BTreeMap<String, RequestRoute>,
    /// Subscriber type names by notification (or view) type name.
    pub notifications: BTreeMap<String, Vec<String>>,
}

impl RegistrationReport {
    /// Create an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the route of a request type.
    pub fn add_request(&mut self, request: &str, response: &str, handler: &str, chain: Vec<String>) {
        self.requests.insert(
            request.to_string(),
            RequestRoute {
                response: response.to_string(),
                handler: handler.to_string(),
                chain,
            },
        );
    }

    /// Record one subscriber of a notification.
    pub fn add_subscriber(&mut self, notification: &str, handler: &str) {
        self.notifications
            .entry(notification.to_string())
            .or_default()
            .push(handler.to_string());
    }

    /// Get the route of a request type by name.
    pub fn get_request(&self, request: &str) -> Option<&RequestRoute> {
        self.requests.get(request)
    }

    /// Get the subscribers of a notification by name.
    pub fn get_subscribers(&self, notification: &str) -> Option<&[String]> {
        self.notifications.get(notification).map(|v| v.as_slice())
    }

    /// Check if nothing was registered.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty() && self.notifications.is_empty()
    }

    /// Render the report as JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("JSON serialization should not fail")
    }

    /// Render the report as indented JSON.
    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).expect("JSON serialization should not fail")
    }
}
