//! Route-timeout resolution.
//!
//! # Responsibilities
//! - Match request paths against ordered prefix rules
//! - Resolve the effective read timeout for a request
//!
//! # Design Decisions
//! - Prefixes match literally; "/v1/models" matches "/v1/models/llama3"
//!   but also "/v1/modelsomething" — no trailing-slash collapsing
//! - A matching rule without an override does not stop the scan
//! - No error cases: resolution always yields a duration

use std::time::Duration;

use crate::config::RouteRule;

/// Immutable table of route-timeout rules, built once at startup.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
    default_timeout: Duration,
}

impl RouteTable {
    /// Build a route table from configured rules and the upstream default.
    pub fn new(rules: Vec<RouteRule>, default_timeout: Duration) -> Self {
        Self { rules, default_timeout }
    }

    /// Resolve the read timeout for a request path.
    ///
    /// Rules are scanned in configured order; the first rule whose path is
    /// a literal prefix of `path` and carries an override governs. If no
    /// rule matches (or matching rules carry no override), the upstream
    /// default applies.
    pub fn resolve_timeout(&self, path: &str) -> Duration {
        for rule in &self.rules {
            if path.starts_with(&rule.path) {
                if let Some(timeout) = rule.timeout() {
                    return timeout;
                }
            }
        }
        self.default_timeout
    }

    /// The default timeout applied when no rule overrides it.
    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}
