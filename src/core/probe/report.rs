//! Diagnostics aggregation and the final connectivity report
//!
//! The aggregator is append-only and lives for one invocation. `finish`
//! consumes it and returns a `ConnectivityReport`, which has no mutating API.
//! Only endpoint paths, auth-mode names, status codes, scrubbed error text and
//! presence flags reach the report.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use crate::core::probe::classifier::{Assessment, Verdict};
use crate::core::probe::secret::Presence;
use crate::core::probe::types::{
    AttemptOutcome, AuthMode, RateLimitSnapshot, ServiceDescriptor, SkippedCandidate,
};
use crate::core::probe::url::UrlError;

/// One entry of the report's `errors` list
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportError {
    pub endpoint: String,
    pub error: String,
}

/// Final, credential-safe result of one probe invocation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityReport {
    service: String,
    ok: bool,
    platform_reachable: bool,
    service_reachable: bool,
    verdict: Verdict,
    detected_base: Option<String>,
    tried_endpoints: Vec<String>,
    status_codes: BTreeMap<String, Option<u16>>,
    rate_limit: Option<RateLimitSnapshot>,
    auth_mode_tried: Vec<AuthMode>,
    errors: Vec<ReportError>,
    skipped: Vec<SkippedCandidate>,
    duration_ms: u64,
    env: BTreeMap<String, Presence>,
}

impl ConnectivityReport {
    /// Report for a service without a base origin; no attempt was made
    pub fn not_configured(
        descriptor: &ServiceDescriptor,
        env: BTreeMap<String, Presence>,
        duration: Duration,
    ) -> Self {
        let error = format!("not configured: {} is not set", descriptor.env_var("BASE_URL"));
        Self::without_attempts(descriptor, Verdict::NotConfigured, error, env, duration)
    }

    /// Report for a base origin that cannot be probed; no attempt was made
    ///
    /// The message names the variable and the parse problem, never its value.
    pub fn invalid_config(
        descriptor: &ServiceDescriptor,
        problem: &UrlError,
        env: BTreeMap<String, Presence>,
        duration: Duration,
    ) -> Self {
        let error = format!(
            "invalid configuration: {}: {}",
            descriptor.env_var("BASE_URL"),
            problem
        );
        Self::without_attempts(descriptor, Verdict::InvalidConfig, error, env, duration)
    }

    fn without_attempts(
        descriptor: &ServiceDescriptor,
        verdict: Verdict,
        error: String,
        env: BTreeMap<String, Presence>,
        duration: Duration,
    ) -> Self {
        Self {
            service: descriptor.name.clone(),
            ok: false,
            platform_reachable: false,
            service_reachable: false,
            verdict,
            detected_base: None,
            tried_endpoints: Vec::new(),
            status_codes: BTreeMap::new(),
            rate_limit: None,
            auth_mode_tried: Vec::new(),
            errors: vec![ReportError {
                endpoint: "config".to_string(),
                error,
            }],
            skipped: Vec::new(),
            duration_ms: duration.as_millis() as u64,
            env,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn ok(&self) -> bool {
        self.ok
    }

    pub fn platform_reachable(&self) -> bool {
        self.platform_reachable
    }

    pub fn service_reachable(&self) -> bool {
        self.service_reachable
    }

    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    pub fn detected_base(&self) -> Option<&str> {
        self.detected_base.as_deref()
    }

    pub fn tried_endpoints(&self) -> &[String] {
        &self.tried_endpoints
    }

    pub fn status_codes(&self) -> &BTreeMap<String, Option<u16>> {
        &self.status_codes
    }

    pub fn rate_limit(&self) -> Option<&RateLimitSnapshot> {
        self.rate_limit.as_ref()
    }

    pub fn auth_mode_tried(&self) -> &[AuthMode] {
        &self.auth_mode_tried
    }

    pub fn errors(&self) -> &[ReportError] {
        &self.errors
    }

    pub fn skipped(&self) -> &[SkippedCandidate] {
        &self.skipped
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn env(&self) -> &BTreeMap<String, Presence> {
        &self.env
    }
}

/// Append-only accumulator for one invocation
#[derive(Debug)]
pub struct DiagnosticsAggregator {
    service: String,
    started: Instant,
    tried_endpoints: Vec<String>,
    status_codes: BTreeMap<String, Option<u16>>,
    rate_limit: Option<RateLimitSnapshot>,
    auth_mode_tried: Vec<AuthMode>,
    errors: Vec<ReportError>,
    skipped: Vec<SkippedCandidate>,
}

impl DiagnosticsAggregator {
    pub fn new(service: &str, started: Instant) -> Self {
        Self {
            service: service.to_string(),
            started,
            tried_endpoints: Vec::new(),
            status_codes: BTreeMap::new(),
            rate_limit: None,
            auth_mode_tried: Vec::new(),
            errors: Vec::new(),
            skipped: Vec::new(),
        }
    }

    pub fn record_skipped(&mut self, skipped: &SkippedCandidate) {
        self.skipped.push(skipped.clone());
    }

    /// Record one Prober invocation
    pub fn record(&mut self, outcome: &AttemptOutcome) {
        let label = outcome.label();
        self.tried_endpoints.push(label.clone());
        self.status_codes.insert(label.clone(), outcome.status);

        if !outcome.endpoint.is_root() {
            self.auth_mode_tried.push(outcome.auth_mode);
        }

        if let Some(snapshot) = &outcome.rate_limit {
            self.rate_limit = Some(snapshot.clone());
        }

        if let Some(error) = &outcome.error {
            self.errors.push(ReportError {
                endpoint: label,
                error: format!("{}: {}", error.kind, error.message),
            });
        } else if let Some(status) = outcome.status {
            // A non-2xx root still proves the platform answers
            if !outcome.endpoint.is_root() && !(200..300).contains(&status) {
                self.errors.push(ReportError {
                    endpoint: label,
                    error: format!("HTTP {}", status),
                });
            }
        }
    }

    /// Record a plan-level problem not tied to one attempt
    pub fn record_error(&mut self, endpoint: &str, error: String) {
        self.errors.push(ReportError {
            endpoint: endpoint.to_string(),
            error,
        });
    }

    /// Number of Prober invocations recorded so far
    pub fn attempts(&self) -> usize {
        self.tried_endpoints.len()
    }

    pub fn finish(
        self,
        assessment: &Assessment,
        env: BTreeMap<String, Presence>,
        finished: Instant,
    ) -> ConnectivityReport {
        ConnectivityReport {
            service: self.service,
            ok: assessment.service_reachable,
            platform_reachable: assessment.platform_reachable,
            service_reachable: assessment.service_reachable,
            verdict: assessment.verdict,
            detected_base: assessment.detected_base.clone(),
            tried_endpoints: self.tried_endpoints,
            status_codes: self.status_codes,
            rate_limit: self.rate_limit,
            auth_mode_tried: self.auth_mode_tried,
            errors: self.errors,
            skipped: self.skipped,
            duration_ms: finished.saturating_duration_since(self.started).as_millis() as u64,
            env,
        }
    }
}
