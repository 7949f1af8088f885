//! Reachability classification
//!
//! A pure function of the outcomes collected so far. The engine calls
//! `assess` after every attempt and stops the plan when `stop` is set.
//!
//! | Observation (non-root endpoint)  | Effect                                         |
//! |----------------------------------|------------------------------------------------|
//! | 2xx                              | service reachable, detected base, **stop**     |
//! | 401 / 403                        | unauthenticated, detected base recorded        |
//! | 429                              | rate limited, detected base recorded           |
//! | 404                              | endpoint missing, no detected base             |
//! | 5xx                              | service error                                  |
//!
//! Any HTTP response at all marks the platform reachable. A root attempt
//! that fails at the network layer stops the plan: the host is not
//! answering. A root timeout does not; the service path may still answer.

use serde::Serialize;
use std::fmt;

use crate::core::probe::types::{AttemptErrorKind, AttemptOutcome};
use crate::core::probe::url::detected_base_url;

/// Overall classification, strongest signal wins
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// No base origin configured, nothing attempted
    NotConfigured,
    /// Base origin set but unusable, nothing attempted
    InvalidConfig,
    /// No HTTP response from any attempt
    Unreachable,
    /// Only the root answered usefully
    PlatformOnly,
    /// Service endpoints answered 404
    EndpointMissing,
    /// Service endpoints answered 5xx
    ServiceError,
    /// Service endpoints exist but rejected every credential tried
    Unauthenticated,
    /// Service endpoints answered 429
    RateLimited,
    /// A service endpoint answered 2xx
    Reachable,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::NotConfigured => "not_configured",
            Verdict::InvalidConfig => "invalid_config",
            Verdict::Unreachable => "unreachable",
            Verdict::PlatformOnly => "platform_only",
            Verdict::EndpointMissing => "endpoint_missing",
            Verdict::ServiceError => "service_error",
            Verdict::Unauthenticated => "unauthenticated",
            Verdict::RateLimited => "rate_limited",
            Verdict::Reachable => "reachable",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// First 2xx on a service endpoint; more attempts cannot improve the verdict
    ServiceReachable,
    /// The root attempt failed at the network layer
    RootUnreachable,
}

/// Verdict for the outcomes seen so far
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub verdict: Verdict,
    pub platform_reachable: bool,
    pub service_reachable: bool,
    pub detected_base: Option<String>,
    pub stop: Option<StopReason>,
}

#[derive(Debug, Clone)]
pub struct ReachabilityClassifier {
    base_url: String,
}

impl ReachabilityClassifier {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
        }
    }

    pub fn assess(&self, outcomes: &[AttemptOutcome]) -> Assessment {
        let mut assessment = Assessment {
            verdict: Verdict::Unreachable,
            platform_reachable: false,
            service_reachable: false,
            detected_base: None,
            stop: None,
        };

        let mut denied = false;
        let mut throttled = false;
        let mut server_error = false;
        let mut missing = false;

        for outcome in outcomes {
            if outcome.status.is_some() {
                assessment.platform_reachable = true;
            }

            if outcome.endpoint.is_root() {
                if outcome.error_kind() == Some(AttemptErrorKind::Network) {
                    assessment.stop = Some(StopReason::RootUnreachable);
                }
                continue;
            }

            match outcome.status {
                Some(200..=299) => {
                    assessment.service_reachable = true;
                    assessment.detected_base = self.detected_base(outcome);
                    assessment.stop = Some(StopReason::ServiceReachable);
                    break;
                }
                Some(401) | Some(403) => {
                    denied = true;
                    self.record_base(&mut assessment, outcome);
                }
                Some(429) => {
                    throttled = true;
                    self.record_base(&mut assessment, outcome);
                }
                Some(404) => missing = true,
                Some(500..=599) => server_error = true,
                _ => {}
            }
        }

        assessment.verdict = if assessment.service_reachable {
            Verdict::Reachable
        } else if throttled {
            Verdict::RateLimited
        } else if denied {
            Verdict::Unauthenticated
        } else if server_error {
            Verdict::ServiceError
        } else if missing {
            Verdict::EndpointMissing
        } else if assessment.platform_reachable {
            Verdict::PlatformOnly
        } else {
            Verdict::Unreachable
        };

        assessment
    }

    fn detected_base(&self, outcome: &AttemptOutcome) -> Option<String> {
        outcome
            .endpoint
            .detected_base_path()
            .map(|path| detected_base_url(&self.base_url, path))
    }

    // First structural signal wins; a later 2xx overrides it
    fn record_base(&self, assessment: &mut Assessment, outcome: &AttemptOutcome) {
        if assessment.detected_base.is_none() {
            assessment.detected_base = self.detected_base(outcome);
        }
    }
}
