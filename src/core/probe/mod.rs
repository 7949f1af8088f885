//! Connectivity Probe Engine
//!
//! Determines whether an external service is reachable, which auth method
//! works against it and what rate-limit posture it exposes:
//! - Ordered candidate plans built from declarative service adapters
//! - Single-attempt prober with timeout racing and credential scrubbing
//! - Pure rate-limit extraction and reachability classification
//! - Append-only diagnostics rolled into a credential-safe report

pub mod adapters;
pub mod classifier;
pub mod client;
pub mod clock;
pub mod debug_logger;
pub mod engine;
pub mod plan;
pub mod prober;
pub mod rate_limit;
pub mod report;
pub mod secret;
pub mod types;
pub mod url;

// Re-export commonly used items
pub use adapters::{builtin_adapters, find_builtin, ProbeDefaults, ServiceAdapter};
pub use classifier::{Assessment, ReachabilityClassifier, StopReason, Verdict};
pub use client::{default_client, ProbeClient, ProbeRequest, ProbeResponse, TransportError};
pub use clock::{Clock, SystemClock};
pub use debug_logger::{get_debug_logger, DebugLogger};
pub use engine::ProbeEngine;
pub use plan::CandidatePlan;
pub use prober::{AttemptBudget, Prober};
pub use rate_limit::extract_rate_limit;
pub use report::{ConnectivityReport, DiagnosticsAggregator, ReportError};
pub use secret::{EnvSource, MapEnv, Presence, ProcessEnv};
pub use types::*;

#[cfg(feature = "network")]
pub use client::IsahcProbeClient;
