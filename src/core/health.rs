//! Health-check boundary
//!
//! Wraps one probe result in the envelope an HTTP health endpoint returns.
//! Expected failures (not configured, bad base URL, unreachable, denied) are
//! still HTTP 200 with `success: false`; only an invalid descriptor maps to 500.

use serde::Serialize;
use serde_json::{json, Value};

use crate::core::probe::report::ConnectivityReport;
use crate::core::probe::types::ProbeError;

pub const CACHE_CONTROL: &str = "no-store";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl HealthCheckResponse {
    pub fn is_server_error(&self) -> bool {
        self.status >= 500
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn to_json(&self, pretty: bool) -> String {
        let rendered = if pretty {
            serde_json::to_string_pretty(&self.body)
        } else {
            serde_json::to_string(&self.body)
        };
        rendered.unwrap_or_else(|_| r#"{"success":false,"error":"serialization failed"}"#.to_string())
    }
}

/// Build the boundary response for one service
pub fn respond(service: &str, result: Result<ConnectivityReport, ProbeError>) -> HealthCheckResponse {
    let (status, body) = match result {
        Ok(report) => {
            let report_json = serde_json::to_value(&report).unwrap_or(Value::Null);
            (
                200,
                json!({
                    "service": service,
                    "success": report.ok(),
                    "report": report_json,
                }),
            )
        }
        Err(err) => (
            500,
            json!({
                "service": service,
                "success": false,
                "error": err.to_string(),
            }),
        ),
    };

    HealthCheckResponse {
        status,
        headers: vec![
            ("content-type".to_string(), "application/json".to_string()),
            ("cache-control".to_string(), CACHE_CONTROL.to_string()),
        ],
        body,
    }
}
