use std::collections::HashMap;
use std::env;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use chrono::Local;
use flate2::{write::GzEncoder, Compression};
use fs2::FileExt;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Hardcoded rotation policy
const LOG_ROTATION_SIZE_MB: u64 = 8;
const MAX_ARCHIVES: u32 = 5;
const ROTATION_CHECK_INTERVAL: u32 = 200;

#[derive(Serialize, Deserialize, Debug, Clone)]
struct LogEntry {
    timestamp: String,                            // ISO-8601 with timezone
    level: String,                                // DEBUG, ERROR, PERF, PROBE
    component: String,                            // Component name
    event: String,                                // Event type
    message: String,                              // Human readable message (redacted)
    correlation_id: Option<String>,               // Ties the attempts of one invocation together
    fields: HashMap<String, serde_json::Value>,   // Structured data
}

struct RotatingLogger {
    log_path: PathBuf,
    write_count: AtomicU32,
}

impl RotatingLogger {
    fn new(log_path: PathBuf) -> Self {
        if let Some(parent) = log_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }

        Self {
            log_path,
            write_count: AtomicU32::new(0),
        }
    }

    fn write_with_rotation(&self, json_line: &str) -> Result<(), std::io::Error> {
        if self.write_count.fetch_add(1, Ordering::Relaxed) % ROTATION_CHECK_INTERVAL == 0 {
            let _ = self.rotate_if_needed(); // Rotation errors never stop logging
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)?;

        writeln!(file, "{}", json_line)?;
        Ok(())
    }

    fn rotate_if_needed(&self) -> Result<(), std::io::Error> {
        if !self.needs_rotation()? {
            return Ok(());
        }

        // File lock so concurrent processes do not rotate twice
        let lock_path = self.log_path.with_extension("lock");
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)?;

        match lock_file.try_lock_exclusive() {
            Ok(()) => {
                if self.needs_rotation()? {
                    self.perform_rotation()?;
                }
                let _ = std::fs::remove_file(&lock_path);
                Ok(())
            }
            Err(_) => Ok(()), // Another process is rotating
        }
    }

    fn needs_rotation(&self) -> Result<bool, std::io::Error> {
        if !self.log_path.exists() {
            return Ok(false);
        }

        let metadata = std::fs::metadata(&self.log_path)?;
        Ok(metadata.len() >= LOG_ROTATION_SIZE_MB * 1024 * 1024)
    }

    fn log_dir_and_stem(&self) -> Result<(&Path, String), std::io::Error> {
        let invalid = || std::io::Error::new(std::io::ErrorKind::InvalidInput, "invalid log path");
        let dir = self.log_path.parent().ok_or_else(invalid)?;
        let stem = self
            .log_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(invalid)?
            .to_string();
        Ok((dir, stem))
    }

    fn perform_rotation(&self) -> Result<(), std::io::Error> {
        let (log_dir, base_name) = self.log_dir_and_stem()?;
        let timestamp = Local::now().format("%Y%m%d_%H%M%S");
        let archive_path = log_dir.join(format!("{}.{}.gz", base_name, timestamp));

        // Move current log aside, compress, clean up
        let temp_path = self.log_path.with_extension("rotating");
        std::fs::rename(&self.log_path, &temp_path)?;

        let source_file = File::open(&temp_path)?;
        let target_file = File::create(&archive_path)?;
        let mut encoder = GzEncoder::new(target_file, Compression::default());
        std::io::copy(&mut BufReader::new(source_file), &mut encoder)?;
        encoder.finish()?;

        std::fs::remove_file(&temp_path)?;

        let _ = self.cleanup_old_archives();

        Ok(())
    }

    fn cleanup_old_archives(&self) -> Result<(), std::io::Error> {
        let (log_dir, base_name) = self.log_dir_and_stem()?;

        let mut archives = Vec::new();
        for entry in std::fs::read_dir(log_dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();

            if name.starts_with(&format!("{}.", base_name)) && name.ends_with(".gz") {
                archives.push((entry.path(), entry.metadata()?.modified()?));
            }
        }

        // Keep only the most recent MAX_ARCHIVES
        archives.sort_by_key(|(_, modified)| *modified);
        if archives.len() > MAX_ARCHIVES as usize {
            let to_remove = archives.len() - MAX_ARCHIVES as usize;
            for (path, _) in archives.iter().take(to_remove) {
                let _ = std::fs::remove_file(path);
            }
        }

        Ok(())
    }
}

/// JSON-lines debug logger for probe runs
///
/// Disabled unless `CONNPROBE_DEBUG` is truthy. Writes to
/// `~/.connprobe/connprobe-debug.log` and never lets a logging failure
/// reach the caller.
pub struct DebugLogger {
    enabled: bool,
    rotating_logger: Option<Arc<Mutex<RotatingLogger>>>,
    session_id: String,
}

// Compiled on first redaction, shared by every logger in the process
static REDACTION_PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();

impl Default for DebugLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl DebugLogger {
    pub fn new() -> Self {
        let enabled = Self::parse_debug_enabled();
        let session_id = Uuid::new_v4().to_string()[..8].to_string();

        let rotating_logger = if enabled {
            Some(Arc::new(Mutex::new(RotatingLogger::new(Self::log_path()))))
        } else {
            None
        };

        Self {
            enabled,
            rotating_logger,
            session_id,
        }
    }

    /// Supports: true/false, 1/0, yes/no, on/off (case insensitive)
    fn parse_debug_enabled() -> bool {
        env::var("CONNPROBE_DEBUG")
            .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on"))
            .unwrap_or(false)
    }

    /// Location of the active log file
    pub fn log_path() -> PathBuf {
        let mut log_path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
        log_path.push(".connprobe");
        log_path.push("connprobe-debug.log");
        log_path
    }

    fn compile_redaction_patterns() -> Vec<Regex> {
        let patterns = [
            r"(?i)authorization[:\s]+[^\s\n]+",
            r"(?i)bearer[:\s]+[^\s\n]+",
            r"(?i)basic[:\s]+[A-Za-z0-9+/=]{8,}",
            r"(?i)token[:\s=]+[^\s\n&]+",
            r"(?i)password[:\s]+[^\s\n]+",
            r"(?i)api[_-]?key[:\s=]+[^\s\n&]+",
            r"(?i)consumer[_-]?(key|secret)[:\s=]+[^\s\n&]+",
            r"(?i)secret[:\s=]+[^\s\n&]+",
        ];

        patterns
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect()
    }

    /// Redaction guardrails for sensitive data
    pub fn redact_sensitive_data(&self, text: &str) -> String {
        let mut redacted = text.to_string();

        let patterns = REDACTION_PATTERNS.get_or_init(Self::compile_redaction_patterns);
        for regex in patterns {
            redacted = regex.replace_all(&redacted, "[REDACTED]").to_string();
        }

        // Suspiciously long opaque strings are probably tokens
        if redacted.len() > 100
            && !redacted.contains(' ')
            && redacted.chars().all(|c| c.is_ascii_alphanumeric() || "-_".contains(c))
        {
            redacted = format!("[REDACTED_LONG_STRING_{}chars]", redacted.len());
        }

        redacted
    }

    fn log_sync(
        &self,
        level: &str,
        component: &str,
        event: &str,
        message: &str,
        correlation_id: Option<&str>,
        fields: HashMap<String, serde_json::Value>,
    ) {
        if !self.enabled {
            return;
        }

        let entry = LogEntry {
            timestamp: Local::now().to_rfc3339(),
            level: level.to_string(),
            component: component.to_string(),
            event: event.to_string(),
            message: self.redact_sensitive_data(message),
            correlation_id: Some(correlation_id.unwrap_or(&self.session_id).to_string()),
            fields,
        };

        if let Some(logger) = &self.rotating_logger {
            if let Ok(logger) = logger.lock() {
                if let Ok(json_line) = serde_json::to_string(&entry) {
                    let _ = logger.write_with_rotation(&json_line);
                }
            }
        }
    }

    pub fn debug(&self, component: &str, message: &str) {
        self.log_sync("DEBUG", component, "debug", message, None, HashMap::new());
    }

    pub fn error(&self, component: &str, message: &str) {
        self.log_sync("ERROR", component, "error", message, None, HashMap::new());
    }

    pub fn performance(&self, component: &str, operation: &str, duration_ms: u64) {
        let mut fields = HashMap::new();
        fields.insert("duration_ms".to_string(), duration_ms.into());

        self.log_sync("PERF", component, "operation_complete", operation, None, fields);
    }

    // Typed probe lifecycle events

    pub fn plan_built(&self, service: &str, candidates: usize, skipped: usize, correlation_id: &str) {
        let mut fields = HashMap::new();
        fields.insert("service".to_string(), service.into());
        fields.insert("candidates".to_string(), candidates.into());
        fields.insert("skipped".to_string(), skipped.into());

        self.log_sync(
            "PROBE",
            "CandidatePlan",
            "plan_built",
            &format!("Plan for {}: {} candidates, {} skipped", service, candidates, skipped),
            Some(correlation_id),
            fields,
        );
    }

    pub fn candidate_skipped(&self, service: &str, label: &str, missing: &[String], correlation_id: &str) {
        let mut fields = HashMap::new();
        fields.insert("service".to_string(), service.into());
        fields.insert("candidate".to_string(), label.into());
        fields.insert("missing".to_string(), missing.to_vec().into());

        self.log_sync(
            "PROBE",
            "CandidatePlan",
            "candidate_skipped",
            &format!("Skipped {} ({} not configured)", label, missing.join(", ")),
            Some(correlation_id),
            fields,
        );
    }

    pub fn attempt_start(&self, target: &str, label: &str, timeout_ms: u64, correlation_id: &str) {
        let mut fields = HashMap::new();
        fields.insert("target".to_string(), target.into());
        fields.insert("candidate".to_string(), label.into());
        fields.insert("timeout_ms".to_string(), timeout_ms.into());

        self.log_sync(
            "PROBE",
            "Prober",
            "attempt_start",
            &format!("Probing {} {}", target, label),
            Some(correlation_id),
            fields,
        );
    }

    pub fn attempt_end(
        &self,
        label: &str,
        http_status: Option<u16>,
        error_kind: Option<&str>,
        duration_ms: u64,
        correlation_id: &str,
    ) {
        let mut fields = HashMap::new();
        fields.insert("candidate".to_string(), label.into());
        fields.insert("duration_ms".to_string(), duration_ms.into());
        if let Some(code) = http_status {
            fields.insert("http_status".to_string(), code.into());
        }
        if let Some(kind) = error_kind {
            fields.insert("error_kind".to_string(), kind.into());
        }

        let summary = match (http_status, error_kind) {
            (Some(code), _) => format!("HTTP {}", code),
            (None, Some(kind)) => kind.to_string(),
            (None, None) => "no result".to_string(),
        };

        self.log_sync(
            "PROBE",
            "Prober",
            "attempt_end",
            &format!("{} -> {} ({}ms)", label, summary, duration_ms),
            Some(correlation_id),
            fields,
        );
    }

    pub fn probe_complete(
        &self,
        service: &str,
        verdict: &str,
        attempts: usize,
        duration_ms: u64,
        correlation_id: &str,
    ) {
        let mut fields = HashMap::new();
        fields.insert("service".to_string(), service.into());
        fields.insert("verdict".to_string(), verdict.into());
        fields.insert("attempts".to_string(), attempts.into());
        fields.insert("duration_ms".to_string(), duration_ms.into());

        self.log_sync(
            "PROBE",
            "ProbeEngine",
            "probe_complete",
            &format!("{}: {} after {} attempts ({}ms)", service, verdict, attempts, duration_ms),
            Some(correlation_id),
            fields,
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Factory used by every component; picks up `CONNPROBE_DEBUG` at call time
pub fn get_debug_logger() -> DebugLogger {
    DebugLogger::new()
}
