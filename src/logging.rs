//! Structured JSON-lines logging for the analysis client.
//!
//! Every record carries a run id and a monotonically increasing sequence
//! number so the primary and secondary fetches of one analysis can be lined
//! up after the fact. Records go to stderr; stdout is reserved for the
//! CLI's own output. Set `LOG_DIR` to also append them to
//! `<LOG_DIR>/<run_id>/events.jsonl`.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fs::{create_dir_all, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

// =============================================================================
// Log Levels
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
}

impl Level {
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "trace" => Level::Trace,
            "debug" => Level::Debug,
            "warn" => Level::Warn,
            "error" => Level::Error,
            _ => Level::Info,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
        }
    }
}

// =============================================================================
// Log Domains (categories for filtering)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    Catalog,   // Reference data load
    Form,      // Draft edits, validation
    Primary,   // Viability scoring request
    Secondary, // Financial, competition, ranking panels
    View,      // Render notifications
    System,    // Startup, config
}

impl Domain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Domain::Catalog => "catalog",
            Domain::Form => "form",
            Domain::Primary => "primary",
            Domain::Secondary => "secondary",
            Domain::View => "view",
            Domain::System => "system",
        }
    }
}

fn domain_enabled(filter: Option<&str>, domain: Domain) -> bool {
    match filter {
        None | Some("all") => true,
        Some(domains) => domains.split(',').any(|d| d.trim() == domain.as_str()),
    }
}

// =============================================================================
// Run context
// =============================================================================

static LOG_SEQ: AtomicU64 = AtomicU64::new(0);
static RUN_CONTEXT: OnceLock<RunContext> = OnceLock::new();

fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst)
}

#[derive(Debug)]
struct RunContext {
    run_id: String,
    min_level: Level,
    domains: Option<String>,
    events: Option<Mutex<BufWriter<File>>>,
}

fn ensure_run_context() -> &'static RunContext {
    RUN_CONTEXT.get_or_init(|| {
        let run_id = std::env::var("RUN_ID")
            .unwrap_or_else(|_| format!("r-{}-{}", ts_epoch_ms(), process::id()));
        let events = std::env::var("LOG_DIR").ok().and_then(|base| open_events_file(&base, &run_id));
        RunContext {
            min_level: std::env::var("LOG_LEVEL").map(|v| Level::parse(&v)).unwrap_or(Level::Info),
            domains: std::env::var("LOG_DOMAINS").ok(),
            run_id,
            events,
        }
    })
}

fn open_events_file(base: &str, run_id: &str) -> Option<Mutex<BufWriter<File>>> {
    let mut run_dir = PathBuf::from(base);
    run_dir.push(run_id);
    if let Err(err) = create_dir_all(&run_dir) {
        eprintln!("[log] failed to create run dir: {}", err);
        return None;
    }
    match OpenOptions::new().create(true).append(true).open(run_dir.join("events.jsonl")) {
        Ok(file) => Some(Mutex::new(BufWriter::new(file))),
        Err(err) => {
            eprintln!("[log] failed to open events log: {}", err);
            None
        }
    }
}

fn sanitize_fields(mut fields: Map<String, Value>) -> Map<String, Value> {
    let redacted = Value::String("[REDACTED]".to_string());
    for key in ["authorization", "Authorization", "api_key", "token"] {
        if fields.contains_key(key) {
            fields.insert(key.to_string(), redacted.clone());
        }
    }
    fields
}

fn split_fields(mut fields: Map<String, Value>) -> (Map<String, Value>, Map<String, Value>) {
    let mut top = Map::new();
    for key in ["generation", "fingerprint", "panel", "msg"] {
        if let Some(value) = fields.remove(key) {
            top.insert(key.to_string(), value);
        }
    }
    (top, fields)
}

// =============================================================================
// Core logging functions
// =============================================================================

/// RFC3339 timestamp with milliseconds
pub fn ts_now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn ts_epoch_ms() -> u64 {
    Utc::now().timestamp_millis() as u64
}

/// Emit a structured log entry
pub fn log(level: Level, domain: Domain, event: &str, fields: Map<String, Value>) {
    let ctx = ensure_run_context();
    if level < ctx.min_level || !domain_enabled(ctx.domains.as_deref(), domain) {
        return;
    }
    let line = build_record(&ctx.run_id, next_seq(), level, domain, event, fields).to_string();
    if let Some(events) = &ctx.events {
        if let Ok(mut w) = events.lock() {
            let _ = writeln!(w, "{}", line);
            let _ = w.flush();
        }
    }
    eprintln!("{}", line);
}

fn build_record(
    run_id: &str,
    seq: u64,
    level: Level,
    domain: Domain,
    event: &str,
    fields: Map<String, Value>,
) -> Value {
    let fields = sanitize_fields(fields);
    let (mut top, data) = split_fields(fields);

    let msg = top.remove("msg").unwrap_or(Value::String(String::new()));
    let mut entry = Map::new();
    entry.insert("ts".to_string(), json!(ts_now()));
    entry.insert("run_id".to_string(), json!(run_id));
    entry.insert("seq".to_string(), json!(seq));
    entry.insert("lvl".to_string(), json!(level.as_str().to_uppercase()));
    entry.insert("component".to_string(), json!(domain.as_str()));
    entry.insert("event".to_string(), json!(event));
    entry.insert("msg".to_string(), msg);
    for (k, v) in top {
        entry.insert(k, v);
    }
    entry.insert("data".to_string(), Value::Object(data));
    Value::Object(entry)
}

// =============================================================================
// Domain-Specific Logging Helpers
// =============================================================================

pub fn log_catalog_loaded(business_types: usize, locations: usize) {
    log(
        Level::Info,
        Domain::Catalog,
        "catalog_loaded",
        obj(&[
            ("business_types", json!(business_types)),
            ("locations", json!(locations)),
        ]),
    );
}

pub fn log_submit(generation: u64, fingerprint: &str, business_type: &str, location_id: &str, budget: f64) {
    log(
        Level::Info,
        Domain::Primary,
        "submit",
        obj(&[
            ("generation", json!(generation)),
            ("fingerprint", v_str(fingerprint)),
            ("business_type", v_str(business_type)),
            ("location_id", v_str(location_id)),
            ("investment_budget", v_num(budget)),
        ]),
    );
}

pub fn log_rejected(reason: &str) {
    log(
        Level::Warn,
        Domain::Form,
        "validation_failed",
        obj(&[("msg", v_str(reason))]),
    );
}

pub fn log_stale_drop(what: &str, generation: u64, current: u64) {
    let domain = if what == "primary" { Domain::Primary } else { Domain::Secondary };
    log(
        Level::Debug,
        domain,
        "stale_dropped",
        obj(&[
            ("what", v_str(what)),
            ("generation", json!(generation)),
            ("current_generation", json!(current)),
        ]),
    );
}

pub fn log_panel(generation: u64, panel: &str, outcome: Result<usize, &str>) {
    let (level, event, detail) = match outcome {
        Ok(items) => (Level::Info, "panel_ready", json!(items)),
        Err(reason) => (Level::Warn, "panel_failed", v_str(reason)),
    };
    log(
        level,
        Domain::Secondary,
        event,
        obj(&[
            ("generation", json!(generation)),
            ("panel", v_str(panel)),
            ("detail", detail),
        ]),
    );
}

// =============================================================================
// Utility Functions
// =============================================================================

pub fn obj(pairs: &[(&str, Value)]) -> Map<String, Value> {
    let mut map = Map::new();
    for (k, v) in pairs {
        map.insert((*k).to_string(), v.clone());
    }
    map
}

pub fn v_str(s: &str) -> Value {
    Value::String(s.to_string())
}

pub fn v_num(n: f64) -> Value {
    json!(n)
}

// =============================================================================
// Profiling Scope
// =============================================================================

/// Emits the elapsed time of a backend call when dropped.
pub struct ProfileScope {
    domain: Domain,
    label: &'static str,
    started: Instant,
}

impl ProfileScope {
    pub fn new(domain: Domain, label: &'static str) -> Self {
        Self {
            domain,
            label,
            started: Instant::now(),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_secs_f64() * 1000.0;
        log(
            Level::Trace,
            self.domain,
            "profile",
            obj(&[("label", v_str(self.label)), ("elapsed_ms", v_num(elapsed_ms))]),
        );
    }
}

// =============================================================================
// Tests
// =============================================================================
