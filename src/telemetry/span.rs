// src/telemetry/span.rs

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Logical service name reported to the span sink.
pub const SERVICE_NAME: &str = "py-service";

/// Span name covering the outbound fetch.
pub const FETCH_SPAN_NAME: &str = "fetch-from-node";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SpanOutcome {
    Fetched,
    Unreachable,
}

/// One record per inbound request, covering the downstream fetch. This is a
/// call-site hook, not a tracing implementation: no parent context, no
/// sampling, just enough to ship to an external collector.
#[derive(Debug, Clone, Serialize)]
pub struct FetchSpan {
    pub id: String,
    pub name: &'static str,
    pub service: &'static str,
    /// Microseconds since the Unix epoch.
    pub timestamp: i64,
    pub duration_us: u64,
    pub outcome: SpanOutcome,
}

impl FetchSpan {
    pub fn new(outcome: SpanOutcome, duration: std::time::Duration) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: FETCH_SPAN_NAME,
            service: SERVICE_NAME,
            timestamp: Utc::now().timestamp_micros(),
            duration_us: duration.as_micros() as u64,
            outcome,
        }
    }
}
