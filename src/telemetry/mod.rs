// src/telemetry/mod.rs
mod exporter;
mod span;

pub use exporter::{ExporterShutdown, SpanExporter, TelemetryHandle};
pub use span::{FetchSpan, SpanOutcome, FETCH_SPAN_NAME, SERVICE_NAME};
