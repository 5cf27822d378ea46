// src/telemetry/exporter.rs

use super::span::FetchSpan;
use crate::config::ExporterConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, Duration};
use tracing::{debug, info, warn};

const CHANNEL_CAPACITY: usize = 256;
const MAX_BATCH: usize = 64;
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);
const EXPORT_TIMEOUT: Duration = Duration::from_secs(5);
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Handle the request path uses to record spans. Recording never blocks and
/// never fails: a full channel drops the span with a debug log.
#[derive(Clone)]
pub struct TelemetryHandle {
    tx: Option<mpsc::Sender<FetchSpan>>,
}

impl TelemetryHandle {
    /// Hook disabled: every `record` is a no-op.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    pub fn record(&self, span: FetchSpan) {
        if let Some(tx) = &self.tx {
            if tx.try_send(span).is_err() {
                debug!("span channel full, dropping span");
            }
        }
    }

    /// Handle backed by a raw channel, with the receiver returned to the
    /// caller. Used by `SpanExporter::spawn` and by tests that assert on
    /// recorded spans directly.
    pub fn channel() -> (Self, mpsc::Receiver<FetchSpan>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        (Self { tx: Some(tx) }, rx)
    }
}

/// Signals the exporter task to stop and waits for its final flush. Holding
/// this is the only way to guarantee buffered spans reach the sink before
/// the process exits; dropping it still stops the task eventually.
pub struct ExporterShutdown {
    tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ExporterShutdown {
    pub async fn shutdown(self) {
        let _ = self.tx.send(true);
        if timeout(DRAIN_TIMEOUT, self.task).await.is_err() {
            warn!("span exporter did not drain within {:?}", DRAIN_TIMEOUT);
        }
    }
}

/// Background task that batches spans and ships them to the configured sink.
/// Export failures are logged and otherwise ignored; nothing here can reach
/// back into the request path.
pub struct SpanExporter {
    sink_url: String,
    client: Client,
    rx: mpsc::Receiver<FetchSpan>,
    shutdown_rx: watch::Receiver<bool>,
}

impl SpanExporter {
    /// Spawn the exporter task. Returns the recording handle and the
    /// shutdown guard that drains the buffer on exit.
    pub fn spawn(config: &ExporterConfig) -> Result<(TelemetryHandle, ExporterShutdown)> {
        let client = Client::builder()
            .timeout(EXPORT_TIMEOUT)
            .build()
            .context("Failed to create span export client")?;

        let (handle, rx) = TelemetryHandle::channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let exporter = Self {
            sink_url: config.sink_url(),
            client,
            rx,
            shutdown_rx,
        };

        info!(sink = %exporter.sink_url, "starting span exporter");
        let task = tokio::spawn(exporter.run());

        Ok((
            handle,
            ExporterShutdown {
                tx: shutdown_tx,
                task,
            },
        ))
    }

    async fn run(self) {
        let Self {
            sink_url,
            client,
            mut rx,
            mut shutdown_rx,
        } = self;

        let mut buffer: Vec<FetchSpan> = Vec::new();
        let mut flush_tick = interval(FLUSH_INTERVAL);

        loop {
            tokio::select! {
                _ = flush_tick.tick() => {
                    flush_batch(&client, &sink_url, &mut buffer).await;
                }
                received = rx.recv() => {
                    match received {
                        Some(span) => {
                            buffer.push(span);
                            if buffer.len() >= MAX_BATCH {
                                flush_batch(&client, &sink_url, &mut buffer).await;
                            }
                        }
                        None => {
                            flush_batch(&client, &sink_url, &mut buffer).await;
                            break;
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        // Spans already recorded but still queued must make
                        // the final batch.
                        rx.close();
                        while let Ok(span) = rx.try_recv() {
                            buffer.push(span);
                        }
                        flush_batch(&client, &sink_url, &mut buffer).await;
                        info!("span exporter shutting down");
                        break;
                    }
                }
            }
        }
    }
}

async fn flush_batch(client: &Client, sink_url: &str, buffer: &mut Vec<FetchSpan>) {
    if buffer.is_empty() {
        return;
    }

    let batch: Vec<FetchSpan> = buffer.drain(..).collect();
    let count = batch.len();

    match client.post(sink_url).json(&batch).send().await {
        Ok(response) if response.status().is_success() => {
            debug!(count, "exported span batch");
        }
        Ok(response) => {
            warn!(count, status = %response.status(), "span sink rejected batch");
        }
        Err(e) => {
            warn!(count, error = %e, "failed to export span batch");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::span::SpanOutcome;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn disabled_handle_records_nothing() {
        let handle = TelemetryHandle::disabled();
        assert!(!handle.is_enabled());
        // Must not panic or block.
        handle.record(FetchSpan::new(SpanOutcome::Fetched, StdDuration::from_millis(1)));
    }

    #[tokio::test]
    async fn recorded_spans_arrive_on_the_channel() {
        let (handle, mut rx) = TelemetryHandle::channel();
        handle.record(FetchSpan::new(SpanOutcome::Fetched, StdDuration::from_millis(1)));

        let span = rx.recv().await.unwrap();
        assert_eq!(span.outcome, SpanOutcome::Fetched);
    }

    #[tokio::test]
    async fn shutdown_waits_for_buffered_spans_to_reach_the_sink() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v2/spans")
            .with_status(202)
            .expect(1)
            .create_async()
            .await;

        let url = url::Url::parse(&server.url()).unwrap();
        let config = ExporterConfig {
            host: url.host_str().unwrap().to_string(),
            port: url.port().unwrap(),
            protocol: "http".to_string(),
            endpoint: "/api/v2/spans".to_string(),
        };

        let (handle, shutdown) = SpanExporter::spawn(&config).unwrap();
        handle.record(FetchSpan::new(SpanOutcome::Fetched, StdDuration::from_millis(1)));

        // Once shutdown() returns, the final flush must have completed; no
        // grace sleep is allowed here.
        shutdown.shutdown().await;

        mock.assert_async().await;
    }
}
