// src/server/handler.rs
use hyper::{Body, Request, Response, StatusCode};
use std::sync::Arc;
use tower::Service;
use tracing::Instrument;

use crate::config::Separator;
use crate::downstream::{FetchOutcome, Fetcher};
use crate::metrics::{MetricsCollector, Timer};
use crate::telemetry::{FetchSpan, SpanOutcome, TelemetryHandle};

/// Fixed prefix of every response body.
pub const GREETING: &str = "hello from python";

/// `prefix + separator + fetch result`, a pure function of the outcome.
pub fn compose_body(separator: Separator, outcome: FetchOutcome) -> String {
    format!("{}{}{}", GREETING, separator.as_str(), outcome.into_body())
}

/// Handles `GET /`: one downstream fetch, one composed 200 response. All
/// state is shared read-only; the handler is cloned per connection.
#[derive(Clone)]
pub struct RequestHandler {
    fetcher: Arc<Fetcher>,
    metrics: Arc<MetricsCollector>,
    telemetry: TelemetryHandle,
    separator: Separator,
}

impl RequestHandler {
    pub fn new(
        fetcher: Arc<Fetcher>,
        metrics: Arc<MetricsCollector>,
        telemetry: TelemetryHandle,
        separator: Separator,
    ) -> Self {
        Self {
            fetcher,
            metrics,
            telemetry,
            separator,
        }
    }

    async fn handle(self, req: Request<Body>) -> Response<Body> {
        let path = req.uri().path().to_string();
        self.metrics.record_request(&path);

        if path != "/" {
            return Response::builder()
                .status(StatusCode::NOT_FOUND)
                .header("Content-Type", "text/plain; charset=utf-8")
                .body(Body::from("Not Found"))
                .unwrap();
        }

        let timer = Timer::new();
        let outcome = self
            .fetcher
            .fetch()
            .instrument(tracing::info_span!("fetch-from-node"))
            .await;
        let elapsed = timer.elapsed();

        self.metrics.record_fetch(outcome.is_unreachable(), elapsed);

        let span_outcome = if outcome.is_unreachable() {
            SpanOutcome::Unreachable
        } else {
            SpanOutcome::Fetched
        };
        self.telemetry.record(FetchSpan::new(span_outcome, elapsed));

        // Always 200: a transport failure already became the fallback body.
        Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", self.separator.content_type())
            .body(Body::from(compose_body(self.separator, outcome)))
            .unwrap()
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Box<dyn std::error::Error + Send + Sync>;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.handle(req).await) })
    }
}
