// src/main.rs
use anyhow::Result;
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

mod config;
mod downstream;
mod metrics;
mod server;
mod telemetry;

use crate::{
    downstream::{DownstreamAddress, Fetcher},
    metrics::MetricsRegistry,
    server::{handler::RequestHandler, ServerBuilder},
    telemetry::{SpanExporter, TelemetryHandle},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hello_fanout=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration; a malformed downstream address aborts here.
    let config = config::load_from_env()?;

    let address = DownstreamAddress::resolve(&config.endpoint)?;
    info!("Downstream address resolved to {}", address);

    let fetcher = Arc::new(Fetcher::new(address, config.fetch_timeout)?);

    // Initialize metrics
    let metrics_registry = MetricsRegistry::new()?;
    let metrics = metrics_registry.collector();

    // Span exporter, only when a sink is configured
    let (telemetry, exporter_shutdown) = match &config.exporter {
        Some(exporter_config) => {
            let (handle, shutdown) = SpanExporter::spawn(exporter_config)?;
            (handle, Some(shutdown))
        }
        None => (TelemetryHandle::disabled(), None),
    };

    // Metrics server if enabled
    if config.metrics.enabled {
        let metrics_addr: SocketAddr = ([0, 0, 0, 0], config.metrics.port).into();
        start_metrics_server(metrics_addr, metrics_registry, config.metrics.path.clone()).await?;
    }

    // Create request handler
    let handler = RequestHandler::new(fetcher, metrics, telemetry, config.separator);

    // Start main server
    let addr: SocketAddr = ([0, 0, 0, 0], config.listen_port).into();
    info!("Starting server on {}", addr);

    let serve = ServerBuilder::new(addr).with_handler(handler).serve();

    tokio::select! {
        result = serve => {
            if let Err(e) = result {
                error!("Server error: {}", e);
            }
        }
        _ = shutdown_signal() => {}
    }

    // Drain buffered spans before exiting.
    if let Some(shutdown) = exporter_shutdown {
        shutdown.shutdown().await;
    }

    Ok(())
}

async fn start_metrics_server(
    addr: SocketAddr,
    registry: MetricsRegistry,
    path: String,
) -> Result<()> {
    let registry = Arc::new(registry);
    let metrics_path = Arc::new(path);
    let service_path = metrics_path.clone();

    let make_service = hyper::service::make_service_fn(move |_| {
        let registry = registry.clone();
        let path = service_path.clone();

        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |req: Request<Body>| {
                let registry = registry.clone();
                let path = path.clone();

                async move {
                    if req.uri().path() == path.as_str() {
                        let metrics = registry.gather();
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(StatusCode::OK)
                                .header("Content-Type", "text/plain; version=0.0.4")
                                .body(Body::from(metrics))
                                .unwrap(),
                        )
                    } else {
                        Ok::<_, Infallible>(
                            Response::builder()
                                .status(StatusCode::NOT_FOUND)
                                .body(Body::from("Not Found"))
                                .unwrap(),
                        )
                    }
                }
            }))
        }
    });

    let server = Server::bind(&addr).serve(make_service);

    info!(
        "Metrics server listening on http://{}{}",
        addr,
        metrics_path.as_str()
    );

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
