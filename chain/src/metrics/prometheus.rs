//! Prometheus-backed metrics and HTTP exporter.
//!
//! This module defines a [`MetricsRegistry`] that owns a Prometheus
//! registry and a set of strongly-typed node metrics, and an async HTTP
//! exporter that serves `/metrics` using `hyper`.

use std::{convert::Infallible, net::SocketAddr, sync::Arc};

use bytes::Bytes;
use http_body_util::Full;
use hyper::{
    Method, Request, Response, StatusCode, body::Incoming, header, server::conn::http1,
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;

use prometheus::{self, Encoder, Gauge, Histogram, HistogramOpts, IntCounter, Opts, Registry, TextEncoder};

/// Node-level Prometheus metrics.
///
/// These are registered into a [`Registry`] and updated from the
/// orchestrator loop, mempool, and peer-network code.
#[derive(Clone)]
pub struct NodeMetrics {
    /// Current chain height (tip block index).
    pub chain_height: Gauge,
    /// Number of transactions currently sitting in the mempool.
    pub mempool_size: Gauge,
    /// Number of peers this node currently considers reachable.
    pub peer_count: Gauge,
    /// Wall-clock time spent composing and appending a locally produced
    /// block, in seconds.
    pub block_production_seconds: Histogram,
    /// Total blocks rejected during validation (ours or a peer's).
    pub blocks_rejected_total: IntCounter,
    /// Total transactions rejected (mempool admission or block validation).
    pub transactions_rejected_total: IntCounter,
}

impl NodeMetrics {
    /// Registers node metrics into the given `Registry`.
    pub fn register(registry: &Registry) -> Result<Self, prometheus::Error> {
        let chain_height = Gauge::with_opts(Opts::new("chain_height", "Current chain tip index"))?;
        registry.register(Box::new(chain_height.clone()))?;

        let mempool_size = Gauge::with_opts(Opts::new(
            "mempool_size",
            "Number of transactions currently pending in the mempool",
        ))?;
        registry.register(Box::new(mempool_size.clone()))?;

        let peer_count = Gauge::with_opts(Opts::new("peer_count", "Number of known reachable peers"))?;
        registry.register(Box::new(peer_count.clone()))?;

        let block_production_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "block_production_seconds",
                "Time to compose and append a locally produced block, in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
        )?;
        registry.register(Box::new(block_production_seconds.clone()))?;

        let blocks_rejected_total = IntCounter::with_opts(Opts::new(
            "blocks_rejected_total",
            "Total number of blocks rejected during validation",
        ))?;
        registry.register(Box::new(blocks_rejected_total.clone()))?;

        let transactions_rejected_total = IntCounter::with_opts(Opts::new(
            "transactions_rejected_total",
            "Total number of transactions rejected by the mempool or block validation",
        ))?;
        registry.register(Box::new(transactions_rejected_total.clone()))?;

        Ok(Self {
            chain_height,
            mempool_size,
            peer_count,
            block_production_seconds,
            blocks_rejected_total,
            transactions_rejected_total,
        })
    }
}

/// Wrapper around a Prometheus registry and the node metrics.
///
/// This is the main handle you pass around in the node. It can be wrapped
/// in an [`Arc`] and shared across threads/tasks.
#[derive(Clone)]
pub struct MetricsRegistry {
    registry: Registry,
    pub node: NodeMetrics,
}

impl MetricsRegistry {
    /// Creates a new `MetricsRegistry` with a fresh underlying `Registry`
    /// and registers the node metrics.
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new_custom(Some("chain".to_string()), None)?;
        let node = NodeMetrics::register(&registry)?;
        Ok(Self { registry, node })
    }

    /// Encodes all metrics in this registry into the Prometheus text format.
    pub fn gather_text(&self) -> String {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
            eprintln!("failed to encode Prometheus metrics: {e}");
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Runs an HTTP server that exposes Prometheus metrics.
///
/// The server listens on `addr` and serves `GET /metrics` with the
/// Prometheus text exposition format. All other paths return 404.
pub async fn run_prometheus_http_server(
    metrics: Arc<MetricsRegistry>,
    addr: SocketAddr,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let svc = service_fn(move |req| {
                let metrics = metrics.clone();
                handle_request(req, metrics)
            });

            if let Err(err) = http1::Builder::new().serve_connection(io, svc).await {
                eprintln!("prometheus HTTP server error: {err}");
            }
        });
    }
}

async fn handle_request(
    req: Request<Incoming>,
    metrics: Arc<MetricsRegistry>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/metrics") => {
            let body = metrics.gather_text();
            Ok(Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/plain; version=0.0.4")
                .body(Full::new(Bytes::from(body)))
                .unwrap())
        }
        _ => Ok(Response::builder()
            .status(StatusCode::NOT_FOUND)
            .body(Full::new(Bytes::from("not found")))
            .unwrap()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Registry;

    #[test]
    fn node_metrics_register_and_record() {
        let registry = Registry::new();
        let metrics = NodeMetrics::register(&registry).expect("register metrics");

        metrics.chain_height.set(42.0);
        metrics.mempool_size.set(3.0);
        metrics.peer_count.set(5.0);
        metrics.block_production_seconds.observe(0.123);
        metrics.blocks_rejected_total.inc();
        metrics.transactions_rejected_total.inc();

        let metric_families = registry.gather();
        assert!(!metric_families.is_empty());
    }

    #[test]
    fn metrics_registry_gather_text_works() {
        let registry = MetricsRegistry::new().expect("create metrics registry");
        registry.node.chain_height.set(7.0);
        let text = registry.gather_text();
        assert!(text.contains("chain_height"));
    }
}
