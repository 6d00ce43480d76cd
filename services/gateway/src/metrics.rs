//! Prometheus metrics
//!
//! HTTP request counts and latency are recorded by [`track_requests`];
//! business counters are bumped by the handlers that own them.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
    orders_placed_total: IntCounter,
    options_priced_total: IntCounterVec,
    var_calculations_total: IntCounterVec,
}

impl std::fmt::Debug for Metrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Metrics")
            .field("orders_placed", &self.inner.orders_placed_total.get())
            .finish()
    }
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("gateway_http_requests_total", "Total HTTP requests"),
            &["method", "path", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("gateway_http_request_duration_seconds", "HTTP request duration in seconds")
                .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            &["method", "path"],
        )?;
        let orders_placed_total = IntCounter::new("gateway_orders_placed_total", "Orders accepted by the exchange")?;
        let options_priced_total = IntCounterVec::new(
            Opts::new("gateway_options_priced_total", "Option valuations by pricing model"),
            &["model"],
        )?;
        let var_calculations_total = IntCounterVec::new(
            Opts::new("gateway_var_calculations_total", "Value-at-risk calculations by method"),
            &["method"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(orders_placed_total.clone()))?;
        registry.register(Box::new(options_priced_total.clone()))?;
        registry.register(Box::new(var_calculations_total.clone()))?;

        Ok(Self {
            inner: Arc::new(Inner {
                registry,
                http_requests_total,
                http_request_duration_seconds,
                orders_placed_total,
                options_priced_total,
                var_calculations_total,
            }),
        })
    }

    fn record_request(&self, method: &str, path: &str, status: u16, duration_secs: f64) {
        let status = status.to_string();
        self.inner
            .http_requests_total
            .with_label_values(&[method, path, &status])
            .inc();
        self.inner
            .http_request_duration_seconds
            .with_label_values(&[method, path])
            .observe(duration_secs);
    }

    pub fn order_placed(&self) {
        self.inner.orders_placed_total.inc();
    }

    pub fn option_priced(&self, model: &str) {
        self.inner.options_priced_total.with_label_values(&[model]).inc();
    }

    pub fn var_calculated(&self, method: &str) {
        self.inner.var_calculations_total.with_label_values(&[method]).inc();
    }

    /// Prometheus text exposition of every registered metric
    pub fn encode(&self) -> Result<String, String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.inner.registry.gather(), &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

/// Replaces UUID segments with `{id}` for unmatched paths
fn normalize_path(path: &str) -> String {
    path.split('/')
        .map(|segment| {
            if uuid::Uuid::parse_str(segment).is_ok() {
                "{id}"
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

pub async fn track_requests(State(metrics): State<Metrics>, request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let path = match request.extensions().get::<MatchedPath>() {
        Some(matched) => matched.as_str().to_string(),
        None => normalize_path(request.uri().path()),
    };
    let start = Instant::now();

    let response = next.run(request).await;

    metrics.record_request(&method, &path, response.status().as_u16(), start.elapsed().as_secs_f64());
    response
}
