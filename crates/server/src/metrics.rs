//! Prometheus metrics for the HTTP layer.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{MatchedPath, Request, State},
    http::header::CONTENT_LENGTH,
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use prometheus::{CounterVec, Encoder, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};

/// Label used for requests that matched no route (static files, 404s).
const UNMATCHED_ROUTE: &str = "fallback";

/// Metrics collects and exposes HTTP server metrics.
pub struct Metrics {
    registry: Registry,
    http_requests_total: CounterVec,
    http_request_duration_seconds: HistogramVec,
    errors_total: CounterVec,
    network_traffic_bytes: CounterVec,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let http_requests_total = CounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            &["method", "endpoint", "status"],
        )?;
        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new("http_request_duration_seconds", "HTTP request duration in seconds"),
            &["method", "endpoint"],
        )?;
        let errors_total = CounterVec::new(
            Opts::new("errors_total", "Total number of error responses"),
            &["class", "endpoint"],
        )?;
        let network_traffic_bytes = CounterVec::new(
            Opts::new("network_traffic_bytes", "Network traffic in bytes"),
            &["direction"],
        )?;

        registry.register(Box::new(http_requests_total.clone()))?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;
        registry.register(Box::new(errors_total.clone()))?;
        registry.register(Box::new(network_traffic_bytes.clone()))?;

        Ok(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
            errors_total,
            network_traffic_bytes,
        })
    }

    fn record_request(&self, method: &str, endpoint: &str, status: u16, duration: Duration) {
        let status = status.to_string();
        self.http_requests_total
            .with_label_values(&[method, endpoint, status.as_str()])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, endpoint])
            .observe(duration.as_secs_f64());
    }

    fn record_error(&self, status: u16, endpoint: &str) {
        let class = if status >= 500 { "server" } else { "client" };
        self.errors_total.with_label_values(&[class, endpoint]).inc();
    }

    fn record_network_traffic(&self, direction: &str, bytes: usize) {
        self.network_traffic_bytes
            .with_label_values(&[direction])
            .inc_by(bytes as f64);
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

fn content_length(headers: &HeaderMap) -> usize {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0)
}

/// Records count, latency, errors and traffic for every request.
///
/// Requests are labelled by their route template (`/api/orders/{id}`), not the raw
/// path, so label cardinality stays bounded.
pub async fn track(State(metrics): State<Arc<Metrics>>, req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = req
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
        .to_string();

    let incoming = content_length(req.headers());
    if incoming > 0 {
        metrics.record_network_traffic("in", incoming);
    }

    let start = Instant::now();
    let response = next.run(req).await;
    let status = response.status().as_u16();

    metrics.record_request(&method, &endpoint, status, start.elapsed());
    if status >= 400 {
        metrics.record_error(status, &endpoint);
    }

    let outgoing = content_length(response.headers());
    if outgoing > 0 {
        metrics.record_network_traffic("out", outgoing);
    }

    response
}
