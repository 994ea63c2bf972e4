/// Prometheus request metrics
///
/// Two series per request, labelled by method, matched route, and status:
///
/// - `http_requests_total` (counter)
/// - `http_request_duration_seconds` (histogram)
///
/// The matched route pattern (`/api/tasks/:id`) is used as the label, not
/// the raw path, so IDs never explode the cardinality. `/metrics` renders
/// the registry in Prometheus text exposition format.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder,
};

const LABELS: &[&str] = &["method", "route", "status"];

/// Shared metrics state
pub struct Metrics {
    registry: Registry,
    http_requests_total: IntCounterVec,
    http_request_duration_seconds: HistogramVec,
}

impl Metrics {
    /// Builds the registry and registers the HTTP series
    ///
    /// Collector registration only fails on duplicate names, which would be
    /// a programming error, so construction is infallible for callers.
    pub fn new() -> Arc<Self> {
        let registry = Registry::new();

        let http_requests_total = IntCounterVec::new(
            Opts::new("http_requests_total", "Total number of HTTP requests"),
            LABELS,
        )
        .unwrap();

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request latency in seconds",
            )
            .buckets(vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]),
            LABELS,
        )
        .unwrap();

        registry
            .register(Box::new(http_requests_total.clone()))
            .unwrap();
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .unwrap();

        Arc::new(Self {
            registry,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    fn observe(&self, method: &str, route: &str, status: &str, elapsed_seconds: f64) {
        self.http_requests_total
            .with_label_values(&[method, route, status])
            .inc();
        self.http_request_duration_seconds
            .with_label_values(&[method, route, status])
            .observe(elapsed_seconds);
    }

    /// Renders the registry in text exposition format
    pub fn render(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer).unwrap_or_default())
    }
}

/// Middleware that records one observation per request
pub async fn track_metrics(
    State(metrics): State<Arc<Metrics>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let start = Instant::now();
    let response = next.run(req).await;
    let elapsed = start.elapsed().as_secs_f64();

    let status = response.status().as_u16().to_string();
    metrics.observe(&method, &route, &status, elapsed);

    response
}

/// Handler for `GET /metrics`
pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [("Content-Type", "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observations_show_up_in_exposition() {
        let metrics = Metrics::new();
        metrics.observe("GET", "/api/tasks", "200", 0.012);
        metrics.observe("GET", "/api/tasks", "200", 0.050);

        let rendered = metrics.render().unwrap();
        assert!(rendered.contains("http_requests_total"));
        assert!(rendered.contains("http_request_duration_seconds"));
        assert!(rendered.contains(r#"route="/api/tasks""#));
    }

    #[test]
    fn test_empty_registry_renders() {
        let metrics = Metrics::new();
        assert!(metrics.render().is_ok());
    }
}
