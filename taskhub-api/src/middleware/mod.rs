/// Middleware modules for the API server
///
/// - `security`: OWASP security headers on every response
/// - `metrics`: Prometheus request counter and latency histogram

pub mod metrics;
pub mod security;
