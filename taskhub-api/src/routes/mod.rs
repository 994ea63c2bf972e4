/// API route handlers
///
/// Organized by resource:
///
/// - `health`: health and readiness probes
/// - `auth`: register, login, logout, me
/// - `tasks`: task CRUD and comments
/// - `tenants`: tenant CRUD, settings, subscription
/// - `ws`: WebSocket channel for the notification relay

pub mod auth;
pub mod health;
pub mod tasks;
pub mod tenants;
pub mod ws;
