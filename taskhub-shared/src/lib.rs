//! # TaskHub Shared Library
//!
//! This crate contains shared types, utilities, and business logic used across
//! the TaskHub API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Authentication and authorization utilities
//! - `db`: Connection pool and migration management
//! - `relay`: In-memory WebSocket connection registry and event fan-out
//! - `email`: Best-effort email dispatch queue

pub mod auth;
pub mod db;
pub mod email;
pub mod models;
pub mod relay;

/// Current version of the TaskHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
