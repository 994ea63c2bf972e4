/// Database layer
///
/// Connection pooling and migration running. Row types and queries live in
/// the `models` module at the crate root.

pub mod migrations;
pub mod pool;
