/// Database models
///
/// Each model owns its schema documentation, a sqlx `FromRow` struct, and the
/// query methods the API controllers call. Queries on tenant-owned rows
/// (tasks, comments, notifications) always take the caller's tenant id and
/// inject an equality predicate; no unscoped variants are exposed.
///
/// - `tenant`: organization/isolation boundary
/// - `user`: account with a role, belonging to one tenant
/// - `task`: the core work item
/// - `comment`: threaded discussion on a task
/// - `notification`: durable per-user notification inbox

pub mod comment;
pub mod notification;
pub mod task;
pub mod tenant;
pub mod user;
