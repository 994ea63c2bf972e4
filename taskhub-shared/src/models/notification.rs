/// Notification model and database operations
///
/// Durable per-user notification inbox. A row is written whenever a unicast
/// relay event fires (task assignment, new comment), so users who were
/// offline still see what happened. Tenant-scoped like every other entity.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE notifications (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
///     kind VARCHAR(20) NOT NULL,
///     title VARCHAR(255) NOT NULL,
///     message TEXT NOT NULL,
///     link VARCHAR(512),
///     is_read BOOLEAN NOT NULL DEFAULT FALSE,
///     metadata JSONB NOT NULL DEFAULT '{}',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT notifications_kind_check CHECK (
///         kind IN ('task', 'comment', 'mention', 'system')
///     )
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

/// Notification categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Task,
    Comment,
    Mention,
    System,
}

impl NotificationKind {
    /// Converts kind to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Task => "task",
            NotificationKind::Comment => "comment",
            NotificationKind::Mention => "mention",
            NotificationKind::System => "system",
        }
    }
}

/// Notification model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    /// Unique notification ID
    pub id: Uuid,

    /// Recipient
    pub user_id: Uuid,

    /// Tenant scope (always equals the recipient's tenant)
    pub tenant_id: Uuid,

    /// Category
    pub kind: String,

    /// Short title
    pub title: String,

    /// Body text
    pub message: String,

    /// Optional deep link into the frontend
    pub link: Option<String>,

    /// Whether the recipient has read it
    pub is_read: bool,

    /// Structured context (e.g. {"task_id": ...})
    pub metadata: JsonValue,

    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

/// Input for creating a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub metadata: JsonValue,
}

impl Notification {
    /// Creates a notification row
    pub async fn create(pool: &PgPool, data: CreateNotification) -> Result<Self, sqlx::Error> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, tenant_id, kind, title, message, link, metadata)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, user_id, tenant_id, kind, title, message, link, is_read,
                      metadata, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.tenant_id)
        .bind(data.kind.as_str())
        .bind(data.title)
        .bind(data.message)
        .bind(data.link)
        .bind(data.metadata)
        .fetch_one(pool)
        .await?;

        Ok(notification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_as_str() {
        assert_eq!(NotificationKind::Task.as_str(), "task");
        assert_eq!(NotificationKind::Comment.as_str(), "comment");
        assert_eq!(NotificationKind::Mention.as_str(), "mention");
        assert_eq!(NotificationKind::System.as_str(), "system");
    }
}
