/// Comment model and database operations
///
/// Comments hang off a task and may be threaded via `parent_id`. The tenant
/// id is denormalized onto every comment row so the scoping filter applies
/// directly, without joining through tasks.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE comments (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     parent_id UUID REFERENCES comments(id) ON DELETE SET NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::UserSummary;

/// Comment model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    /// Unique comment ID
    pub id: Uuid,

    /// Task this comment belongs to
    pub task_id: Uuid,

    /// Author
    pub user_id: Uuid,

    /// Tenant scope (always equals the task's tenant)
    pub tenant_id: Uuid,

    /// Comment body
    pub content: String,

    /// Parent comment for threading (None for top-level comments)
    pub parent_id: Option<Uuid>,

    /// When the comment was created
    pub created_at: DateTime<Utc>,

    /// When the comment was last updated
    pub updated_at: DateTime<Utc>,
}

/// Comment plus author summary, as embedded in task detail responses
#[derive(Debug, Clone, Serialize)]
pub struct CommentWithUser {
    #[serde(flatten)]
    pub comment: Comment,

    /// Author summary
    pub user: Option<UserSummary>,
}

/// Input for creating a new comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub task_id: Uuid,
    pub user_id: Uuid,
    pub tenant_id: Uuid,
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, sqlx::FromRow)]
struct CommentUserRow {
    #[sqlx(flatten)]
    comment: Comment,
    user_name: Option<String>,
    user_email: Option<String>,
}

impl Comment {
    /// Creates a new comment
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, user_id, tenant_id, content, parent_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, task_id, user_id, tenant_id, content, parent_id,
                      created_at, updated_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.tenant_id)
        .bind(data.content)
        .bind(data.parent_id)
        .fetch_one(pool)
        .await?;

        Ok(comment)
    }

    /// Lists a task's comments with author summaries, oldest first
    pub async fn list_by_task(
        pool: &PgPool,
        task_id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Vec<CommentWithUser>, sqlx::Error> {
        let rows = sqlx::query_as::<_, CommentUserRow>(
            r#"
            SELECT cm.id, cm.task_id, cm.user_id, cm.tenant_id, cm.content,
                   cm.parent_id, cm.created_at, cm.updated_at,
                   u.name AS user_name, u.email AS user_email
            FROM comments cm
            LEFT JOIN users u ON u.id = cm.user_id
            WHERE cm.task_id = $1 AND cm.tenant_id = $2
            ORDER BY cm.created_at ASC
            "#,
        )
        .bind(task_id)
        .bind(tenant_id)
        .fetch_all(pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let user = match (row.user_name, row.user_email) {
                    (Some(name), Some(email)) => Some(UserSummary {
                        id: row.comment.user_id,
                        name,
                        email,
                    }),
                    _ => None,
                };
                CommentWithUser {
                    comment: row.comment,
                    user,
                }
            })
            .collect())
    }
}
