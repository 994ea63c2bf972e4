/// Task model and database operations
///
/// Tasks are the core entity of the system. Every task belongs to one
/// tenant and one creator, and is optionally assigned to one user of the
/// same tenant. All queries here are tenant-scoped.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     tenant_id UUID NOT NULL REFERENCES tenants(id) ON DELETE CASCADE,
///     creator_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     assignee_id UUID REFERENCES users(id) ON DELETE SET NULL,
///     title VARCHAR(255) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     priority VARCHAR(20) NOT NULL DEFAULT 'medium',
///     status VARCHAR(20) NOT NULL DEFAULT 'todo',
///     due_date TIMESTAMPTZ,
///     tags TEXT[] NOT NULL DEFAULT '{}',
///     parent_task_id UUID REFERENCES tasks(id) ON DELETE SET NULL,
///     estimated_hours REAL,
///     actual_hours REAL,
///     is_archived BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::user::UserSummary;

/// Task priority levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    /// Converts priority to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }

    /// Parses priority from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(TaskPriority::Low),
            "medium" => Some(TaskPriority::Medium),
            "high" => Some(TaskPriority::High),
            _ => None,
        }
    }
}

/// Task workflow status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
        }
    }

    /// Parses status from string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "todo" => Some(TaskStatus::Todo),
            "in_progress" => Some(TaskStatus::InProgress),
            "review" => Some(TaskStatus::Review),
            "done" => Some(TaskStatus::Done),
            _ => None,
        }
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Tenant this task belongs to
    pub tenant_id: Uuid,

    /// User who created the task
    pub creator_id: Uuid,

    /// User the task is assigned to (None if unassigned)
    pub assignee_id: Option<Uuid>,

    /// Task title
    pub title: String,

    /// Free-form description
    pub description: String,

    /// Priority (low/medium/high)
    pub priority: String,

    /// Workflow status (todo/in_progress/review/done)
    pub status: String,

    /// Optional due date
    pub due_date: Option<DateTime<Utc>>,

    /// Free-form labels
    pub tags: Vec<String>,

    /// Parent task for sub-task hierarchies
    pub parent_task_id: Option<Uuid>,

    /// Estimated effort in hours
    pub estimated_hours: Option<f32>,

    /// Actual effort in hours
    pub actual_hours: Option<f32>,

    /// Soft archive flag (the only non-hard-delete marker in the system)
    pub is_archived: bool,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Task plus creator/assignee summaries, as returned by list/get endpoints
#[derive(Debug, Clone, Serialize)]
pub struct TaskWithUsers {
    #[serde(flatten)]
    pub task: Task,

    /// Creator summary
    pub creator: Option<UserSummary>,

    /// Assignee summary (None if unassigned)
    pub assignee: Option<UserSummary>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub tenant_id: Uuid,
    pub creator_id: Uuid,
    pub assignee_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    pub parent_task_id: Option<Uuid>,
    pub estimated_hours: Option<f32>,
    pub actual_hours: Option<f32>,
}

/// Input for updating a task
///
/// `None` keeps the current value. `assignee_id` and `due_date` use nested
/// options so `Some(None)` clears the column.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub assignee_id: Option<Option<Uuid>>,
    pub tags: Option<Vec<String>>,
    pub estimated_hours: Option<f32>,
    pub actual_hours: Option<f32>,
    pub is_archived: Option<bool>,
}

/// List filters applied on top of the tenant scope
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    /// Case-insensitive substring match on title or description
    pub search: Option<String>,
}

/// Flat row shape for the LEFT JOIN against users (creator + assignee)
#[derive(Debug, sqlx::FromRow)]
struct TaskUserRow {
    #[sqlx(flatten)]
    task: Task,
    creator_name: Option<String>,
    creator_email: Option<String>,
    assignee_name: Option<String>,
    assignee_email: Option<String>,
}

impl TaskUserRow {
    fn into_task_with_users(self) -> TaskWithUsers {
        let creator = match (self.creator_name, self.creator_email) {
            (Some(name), Some(email)) => Some(UserSummary {
                id: self.task.creator_id,
                name,
                email,
            }),
            _ => None,
        };
        let assignee = match (self.task.assignee_id, self.assignee_name, self.assignee_email) {
            (Some(id), Some(name), Some(email)) => Some(UserSummary { id, name, email }),
            _ => None,
        };
        TaskWithUsers {
            task: self.task,
            creator,
            assignee,
        }
    }
}

const TASK_COLUMNS: &str = "t.id, t.tenant_id, t.creator_id, t.assignee_id, t.title, \
     t.description, t.priority, t.status, t.due_date, t.tags, t.parent_task_id, \
     t.estimated_hours, t.actual_hours, t.is_archived, t.created_at, t.updated_at";

const USER_JOIN_COLUMNS: &str = "c.name AS creator_name, c.email AS creator_email, \
     a.name AS assignee_name, a.email AS assignee_email";

impl Task {
    /// Creates a new task
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (tenant_id, creator_id, assignee_id, title, description,
                               priority, status, due_date, tags, parent_task_id,
                               estimated_hours, actual_hours)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, tenant_id, creator_id, assignee_id, title, description,
                      priority, status, due_date, tags, parent_task_id,
                      estimated_hours, actual_hours, is_archived, created_at, updated_at
            "#,
        )
        .bind(data.tenant_id)
        .bind(data.creator_id)
        .bind(data.assignee_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority.as_str())
        .bind(data.status.as_str())
        .bind(data.due_date)
        .bind(data.tags)
        .bind(data.parent_task_id)
        .bind(data.estimated_hours)
        .bind(data.actual_hours)
        .fetch_one(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID with tenant isolation
    pub async fn find_by_id_and_tenant(
        pool: &PgPool,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, tenant_id, creator_id, assignee_id, title, description,
                   priority, status, due_date, tags, parent_task_id,
                   estimated_hours, actual_hours, is_archived, created_at, updated_at
            FROM tasks
            WHERE id = $1 AND tenant_id = $2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Finds a task with creator/assignee summaries, tenant-scoped
    pub async fn find_with_users(
        pool: &PgPool,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<TaskWithUsers>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}, {USER_JOIN_COLUMNS}
            FROM tasks t
            LEFT JOIN users c ON c.id = t.creator_id
            LEFT JOIN users a ON a.id = t.assignee_id
            WHERE t.id = $1 AND t.tenant_id = $2
            "#
        );

        let row = sqlx::query_as::<_, TaskUserRow>(&sql)
            .bind(id)
            .bind(tenant_id)
            .fetch_optional(pool)
            .await?;

        Ok(row.map(TaskUserRow::into_task_with_users))
    }

    /// Lists tasks for a tenant with optional filters, newest first
    pub async fn list_by_tenant(
        pool: &PgPool,
        tenant_id: Uuid,
        filter: &TaskFilter,
    ) -> Result<Vec<TaskWithUsers>, sqlx::Error> {
        let mut sql = format!(
            r#"
            SELECT {TASK_COLUMNS}, {USER_JOIN_COLUMNS}
            FROM tasks t
            LEFT JOIN users c ON c.id = t.creator_id
            LEFT JOIN users a ON a.id = t.assignee_id
            WHERE t.tenant_id = $1
            "#
        );

        let mut bind_count = 1;
        if filter.status.is_some() {
            bind_count += 1;
            sql.push_str(&format!(" AND t.status = ${}", bind_count));
        }
        if filter.priority.is_some() {
            bind_count += 1;
            sql.push_str(&format!(" AND t.priority = ${}", bind_count));
        }
        if filter.assignee_id.is_some() {
            bind_count += 1;
            sql.push_str(&format!(" AND t.assignee_id = ${}", bind_count));
        }
        if filter.search.is_some() {
            bind_count += 1;
            sql.push_str(&format!(
                " AND (t.title ILIKE ${0} OR t.description ILIKE ${0})",
                bind_count
            ));
        }
        sql.push_str(" ORDER BY t.created_at DESC");

        let mut query = sqlx::query_as::<_, TaskUserRow>(&sql).bind(tenant_id);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(priority) = filter.priority {
            query = query.bind(priority.as_str());
        }
        if let Some(assignee_id) = filter.assignee_id {
            query = query.bind(assignee_id);
        }
        if let Some(ref search) = filter.search {
            query = query.bind(format!("%{}%", search));
        }

        let rows = query.fetch_all(pool).await?;

        Ok(rows.into_iter().map(TaskUserRow::into_task_with_users).collect())
    }

    /// Applies a partial update, tenant-scoped
    ///
    /// Returns `None` when the task does not exist in the caller's tenant.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        tenant_id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET title = COALESCE($3, title),
                description = COALESCE($4, description),
                priority = COALESCE($5, priority),
                status = COALESCE($6, status),
                due_date = CASE WHEN $7 THEN $8 ELSE due_date END,
                assignee_id = CASE WHEN $9 THEN $10 ELSE assignee_id END,
                tags = COALESCE($11, tags),
                estimated_hours = COALESCE($12, estimated_hours),
                actual_hours = COALESCE($13, actual_hours),
                is_archived = COALESCE($14, is_archived),
                updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2
            RETURNING id, tenant_id, creator_id, assignee_id, title, description,
                      priority, status, due_date, tags, parent_task_id,
                      estimated_hours, actual_hours, is_archived, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.priority.map(|p| p.as_str()))
        .bind(data.status.map(|s| s.as_str()))
        .bind(data.due_date.is_some())
        .bind(data.due_date.flatten())
        .bind(data.assignee_id.is_some())
        .bind(data.assignee_id.flatten())
        .bind(data.tags)
        .bind(data.estimated_hours)
        .bind(data.actual_hours)
        .bind(data.is_archived)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Hard-deletes a task, tenant-scoped
    ///
    /// Related comments are removed by ON DELETE CASCADE.
    pub async fn delete(pool: &PgPool, id: Uuid, tenant_id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1 AND tenant_id = $2")
            .bind(id)
            .bind(tenant_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
