/// Task endpoints
///
/// All handlers require a valid bearer token (enforced by the router
/// layer) and a tenant scope (enforced here); every query filters on the
/// caller's tenant ID, so rows from other tenants are indistinguishable
/// from rows that do not exist.
///
/// Write operations fan out over the notification relay after the commit:
/// creates and updates multicast to the tenant, assignments unicast to the
/// assignee, comments unicast to the task's assignee and creator. Email is
/// enqueued best-effort and never fails the request.

use crate::{
    app::AppState,
    error::{map_validation_errors, ApiError, ApiResult},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::json;
use taskhub_shared::{
    auth::{authorization::require_tenant, middleware::AuthContext},
    email::templates,
    models::{
        comment::{Comment, CreateComment},
        notification::{CreateNotification, Notification, NotificationKind},
        task::{CreateTask, Task, TaskFilter, TaskPriority, TaskStatus, TaskWithUsers, UpdateTask},
        user::User,
    },
    relay::{EventKind, WsEvent},
};
use uuid::Uuid;
use validator::Validate;

/// Distinguishes an absent field from an explicit null
///
/// With `#[serde(default, deserialize_with = "double_option")]`, a missing
/// field stays `None` while `"field": null` becomes `Some(None)` and
/// clears the column.
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    #[validate(length(min = 3, max = 100, message = "Title must be 3-100 characters"))]
    pub title: String,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,
    pub due_date: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    pub tags: Option<Vec<String>>,
    pub parent_task_id: Option<Uuid>,
    pub estimated_hours: Option<f32>,
}

/// Update task request; omitted fields keep their value
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[validate(length(min = 3, max = 100, message = "Title must be 3-100 characters"))]
    pub title: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,

    pub priority: Option<TaskPriority>,
    pub status: Option<TaskStatus>,

    #[serde(default, deserialize_with = "double_option")]
    pub due_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, deserialize_with = "double_option")]
    pub assignee_id: Option<Option<Uuid>>,

    pub tags: Option<Vec<String>>,
    pub estimated_hours: Option<f32>,
    pub actual_hours: Option<f32>,
    pub is_archived: Option<bool>,
}

/// List query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assignee_id: Option<Uuid>,
    pub search: Option<String>,
}

/// Create comment request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    #[validate(length(min = 1, max = 1000, message = "Content must be 1-1000 characters"))]
    pub content: String,

    pub parent_id: Option<Uuid>,
}

/// Looks up the assignee inside the caller's tenant
///
/// A user ID from another tenant fails the same way as an unknown ID.
async fn resolve_assignee(
    state: &AppState,
    assignee_id: Uuid,
    tenant_id: Uuid,
) -> ApiResult<User> {
    User::find_by_id_and_tenant(&state.db, assignee_id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::invalid_field("assigneeId", "Assignee not found"))
}

/// Assignment side effects: email, unicast, notification row
async fn notify_assignee(state: &AppState, assignee: &User, task: &Task) {
    state.email.enqueue(templates::task_assignment(
        assignee,
        task,
        &state.config.smtp.frontend_url,
    ));

    let event = WsEvent::new(EventKind::TaskAssigned, task);
    state.relay.emit_to_user(assignee.id, &event);

    let result = Notification::create(
        &state.db,
        CreateNotification {
            user_id: assignee.id,
            tenant_id: task.tenant_id,
            kind: NotificationKind::Task,
            title: "Task assigned".to_string(),
            message: format!("You have been assigned: {}", task.title),
            link: Some(format!("/tasks/{}", task.id)),
            metadata: json!({ "taskId": task.id }),
        },
    )
    .await;

    if let Err(e) = result {
        tracing::warn!(task_id = %task.id, "Failed to store assignment notification: {}", e);
    }
}

/// Create a task
///
/// # Errors
///
/// - `400 Bad Request`: validation failed or assignee not in tenant
/// - `401 Unauthorized` / `403 Forbidden`: auth or tenant scope missing
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskWithUsers>)> {
    let tenant_id = require_tenant(&auth)?;
    req.validate().map_err(map_validation_errors)?;

    let assignee = match req.assignee_id {
        Some(assignee_id) => Some(resolve_assignee(&state, assignee_id, tenant_id).await?),
        None => None,
    };

    let task = Task::create(
        &state.db,
        CreateTask {
            tenant_id,
            creator_id: auth.user_id,
            assignee_id: req.assignee_id,
            title: req.title,
            description: req.description.unwrap_or_default(),
            priority: req.priority.unwrap_or(TaskPriority::Medium),
            status: req.status.unwrap_or(TaskStatus::Todo),
            due_date: req.due_date,
            tags: req.tags.unwrap_or_default(),
            parent_task_id: req.parent_task_id,
            estimated_hours: req.estimated_hours,
            actual_hours: None,
        },
    )
    .await?;

    if let Some(assignee) = assignee {
        notify_assignee(&state, &assignee, &task).await;
    }

    let detail = Task::find_with_users(&state.db, task.id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::InternalError("Created task vanished".to_string()))?;

    let event = WsEvent::new(EventKind::TaskCreated, &detail);
    state.relay.emit_to_tenant(tenant_id, &event);

    Ok((StatusCode::CREATED, Json(detail)))
}

/// List tasks with optional filters, newest first
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Vec<TaskWithUsers>>> {
    let tenant_id = require_tenant(&auth)?;

    let filter = TaskFilter {
        status: query.status,
        priority: query.priority,
        assignee_id: query.assignee_id,
        search: query.search,
    };

    let tasks = Task::list_by_tenant(&state.db, tenant_id, &filter).await?;
    Ok(Json(tasks))
}

/// Task detail with creator/assignee summaries and its comment thread
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let tenant_id = require_tenant(&auth)?;

    let task = Task::find_with_users(&state.db, id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let comments = Comment::list_by_task(&state.db, id, tenant_id).await?;

    let mut body = serde_json::to_value(&task)
        .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))?;
    body["comments"] = serde_json::to_value(&comments)
        .map_err(|e| ApiError::InternalError(format!("Serialization failed: {}", e)))?;

    Ok(Json(body))
}

/// Partial update
///
/// When the assignee changes to a new user, only that user gets the
/// assignment email, unicast, and notification; the previous assignee is
/// not told. The whole tenant receives `task:updated`.
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<TaskWithUsers>> {
    let tenant_id = require_tenant(&auth)?;
    req.validate().map_err(map_validation_errors)?;

    let existing = Task::find_by_id_and_tenant(&state.db, id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;
    let old_assignee_id = existing.assignee_id;

    let new_assignee = match req.assignee_id {
        Some(Some(assignee_id)) if Some(assignee_id) != old_assignee_id => {
            Some(resolve_assignee(&state, assignee_id, tenant_id).await?)
        }
        _ => None,
    };

    let task = Task::update(
        &state.db,
        id,
        tenant_id,
        UpdateTask {
            title: req.title,
            description: req.description,
            priority: req.priority,
            status: req.status,
            due_date: req.due_date,
            assignee_id: req.assignee_id,
            tags: req.tags,
            estimated_hours: req.estimated_hours,
            actual_hours: req.actual_hours,
            is_archived: req.is_archived,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if let Some(assignee) = new_assignee {
        notify_assignee(&state, &assignee, &task).await;
    }

    let detail = Task::find_with_users(&state.db, task.id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let event = WsEvent::new(EventKind::TaskUpdated, &detail);
    state.relay.emit_to_tenant(tenant_id, &event);

    Ok(Json(detail))
}

/// Hard delete
///
/// Comments go with the task via ON DELETE CASCADE. The multicast payload
/// is just the ID; clients drop the row from their views.
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let tenant_id = require_tenant(&auth)?;

    let deleted = Task::delete(&state.db, id, tenant_id).await?;
    if !deleted {
        return Err(ApiError::NotFound("Task not found".to_string()));
    }

    let event = WsEvent::new(EventKind::TaskDeleted, json!({ "id": id }));
    state.relay.emit_to_tenant(tenant_id, &event);

    Ok(StatusCode::NO_CONTENT)
}

/// Add a comment to a task
///
/// The task's assignee and creator each get a `comment:created` unicast,
/// a best-effort email, and a notification row, skipped when they
/// authored the comment.
pub async fn add_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let tenant_id = require_tenant(&auth)?;
    req.validate().map_err(map_validation_errors)?;

    let task = Task::find_by_id_and_tenant(&state.db, id, tenant_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    let comment = Comment::create(
        &state.db,
        CreateComment {
            task_id: id,
            user_id: auth.user_id,
            tenant_id,
            content: req.content,
            parent_id: req.parent_id,
        },
    )
    .await?;

    let event = WsEvent::new(
        EventKind::CommentCreated,
        json!({ "taskId": id, "comment": comment }),
    );

    let author_name = match User::find_by_id(&state.db, auth.user_id).await {
        Ok(Some(author)) => author.name,
        _ => auth.email.clone(),
    };

    if let Some(assignee_id) = task.assignee_id {
        if assignee_id != auth.user_id {
            notify_commenter(&state, assignee_id, &author_name, &task, &comment, &event).await;
        }
    }
    if task.creator_id != auth.user_id {
        notify_commenter(&state, task.creator_id, &author_name, &task, &comment, &event).await;
    }

    Ok((StatusCode::CREATED, Json(comment)))
}

/// Comment side effects for one recipient: unicast, email, notification row
async fn notify_commenter(
    state: &AppState,
    recipient_id: Uuid,
    author_name: &str,
    task: &Task,
    comment: &Comment,
    event: &WsEvent,
) {
    state.relay.emit_to_user(recipient_id, event);

    match User::find_by_id_and_tenant(&state.db, recipient_id, task.tenant_id).await {
        Ok(Some(recipient)) => {
            state.email.enqueue(templates::comment_notification(
                &recipient,
                task,
                author_name,
                &comment.content,
                &state.config.smtp.frontend_url,
            ));
        }
        Ok(None) => {}
        Err(e) => {
            tracing::warn!(task_id = %task.id, "Failed to load comment recipient: {}", e);
        }
    }

    let result = Notification::create(
        &state.db,
        CreateNotification {
            user_id: recipient_id,
            tenant_id: task.tenant_id,
            kind: NotificationKind::Comment,
            title: "New comment".to_string(),
            message: format!("New comment on: {}", task.title),
            link: Some(format!("/tasks/{}", task.id)),
            metadata: json!({ "taskId": task.id, "commentId": comment.id }),
        },
    )
    .await;

    if let Err(e) = result {
        tracing::warn!(task_id = %task.id, "Failed to store comment notification: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_from_missing() {
        let missing: UpdateTaskRequest = serde_json::from_str(r#"{"title":"New name"}"#).unwrap();
        assert_eq!(missing.assignee_id, None);

        let cleared: UpdateTaskRequest = serde_json::from_str(r#"{"assigneeId":null}"#).unwrap();
        assert_eq!(cleared.assignee_id, Some(None));

        let set: UpdateTaskRequest =
            serde_json::from_str(r#"{"assigneeId":"5f0c9fc6-5b3a-4b7f-9e5c-2a1d3e4f5a6b"}"#)
                .unwrap();
        assert!(matches!(set.assignee_id, Some(Some(_))));
    }

    #[test]
    fn test_create_request_validates_title_length() {
        let req = CreateTaskRequest {
            title: "ab".to_string(),
            description: None,
            priority: None,
            status: None,
            due_date: None,
            assignee_id: None,
            tags: None,
            parent_task_id: None,
            estimated_hours: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_comment_request_rejects_empty_content() {
        let req = CreateCommentRequest {
            content: String::new(),
            parent_id: None,
        };
        assert!(req.validate().is_err());
    }
}
