/// Builders for every email the system sends
///
/// Templates render to [`EmailMessage`] values; the caller hands them to
/// the dispatcher. `frontend_url` is the base URL of the web client, used
/// for deep links into tasks.

use chrono::{DateTime, Utc};

use super::transport::EmailMessage;
use crate::models::task::Task;
use crate::models::user::User;

fn due_date_line(due_date: Option<DateTime<Utc>>) -> String {
    match due_date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => "Not set".to_string(),
    }
}

/// Sent once after registration
pub fn welcome(user: &User) -> EmailMessage {
    EmailMessage {
        to: user.email.clone(),
        subject: "Welcome to TaskHub".to_string(),
        html_body: format!(
            "<h1>Welcome {}!</h1>\
             <p>Thank you for joining TaskHub.</p>\
             <p>You can now start creating and managing your tasks.</p>\
             <p>If you have any questions, feel free to contact our support team.</p>",
            user.name
        ),
    }
}

/// Sent to the assignee when a task is assigned to them
pub fn task_assignment(user: &User, task: &Task, frontend_url: &str) -> EmailMessage {
    EmailMessage {
        to: user.email.clone(),
        subject: "New Task Assigned".to_string(),
        html_body: format!(
            "<h1>Hello {},</h1>\
             <p>You have been assigned a new task:</p>\
             <h2>{}</h2>\
             <p>{}</p>\
             <p>Priority: {}</p>\
             <p>Due Date: {}</p>\
             <p><a href=\"{}/tasks/{}\">View Task</a></p>",
            user.name,
            task.title,
            task.description,
            task.priority,
            due_date_line(task.due_date),
            frontend_url,
            task.id
        ),
    }
}

/// Sent when someone else comments on a task the recipient owns or holds
pub fn comment_notification(
    user: &User,
    task: &Task,
    author_name: &str,
    content: &str,
    frontend_url: &str,
) -> EmailMessage {
    EmailMessage {
        to: user.email.clone(),
        subject: "New Comment on Task".to_string(),
        html_body: format!(
            "<h1>Hello {},</h1>\
             <p>There is a new comment on your task:</p>\
             <h2>{}</h2>\
             <p>Comment by {}:</p>\
             <p>{}</p>\
             <p><a href=\"{}/tasks/{}\">View Task</a></p>",
            user.name, task.title, author_name, content, frontend_url, task.id
        ),
    }
}

/// Sent to every member when their tenant is deleted
pub fn tenant_deletion(user: &User) -> EmailMessage {
    EmailMessage {
        to: user.email.clone(),
        subject: "Tenant Deletion Notice".to_string(),
        html_body: format!(
            "<h1>Hello {},</h1>\
             <p>Your tenant account has been deleted.</p>\
             <p>If you believe this was done in error, please contact our \
             support team immediately.</p>",
            user.name
        ),
    }
}

/// Sent to the tenant admin after a subscription plan change
pub fn subscription_update(user: &User, plan: &str) -> EmailMessage {
    EmailMessage {
        to: user.email.clone(),
        subject: "Subscription Plan Updated".to_string(),
        html_body: format!(
            "<h1>Hello {},</h1>\
             <p>Your subscription plan has been updated to: {}</p>\
             <p>Thank you for your continued support!</p>",
            user.name, plan
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;
    use uuid::Uuid;

    fn test_user(name: &str, email: &str) -> User {
        User {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: "user".to_string(),
            tenant_id: Some(Uuid::new_v4()),
            settings: json!({}),
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            last_login_at: None,
        }
    }

    fn test_task(title: &str) -> Task {
        Task {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            assignee_id: None,
            title: title.to_string(),
            description: "Do the thing".to_string(),
            priority: "high".to_string(),
            status: "todo".to_string(),
            due_date: None,
            tags: vec![],
            parent_task_id: None,
            estimated_hours: None,
            actual_hours: None,
            is_archived: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_welcome_addresses_the_user() {
        let user = test_user("Ada", "ada@example.com");
        let message = welcome(&user);

        assert_eq!(message.to, "ada@example.com");
        assert_eq!(message.subject, "Welcome to TaskHub");
        assert!(message.html_body.contains("Welcome Ada!"));
    }

    #[test]
    fn test_assignment_links_to_the_task() {
        let user = test_user("Ada", "ada@example.com");
        let task = test_task("Ship it");
        let message = task_assignment(&user, &task, "https://app.taskhub.io");

        assert!(message.html_body.contains("Ship it"));
        assert!(message
            .html_body
            .contains(&format!("https://app.taskhub.io/tasks/{}", task.id)));
        assert!(message.html_body.contains("Due Date: Not set"));
    }

    #[test]
    fn test_comment_notification_names_the_author() {
        let user = test_user("Ada", "ada@example.com");
        let task = test_task("Ship it");
        let message =
            comment_notification(&user, &task, "Grace", "Looks good", "https://app.taskhub.io");

        assert!(message.html_body.contains("Comment by Grace:"));
        assert!(message.html_body.contains("Looks good"));
    }

    #[test]
    fn test_subscription_update_names_the_plan() {
        let user = test_user("Ada", "ada@example.com");
        let message = subscription_update(&user, "pro");

        assert!(message.html_body.contains("updated to: pro"));
    }
}
