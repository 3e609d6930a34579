use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::{notifications as q, users};
use crate::database::models::{NewNotification, Notification, NotificationType};
use crate::error::{Error, Result, Validator};
use crate::services::mailer::{html_escape, Mailer};

pub const EMAIL_PRIORITY: i64 = 2;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotification {
    #[serde(rename = "type")]
    pub kind: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: Option<i64>,
    pub action_url: Option<String>,
    pub metadata: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub unread_only: Option<bool>,
    pub limit: Option<i64>,
}

/// Write a notification and email it when it is urgent. Returns `None` for a deduplicated repeat.
pub async fn notify(
    pool: &Pool<Sqlite>,
    mailer: &dyn Mailer,
    notification: NewNotification,
    now: NaiveDateTime,
) -> Result<Option<Notification>> {
    let Some(saved) = q::insert_notification(pool, &notification, now).await? else {
        tracing::debug!(user_id = notification.user_id, key = ?notification.dedupe_key, "duplicate notification skipped");
        return Ok(None);
    };

    if saved.priority >= EMAIL_PRIORITY {
        deliver(pool, mailer, &saved).await;
    }
    Ok(Some(saved))
}

/// Mail failures are logged, never returned.
async fn deliver(pool: &Pool<Sqlite>, mailer: &dyn Mailer, n: &Notification) {
    let user = match users::get_user(pool, n.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return,
        Err(e) => {
            tracing::warn!(error = %e, notification_id = n.id, "could not load recipient");
            return;
        }
    };
    let html = format!("<h2>{}</h2><p>{}</p>", html_escape(&n.title), html_escape(&n.message));
    if let Err(e) = mailer.send(&user.email, &n.title, &html).await {
        tracing::warn!(error = %e, notification_id = n.id, "notification email failed");
    }
}

pub async fn create(
    pool: &Pool<Sqlite>,
    mailer: &dyn Mailer,
    user_id: i64,
    input: CreateNotification,
    now: NaiveDateTime,
) -> Result<Notification> {
    let priority = input.priority.unwrap_or(0);
    let title = input.title.trim().to_string();
    Validator::new()
        .check(!title.is_empty(), "title", "Title is required")
        .check(title.chars().count() <= 200, "title", "Title must be at most 200 characters")
        .check(!input.message.trim().is_empty(), "message", "Message is required")
        .check((0..=2).contains(&priority), "priority", "Priority must be between 0 and 2")
        .finish()?;

    let mut n = NewNotification::new(user_id, input.kind, title, input.message.trim()).priority(priority);
    n.action_url = input.action_url;
    n.metadata = input.metadata;

    notify(pool, mailer, n, now)
        .await?
        .ok_or_else(|| Error::Internal("notification was not stored".into()))
}

pub async fn list(pool: &Pool<Sqlite>, user_id: i64, query: ListQuery) -> Result<Vec<Notification>> {
    let limit = query.limit.unwrap_or(50);
    if !(1..=200).contains(&limit) {
        return Err(Error::field("limit", "Limit must be between 1 and 200"));
    }
    Ok(q::list_notifications(pool, user_id, query.unread_only.unwrap_or(false), limit).await?)
}

pub async fn unread_count(pool: &Pool<Sqlite>, user_id: i64) -> Result<i64> {
    Ok(q::unread_count(pool, user_id).await?)
}

pub async fn mark_read(pool: &Pool<Sqlite>, user_id: i64, id: i64, now: NaiveDateTime) -> Result<Notification> {
    q::mark_read(pool, user_id, id, now)
        .await?
        .ok_or(Error::NotFound("Notification"))
}

pub async fn mark_all_read(pool: &Pool<Sqlite>, user_id: i64, now: NaiveDateTime) -> Result<u64> {
    Ok(q::mark_all_read(pool, user_id, now).await?)
}

pub async fn delete(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<()> {
    if q::delete_notification(pool, user_id, id).await? {
        Ok(())
    } else {
        Err(Error::NotFound("Notification"))
    }
}
