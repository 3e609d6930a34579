use chrono::NaiveDateTime;
use sqlx::types::Json;
use sqlx::SqliteExecutor;

use crate::database::models::{NewNotification, Notification};

/*==========Notification Queries=========== */

/// Returns `None` when a row with the same dedupe key already exists for the user.
pub async fn insert_notification(
    ex: impl SqliteExecutor<'_>,
    n: &NewNotification,
    now: NaiveDateTime,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        INSERT INTO notifications (user_id, type, title, message, priority, status, action_url, metadata, dedupe_key, created_at)
        VALUES (?, ?, ?, ?, ?, 'UNREAD', ?, ?, ?, ?)
        ON CONFLICT DO NOTHING
        RETURNING *
        "#,
    )
    .bind(n.user_id)
    .bind(n.kind)
    .bind(&n.title)
    .bind(&n.message)
    .bind(n.priority)
    .bind(&n.action_url)
    .bind(n.metadata.as_ref().map(Json))
    .bind(&n.dedupe_key)
    .bind(now)
    .fetch_optional(ex)
    .await
}

pub async fn list_notifications(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    unread_only: bool,
    limit: i64,
) -> Result<Vec<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        SELECT * FROM notifications
        WHERE user_id = ? AND (? = 0 OR status = 'UNREAD')
        ORDER BY priority DESC, created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(unread_only)
    .bind(limit)
    .fetch_all(ex)
    .await
}

pub async fn unread_count(ex: impl SqliteExecutor<'_>, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM notifications WHERE user_id = ? AND status = 'UNREAD'")
        .bind(user_id)
        .fetch_one(ex)
        .await
}

pub async fn mark_read(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    id: i64,
    now: NaiveDateTime,
) -> Result<Option<Notification>, sqlx::Error> {
    sqlx::query_as::<_, Notification>(
        r#"
        UPDATE notifications SET status = 'READ', read_at = coalesce(read_at, ?)
        WHERE id = ? AND user_id = ?
        RETURNING *
        "#,
    )
    .bind(now)
    .bind(id)
    .bind(user_id)
    .fetch_optional(ex)
    .await
}

pub async fn mark_all_read(ex: impl SqliteExecutor<'_>, user_id: i64, now: NaiveDateTime) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE notifications SET status = 'READ', read_at = ? WHERE user_id = ? AND status = 'UNREAD'")
        .bind(now)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected())
}

pub async fn delete_notification(ex: impl SqliteExecutor<'_>, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}

