use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::types::Json;
use sqlx::SqliteExecutor;

use crate::database::models::{Report, ReportFormat, ReportType};

/*==========Report Queries=========== */

pub struct ReportFields<'a> {
    pub name: &'a str,
    pub kind: ReportType,
    pub format: ReportFormat,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub filters: &'a Value,
    pub data: &'a Value,
}

pub async fn insert_report(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    fields: &ReportFields<'_>,
    now: NaiveDateTime,
) -> Result<Report, sqlx::Error> {
    sqlx::query_as::<_, Report>(
        r#"
        INSERT INTO reports (user_id, name, type, format, start_date, end_date, filters, data, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(fields.name)
    .bind(fields.kind)
    .bind(fields.format)
    .bind(fields.start_date)
    .bind(fields.end_date)
    .bind(Json(fields.filters))
    .bind(Json(fields.data))
    .bind(now)
    .fetch_one(ex)
    .await
}

pub async fn list_reports(ex: impl SqliteExecutor<'_>, user_id: i64, limit: i64) -> Result<Vec<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE user_id = ? ORDER BY created_at DESC, id DESC LIMIT ?")
        .bind(user_id)
        .bind(limit)
        .fetch_all(ex)
        .await
}

pub async fn get_report(ex: impl SqliteExecutor<'_>, user_id: i64, id: i64) -> Result<Option<Report>, sqlx::Error> {
    sqlx::query_as::<_, Report>("SELECT * FROM reports WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(ex)
        .await
}

pub async fn delete_report(ex: impl SqliteExecutor<'_>, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM reports WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_reports(ex: impl SqliteExecutor<'_>, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM reports WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(ex)
        .await
}
