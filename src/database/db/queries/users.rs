use chrono::NaiveDateTime;
use sqlx::SqliteExecutor;

use crate::database::models::User;

/*==========User Queries=========== */

pub async fn create_user(
    ex: impl SqliteExecutor<'_>,
    email: &str,
    name: &str,
    token_hash: &str,
    now: NaiveDateTime,
) -> Result<User, sqlx::Error> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, name, api_token_hash, created_at)
        VALUES (?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(email)
    .bind(name)
    .bind(token_hash)
    .bind(now)
    .fetch_one(ex)
    .await
}

pub async fn find_by_token_hash(ex: impl SqliteExecutor<'_>, token_hash: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE api_token_hash = ?")
        .bind(token_hash)
        .fetch_optional(ex)
        .await
}

pub async fn find_by_email(ex: impl SqliteExecutor<'_>, email: &str) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ? COLLATE NOCASE")
        .bind(email)
        .fetch_optional(ex)
        .await
}

pub async fn get_user(ex: impl SqliteExecutor<'_>, user_id: i64) -> Result<Option<User>, sqlx::Error> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(ex)
        .await
}

pub async fn list_user_ids(ex: impl SqliteExecutor<'_>) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM users ORDER BY id")
        .fetch_all(ex)
        .await
}

pub async fn set_token_hash(ex: impl SqliteExecutor<'_>, user_id: i64, token_hash: &str) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET api_token_hash = ? WHERE id = ?")
        .bind(token_hash)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn set_gemini_key(ex: impl SqliteExecutor<'_>, user_id: i64, key: Option<&str>) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE users SET gemini_api_key = ? WHERE id = ?")
        .bind(key)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}
