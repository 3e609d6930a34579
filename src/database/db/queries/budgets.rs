use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::SqliteExecutor;

use super::money;
use crate::database::models::Budget;

/*==========Budget Queries=========== */

pub async fn create_budget(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    category: &str,
    amount: &Decimal,
    month: u32,
    year: i32,
    now: NaiveDateTime,
) -> Result<Budget, sqlx::Error> {
    sqlx::query_as::<_, Budget>(
        r#"
        INSERT INTO budgets (user_id, category, amount, month, year, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(category)
    .bind(money(amount))
    .bind(month)
    .bind(year)
    .bind(now)
    .bind(now)
    .fetch_one(ex)
    .await
}

pub async fn get_budget(ex: impl SqliteExecutor<'_>, user_id: i64, id: i64) -> Result<Option<Budget>, sqlx::Error> {
    sqlx::query_as::<_, Budget>("SELECT * FROM budgets WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(ex)
        .await
}

pub async fn budgets_for_month(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    month: u32,
    year: i32,
) -> Result<Vec<Budget>, sqlx::Error> {
    sqlx::query_as::<_, Budget>(
        "SELECT * FROM budgets WHERE user_id = ? AND month = ? AND year = ? ORDER BY category ASC",
    )
    .bind(user_id)
    .bind(month)
    .bind(year)
    .fetch_all(ex)
    .await
}

pub async fn all_budgets(ex: impl SqliteExecutor<'_>, user_id: i64) -> Result<Vec<Budget>, sqlx::Error> {
    sqlx::query_as::<_, Budget>("SELECT * FROM budgets WHERE user_id = ? ORDER BY year DESC, month DESC, category ASC")
        .bind(user_id)
        .fetch_all(ex)
        .await
}

pub async fn update_budget(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    id: i64,
    category: &str,
    amount: &Decimal,
    month: u32,
    year: i32,
    now: NaiveDateTime,
) -> Result<Option<Budget>, sqlx::Error> {
    sqlx::query_as::<_, Budget>(
        r#"
        UPDATE budgets
        SET category = ?, amount = ?, month = ?, year = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        RETURNING *
        "#,
    )
    .bind(category)
    .bind(money(amount))
    .bind(month)
    .bind(year)
    .bind(now)
    .bind(id)
    .bind(user_id)
    .fetch_optional(ex)
    .await
}

pub async fn delete_budget(ex: impl SqliteExecutor<'_>, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM budgets WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_budgets(ex: impl SqliteExecutor<'_>, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM budgets WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(ex)
        .await
}
