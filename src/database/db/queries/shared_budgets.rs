use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::SqliteExecutor;

use super::money;
use crate::database::models::{BudgetMember, BudgetRole, SharedBudget};

/*==========Shared Budget Queries=========== */

pub struct SharedBudgetFields<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub category: &'a str,
    pub amount: Decimal,
    pub month: u32,
    pub year: i32,
}

pub async fn insert_shared_budget(
    ex: impl SqliteExecutor<'_>,
    owner_id: i64,
    fields: &SharedBudgetFields<'_>,
    now: NaiveDateTime,
) -> Result<SharedBudget, sqlx::Error> {
    sqlx::query_as::<_, SharedBudget>(
        r#"
        INSERT INTO shared_budgets (owner_id, name, description, category, amount, month, year, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(owner_id)
    .bind(fields.name)
    .bind(fields.description)
    .bind(fields.category)
    .bind(money(&fields.amount))
    .bind(fields.month)
    .bind(fields.year)
    .bind(now)
    .bind(now)
    .fetch_one(ex)
    .await
}

pub async fn get_shared_budget(ex: impl SqliteExecutor<'_>, id: i64) -> Result<Option<SharedBudget>, sqlx::Error> {
    sqlx::query_as::<_, SharedBudget>("SELECT * FROM shared_budgets WHERE id = ?")
        .bind(id)
        .fetch_optional(ex)
        .await
}

/// Budgets the user owns or holds a permission on.
pub async fn list_for_user(ex: impl SqliteExecutor<'_>, user_id: i64) -> Result<Vec<SharedBudget>, sqlx::Error> {
    sqlx::query_as::<_, SharedBudget>(
        r#"
        SELECT DISTINCT sb.* FROM shared_budgets sb
        LEFT JOIN budget_permissions bp ON bp.shared_budget_id = sb.id
        WHERE sb.owner_id = ? OR bp.user_id = ?
        ORDER BY sb.year DESC, sb.month DESC, sb.id DESC
        "#,
    )
    .bind(user_id)
    .bind(user_id)
    .fetch_all(ex)
    .await
}

pub async fn update_shared_budget(
    ex: impl SqliteExecutor<'_>,
    id: i64,
    fields: &SharedBudgetFields<'_>,
    now: NaiveDateTime,
) -> Result<SharedBudget, sqlx::Error> {
    sqlx::query_as::<_, SharedBudget>(
        r#"
        UPDATE shared_budgets
        SET name = ?, description = ?, category = ?, amount = ?, month = ?, year = ?, updated_at = ?
        WHERE id = ?
        RETURNING *
        "#,
    )
    .bind(fields.name)
    .bind(fields.description)
    .bind(fields.category)
    .bind(money(&fields.amount))
    .bind(fields.month)
    .bind(fields.year)
    .bind(now)
    .bind(id)
    .fetch_one(ex)
    .await
}

pub async fn delete_shared_budget(ex: impl SqliteExecutor<'_>, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM shared_budgets WHERE id = ?")
        .bind(id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn count_owned(ex: impl SqliteExecutor<'_>, owner_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM shared_budgets WHERE owner_id = ?")
        .bind(owner_id)
        .fetch_one(ex)
        .await
}

/*==========Permission Queries=========== */

pub async fn member_role(
    ex: impl SqliteExecutor<'_>,
    shared_budget_id: i64,
    user_id: i64,
) -> Result<Option<BudgetRole>, sqlx::Error> {
    sqlx::query_scalar("SELECT role FROM budget_permissions WHERE shared_budget_id = ? AND user_id = ?")
        .bind(shared_budget_id)
        .bind(user_id)
        .fetch_optional(ex)
        .await
}

pub async fn members(ex: impl SqliteExecutor<'_>, shared_budget_id: i64) -> Result<Vec<BudgetMember>, sqlx::Error> {
    sqlx::query_as::<_, BudgetMember>(
        r#"
        SELECT bp.id, bp.shared_budget_id, bp.user_id, u.email, u.name, bp.role, bp.created_at
        FROM budget_permissions bp
        JOIN users u ON u.id = bp.user_id
        WHERE bp.shared_budget_id = ?
        ORDER BY bp.created_at ASC, bp.id ASC
        "#,
    )
    .bind(shared_budget_id)
    .fetch_all(ex)
    .await
}

pub async fn add_member(
    ex: impl SqliteExecutor<'_>,
    shared_budget_id: i64,
    user_id: i64,
    role: BudgetRole,
    now: NaiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO budget_permissions (shared_budget_id, user_id, role, created_at) VALUES (?, ?, ?, ?)")
        .bind(shared_budget_id)
        .bind(user_id)
        .bind(role)
        .bind(now)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn set_member_role(
    ex: impl SqliteExecutor<'_>,
    shared_budget_id: i64,
    user_id: i64,
    role: BudgetRole,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE budget_permissions SET role = ? WHERE shared_budget_id = ? AND user_id = ?")
        .bind(role)
        .bind(shared_budget_id)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn remove_member(ex: impl SqliteExecutor<'_>, shared_budget_id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM budget_permissions WHERE shared_budget_id = ? AND user_id = ?")
        .bind(shared_budget_id)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}
