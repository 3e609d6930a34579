use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::SqliteExecutor;

use super::money;
use crate::database::models::{Goal, GoalContribution, GoalMilestone, GoalStatus};

/*==========Goal Queries=========== */

pub struct GoalFields<'a> {
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub target_amount: Decimal,
    pub target_date: NaiveDate,
    pub category: &'a str,
    pub priority: i64,
}

pub async fn insert_goal(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    fields: &GoalFields<'_>,
    now: NaiveDateTime,
) -> Result<Goal, sqlx::Error> {
    sqlx::query_as::<_, Goal>(
        r#"
        INSERT INTO goals (user_id, name, description, target_amount, current_amount, target_date,
                           category, priority, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, '0', ?, ?, ?, 'ACTIVE', ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(fields.name)
    .bind(fields.description)
    .bind(money(&fields.target_amount))
    .bind(fields.target_date)
    .bind(fields.category)
    .bind(fields.priority)
    .bind(now)
    .bind(now)
    .fetch_one(ex)
    .await
}

pub async fn insert_milestone(
    ex: impl SqliteExecutor<'_>,
    goal_id: i64,
    percentage: i64,
    amount: &Decimal,
    description: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO goal_milestones (goal_id, percentage, amount, description) VALUES (?, ?, ?, ?)")
        .bind(goal_id)
        .bind(percentage)
        .bind(money(amount))
        .bind(description)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn get_goal(ex: impl SqliteExecutor<'_>, user_id: i64, id: i64) -> Result<Option<Goal>, sqlx::Error> {
    sqlx::query_as::<_, Goal>("SELECT * FROM goals WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(ex)
        .await
}

pub async fn list_goals(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    status: Option<GoalStatus>,
) -> Result<Vec<Goal>, sqlx::Error> {
    sqlx::query_as::<_, Goal>(
        r#"
        SELECT * FROM goals
        WHERE user_id = ? AND (? IS NULL OR status = ?)
        ORDER BY priority DESC, target_date ASC
        "#,
    )
    .bind(user_id)
    .bind(status)
    .bind(status)
    .fetch_all(ex)
    .await
}

pub async fn update_goal(
    ex: impl SqliteExecutor<'_>,
    goal: &Goal,
    now: NaiveDateTime,
) -> Result<Goal, sqlx::Error> {
    sqlx::query_as::<_, Goal>(
        r#"
        UPDATE goals
        SET name = ?, description = ?, target_amount = ?, current_amount = ?, target_date = ?,
            category = ?, priority = ?, status = ?, completed_at = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        RETURNING *
        "#,
    )
    .bind(&goal.name)
    .bind(&goal.description)
    .bind(money(&goal.target_amount))
    .bind(money(&goal.current_amount))
    .bind(goal.target_date)
    .bind(&goal.category)
    .bind(goal.priority)
    .bind(goal.status)
    .bind(goal.completed_at)
    .bind(now)
    .bind(goal.id)
    .bind(goal.user_id)
    .fetch_one(ex)
    .await
}

pub async fn delete_goal(ex: impl SqliteExecutor<'_>, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM goals WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn milestones(ex: impl SqliteExecutor<'_>, goal_id: i64) -> Result<Vec<GoalMilestone>, sqlx::Error> {
    sqlx::query_as::<_, GoalMilestone>("SELECT * FROM goal_milestones WHERE goal_id = ? ORDER BY percentage ASC")
        .bind(goal_id)
        .fetch_all(ex)
        .await
}

/// Milestone amounts follow the goal target; achievements are kept.
pub async fn set_milestone_amount(
    ex: impl SqliteExecutor<'_>,
    milestone_id: i64,
    amount: &Decimal,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE goal_milestones SET amount = ? WHERE id = ?")
        .bind(money(amount))
        .bind(milestone_id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn mark_milestone_achieved(
    ex: impl SqliteExecutor<'_>,
    milestone_id: i64,
    now: NaiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE goal_milestones SET achieved_at = ? WHERE id = ? AND achieved_at IS NULL")
        .bind(now)
        .bind(milestone_id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn insert_contribution(
    ex: impl SqliteExecutor<'_>,
    goal_id: i64,
    amount: &Decimal,
    note: Option<&str>,
    now: NaiveDateTime,
) -> Result<GoalContribution, sqlx::Error> {
    sqlx::query_as::<_, GoalContribution>(
        "INSERT INTO goal_contributions (goal_id, amount, note, created_at) VALUES (?, ?, ?, ?) RETURNING *",
    )
    .bind(goal_id)
    .bind(money(amount))
    .bind(note)
    .bind(now)
    .fetch_one(ex)
    .await
}

pub async fn contributions(ex: impl SqliteExecutor<'_>, goal_id: i64) -> Result<Vec<GoalContribution>, sqlx::Error> {
    sqlx::query_as::<_, GoalContribution>(
        "SELECT * FROM goal_contributions WHERE goal_id = ? ORDER BY created_at DESC, id DESC",
    )
    .bind(goal_id)
    .fetch_all(ex)
    .await
}

pub async fn count_goals(ex: impl SqliteExecutor<'_>, user_id: i64) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM goals WHERE user_id = ?")
        .bind(user_id)
        .fetch_one(ex)
        .await
}
