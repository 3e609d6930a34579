use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::decimal_column;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GoalStatus {
    Active,
    Completed,
    Cancelled,
    Paused,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Goal {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub target_amount: Decimal,
    pub current_amount: Decimal,
    pub target_date: NaiveDate,
    pub category: String,
    pub priority: i64,
    pub status: GoalStatus,
    pub completed_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl<'r> FromRow<'r, SqliteRow> for Goal {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Goal {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            target_amount: decimal_column(row, "target_amount")?,
            current_amount: decimal_column(row, "current_amount")?,
            target_date: row.try_get("target_date")?,
            category: row.try_get("category")?,
            priority: row.try_get("priority")?,
            status: row.try_get("status")?,
            completed_at: row.try_get("completed_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalMilestone {
    pub id: i64,
    pub goal_id: i64,
    pub percentage: i64,
    pub amount: Decimal,
    pub description: String,
    pub achieved_at: Option<NaiveDateTime>,
}

impl<'r> FromRow<'r, SqliteRow> for GoalMilestone {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(GoalMilestone {
            id: row.try_get("id")?,
            goal_id: row.try_get("goal_id")?,
            percentage: row.try_get("percentage")?,
            amount: decimal_column(row, "amount")?,
            description: row.try_get("description")?,
            achieved_at: row.try_get("achieved_at")?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalContribution {
    pub id: i64,
    pub goal_id: i64,
    pub amount: Decimal,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}

impl<'r> FromRow<'r, SqliteRow> for GoalContribution {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(GoalContribution {
            id: row.try_get("id")?,
            goal_id: row.try_get("goal_id")?,
            amount: decimal_column(row, "amount")?,
            note: row.try_get("note")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
