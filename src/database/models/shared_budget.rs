use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::decimal_column;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetRole {
    Admin,
    Contributor,
    Viewer,
}

impl BudgetRole {
    pub fn as_str(self) -> &'static str {
        match self {
            BudgetRole::Admin => "ADMIN",
            BudgetRole::Contributor => "CONTRIBUTOR",
            BudgetRole::Viewer => "VIEWER",
        }
    }

    pub fn can_edit(self) -> bool {
        matches!(self, BudgetRole::Admin | BudgetRole::Contributor)
    }

    pub fn can_invite(self) -> bool {
        matches!(self, BudgetRole::Admin)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedBudget {
    pub id: i64,
    pub owner_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub amount: Decimal,
    pub month: u32,
    pub year: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl<'r> FromRow<'r, SqliteRow> for SharedBudget {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(SharedBudget {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            amount: decimal_column(row, "amount")?,
            month: row.try_get("month")?,
            year: row.try_get("year")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A permission row joined with the member's identity.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BudgetMember {
    pub id: i64,
    pub shared_budget_id: i64,
    pub user_id: i64,
    pub email: String,
    pub name: String,
    pub role: BudgetRole,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_flags() {
        assert!(BudgetRole::Admin.can_edit() && BudgetRole::Admin.can_invite());
        assert!(BudgetRole::Contributor.can_edit() && !BudgetRole::Contributor.can_invite());
        assert!(!BudgetRole::Viewer.can_edit() && !BudgetRole::Viewer.can_invite());
    }
}
