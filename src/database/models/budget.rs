use serde::Serialize;
use rust_decimal::Decimal;
use chrono::NaiveDateTime;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::decimal_column;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub category: String,
    pub amount: Decimal,
    pub month: u32,     // 1..=12
    pub year: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl<'r> FromRow<'r, SqliteRow> for Budget {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Budget {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            category: row.try_get("category")?,
            amount: decimal_column(row, "amount")?,
            month: row.try_get("month")?,
            year: row.try_get("year")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// A budget together with what has been spent against it this period.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetProgress {
    #[serde(flatten)]
    pub budget: Budget,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub progress: Decimal,
}

impl BudgetProgress {
    pub fn new(budget: Budget, spent: Decimal) -> Self {
        let remaining = (budget.amount - spent).max(Decimal::ZERO);
        let progress = if budget.amount > Decimal::ZERO {
            (spent / budget.amount * Decimal::ONE_HUNDRED)
                .min(Decimal::ONE_HUNDRED)
                .round_dp(2)
        } else {
            Decimal::ZERO
        };
        BudgetProgress { budget, spent, remaining, progress }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn budget(amount: &str) -> Budget {
        let now = chrono::Utc::now().naive_utc();
        Budget {
            id: 1,
            user_id: 1,
            category: "Food & Dining".into(),
            amount: Decimal::from_str(amount).unwrap(),
            month: 3,
            year: 2025,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn progress_is_capped_and_remaining_never_negative() {
        let over = BudgetProgress::new(budget("100"), Decimal::from(150));
        assert_eq!(over.remaining, Decimal::ZERO);
        assert_eq!(over.progress, Decimal::ONE_HUNDRED);

        let partial = BudgetProgress::new(budget("200"), Decimal::from(50));
        assert_eq!(partial.remaining, Decimal::from(150));
        assert_eq!(partial.progress, Decimal::from(25));
    }
}
