use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use super::{decimal_column, TransactionType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Frequency {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Quarterly,
    Yearly,
}

enum Step {
    Days(u64),
    Months(u32),
}

impl Frequency {
    fn step(self) -> Step {
        match self {
            Frequency::Daily => Step::Days(1),
            Frequency::Weekly => Step::Days(7),
            Frequency::Biweekly => Step::Days(14),
            Frequency::Monthly => Step::Months(1),
            Frequency::Quarterly => Step::Months(3),
            Frequency::Yearly => Step::Months(12),
        }
    }

    /// The `n`-th occurrence counted from `start` (n = 0 is `start` itself).
    /// Month steps are computed from the anchor so the 31st stays the 31st where it exists.
    pub fn occurrence(self, start: NaiveDate, n: u32) -> Option<NaiveDate> {
        match self.step() {
            Step::Days(d) => start.checked_add_days(Days::new(d * n as u64)),
            Step::Months(m) => start.checked_add_months(Months::new(m * n)),
        }
    }

    /// First occurrence of the schedule anchored at `start` that falls strictly after `after`.
    pub fn next_after(self, start: NaiveDate, after: NaiveDate) -> Option<NaiveDate> {
        if after < start {
            return Some(start);
        }
        let mut n = match self.step() {
            Step::Days(d) => ((after - start).num_days() as u64 / d) as u32,
            Step::Months(m) => {
                let months = (after.year() - start.year()) * 12 + after.month() as i32 - start.month() as i32;
                (months.max(0) as u32) / m
            }
        };
        loop {
            let candidate = self.occurrence(start, n)?;
            if candidate > after {
                return Some(candidate);
            }
            n += 1;
        }
    }

    /// How many times per month this frequency fires, for monthly projections.
    pub fn monthly_factor(self) -> Decimal {
        match self {
            Frequency::Daily => Decimal::from(30),
            Frequency::Weekly => Decimal::new(433, 2),
            Frequency::Biweekly => Decimal::new(217, 2),
            Frequency::Monthly => Decimal::ONE,
            Frequency::Quarterly => Decimal::ONE / Decimal::from(3),
            Frequency::Yearly => Decimal::ONE / Decimal::from(12),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecurringTransaction {
    pub id: i64,
    pub user_id: i64,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub description: String,
    pub notes: Option<String>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_date: NaiveDate,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl<'r> FromRow<'r, SqliteRow> for RecurringTransaction {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(RecurringTransaction {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            amount: decimal_column(row, "amount")?,
            kind: row.try_get("type")?,
            category: row.try_get("category")?,
            description: row.try_get("description")?,
            notes: row.try_get("notes")?,
            frequency: row.try_get("frequency")?,
            start_date: row.try_get("start_date")?,
            end_date: row.try_get("end_date")?,
            next_date: row.try_get("next_date")?,
            is_active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn day_based_steps() {
        let start = d(2025, 1, 1);
        assert_eq!(Frequency::Daily.next_after(start, start), Some(d(2025, 1, 2)));
        assert_eq!(Frequency::Weekly.next_after(start, start), Some(d(2025, 1, 8)));
        assert_eq!(Frequency::Biweekly.next_after(start, d(2025, 1, 20)), Some(d(2025, 1, 29)));
    }

    #[test]
    fn month_steps_clamp_without_drifting() {
        let start = d(2025, 1, 31);
        assert_eq!(Frequency::Monthly.next_after(start, start), Some(d(2025, 2, 28)));
        // anchored on the 31st, so March is the 31st again
        assert_eq!(Frequency::Monthly.next_after(start, d(2025, 2, 28)), Some(d(2025, 3, 31)));
        assert_eq!(Frequency::Quarterly.next_after(start, start), Some(d(2025, 4, 30)));
        assert_eq!(Frequency::Yearly.next_after(d(2024, 2, 29), d(2024, 2, 29)), Some(d(2025, 2, 28)));
    }

    #[test]
    fn before_start_returns_start() {
        let start = d(2025, 6, 15);
        assert_eq!(Frequency::Monthly.next_after(start, d(2025, 1, 1)), Some(start));
    }

    #[test]
    fn monthly_factors() {
        assert_eq!(Frequency::Weekly.monthly_factor(), Decimal::new(433, 2));
        assert_eq!((Frequency::Yearly.monthly_factor() * Decimal::from(12)).round_dp(6), Decimal::ONE);
    }
}
