use chrono::{Datelike, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::{budgets as q, transactions};
use crate::database::models::{Budget, BudgetProgress};
use crate::error::{Error, Result, Validator};
use crate::services::period::month_bounds;
use crate::services::subscriptions::{self, Feature};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBudget {
    pub category: String,
    pub amount: Decimal,
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBudget {
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MonthQuery {
    pub month: Option<u32>,
    pub year: Option<i32>,
}

pub fn validate_fields(category: &str, amount: Decimal, month: u32, year: i32) -> Result<()> {
    Validator::new()
        .check(!category.trim().is_empty(), "category", "Category is required")
        .check(amount > Decimal::ZERO, "amount", "Amount must be positive")
        .check((1..=12).contains(&month), "month", "Month must be between 1 and 12")
        .check((2000..=2100).contains(&year), "year", "Year must be between 2000 and 2100")
        .finish()
}

async fn with_progress(pool: &Pool<Sqlite>, budget: Budget) -> Result<BudgetProgress> {
    let (start, end) = month_bounds(budget.year, budget.month)?;
    let spent = transactions::expense_total(pool, &[budget.user_id], &budget.category, start, end).await?;
    Ok(BudgetProgress::new(budget, spent))
}

/// Budgets of one month with what has been spent against each.
pub async fn list(pool: &Pool<Sqlite>, user_id: i64, query: MonthQuery, now: NaiveDateTime) -> Result<Vec<BudgetProgress>> {
    let month = query.month.unwrap_or(now.month());
    let year = query.year.unwrap_or(now.year());
    Validator::new()
        .check((1..=12).contains(&month), "month", "Month must be between 1 and 12")
        .check((2000..=2100).contains(&year), "year", "Year must be between 2000 and 2100")
        .finish()?;

    let mut out = Vec::new();
    for budget in q::budgets_for_month(pool, user_id, month, year).await? {
        out.push(with_progress(pool, budget).await?);
    }
    Ok(out)
}

pub async fn create(pool: &Pool<Sqlite>, user_id: i64, input: CreateBudget, now: NaiveDateTime) -> Result<BudgetProgress> {
    let category = input.category.trim();
    validate_fields(category, input.amount, input.month, input.year)?;
    subscriptions::ensure_within_limit(pool, user_id, Feature::Budgets, now).await?;

    let budget = q::create_budget(pool, user_id, category, &input.amount, input.month, input.year, now)
        .await
        .map_err(duplicate_as_conflict)?;
    with_progress(pool, budget).await
}

/// Ownership is checked and the row rewritten in one transaction.
pub async fn update(
    pool: &Pool<Sqlite>,
    user_id: i64,
    id: i64,
    input: UpdateBudget,
    now: NaiveDateTime,
) -> Result<BudgetProgress> {
    let mut tx = pool.begin().await?;
    let current = q::get_budget(&mut *tx, user_id, id)
        .await?
        .ok_or(Error::NotFound("Budget"))?;

    let category = input.category.as_deref().map(str::trim).unwrap_or(&current.category).to_string();
    let amount = input.amount.unwrap_or(current.amount);
    let month = input.month.unwrap_or(current.month);
    let year = input.year.unwrap_or(current.year);
    validate_fields(&category, amount, month, year)?;

    let updated = q::update_budget(&mut *tx, user_id, id, &category, &amount, month, year, now)
        .await
        .map_err(duplicate_as_conflict)?
        .ok_or(Error::NotFound("Budget"))?;
    tx.commit().await?;

    with_progress(pool, updated).await
}

pub async fn delete(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<()> {
    if q::delete_budget(pool, user_id, id).await? {
        Ok(())
    } else {
        Err(Error::NotFound("Budget"))
    }
}

fn duplicate_as_conflict(e: sqlx::Error) -> Error {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Error::Conflict("A budget for this category and month already exists".into())
        }
        _ => Error::Database(e),
    }
}
