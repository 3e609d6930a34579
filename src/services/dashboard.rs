use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::{notifications, transactions};
use crate::database::models::Transaction;
use crate::error::{Error, Result};
use crate::services::period::month_bounds;
use crate::services::reports::{expense_by_category, summarize, CategoryShare};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
    pub transaction_count: usize,
    pub expense_by_category: Vec<CategoryShare>,
    pub recent_transactions: Vec<Transaction>,
    pub unread_notifications: i64,
}

/// Totals for a date range; defaults to the current calendar month.
pub async fn stats(pool: &Pool<Sqlite>, user_id: i64, range: RangeQuery, now: NaiveDateTime) -> Result<DashboardStats> {
    let (month_start, month_end) = month_bounds(now.year(), now.month())?;
    let start = range.start_date.unwrap_or(month_start);
    let end = range.end_date.unwrap_or(month_end);
    if start > end {
        return Err(Error::field("startDate", "Start date must not be after end date"));
    }

    let txns = transactions::transactions_between(pool, user_id, start, end).await?;
    let summary = summarize(&txns, start, end);

    Ok(DashboardStats {
        start_date: start,
        end_date: end,
        total_income: summary.total_income,
        total_expense: summary.total_expense,
        net: summary.net,
        transaction_count: summary.transaction_count,
        expense_by_category: expense_by_category(&txns),
        recent_transactions: transactions::recent_transactions(pool, user_id, 5).await?,
        unread_notifications: notifications::unread_count(pool, user_id).await?,
    })
}
