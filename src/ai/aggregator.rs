// src/ai/aggregator.rs
//! 90-day financial metrics behind the Big 4 analysis, cached per user for a day.

use std::collections::HashMap;

use chrono::{Datelike, Duration, Months, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::{ai as q, transactions};
use crate::database::models::financial_snapshot::{CategoryTotal, IncomeStability, MonthlyFlow};
use crate::database::models::{FinancialMetrics, Transaction, TransactionType};
use crate::error::Result;
use crate::services::period::month_key;

pub const WINDOW_DAYS: i64 = 90;
pub const MONTHS: u32 = 3;
pub const SNAPSHOT_TTL_HOURS: i64 = 24;

pub const DISCRETIONARY_CATEGORIES: [&str; 6] = ["Dining", "Entertainment", "Shopping", "Travel", "Hobbies", "Subscriptions"];

fn to_f64(d: Decimal) -> f64 {
    d.to_f64().unwrap_or(0.0)
}

/// Population coefficient of variation in percent; `None` when the mean is zero.
fn cv_percent(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return None;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some(variance.sqrt() / mean * 100.0)
}

pub fn income_stability(cv: Option<f64>) -> IncomeStability {
    match cv {
        None => IncomeStability::Volatile,
        Some(cv) if cv < 10.0 => IncomeStability::Stable,
        Some(cv) if cv < 30.0 => IncomeStability::Variable,
        Some(_) => IncomeStability::Volatile,
    }
}

/// Metrics for the window ending `today`, from that window's live transactions.
pub fn compute(txns: &[Transaction], today: NaiveDate) -> FinancialMetrics {
    let period_start = today - Duration::days(WINDOW_DAYS);

    // the current calendar month and the two before it, oldest first
    let mut monthly: Vec<MonthlyFlow> = (0..MONTHS)
        .rev()
        .map(|back| {
            let month = today.with_day(1).unwrap_or(today) - Months::new(back);
            MonthlyFlow {
                month: month_key(month),
                income: Decimal::ZERO,
                expenses: Decimal::ZERO,
                net: Decimal::ZERO,
                discretionary: Decimal::ZERO,
            }
        })
        .collect();

    let mut balance = Decimal::ZERO;
    let mut by_category: HashMap<&str, Decimal> = HashMap::new();
    let mut count = 0;

    for t in txns.iter().filter(|t| t.date >= period_start && t.date <= today) {
        count += 1;
        match t.kind {
            TransactionType::Income => balance += t.amount,
            TransactionType::Expense => {
                balance -= t.amount;
                *by_category.entry(t.category.as_str()).or_default() += t.amount;
            }
        }

        let key = month_key(t.date);
        let Some(month) = monthly.iter_mut().find(|m| m.month == key) else {
            continue;
        };
        match t.kind {
            TransactionType::Income => month.income += t.amount,
            TransactionType::Expense => {
                month.expenses += t.amount;
                if DISCRETIONARY_CATEGORIES.contains(&t.category.as_str()) {
                    month.discretionary += t.amount;
                }
            }
        }
    }
    for m in &mut monthly {
        m.net = m.income - m.expenses;
    }

    let months = Decimal::from(MONTHS);
    let net_cashflow_avg = (monthly.iter().map(|m| m.net).sum::<Decimal>() / months).round_dp(2);
    let burn_rate = (monthly.iter().map(|m| m.expenses).sum::<Decimal>() / months).round_dp(2);
    let monthly_income_avg = (monthly.iter().map(|m| m.income).sum::<Decimal>() / months).round_dp(2);

    let cashflow_trend_pct = match monthly.as_slice() {
        [.., prev, latest] if !prev.net.is_zero() => {
            to_f64((latest.net - prev.net) / prev.net.abs() * Decimal::ONE_HUNDRED)
        }
        _ => 0.0,
    };

    let discretionary: Vec<f64> = monthly.iter().map(|m| to_f64(m.discretionary)).collect();
    let discretionary_variability_pct = cv_percent(&discretionary).unwrap_or(0.0);

    let incomes: Vec<f64> = monthly.iter().map(|m| to_f64(m.income)).collect();
    let income_cv = cv_percent(&incomes);

    let cash_buffer = balance.max(Decimal::ZERO);
    let buffer_multiple = if burn_rate > Decimal::ZERO { to_f64(cash_buffer / burn_rate) } else { 0.0 };

    let mut top_expense_categories: Vec<CategoryTotal> = by_category
        .into_iter()
        .map(|(category, total)| CategoryTotal { category: category.to_string(), total })
        .collect();
    top_expense_categories.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    top_expense_categories.truncate(5);

    FinancialMetrics {
        period_start,
        period_end: today,
        transaction_count: count,
        monthly,
        net_cashflow_avg,
        cashflow_trend_pct,
        discretionary_variability_pct,
        burn_rate,
        monthly_income_avg,
        income_stability: income_stability(income_cv),
        income_cv_pct: income_cv.unwrap_or(0.0),
        cash_buffer,
        buffer_multiple,
        safety_margin_pct: buffer_multiple / 3.0 * 100.0,
        top_expense_categories,
    }
}

/// Reuse a snapshot younger than a day, otherwise compute and store a new one.
pub async fn snapshot(pool: &Pool<Sqlite>, user_id: i64, now: NaiveDateTime) -> Result<FinancialMetrics> {
    let fresh_since = now - Duration::hours(SNAPSHOT_TTL_HOURS);
    if let Some(cached) = q::latest_snapshot_since(pool, user_id, fresh_since).await? {
        tracing::debug!(user_id, snapshot_id = cached.id, "reusing financial snapshot");
        return Ok(cached.metrics.0);
    }

    let today = now.date();
    let txns = transactions::transactions_between(pool, user_id, today - Duration::days(WINDOW_DAYS), today).await?;
    let metrics = compute(&txns, today);
    q::insert_snapshot(pool, user_id, metrics.period_start, metrics.period_end, &metrics, now).await?;
    Ok(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn txn(date: NaiveDate, kind: TransactionType, category: &str, amount: i64) -> Transaction {
        let at = date.and_hms_opt(12, 0, 0).unwrap();
        Transaction {
            id: 0,
            user_id: 1,
            amount: Decimal::from(amount),
            kind,
            category: category.into(),
            description: "t".into(),
            notes: None,
            date,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    #[test]
    fn three_month_metrics() {
        let today = d(2025, 3, 20);
        let mut txns = Vec::new();
        for (month, dining) in [(1, 100), (2, 200), (3, 300)] {
            txns.push(txn(d(2025, month, 1), TransactionType::Income, "Salary", 3000));
            txns.push(txn(d(2025, month, 5), TransactionType::Expense, "Housing", 1500));
            txns.push(txn(d(2025, month, 9), TransactionType::Expense, "Dining", dining));
        }

        let m = compute(&txns, today);
        assert_eq!(m.monthly.iter().map(|f| f.month.as_str()).collect::<Vec<_>>(), ["2025-01", "2025-02", "2025-03"]);
        assert_eq!(m.transaction_count, 9);
        assert_eq!(m.monthly_income_avg, Decimal::from(3000));
        assert_eq!(m.burn_rate, Decimal::from(1700));
        assert_eq!(m.net_cashflow_avg, Decimal::from(1300));
        assert_eq!(m.income_stability, IncomeStability::Stable);
        assert_eq!(m.cash_buffer, Decimal::from(3900));
        // net went 1400 -> 1300 -> 1200
        assert!((m.cashflow_trend_pct - (-100.0 / 13.0)).abs() < 1e-6);
        // discretionary 100/200/300: sd 81.65 over mean 200
        assert!((m.discretionary_variability_pct - 40.8248).abs() < 1e-3);
        assert_eq!(m.top_expense_categories[0].category, "Housing");
    }

    #[test]
    fn empty_history() {
        let m = compute(&[], d(2025, 3, 20));
        assert_eq!(m.transaction_count, 0);
        assert_eq!(m.income_stability, IncomeStability::Volatile);
        assert_eq!(m.cashflow_trend_pct, 0.0);
        assert_eq!(m.buffer_multiple, 0.0);
        assert_eq!(m.cash_buffer, Decimal::ZERO);
    }

    #[test]
    fn stability_thresholds() {
        assert_eq!(income_stability(Some(9.9)), IncomeStability::Stable);
        assert_eq!(income_stability(Some(10.0)), IncomeStability::Variable);
        assert_eq!(income_stability(Some(30.0)), IncomeStability::Volatile);
    }
}
