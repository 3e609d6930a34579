use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncomeStability {
    Stable,
    Variable,
    Volatile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyFlow {
    pub month: String, // YYYY-MM
    pub income: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
    pub discretionary: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: String,
    pub total: Decimal,
}

/// Derived 90-day metrics that feed the Big 4 prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialMetrics {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub transaction_count: usize,
    pub monthly: Vec<MonthlyFlow>,
    pub net_cashflow_avg: Decimal,
    pub cashflow_trend_pct: f64,
    pub discretionary_variability_pct: f64,
    pub burn_rate: Decimal,
    pub monthly_income_avg: Decimal,
    pub income_stability: IncomeStability,
    pub income_cv_pct: f64,
    pub cash_buffer: Decimal,
    pub buffer_multiple: f64,
    pub safety_margin_pct: f64,
    pub top_expense_categories: Vec<CategoryTotal>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSnapshot {
    pub id: i64,
    pub user_id: i64,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub metrics: Json<FinancialMetrics>,
    pub created_at: NaiveDateTime,
}
