// src/ai/forecast.rs
//! Spending forecast: six months of history plus recurring templates, projected
//! forward month by month. The model only writes explanations and insights.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Months, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use super::{generate_object, prompts, ModelFactory};
use crate::database::db::queries::{recurring, transactions, users};
use crate::database::models::{RecurringTransaction, Transaction, TransactionType};
use crate::error::Result;

pub const HISTORY_MONTHS: u32 = 6;
pub const DEFAULT_MONTHS: u32 = 3;
pub const MAX_MONTHS: u32 = 6;
/// Half-over-half change beyond this percentage counts as a trend.
pub const TREND_THRESHOLD_PCT: i64 = 10;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForecastQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(self) -> &'static str {
        match self {
            Trend::Increasing => "increasing",
            Trend::Decreasing => "decreasing",
            Trend::Stable => "stable",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryForecast {
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub projected: Decimal,
    pub historical: Decimal,
    pub recurring: Decimal,
    pub trend: Trend,
    pub confidence: f64,
    pub explanation: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyForecast {
    pub month: u32,
    pub year: i32,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net_balance: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Forecast {
    pub months: Vec<MonthlyForecast>,
    pub categories: Vec<CategoryForecast>,
    pub total_projected: Decimal,
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub confidence: f64,
    pub methodology: String,
    pub insights: Vec<String>,
    pub fallback: bool,
    pub generated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastAnswer {
    #[serde(default)]
    pub category_explanations: HashMap<String, String>,
    pub insights: Vec<String>,
    pub confidence: f64,
    pub methodology: String,
}

fn validate_answer(answer: &ForecastAnswer) -> std::result::Result<(), String> {
    if !(0.0..=1.0).contains(&answer.confidence) {
        return Err(format!("confidence {} is outside 0..1", answer.confidence));
    }
    Ok(())
}

/// Compares the mean amount of the older half of a category's rows with the newer half.
pub fn trend(amounts: &[Decimal]) -> Trend {
    if amounts.len() < 4 {
        return Trend::Stable;
    }
    let mid = amounts.len() / 2;
    let mean = |xs: &[Decimal]| xs.iter().sum::<Decimal>() / Decimal::from(xs.len());
    let (first, second) = (mean(&amounts[..mid]), mean(&amounts[mid..]));
    if first.is_zero() {
        return Trend::Stable;
    }
    let change = (second - first) / first * Decimal::ONE_HUNDRED;
    if change > Decimal::from(TREND_THRESHOLD_PCT) {
        Trend::Increasing
    } else if change < -Decimal::from(TREND_THRESHOLD_PCT) {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Per-category monthly projection; `txns` must be in date order.
pub fn category_forecasts(txns: &[Transaction], templates: &[RecurringTransaction]) -> Vec<CategoryForecast> {
    let mut history: BTreeMap<&str, (TransactionType, Vec<Decimal>)> = BTreeMap::new();
    for t in txns {
        history.entry(t.category.as_str()).or_insert((t.kind, Vec::new())).1.push(t.amount);
    }

    let mut recurring_monthly: BTreeMap<&str, (TransactionType, Decimal)> = BTreeMap::new();
    for r in templates {
        let entry = recurring_monthly.entry(r.category.as_str()).or_insert((r.kind, Decimal::ZERO));
        entry.1 += r.amount * r.frequency.monthly_factor();
    }

    let mut categories: Vec<&str> = history.keys().chain(recurring_monthly.keys()).copied().collect();
    categories.sort_unstable();
    categories.dedup();

    categories
        .into_iter()
        .filter_map(|category| {
            let hist = history.get(category);
            let rec = recurring_monthly.get(category);
            let historical = hist
                .map(|(_, amounts)| amounts.iter().sum::<Decimal>() / Decimal::from(HISTORY_MONTHS))
                .unwrap_or_default();
            let recurring = rec.map(|(_, m)| *m).unwrap_or_default();
            let projected = (historical + recurring).round_dp(2);
            if projected.is_zero() {
                return None;
            }
            let kind = hist.map(|(k, _)| *k).or(rec.map(|(k, _)| *k)).unwrap_or(TransactionType::Expense);
            Some(CategoryForecast {
                category: category.to_string(),
                kind,
                projected,
                historical: historical.round_dp(2),
                recurring: recurring.round_dp(2),
                trend: hist.map(|(_, amounts)| trend(amounts)).unwrap_or(Trend::Stable),
                confidence: if hist.is_some() { 0.8 } else { 0.6 },
                explanation: String::new(),
            })
        })
        .collect()
}

pub fn fallback_answer(transaction_count: usize, category_count: usize) -> ForecastAnswer {
    let coverage = if transaction_count > 0 {
        format!("Analyzed {transaction_count} transactions across {category_count} categories")
    } else {
        "No historical data available - forecast based on recurring transactions only".to_string()
    };
    ForecastAnswer {
        category_explanations: HashMap::new(),
        insights: vec![
            "Forecast based on historical spending patterns from the last 6 months".into(),
            "Recurring transactions have been included in projections".into(),
            coverage,
        ],
        confidence: if transaction_count > 20 { 0.75 } else { 0.5 },
        methodology: "Statistical analysis of historical transactions combined with recurring expense patterns. \
                      Forecast uses historical averages and trend analysis."
            .into(),
    }
}

fn empty_forecast(now: NaiveDateTime) -> Forecast {
    Forecast {
        months: vec![],
        categories: vec![],
        total_projected: Decimal::ZERO,
        total_income: Decimal::ZERO,
        total_expense: Decimal::ZERO,
        confidence: 0.0,
        methodology: "No historical data or recurring transactions available for forecasting.".into(),
        insights: vec![
            "No transaction data available yet. Start by adding some transactions or recurring expenses to generate a forecast.".into(),
            "Once you have at least a few weeks of transaction history, the forecast will become more accurate.".into(),
        ],
        fallback: false,
        generated_at: now,
    }
}

pub fn assemble(
    mut categories: Vec<CategoryForecast>,
    answer: ForecastAnswer,
    months: u32,
    today: NaiveDate,
    fallback: bool,
    now: NaiveDateTime,
) -> Forecast {
    for c in &mut categories {
        c.explanation = answer
            .category_explanations
            .get(&c.category)
            .cloned()
            .unwrap_or_else(|| format!("Projected based on {} historical trend.", c.trend.as_str()));
    }

    let total_for = |kind: TransactionType| {
        categories.iter().filter(|c| c.kind == kind).map(|c| c.projected).sum::<Decimal>()
    };
    let income = total_for(TransactionType::Income);
    let expense = total_for(TransactionType::Expense);

    let first_of_month = today.with_day(1).unwrap_or(today);
    let monthly: Vec<MonthlyForecast> = (1..=months)
        .filter_map(|i| first_of_month.checked_add_months(Months::new(i)))
        .map(|d| MonthlyForecast {
            month: d.month(),
            year: d.year(),
            total_income: income,
            total_expense: expense,
            net_balance: income - expense,
        })
        .collect();

    let n = Decimal::from(monthly.len());
    Forecast {
        months: monthly,
        categories,
        total_projected: expense * n,
        total_income: income * n,
        total_expense: expense * n,
        confidence: answer.confidence,
        methodology: answer.methodology,
        insights: answer.insights,
        fallback,
        generated_at: now,
    }
}

pub async fn forecast(
    pool: &Pool<Sqlite>,
    factory: &dyn ModelFactory,
    user_id: i64,
    query: ForecastQuery,
    now: NaiveDateTime,
) -> Result<Forecast> {
    let months = query.months.unwrap_or(DEFAULT_MONTHS).clamp(1, MAX_MONTHS);
    let today = now.date();
    let since = today.checked_sub_months(Months::new(HISTORY_MONTHS)).unwrap_or(today);

    let txns = transactions::transactions_between(pool, user_id, since, today).await?;
    let templates: Vec<RecurringTransaction> = recurring::active_recurring(pool, user_id)
        .await?
        .into_iter()
        .filter(|r| r.end_date.is_none_or(|end| end >= today))
        .collect();

    let categories = category_forecasts(&txns, &templates);
    if categories.is_empty() {
        tracing::info!(user_id, "no data available for forecast");
        return Ok(empty_forecast(now));
    }

    let mut historical: Vec<&str> = txns.iter().map(|t| t.category.as_str()).collect();
    historical.sort_unstable();
    historical.dedup();

    let user_key = users::get_user(pool, user_id).await?.and_then(|u| u.gemini_api_key);
    let prompt = prompts::forecast(txns.len(), &historical, months, &categories, &templates);
    let answer = match factory.model_for(user_key.as_deref()) {
        Ok(model) => generate_object(model.as_ref(), &prompt, prompts::FORECAST_SCHEMA, validate_answer).await,
        Err(e) => Err(e),
    };

    let (answer, fallback) = match answer {
        Ok(a) => (a, false),
        Err(e) => {
            tracing::warn!(error = %e, user_id, "forecast explanations fell back to statistics");
            (fallback_answer(txns.len(), historical.len()), true)
        }
    };

    tracing::info!(user_id, months, categories = categories.len(), "forecast generated");
    Ok(assemble(categories, answer, months, today, fallback, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Frequency;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn txn(date: NaiveDate, kind: TransactionType, category: &str, amount: i64) -> Transaction {
        let at = date.and_hms_opt(8, 0, 0).unwrap();
        Transaction {
            id: 0,
            user_id: 1,
            amount: Decimal::from(amount),
            kind,
            category: category.into(),
            description: "x".into(),
            notes: None,
            date,
            created_at: at,
            updated_at: at,
            deleted_at: None,
        }
    }

    fn template(category: &str, amount: i64, frequency: Frequency) -> RecurringTransaction {
        let at = d(2025, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        RecurringTransaction {
            id: 1,
            user_id: 1,
            amount: Decimal::from(amount),
            kind: TransactionType::Expense,
            category: category.into(),
            description: "Gym".into(),
            notes: None,
            frequency,
            start_date: d(2025, 1, 1),
            end_date: None,
            next_date: d(2025, 4, 1),
            is_active: true,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn trend_uses_half_split() {
        let amounts = |xs: &[i64]| xs.iter().map(|x| Decimal::from(*x)).collect::<Vec<_>>();
        assert_eq!(trend(&amounts(&[100, 100, 150, 150])), Trend::Increasing);
        assert_eq!(trend(&amounts(&[100, 100, 80, 80])), Trend::Decreasing);
        assert_eq!(trend(&amounts(&[100, 100, 105, 105])), Trend::Stable);
        assert_eq!(trend(&amounts(&[10, 500, 900])), Trend::Stable);
    }

    #[test]
    fn history_and_recurring_combine() {
        let txns = vec![
            txn(d(2025, 1, 3), TransactionType::Expense, "Groceries", 300),
            txn(d(2025, 2, 3), TransactionType::Expense, "Groceries", 300),
            txn(d(2025, 1, 1), TransactionType::Income, "Salary", 6000),
        ];
        let templates = vec![template("Health", 40, Frequency::Monthly), template("Groceries", 10, Frequency::Weekly)];

        let forecasts = category_forecasts(&txns, &templates);
        let by_name: HashMap<_, _> = forecasts.iter().map(|f| (f.category.as_str(), f)).collect();

        // 600 over six months plus 10 * 4.33 weekly
        assert_eq!(by_name["Groceries"].projected, Decimal::new(14330, 2));
        assert_eq!(by_name["Groceries"].confidence, 0.8);
        assert_eq!(by_name["Health"].projected, Decimal::from(40));
        assert_eq!(by_name["Health"].confidence, 0.6);
        assert_eq!(by_name["Salary"].kind, TransactionType::Income);
        assert_eq!(by_name["Salary"].projected, Decimal::from(1000));
    }

    #[test]
    fn assembled_months_follow_today() {
        let txns = vec![txn(d(2025, 1, 3), TransactionType::Expense, "Rent", 6000)];
        let cats = category_forecasts(&txns, &[]);
        let now = d(2025, 11, 15).and_hms_opt(9, 0, 0).unwrap();
        let f = assemble(cats, fallback_answer(1, 1), 3, now.date(), true, now);

        assert_eq!(f.months.iter().map(|m| (m.year, m.month)).collect::<Vec<_>>(), [(2025, 12), (2026, 1), (2026, 2)]);
        assert_eq!(f.total_expense, Decimal::from(3000));
        assert_eq!(f.categories[0].explanation, "Projected based on stable historical trend.");
        assert_eq!(f.confidence, 0.5);
    }
}
