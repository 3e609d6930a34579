use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::reports::{self as q, ReportFields};
use crate::database::db::queries::transactions;
use crate::database::models::{Report, ReportFormat, ReportType, Transaction, TransactionType};
use crate::error::{Error, Result};
use crate::services::export::csv_line;
use crate::services::period::{month_bounds, month_label};
use crate::services::subscriptions::{self, Feature};

const TOP_CATEGORIES: usize = 10;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilters {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub types: Vec<TransactionType>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>,
}

impl ReportFilters {
    fn matches(&self, t: &Transaction) -> bool {
        (self.categories.is_empty() || self.categories.iter().any(|c| c == &t.category))
            && (self.types.is_empty() || self.types.contains(&t.kind))
            && self.min_amount.map_or(true, |min| t.amount >= min)
            && self.max_amount.map_or(true, |max| t.amount <= max)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateReport {
    #[serde(rename = "type")]
    pub kind: ReportType,
    pub name: Option<String>,
    #[serde(default)]
    pub format: ReportFormat,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub filters: ReportFilters,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    pub category: String,
    pub amount: Decimal,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub total: Decimal,
    pub count: usize,
    pub average: Decimal,
    pub min: Decimal,
    pub max: Decimal,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_income: Decimal,
    pub total_expense: Decimal,
    pub net: Decimal,
    pub transaction_count: usize,
    pub average_transaction: Decimal,
    pub daily_average: Decimal,
    pub monthly_projection: Decimal,
    pub top_categories: Vec<CategoryShare>,
}

fn pct(part: Decimal, whole: Decimal) -> f64 {
    if whole.is_zero() {
        0.0
    } else {
        (part / whole * Decimal::ONE_HUNDRED).round_dp(2).to_f64().unwrap_or(0.0)
    }
}

/// Expense totals per category, largest first.
pub fn expense_by_category(txns: &[Transaction]) -> Vec<CategoryShare> {
    let mut totals: BTreeMap<&str, Decimal> = BTreeMap::new();
    let mut all = Decimal::ZERO;
    for t in txns.iter().filter(|t| t.kind == TransactionType::Expense) {
        *totals.entry(t.category.as_str()).or_default() += t.amount;
        all += t.amount;
    }
    let mut shares: Vec<CategoryShare> = totals
        .into_iter()
        .map(|(category, amount)| CategoryShare {
            category: category.to_string(),
            amount,
            percentage: pct(amount, all),
        })
        .collect();
    shares.sort_by(|a, b| b.amount.cmp(&a.amount).then_with(|| a.category.cmp(&b.category)));
    shares
}

pub fn summarize(txns: &[Transaction], start: NaiveDate, end: NaiveDate) -> Summary {
    let income: Decimal = txns.iter().filter(|t| t.kind == TransactionType::Income).map(|t| t.amount).sum();
    let expense: Decimal = txns.iter().filter(|t| t.kind == TransactionType::Expense).map(|t| t.amount).sum();
    let count = txns.len();
    let days = Decimal::from((end - start).num_days().max(0) + 1);
    let daily_average = (expense / days).round_dp(2);

    let mut top = expense_by_category(txns);
    top.truncate(TOP_CATEGORIES);

    Summary {
        total_income: income,
        total_expense: expense,
        net: income - expense,
        transaction_count: count,
        average_transaction: if count == 0 {
            Decimal::ZERO
        } else {
            ((income + expense) / Decimal::from(count)).round_dp(2)
        },
        daily_average,
        monthly_projection: daily_average * Decimal::from(30),
        top_categories: top,
    }
}

pub fn category_breakdown(txns: &[Transaction]) -> Vec<CategoryBreakdown> {
    let mut groups: BTreeMap<(TransactionType, &str), Vec<Decimal>> = BTreeMap::new();
    for t in txns {
        groups.entry((t.kind, t.category.as_str())).or_default().push(t.amount);
    }
    let total_of = |kind: TransactionType| -> Decimal {
        txns.iter().filter(|t| t.kind == kind).map(|t| t.amount).sum()
    };
    let income_total = total_of(TransactionType::Income);
    let expense_total = total_of(TransactionType::Expense);

    let mut out: Vec<CategoryBreakdown> = groups
        .into_iter()
        .map(|((kind, category), amounts)| {
            let total: Decimal = amounts.iter().copied().sum();
            let whole = match kind {
                TransactionType::Income => income_total,
                TransactionType::Expense => expense_total,
            };
            CategoryBreakdown {
                category: category.to_string(),
                kind,
                total,
                count: amounts.len(),
                average: (total / Decimal::from(amounts.len())).round_dp(2),
                min: amounts.iter().copied().min().unwrap_or_default(),
                max: amounts.iter().copied().max().unwrap_or_default(),
                percentage: pct(total, whole),
            }
        })
        .collect();
    out.sort_by(|a, b| b.total.cmp(&a.total));
    out
}

/// Resolve the report period and its default name.
pub fn resolve_period(input: &GenerateReport, now: NaiveDateTime) -> Result<(NaiveDate, NaiveDate, String)> {
    let year = input.year.unwrap_or(now.year());
    let explicit = || -> Result<(NaiveDate, NaiveDate)> {
        match (input.start_date, input.end_date) {
            (Some(s), Some(e)) if s <= e => Ok((s, e)),
            (Some(_), Some(_)) => Err(Error::field("startDate", "Start date must not be after end date")),
            _ => Err(Error::field("startDate", "startDate and endDate are required for this report type")),
        }
    };

    let year_bounds = || -> Result<(NaiveDate, NaiveDate)> {
        let (s, _) = month_bounds(year, 1)?;
        let (_, e) = month_bounds(year, 12)?;
        Ok((s, e))
    };

    Ok(match input.kind {
        ReportType::Monthly => {
            let (s, e) = month_bounds(year, input.month.unwrap_or(now.month()))?;
            (s, e, format!("Monthly Report - {}", month_label(s)))
        }
        ReportType::Yearly => {
            let (s, e) = year_bounds()?;
            (s, e, format!("Yearly Report - {year}"))
        }
        ReportType::Tax => {
            let (s, e) = year_bounds()?;
            (s, e, format!("Tax Report - {year}"))
        }
        ReportType::Category => {
            let (s, e) = explicit()?;
            (s, e, format!("Category Report - {s} to {e}"))
        }
        ReportType::Custom => {
            let (s, e) = explicit()?;
            (s, e, format!("Custom Report - {s} to {e}"))
        }
    })
}

pub async fn generate(pool: &Pool<Sqlite>, user_id: i64, input: GenerateReport, now: NaiveDateTime) -> Result<Report> {
    let (start, end, default_name) = resolve_period(&input, now)?;
    let name = input
        .name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(&default_name)
        .to_string();
    if name.chars().count() > 200 {
        return Err(Error::field("name", "Name must be at most 200 characters"));
    }
    subscriptions::ensure_within_limit(pool, user_id, Feature::Reports, now).await?;

    let txns: Vec<Transaction> = transactions::transactions_between(pool, user_id, start, end)
        .await?
        .into_iter()
        .filter(|t| input.filters.matches(t))
        .collect();

    let data = json!({
        "summary": summarize(&txns, start, end),
        "categoryBreakdown": category_breakdown(&txns),
        "transactions": txns,
    });
    let filters = serde_json::to_value(&input.filters).unwrap_or(Value::Null);

    let fields = ReportFields {
        name: &name,
        kind: input.kind,
        format: input.format,
        start_date: start,
        end_date: end,
        filters: &filters,
        data: &data,
    };
    let report = q::insert_report(pool, user_id, &fields, now).await?;
    tracing::info!(user_id, report_id = report.id, kind = ?report.kind, "report generated");
    Ok(report)
}

pub async fn list(pool: &Pool<Sqlite>, user_id: i64) -> Result<Vec<Report>> {
    Ok(q::list_reports(pool, user_id, 20).await?)
}

pub async fn get(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<Report> {
    q::get_report(pool, user_id, id).await?.ok_or(Error::NotFound("Report"))
}

pub async fn delete(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<()> {
    if q::delete_report(pool, user_id, id).await? {
        Ok(())
    } else {
        Err(Error::NotFound("Report"))
    }
}

pub struct Download {
    pub content_type: &'static str,
    pub filename: String,
    pub body: String,
}

/// Render a stored report in its own format, or in `format` when given.
pub fn render(report: &Report, format: Option<ReportFormat>) -> Result<Download> {
    let stem = format!("report-{}-{}", report.id, report.start_date);
    match format.unwrap_or(report.format) {
        ReportFormat::Json => Ok(Download {
            content_type: "application/json",
            filename: format!("{stem}.json"),
            body: serde_json::to_string_pretty(&report.data.0)
                .map_err(|e| Error::Internal(format!("report serialization failed: {e}")))?,
        }),
        ReportFormat::Csv => {
            let mut out = String::new();
            out.push_str(&csv_line(&["Report", &report.name]));
            out.push_str(&csv_line(&["Period", &report.start_date.to_string(), &report.end_date.to_string()]));
            out.push('\n');
            out.push_str(&csv_line(&["Category", "Type", "Total", "Count", "Average", "Min", "Max", "Percentage"]));
            let rows = report.data.0.get("categoryBreakdown").and_then(Value::as_array).cloned().unwrap_or_default();
            for row in rows {
                let field = |k: &str| match row.get(k) {
                    Some(Value::String(s)) => s.clone(),
                    Some(v) if !v.is_null() => v.to_string(),
                    _ => String::new(),
                };
                out.push_str(&csv_line(&[
                    &field("category"),
                    &field("type"),
                    &field("total"),
                    &field("count"),
                    &field("average"),
                    &field("min"),
                    &field("max"),
                    &field("percentage"),
                ]));
            }
            out.push('\n');
            out.push_str(&csv_line(&["Date", "Type", "Category", "Description", "Amount"]));
            let txns = report.data.0.get("transactions").and_then(Value::as_array).cloned().unwrap_or_default();
            for t in txns {
                let field = |k: &str| t.get(k).and_then(Value::as_str).unwrap_or_default().to_string();
                out.push_str(&csv_line(&[&field("date"), &field("type"), &field("category"), &field("description"), &field("amount")]));
            }
            Ok(Download { content_type: "text/csv", filename: format!("{stem}.csv"), body: out })
        }
    }
}
