use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::json;
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::{budgets, goals, recurring, transactions};
use crate::database::models::ReportFormat;
use crate::error::{Error, Result};
use crate::services::reports::Download;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

/// Quote a value when it contains a delimiter, quote, or line break.
pub fn escape_csv(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

pub fn csv_line(values: &[&str]) -> String {
    let mut line = values.iter().map(|v| escape_csv(v)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

pub fn parse_format(raw: Option<&str>) -> Result<ReportFormat> {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        None | Some("json") => Ok(ReportFormat::Json),
        Some("csv") => Ok(ReportFormat::Csv),
        Some(other) => Err(Error::field("format", format!("Unsupported format: {other}"))),
    }
}

/// Everything the user owns, as one JSON document or a sectioned CSV file.
pub async fn export_data(pool: &Pool<Sqlite>, user_id: i64, query: ExportQuery, now: NaiveDateTime) -> Result<Download> {
    let format = parse_format(query.format.as_deref())?;
    let txns = transactions::all_transactions(pool, user_id).await?;
    let budgets = budgets::all_budgets(pool, user_id).await?;
    let goals = goals::list_goals(pool, user_id, None).await?;
    let recurring = recurring::list_recurring(pool, user_id).await?;
    let stamp = now.format("%Y-%m-%d");

    tracing::info!(user_id, ?format, transactions = txns.len(), "data export");

    match format {
        ReportFormat::Json => {
            let body = json!({
                "exportedAt": now,
                "transactions": txns,
                "budgets": budgets,
                "goals": goals,
                "recurringTransactions": recurring,
            });
            Ok(Download {
                content_type: "application/json",
                filename: format!("financeflow-export-{stamp}.json"),
                body: serde_json::to_string_pretty(&body)
                    .map_err(|e| Error::Internal(format!("export serialization failed: {e}")))?,
            })
        }
        ReportFormat::Csv => {
            let mut out = String::from("TRANSACTIONS\n");
            out.push_str(&csv_line(&["Date", "Type", "Category", "Description", "Amount", "Notes"]));
            for t in &txns {
                out.push_str(&csv_line(&[
                    &t.date.to_string(),
                    t.kind.as_str(),
                    &t.category,
                    &t.description,
                    &t.amount.to_string(),
                    t.notes.as_deref().unwrap_or(""),
                ]));
            }

            out.push_str("\nBUDGETS\n");
            out.push_str(&csv_line(&["Category", "Amount", "Month", "Year"]));
            for b in &budgets {
                out.push_str(&csv_line(&[&b.category, &b.amount.to_string(), &b.month.to_string(), &b.year.to_string()]));
            }

            out.push_str("\nGOALS\n");
            out.push_str(&csv_line(&["Name", "Target", "Current", "Target Date", "Status"]));
            for g in &goals {
                let status = format!("{:?}", g.status).to_uppercase();
                out.push_str(&csv_line(&[
                    &g.name,
                    &g.target_amount.to_string(),
                    &g.current_amount.to_string(),
                    &g.target_date.to_string(),
                    &status,
                ]));
            }

            Ok(Download {
                content_type: "text/csv",
                filename: format!("financeflow-export-{stamp}.csv"),
                body: out,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_only_when_needed() {
        assert_eq!(escape_csv("plain"), "plain");
        assert_eq!(escape_csv("a,b"), "\"a,b\"");
        assert_eq!(escape_csv("say \"hi\""), "\"say \"\"hi\"\"\"");
        assert_eq!(escape_csv("two\nlines"), "\"two\nlines\"");
    }

    #[test]
    fn line_joins_and_terminates() {
        assert_eq!(csv_line(&["Date", "Coffee, large", "4.50"]), "Date,\"Coffee, large\",4.50\n");
    }

    #[test]
    fn format_parsing() {
        assert_eq!(parse_format(None).unwrap(), ReportFormat::Json);
        assert_eq!(parse_format(Some("CSV")).unwrap(), ReportFormat::Csv);
        assert!(parse_format(Some("xml")).is_err());
    }
}
