//! Scheduled jobs. Each is callable from the HTTP cron endpoints and from
//! `finance-flow cron <job>`; both paths return the same stats.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{json, Value};
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::{budgets, recurring, transactions, users};
use crate::database::models::{Budget, NewNotification, NotificationType, RecurringTransaction, TransactionType};
use crate::error::{Error, Result};
use crate::services::mailer::{html_escape, Mailer};
use crate::services::{notifications, recurring as recurring_service};

pub const WARNING_PERCENT: i64 = 90;
pub const BILL_LOOKAHEAD_DAYS: i64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    DailyChecks,
    WeeklySummary,
    Recurring,
}

impl FromStr for Job {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "daily-checks" => Ok(Job::DailyChecks),
            "weekly-summary" => Ok(Job::WeeklySummary),
            "recurring" => Ok(Job::Recurring),
            other => Err(Error::BadRequest(format!(
                "unknown job '{other}' (expected daily-checks, weekly-summary or recurring)"
            ))),
        }
    }
}

pub async fn run(pool: &Pool<Sqlite>, mailer: &dyn Mailer, job: Job, now: NaiveDateTime) -> Result<Value> {
    let stats = match job {
        Job::DailyChecks => serde_json::to_value(daily_checks(pool, mailer, now).await?),
        Job::WeeklySummary => serde_json::to_value(weekly_summary(pool, mailer, now).await?),
        Job::Recurring => serde_json::to_value(recurring_service::materialize_due(pool, now).await?),
    };
    stats.map_err(|e| Error::Internal(e.to_string()))
}

/*==========Daily Checks=========== */

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub users_checked: usize,
    pub budget_alerts_created: usize,
    pub bill_reminders_created: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Warning,
    Exceeded,
}

impl AlertLevel {
    fn key(self) -> &'static str {
        match self {
            AlertLevel::Warning => "warning",
            AlertLevel::Exceeded => "exceeded",
        }
    }
}

fn dollars(amount: Decimal) -> String {
    amount.round_dp(2).to_string()
}

/// The alert a budget deserves at this level of spending, if any.
pub fn budget_alert(budget: &Budget, spent: Decimal) -> Option<(AlertLevel, String, String)> {
    if budget.amount <= Decimal::ZERO {
        return None;
    }
    let percent = spent / budget.amount * Decimal::ONE_HUNDRED;
    if spent >= budget.amount {
        Some((
            AlertLevel::Exceeded,
            format!("Budget Exceeded: {}", budget.category),
            format!(
                "You've exceeded your {} budget by ${}",
                budget.category,
                dollars(spent - budget.amount)
            ),
        ))
    } else if percent >= Decimal::from(WARNING_PERCENT) {
        Some((
            AlertLevel::Warning,
            format!("Budget Alert: {}", budget.category),
            format!(
                "You've used {}% of your {} budget (${} of ${})",
                percent.round(),
                budget.category,
                dollars(spent),
                dollars(budget.amount)
            ),
        ))
    } else {
        None
    }
}

pub fn bill_reminder(bill: &RecurringTransaction, today: NaiveDate) -> (String, String) {
    let days = (bill.next_date - today).num_days();
    let when = match days {
        0 => "today".to_string(),
        1 => "in 1 day".to_string(),
        n => format!("in {n} days"),
    };
    (
        format!("Upcoming Bill: {}", bill.description),
        format!("{} of ${} is due {}", bill.description, dollars(bill.amount), when),
    )
}

/// Alerts and reminders created for one user.
async fn check_user(
    pool: &Pool<Sqlite>,
    mailer: &dyn Mailer,
    user_id: i64,
    now: NaiveDateTime,
) -> Result<(usize, usize)> {
    let today = now.date();
    let (month_start, month_end) = super::period::month_bounds(today.year(), today.month())?;
    let (mut alerts, mut reminders) = (0, 0);

    for budget in budgets::budgets_for_month(pool, user_id, today.month(), today.year()).await? {
        let spent = transactions::expense_total(pool, &[user_id], &budget.category, month_start, month_end).await?;
        let Some((level, title, message)) = budget_alert(&budget, spent) else {
            continue;
        };
        let note = NewNotification::new(user_id, NotificationType::BudgetAlert, title, message)
            .priority(2)
            .action_url("/budgets")
            .metadata(json!({
                "budgetId": budget.id,
                "category": budget.category,
                "spent": spent,
                "budgetAmount": budget.amount,
            }))
            .dedupe_key(format!(
                "budget:{}:{}-{:02}:{}",
                budget.id,
                budget.year,
                budget.month,
                level.key()
            ));
        if notifications::notify(pool, mailer, note, now).await?.is_some() {
            alerts += 1;
        }
    }

    let horizon = today + Duration::days(BILL_LOOKAHEAD_DAYS);
    for bill in recurring::upcoming_bills(pool, user_id, today, horizon).await? {
        let (title, message) = bill_reminder(&bill, today);
        let note = NewNotification::new(user_id, NotificationType::BillReminder, title, message)
            .priority(1)
            .action_url("/recurring")
            .metadata(json!({
                "recurringTransactionId": bill.id,
                "amount": bill.amount,
                "dueDate": bill.next_date,
            }))
            .dedupe_key(format!("bill:{}:{}", bill.id, bill.next_date));
        if notifications::notify(pool, mailer, note, now).await?.is_some() {
            reminders += 1;
        }
    }
    Ok((alerts, reminders))
}

/// One user's failure is logged and counted; the rest are still checked.
pub async fn daily_checks(pool: &Pool<Sqlite>, mailer: &dyn Mailer, now: NaiveDateTime) -> Result<DailyStats> {
    let mut stats = DailyStats::default();

    for user_id in users::list_user_ids(pool).await? {
        stats.users_checked += 1;
        match check_user(pool, mailer, user_id, now).await {
            Ok((alerts, reminders)) => {
                stats.budget_alerts_created += alerts;
                stats.bill_reminders_created += reminders;
            }
            Err(e) => {
                stats.failures += 1;
                tracing::warn!(error = %e, user_id, "daily checks failed for user");
            }
        }
    }

    tracing::info!(
        users = stats.users_checked,
        budget_alerts = stats.budget_alerts_created,
        bill_reminders = stats.bill_reminders_created,
        failures = stats.failures,
        "daily checks finished"
    );
    Ok(stats)
}

/*==========Weekly Summary=========== */

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub users_processed: usize,
    pub summaries_created: usize,
    pub emails_sent: usize,
    pub failures: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeekTotals {
    pub count: usize,
    pub income: Decimal,
    pub expenses: Decimal,
    pub top_category: Option<(String, Decimal)>,
}

pub fn week_totals(txns: &[crate::database::models::Transaction]) -> WeekTotals {
    let mut income = Decimal::ZERO;
    let mut expenses = Decimal::ZERO;
    let mut by_category: HashMap<&str, Decimal> = HashMap::new();

    for t in txns {
        match t.kind {
            TransactionType::Income => income += t.amount,
            TransactionType::Expense => {
                expenses += t.amount;
                *by_category.entry(t.category.as_str()).or_default() += t.amount;
            }
        }
    }

    // ties go to the alphabetically first category so reruns agree
    let top_category = by_category
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(c, total)| (c.to_string(), total));

    WeekTotals { count: txns.len(), income, expenses, top_category }
}

pub fn weekly_message(totals: &WeekTotals) -> String {
    let plural = if totals.count == 1 { "" } else { "s" };
    let mut msg = format!(
        "This week: {} transaction{}, ${} spent",
        totals.count,
        plural,
        dollars(totals.expenses)
    );
    if totals.income > Decimal::ZERO {
        msg.push_str(&format!(", ${} earned", dollars(totals.income)));
    }
    let net = totals.income - totals.expenses;
    if net >= Decimal::ZERO {
        msg.push_str(&format!(". Net savings: ${} ✅", dollars(net)));
    } else {
        msg.push_str(&format!(". Deficit: ${} ⚠️", dollars(-net)));
    }
    if let Some((category, total)) = &totals.top_category {
        msg.push_str(&format!(". Top category: {} (${})", category, dollars(*total)));
    }
    msg
}

/// Whether a summary was stored and whether it was emailed.
async fn summarize_user(
    pool: &Pool<Sqlite>,
    mailer: &dyn Mailer,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    now: NaiveDateTime,
) -> Result<(bool, bool)> {
    let txns = transactions::transactions_between(pool, user_id, start, end).await?;
    if txns.is_empty() {
        return Ok((false, false));
    }

    let totals = week_totals(&txns);
    let message = weekly_message(&totals);
    let note = NewNotification::new(user_id, NotificationType::System, "Your Weekly Summary", message.clone())
        .priority(0)
        .action_url("/dashboard")
        .metadata(json!({
            "periodStart": start,
            "periodEnd": end,
            "income": totals.income,
            "expenses": totals.expenses,
            "transactionCount": totals.count,
        }))
        .dedupe_key(format!("weekly:{end}"));
    if notifications::notify(pool, mailer, note, now).await?.is_none() {
        return Ok((false, false));
    }

    let Some(user) = users::get_user(pool, user_id).await? else {
        return Ok((true, false));
    };
    let html = format!("<h2>Your Weekly Summary</h2><p>{}</p>", html_escape(&message));
    match mailer.send(&user.email, "Your FinanceFlow weekly summary", &html).await {
        Ok(()) => Ok((true, true)),
        Err(e) => {
            tracing::warn!(error = %e, user_id, "weekly summary email failed");
            Ok((true, false))
        }
    }
}

pub async fn weekly_summary(pool: &Pool<Sqlite>, mailer: &dyn Mailer, now: NaiveDateTime) -> Result<WeeklyStats> {
    let end = now.date();
    let start = end - Duration::days(6);
    let mut stats = WeeklyStats::default();

    for user_id in users::list_user_ids(pool).await? {
        stats.users_processed += 1;
        match summarize_user(pool, mailer, user_id, start, end, now).await {
            Ok((created, emailed)) => {
                stats.summaries_created += usize::from(created);
                stats.emails_sent += usize::from(emailed);
            }
            Err(e) => {
                stats.failures += 1;
                tracing::warn!(error = %e, user_id, "weekly summary failed for user");
            }
        }
    }

    tracing::info!(
        users = stats.users_processed,
        summaries = stats.summaries_created,
        emails = stats.emails_sent,
        failures = stats.failures,
        "weekly summary finished"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{Frequency, Transaction};

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(9, 0, 0).unwrap()
    }

    fn budget(amount: i64) -> Budget {
        Budget {
            id: 7,
            user_id: 1,
            category: "Dining".into(),
            amount: Decimal::from(amount),
            month: 3,
            year: 2025,
            created_at: at(2025, 3, 1),
            updated_at: at(2025, 3, 1),
        }
    }

    fn txn(kind: TransactionType, category: &str, amount: i64) -> Transaction {
        Transaction {
            id: 1,
            user_id: 1,
            amount: Decimal::from(amount),
            kind,
            category: category.into(),
            description: "x".into(),
            notes: None,
            date: NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            created_at: at(2025, 3, 3),
            updated_at: at(2025, 3, 3),
            deleted_at: None,
        }
    }

    #[test]
    fn alert_thresholds() {
        assert!(budget_alert(&budget(100), Decimal::from(89)).is_none());

        let (level, title, message) = budget_alert(&budget(100), Decimal::from(92)).unwrap();
        assert_eq!(level, AlertLevel::Warning);
        assert_eq!(title, "Budget Alert: Dining");
        assert_eq!(message, "You've used 92% of your Dining budget ($92 of $100)");

        let (level, _, message) = budget_alert(&budget(100), Decimal::from(125)).unwrap();
        assert_eq!(level, AlertLevel::Exceeded);
        assert_eq!(message, "You've exceeded your Dining budget by $25");
    }

    #[test]
    fn reminder_wording() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let bill = RecurringTransaction {
            id: 3,
            user_id: 1,
            amount: Decimal::new(1999, 2),
            kind: TransactionType::Expense,
            category: "Subscriptions".into(),
            description: "Streaming".into(),
            notes: None,
            frequency: Frequency::Monthly,
            start_date: today,
            end_date: None,
            next_date: today + Duration::days(1),
            is_active: true,
            created_at: at(2025, 3, 1),
            updated_at: at(2025, 3, 1),
        };
        let (title, message) = bill_reminder(&bill, today);
        assert_eq!(title, "Upcoming Bill: Streaming");
        assert_eq!(message, "Streaming of $19.99 is due in 1 day");
    }

    #[test]
    fn weekly_wording() {
        let txns = vec![
            txn(TransactionType::Income, "Salary", 1000),
            txn(TransactionType::Expense, "Dining", 120),
            txn(TransactionType::Expense, "Groceries", 80),
        ];
        let totals = week_totals(&txns);
        assert_eq!(
            weekly_message(&totals),
            "This week: 3 transactions, $200 spent, $1000 earned. Net savings: $800 ✅. Top category: Dining ($120)"
        );

        let deficit = week_totals(&[txn(TransactionType::Expense, "Rent", 50)]);
        assert_eq!(
            weekly_message(&deficit),
            "This week: 1 transaction, $50 spent. Deficit: $50 ⚠️. Top category: Rent ($50)"
        );
    }

    #[test]
    fn job_names() {
        assert_eq!("daily-checks".parse::<Job>().unwrap(), Job::DailyChecks);
        assert_eq!("recurring".parse::<Job>().unwrap(), Job::Recurring);
        assert!("hourly".parse::<Job>().is_err());
    }
}
