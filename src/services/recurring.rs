use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::recurring::{self as q, RecurringFields};
use crate::database::db::queries::transactions;
use crate::database::models::{Frequency, RecurringTransaction, TransactionDraft, TransactionType};
use crate::error::{Error, Result};
use crate::services::transactions::validate_draft;

/// Upper bound on occurrences produced for one template in one run.
const MAX_CATCH_UP: usize = 400;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecurring {
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub description: String,
    pub notes: Option<String>,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRecurring {
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub frequency: Option<Frequency>,
    pub start_date: Option<NaiveDate>,
    /// Absent keeps the end date, `null` clears it.
    #[serde(default, with = "::serde_with::rust::double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    pub is_active: Option<bool>,
}

fn validate(fields: &RecurringFields) -> Result<()> {
    validate_draft(&fields.draft)?;
    if let Some(end) = fields.end_date {
        if end < fields.start_date {
            return Err(Error::field("endDate", "End date must not be before start date"));
        }
    }
    Ok(())
}

/// First scheduled date on or after `today`.
pub fn first_on_or_after(frequency: Frequency, start: NaiveDate, today: NaiveDate) -> Option<NaiveDate> {
    match today.pred_opt() {
        Some(yesterday) if today > start => frequency.next_after(start, yesterday),
        _ => Some(start),
    }
}

pub async fn list(pool: &Pool<Sqlite>, user_id: i64) -> Result<Vec<RecurringTransaction>> {
    Ok(q::list_recurring(pool, user_id).await?)
}

pub async fn get(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<RecurringTransaction> {
    q::get_recurring(pool, user_id, id)
        .await?
        .ok_or(Error::NotFound("Recurring transaction"))
}

pub async fn create(pool: &Pool<Sqlite>, user_id: i64, input: CreateRecurring, now: NaiveDateTime) -> Result<RecurringTransaction> {
    let fields = RecurringFields {
        draft: TransactionDraft {
            amount: input.amount,
            kind: input.kind,
            category: input.category.trim().to_string(),
            description: input.description.trim().to_string(),
            notes: input.notes.filter(|n| !n.trim().is_empty()),
            date: input.start_date,
        },
        frequency: input.frequency,
        start_date: input.start_date,
        end_date: input.end_date,
        next_date: input.start_date,
        is_active: true,
    };
    validate(&fields)?;
    Ok(q::insert_recurring(pool, user_id, &fields, now).await?)
}

pub async fn update(
    pool: &Pool<Sqlite>,
    user_id: i64,
    id: i64,
    input: UpdateRecurring,
    now: NaiveDateTime,
) -> Result<RecurringTransaction> {
    let mut tx = pool.begin().await?;
    let current = q::get_recurring(&mut *tx, user_id, id)
        .await?
        .ok_or(Error::NotFound("Recurring transaction"))?;

    let schedule_changed = input.frequency.is_some_and(|f| f != current.frequency)
        || input.start_date.is_some_and(|d| d != current.start_date);

    let mut fields = RecurringFields {
        draft: TransactionDraft {
            amount: input.amount.unwrap_or(current.amount),
            kind: input.kind.unwrap_or(current.kind),
            category: input.category.map(|c| c.trim().to_string()).unwrap_or(current.category),
            description: input.description.map(|d| d.trim().to_string()).unwrap_or(current.description),
            notes: match input.notes {
                Some(n) if n.trim().is_empty() => None,
                Some(n) => Some(n),
                None => current.notes,
            },
            date: input.start_date.unwrap_or(current.start_date),
        },
        frequency: input.frequency.unwrap_or(current.frequency),
        start_date: input.start_date.unwrap_or(current.start_date),
        end_date: input.end_date.unwrap_or(current.end_date),
        next_date: current.next_date,
        is_active: input.is_active.unwrap_or(current.is_active),
    };
    if schedule_changed {
        fields.next_date = first_on_or_after(fields.frequency, fields.start_date, now.date())
            .ok_or_else(|| Error::field("startDate", "Schedule is out of range"))?;
    }
    validate(&fields)?;

    let updated = q::update_recurring(&mut *tx, user_id, id, &fields, now)
        .await?
        .ok_or(Error::NotFound("Recurring transaction"))?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn delete(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<()> {
    if q::delete_recurring(pool, user_id, id).await? {
        Ok(())
    } else {
        Err(Error::NotFound("Recurring transaction"))
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MaterializeStats {
    pub templates_processed: usize,
    pub transactions_created: usize,
    pub deactivated: usize,
    pub failures: usize,
}

/// Occurrence dates of `template` due on or before `today`, and the schedule state afterwards.
pub fn due_occurrences(template: &RecurringTransaction, today: NaiveDate) -> (Vec<NaiveDate>, NaiveDate, bool) {
    let mut dates = Vec::new();
    let mut next = template.next_date;
    let within_end = |d: NaiveDate| template.end_date.map_or(true, |end| d <= end);

    while next <= today && within_end(next) && dates.len() < MAX_CATCH_UP {
        dates.push(next);
        match template.frequency.next_after(template.start_date, next) {
            Some(n) => next = n,
            None => break,
        }
    }
    (dates, next, within_end(next))
}

async fn materialize_one(pool: &Pool<Sqlite>, template: &RecurringTransaction, today: NaiveDate, now: NaiveDateTime) -> Result<(usize, bool)> {
    let (dates, next, still_active) = due_occurrences(template, today);

    let mut tx = pool.begin().await?;
    for date in &dates {
        let draft = TransactionDraft {
            amount: template.amount,
            kind: template.kind,
            category: template.category.clone(),
            description: template.description.clone(),
            notes: template.notes.clone(),
            date: *date,
        };
        transactions::insert_transaction(&mut *tx, template.user_id, &draft, now).await?;
    }
    q::advance_schedule(&mut *tx, template.id, next, still_active, now).await?;
    tx.commit().await?;
    Ok((dates.len(), !still_active))
}

/// Turn every due template into real transactions, catching up missed runs.
pub async fn materialize_due(pool: &Pool<Sqlite>, now: NaiveDateTime) -> Result<MaterializeStats> {
    let today = now.date();
    let mut stats = MaterializeStats::default();

    for template in q::due_recurring(pool, today).await? {
        stats.templates_processed += 1;
        match materialize_one(pool, &template, today, now).await {
            Ok((created, deactivated)) => {
                stats.transactions_created += created;
                if deactivated {
                    stats.deactivated += 1;
                }
            }
            Err(e) => {
                stats.failures += 1;
                tracing::warn!(error = %e, recurring_id = template.id, "failed to materialize recurring transaction");
            }
        }
    }
    tracing::info!(
        processed = stats.templates_processed,
        created = stats.transactions_created,
        deactivated = stats.deactivated,
        "recurring transactions materialized"
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn template(frequency: Frequency, start: NaiveDate, next: NaiveDate, end: Option<NaiveDate>) -> RecurringTransaction {
        let now = start.and_hms_opt(0, 0, 0).unwrap();
        RecurringTransaction {
            id: 1,
            user_id: 1,
            amount: Decimal::from(1200),
            kind: TransactionType::Expense,
            category: "Housing".into(),
            description: "Rent".into(),
            notes: None,
            frequency,
            start_date: start,
            end_date: end,
            next_date: next,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn catches_up_missed_months() {
        let t = template(Frequency::Monthly, d(2025, 1, 1), d(2025, 1, 1), None);
        let (dates, next, active) = due_occurrences(&t, d(2025, 3, 15));
        assert_eq!(dates, vec![d(2025, 1, 1), d(2025, 2, 1), d(2025, 3, 1)]);
        assert_eq!(next, d(2025, 4, 1));
        assert!(active);
    }

    #[test]
    fn stops_at_end_date() {
        let t = template(Frequency::Weekly, d(2025, 1, 1), d(2025, 1, 1), Some(d(2025, 1, 10)));
        let (dates, next, active) = due_occurrences(&t, d(2025, 2, 1));
        assert_eq!(dates, vec![d(2025, 1, 1), d(2025, 1, 8)]);
        assert_eq!(next, d(2025, 1, 15));
        assert!(!active);
    }

    #[test]
    fn nothing_due_yet() {
        let t = template(Frequency::Daily, d(2025, 5, 1), d(2025, 5, 1), None);
        let (dates, next, active) = due_occurrences(&t, d(2025, 4, 30));
        assert!(dates.is_empty());
        assert_eq!(next, d(2025, 5, 1));
        assert!(active);
    }

    #[test]
    fn first_on_or_after_today() {
        assert_eq!(first_on_or_after(Frequency::Monthly, d(2025, 1, 15), d(2025, 3, 10)), Some(d(2025, 3, 15)));
        assert_eq!(first_on_or_after(Frequency::Monthly, d(2025, 1, 15), d(2025, 3, 15)), Some(d(2025, 3, 15)));
        assert_eq!(first_on_or_after(Frequency::Monthly, d(2025, 6, 1), d(2025, 3, 15)), Some(d(2025, 6, 1)));
    }
}
