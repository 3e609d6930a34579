use chrono::{NaiveDate, NaiveDateTime};
use sqlx::SqliteExecutor;

use super::money;
use crate::database::models::{RecurringTransaction, TransactionDraft, Frequency};

/*==========Recurring Transaction Queries=========== */

pub struct RecurringFields {
    pub draft: TransactionDraft,
    pub frequency: Frequency,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_date: NaiveDate,
    pub is_active: bool,
}

pub async fn insert_recurring(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    fields: &RecurringFields,
    now: NaiveDateTime,
) -> Result<RecurringTransaction, sqlx::Error> {
    sqlx::query_as::<_, RecurringTransaction>(
        r#"
        INSERT INTO recurring_transactions (user_id, amount, type, category, description, notes, frequency,
                                            start_date, end_date, next_date, is_active, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(money(&fields.draft.amount))
    .bind(fields.draft.kind)
    .bind(&fields.draft.category)
    .bind(&fields.draft.description)
    .bind(&fields.draft.notes)
    .bind(fields.frequency)
    .bind(fields.start_date)
    .bind(fields.end_date)
    .bind(fields.next_date)
    .bind(fields.is_active)
    .bind(now)
    .bind(now)
    .fetch_one(ex)
    .await
}

pub async fn get_recurring(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    id: i64,
) -> Result<Option<RecurringTransaction>, sqlx::Error> {
    sqlx::query_as::<_, RecurringTransaction>("SELECT * FROM recurring_transactions WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .fetch_optional(ex)
        .await
}

pub async fn list_recurring(ex: impl SqliteExecutor<'_>, user_id: i64) -> Result<Vec<RecurringTransaction>, sqlx::Error> {
    sqlx::query_as::<_, RecurringTransaction>(
        "SELECT * FROM recurring_transactions WHERE user_id = ? ORDER BY next_date ASC, id ASC",
    )
    .bind(user_id)
    .fetch_all(ex)
    .await
}

pub async fn active_recurring(ex: impl SqliteExecutor<'_>, user_id: i64) -> Result<Vec<RecurringTransaction>, sqlx::Error> {
    sqlx::query_as::<_, RecurringTransaction>(
        "SELECT * FROM recurring_transactions WHERE user_id = ? AND is_active = 1 ORDER BY next_date ASC",
    )
    .bind(user_id)
    .fetch_all(ex)
    .await
}

/// Active templates of every user whose next occurrence is on or before `today`.
pub async fn due_recurring(ex: impl SqliteExecutor<'_>, today: NaiveDate) -> Result<Vec<RecurringTransaction>, sqlx::Error> {
    sqlx::query_as::<_, RecurringTransaction>(
        "SELECT * FROM recurring_transactions WHERE is_active = 1 AND next_date <= ? ORDER BY user_id, id",
    )
    .bind(today)
    .fetch_all(ex)
    .await
}

/// Active EXPENSE templates due within `[from, to]`.
pub async fn upcoming_bills(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<Vec<RecurringTransaction>, sqlx::Error> {
    sqlx::query_as::<_, RecurringTransaction>(
        r#"
        SELECT * FROM recurring_transactions
        WHERE user_id = ? AND is_active = 1 AND type = 'EXPENSE' AND next_date >= ? AND next_date <= ?
        ORDER BY next_date ASC
        "#,
    )
    .bind(user_id)
    .bind(from)
    .bind(to)
    .fetch_all(ex)
    .await
}

pub async fn update_recurring(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    id: i64,
    fields: &RecurringFields,
    now: NaiveDateTime,
) -> Result<Option<RecurringTransaction>, sqlx::Error> {
    sqlx::query_as::<_, RecurringTransaction>(
        r#"
        UPDATE recurring_transactions
        SET amount = ?, type = ?, category = ?, description = ?, notes = ?, frequency = ?,
            start_date = ?, end_date = ?, next_date = ?, is_active = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        RETURNING *
        "#,
    )
    .bind(money(&fields.draft.amount))
    .bind(fields.draft.kind)
    .bind(&fields.draft.category)
    .bind(&fields.draft.description)
    .bind(&fields.draft.notes)
    .bind(fields.frequency)
    .bind(fields.start_date)
    .bind(fields.end_date)
    .bind(fields.next_date)
    .bind(fields.is_active)
    .bind(now)
    .bind(id)
    .bind(user_id)
    .fetch_optional(ex)
    .await
}

pub async fn advance_schedule(
    ex: impl SqliteExecutor<'_>,
    id: i64,
    next_date: NaiveDate,
    is_active: bool,
    now: NaiveDateTime,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE recurring_transactions SET next_date = ?, is_active = ?, updated_at = ? WHERE id = ?")
        .bind(next_date)
        .bind(is_active)
        .bind(now)
        .bind(id)
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn delete_recurring(ex: impl SqliteExecutor<'_>, user_id: i64, id: i64) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM recurring_transactions WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(ex)
        .await?;
    Ok(result.rows_affected() > 0)
}
