use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor};

use super::money;
use crate::database::models::{Transaction, TransactionDraft, TransactionType};

/*==========Transaction Queries=========== */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    Date,
    Amount,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub kind: Option<TransactionType>,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub search: Option<String>,
    pub sort: SortField,
    pub ascending: bool,
    pub limit: i64,
    pub offset: i64,
}

pub async fn insert_transaction(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    draft: &TransactionDraft,
    now: NaiveDateTime,
) -> Result<Transaction, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (user_id, amount, type, category, description, notes, date, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(money(&draft.amount))
    .bind(draft.kind)
    .bind(&draft.category)
    .bind(&draft.description)
    .bind(&draft.notes)
    .bind(draft.date)
    .bind(now)
    .bind(now)
    .fetch_one(ex)
    .await
}

pub async fn get_transaction(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    id: i64,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(ex)
    .await
}

/// `%`, `_` and `\` match literally under `ESCAPE '\'`.
fn like_pattern(search: &str) -> String {
    let mut pattern = String::with_capacity(search.len() + 2);
    pattern.push('%');
    for c in search.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_filters(qb: &mut QueryBuilder<'_, Sqlite>, user_id: i64, filter: &TransactionFilter) {
    qb.push(" WHERE user_id = ").push_bind(user_id).push(" AND deleted_at IS NULL");
    if let Some(kind) = filter.kind {
        qb.push(" AND type = ").push_bind(kind);
    }
    if let Some(category) = &filter.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(start) = filter.start_date {
        qb.push(" AND date >= ").push_bind(start);
    }
    if let Some(end) = filter.end_date {
        qb.push(" AND date <= ").push_bind(end);
    }
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" AND (lower(description) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR lower(coalesce(notes, '')) LIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\' OR lower(category) LIKE ")
            .push_bind(pattern)
            .push(" ESCAPE '\\')");
    }
}

/// One page of matching rows plus the total match count.
pub async fn list_transactions(
    pool: &sqlx::Pool<Sqlite>,
    user_id: i64,
    filter: &TransactionFilter,
) -> Result<(Vec<Transaction>, i64), sqlx::Error> {
    let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM transactions");
    push_filters(&mut count, user_id, filter);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let mut qb = QueryBuilder::<Sqlite>::new("SELECT * FROM transactions");
    push_filters(&mut qb, user_id, filter);
    let order = if filter.ascending { "ASC" } else { "DESC" };
    match filter.sort {
        SortField::Date => qb.push(format!(" ORDER BY date {order}, id {order}")),
        SortField::Amount => qb.push(format!(" ORDER BY CAST(amount AS REAL) {order}, id {order}")),
    };
    qb.push(" LIMIT ").push_bind(filter.limit);
    qb.push(" OFFSET ").push_bind(filter.offset);

    let rows = qb.build_query_as::<Transaction>().fetch_all(pool).await?;
    Ok((rows, total))
}

pub async fn update_transaction(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    id: i64,
    draft: &TransactionDraft,
    now: NaiveDateTime,
) -> Result<Option<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        UPDATE transactions
        SET amount = ?, type = ?, category = ?, description = ?, notes = ?, date = ?, updated_at = ?
        WHERE id = ? AND user_id = ? AND deleted_at IS NULL
        RETURNING *
        "#,
    )
    .bind(money(&draft.amount))
    .bind(draft.kind)
    .bind(&draft.category)
    .bind(&draft.description)
    .bind(&draft.notes)
    .bind(draft.date)
    .bind(now)
    .bind(id)
    .bind(user_id)
    .fetch_optional(ex)
    .await
}

pub async fn soft_delete_transaction(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    id: i64,
    now: NaiveDateTime,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE transactions SET deleted_at = ?, updated_at = ? WHERE id = ? AND user_id = ? AND deleted_at IS NULL",
    )
    .bind(now)
    .bind(now)
    .bind(id)
    .bind(user_id)
    .execute(ex)
    .await?;
    Ok(result.rows_affected() > 0)
}

/// How many of `ids` are live rows owned by `user_id`.
pub async fn count_owned(ex: impl SqliteExecutor<'_>, user_id: i64, ids: &[i64]) -> Result<i64, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT COUNT(*) FROM transactions WHERE deleted_at IS NULL AND user_id = ",
    );
    qb.push_bind(user_id).push(" AND id IN (");
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
    qb.build_query_scalar().fetch_one(ex).await
}

pub enum BulkChange<'a> {
    Delete,
    Category(&'a str),
    Type(TransactionType),
}

pub async fn bulk_update(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    ids: &[i64],
    change: BulkChange<'_>,
    now: NaiveDateTime,
) -> Result<u64, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE transactions SET ");
    match change {
        BulkChange::Delete => qb.push("deleted_at = ").push_bind(now),
        BulkChange::Category(category) => qb.push("category = ").push_bind(category.to_string()),
        BulkChange::Type(kind) => qb.push("type = ").push_bind(kind),
    };
    qb.push(", updated_at = ").push_bind(now);
    qb.push(" WHERE deleted_at IS NULL AND user_id = ").push_bind(user_id).push(" AND id IN (");
    let mut list = qb.separated(", ");
    for id in ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");
    Ok(qb.build().execute(ex).await?.rows_affected())
}

/// Live transactions dated within `[start, end]`, oldest first.
pub async fn transactions_between(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        r#"
        SELECT * FROM transactions
        WHERE user_id = ? AND deleted_at IS NULL AND date >= ? AND date <= ?
        ORDER BY date ASC, id ASC
        "#,
    )
    .bind(user_id)
    .bind(start)
    .bind(end)
    .fetch_all(ex)
    .await
}

pub async fn all_transactions(ex: impl SqliteExecutor<'_>, user_id: i64) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE user_id = ? AND deleted_at IS NULL ORDER BY date DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(ex)
    .await
}

pub async fn recent_transactions(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    limit: i64,
) -> Result<Vec<Transaction>, sqlx::Error> {
    sqlx::query_as::<_, Transaction>(
        "SELECT * FROM transactions WHERE user_id = ? AND deleted_at IS NULL ORDER BY date DESC, id DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(ex)
    .await
}

/// Sum of live EXPENSE rows in a category for any of `user_ids` within `[start, end]`.
pub async fn expense_total(
    pool: &sqlx::Pool<Sqlite>,
    user_ids: &[i64],
    category: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Decimal, sqlx::Error> {
    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT amount FROM transactions WHERE deleted_at IS NULL AND type = 'EXPENSE' AND category = ",
    );
    qb.push_bind(category.to_string());
    qb.push(" AND date >= ").push_bind(start);
    qb.push(" AND date <= ").push_bind(end);
    qb.push(" AND user_id IN (");
    let mut list = qb.separated(", ");
    for id in user_ids {
        list.push_bind(*id);
    }
    list.push_unseparated(")");

    let amounts: Vec<String> = qb.build_query_scalar().fetch_all(pool).await?;
    amounts.iter().try_fold(Decimal::ZERO, |acc, text| {
        text.parse::<Decimal>()
            .map(|d| acc + d)
            .map_err(|e| sqlx::Error::Decode(format!("Invalid Decimal format for amount: {}", e).into()))
    })
}

/// Rows created since `since`, deleted or not; this is what the monthly quota counts.
pub async fn count_created_since(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    since: NaiveDateTime,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM transactions WHERE user_id = ? AND created_at >= ?")
        .bind(user_id)
        .bind(since)
        .fetch_one(ex)
        .await
}
