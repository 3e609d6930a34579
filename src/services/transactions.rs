use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::transactions::{self as q, BulkChange, SortField, TransactionFilter};
use crate::database::models::{Transaction, TransactionDraft, TransactionType};
use crate::error::{Error, Result, Validator};
use crate::services::subscriptions::{self, Feature};

pub const DESCRIPTION_MAX: usize = 191;
pub const NOTES_MAX: usize = 2000;
pub const BULK_MAX: usize = 100;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransaction {
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: String,
    pub description: String,
    pub notes: Option<String>,
    pub date: NaiveDate,
}

impl CreateTransaction {
    fn into_draft(self) -> TransactionDraft {
        TransactionDraft {
            amount: self.amount,
            kind: self.kind,
            category: self.category.trim().to_string(),
            description: self.description.trim().to_string(),
            notes: self.notes.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            date: self.date,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransaction {
    pub amount: Option<Decimal>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub date: Option<NaiveDate>,
}

pub fn validate_draft(draft: &TransactionDraft) -> Result<()> {
    Validator::new()
        .check(draft.amount > Decimal::ZERO, "amount", "Amount must be positive")
        .check(draft.amount.scale() <= 2, "amount", "Amount can have at most 2 decimal places")
        .check(!draft.category.is_empty(), "category", "Category is required")
        .check(!draft.description.is_empty(), "description", "Description is required")
        .check(
            draft.description.chars().count() <= DESCRIPTION_MAX,
            "description",
            "Description must be at most 191 characters",
        )
        .check(
            draft.notes.as_ref().map_or(true, |n| n.chars().count() <= NOTES_MAX),
            "notes",
            "Notes must be at most 2000 characters",
        )
        .finish()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Date,
    Amount,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
    pub category: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub search: Option<String>,
    pub sort: Option<SortBy>,
    pub order: Option<SortOrder>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

pub fn total_pages(total: i64, limit: i64) -> i64 {
    ((total + limit - 1) / limit).max(1)
}

pub async fn list(pool: &Pool<Sqlite>, user_id: i64, params: ListParams) -> Result<Page<Transaction>> {
    let page = params.page.unwrap_or(1);
    let limit = params.limit.unwrap_or(10);
    let offset = page.checked_sub(1).and_then(|skipped| skipped.checked_mul(limit));
    Validator::new()
        .check(page >= 1, "page", "Page must be at least 1")
        .check(page < 1 || offset.is_some(), "page", "Page is out of range")
        .check((1..=100).contains(&limit), "limit", "Limit must be between 1 and 100")
        .check(
            match (params.start_date, params.end_date) {
                (Some(s), Some(e)) => s <= e,
                _ => true,
            },
            "startDate",
            "Start date must not be after end date",
        )
        .finish()?;

    let filter = TransactionFilter {
        kind: params.kind,
        category: params.category.filter(|c| !c.trim().is_empty()),
        start_date: params.start_date,
        end_date: params.end_date,
        search: params.search.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()),
        sort: match params.sort.unwrap_or_default() {
            SortBy::Date => SortField::Date,
            SortBy::Amount => SortField::Amount,
        },
        ascending: params.order.unwrap_or_default() == SortOrder::Asc,
        limit,
        offset: offset.unwrap_or_default(),
    };

    let (data, total) = q::list_transactions(pool, user_id, &filter).await?;
    Ok(Page {
        data,
        meta: PageMeta { total, page, limit, total_pages: total_pages(total, limit) },
    })
}

pub async fn create(pool: &Pool<Sqlite>, user_id: i64, input: CreateTransaction, now: NaiveDateTime) -> Result<Transaction> {
    let draft = input.into_draft();
    validate_draft(&draft)?;
    subscriptions::ensure_within_limit(pool, user_id, Feature::Transactions, now).await?;

    let txn = q::insert_transaction(pool, user_id, &draft, now).await?;
    tracing::debug!(user_id, transaction_id = txn.id, "transaction created");
    Ok(txn)
}

pub async fn get(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<Transaction> {
    q::get_transaction(pool, user_id, id)
        .await?
        .ok_or(Error::NotFound("Transaction"))
}

pub async fn update(
    pool: &Pool<Sqlite>,
    user_id: i64,
    id: i64,
    input: UpdateTransaction,
    now: NaiveDateTime,
) -> Result<Transaction> {
    let mut tx = pool.begin().await?;

    let current = q::get_transaction(&mut *tx, user_id, id)
        .await?
        .ok_or(Error::NotFound("Transaction"))?;

    let mut draft = TransactionDraft::from(&current);
    if let Some(amount) = input.amount {
        draft.amount = amount;
    }
    if let Some(kind) = input.kind {
        draft.kind = kind;
    }
    if let Some(category) = input.category {
        draft.category = category.trim().to_string();
    }
    if let Some(description) = input.description {
        draft.description = description.trim().to_string();
    }
    if let Some(notes) = input.notes {
        let notes = notes.trim().to_string();
        draft.notes = (!notes.is_empty()).then_some(notes);
    }
    if let Some(date) = input.date {
        draft.date = date;
    }
    validate_draft(&draft)?;

    let updated = q::update_transaction(&mut *tx, user_id, id, &draft, now)
        .await?
        .ok_or(Error::NotFound("Transaction"))?;
    tx.commit().await?;
    Ok(updated)
}

pub async fn delete(pool: &Pool<Sqlite>, user_id: i64, id: i64, now: NaiveDateTime) -> Result<()> {
    if q::soft_delete_transaction(pool, user_id, id, now).await? {
        Ok(())
    } else {
        Err(Error::NotFound("Transaction"))
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BulkOperation {
    Delete,
    UpdateCategory,
    UpdateType,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkData {
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionType>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkRequest {
    pub operation: BulkOperation,
    pub transaction_ids: Vec<i64>,
    #[serde(default)]
    pub data: BulkData,
}

#[derive(Debug, Serialize)]
pub struct BulkOutcome {
    pub operation: BulkOperation,
    pub affected: u64,
}

/// All-or-nothing: if any id is not a live row of the caller, nothing changes.
pub async fn bulk(pool: &Pool<Sqlite>, user_id: i64, req: BulkRequest, now: NaiveDateTime) -> Result<BulkOutcome> {
    let mut ids = req.transaction_ids.clone();
    ids.sort_unstable();
    ids.dedup();

    Validator::new()
        .check(!ids.is_empty(), "transactionIds", "At least one transaction id is required")
        .check(ids.len() <= BULK_MAX, "transactionIds", "At most 100 transactions per request")
        .finish()?;

    let category = req.data.category.as_deref().map(str::trim);
    let change = match req.operation {
        BulkOperation::Delete => BulkChange::Delete,
        BulkOperation::UpdateCategory => match category {
            Some(c) if !c.is_empty() => BulkChange::Category(c),
            _ => return Err(Error::field("data.category", "Category is required for update_category")),
        },
        BulkOperation::UpdateType => match req.data.kind {
            Some(kind) => BulkChange::Type(kind),
            None => return Err(Error::field("data.type", "Type is required for update_type")),
        },
    };

    let mut tx = pool.begin().await?;
    let owned = q::count_owned(&mut *tx, user_id, &ids).await?;
    if owned != ids.len() as i64 {
        tracing::warn!(user_id, requested = ids.len(), owned, "bulk request touches foreign transactions");
        return Err(Error::Forbidden("One or more transactions do not belong to you".into()));
    }
    let affected = q::bulk_update(&mut *tx, user_id, &ids, change, now).await?;
    tx.commit().await?;

    Ok(BulkOutcome { operation: req.operation, affected })
}
