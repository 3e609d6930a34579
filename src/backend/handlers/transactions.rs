use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{created, deleted, now, ok, ApiResult, Created, Deleted};
use crate::backend::{AppState, AuthUser, ValidJson, ValidQuery};
use crate::database::models::Transaction;
use crate::error::Result;
use crate::services::transactions::{
    self, BulkOutcome, BulkRequest, CreateTransaction, ListParams, PageMeta, UpdateTransaction,
};

#[derive(Debug, Serialize)]
pub struct PageEnvelope {
    pub success: bool,
    pub data: Vec<Transaction>,
    pub meta: PageMeta,
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidQuery(params): ValidQuery<ListParams>,
) -> Result<Json<PageEnvelope>> {
    let page = transactions::list(&state.db, user.id, params).await?;
    Ok(Json(PageEnvelope { success: true, data: page.data, meta: page.meta }))
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(input): ValidJson<CreateTransaction>,
) -> Created<Transaction> {
    created(transactions::create(&state.db, user.id, input, now()).await?)
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Transaction> {
    ok(transactions::get(&state.db, user.id, id).await?)
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<UpdateTransaction>,
) -> ApiResult<Transaction> {
    ok(transactions::update(&state.db, user.id, id, input, now()).await?)
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    transactions::delete(&state.db, user.id, id, now()).await?;
    deleted(id)
}

pub async fn bulk(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(req): ValidJson<BulkRequest>,
) -> ApiResult<BulkOutcome> {
    ok(transactions::bulk(&state.db, user.id, req, now()).await?)
}
