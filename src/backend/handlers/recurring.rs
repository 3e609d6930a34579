use axum::extract::{Path, State};

use super::{created, deleted, now, ok, ApiResult, Created, Deleted};
use crate::backend::{AppState, AuthUser, ValidJson};
use crate::database::models::RecurringTransaction;
use crate::services::recurring::{self, CreateRecurring, UpdateRecurring};

pub async fn list(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Vec<RecurringTransaction>> {
    ok(recurring::list(&state.db, user.id).await?)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(input): ValidJson<CreateRecurring>,
) -> Created<RecurringTransaction> {
    created(recurring::create(&state.db, user.id, input, now()).await?)
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<RecurringTransaction> {
    ok(recurring::get(&state.db, user.id, id).await?)
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<UpdateRecurring>,
) -> ApiResult<RecurringTransaction> {
    ok(recurring::update(&state.db, user.id, id, input, now()).await?)
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    recurring::delete(&state.db, user.id, id).await?;
    deleted(id)
}
