use axum::extract::{Path, State};

use super::{created, deleted, now, ok, ApiResult, Created, Deleted};
use crate::backend::{AppState, AuthUser, ValidJson};
use crate::database::models::{BudgetMember, SharedBudget};
use crate::services::shared_budgets::{
    self, ChangeRole, CreateSharedBudget, Invite, SharedBudgetDetail, UpdateSharedBudget,
};

pub async fn list(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Vec<SharedBudget>> {
    ok(shared_budgets::list(&state.db, user.id).await?)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(input): ValidJson<CreateSharedBudget>,
) -> Created<SharedBudgetDetail> {
    created(shared_budgets::create(&state.db, user.id, input, now()).await?)
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<SharedBudgetDetail> {
    ok(shared_budgets::get(&state.db, user.id, id).await?)
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<UpdateSharedBudget>,
) -> ApiResult<SharedBudgetDetail> {
    ok(shared_budgets::update(&state.db, user.id, id, input, now()).await?)
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    shared_budgets::delete(&state.db, user.id, id).await?;
    deleted(id)
}

pub async fn invite(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<Invite>,
) -> Created<BudgetMember> {
    let member = shared_budgets::invite(&state.db, state.mailer.as_ref(), user.id, id, input, now()).await?;
    created(member)
}

pub async fn permissions(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Vec<BudgetMember>> {
    ok(shared_budgets::permissions(&state.db, user.id, id).await?)
}

pub async fn change_role(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<ChangeRole>,
) -> ApiResult<Vec<BudgetMember>> {
    ok(shared_budgets::change_role(&state.db, user.id, id, input).await?)
}

pub async fn leave(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    shared_budgets::leave(&state.db, user.id, id).await?;
    deleted(id)
}
