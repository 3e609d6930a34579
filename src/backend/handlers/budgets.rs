use axum::extract::{Path, State};

use super::{created, deleted, now, ok, ApiResult, Created, Deleted};
use crate::backend::{AppState, AuthUser, ValidJson, ValidQuery};
use crate::database::models::BudgetProgress;
use crate::services::budgets::{self, CreateBudget, MonthQuery, UpdateBudget};

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidQuery(query): ValidQuery<MonthQuery>,
) -> ApiResult<Vec<BudgetProgress>> {
    ok(budgets::list(&state.db, user.id, query, now()).await?)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(input): ValidJson<CreateBudget>,
) -> Created<BudgetProgress> {
    created(budgets::create(&state.db, user.id, input, now()).await?)
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<UpdateBudget>,
) -> ApiResult<BudgetProgress> {
    ok(budgets::update(&state.db, user.id, id, input, now()).await?)
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    budgets::delete(&state.db, user.id, id).await?;
    deleted(id)
}
