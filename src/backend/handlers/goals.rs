use axum::extract::{Path, State};

use super::{created, deleted, now, ok, ApiResult, Created, Deleted};
use crate::backend::{AppState, AuthUser, ValidJson, ValidQuery};
use crate::database::models::Goal;
use crate::services::goals::{self, Contribute, CreateGoal, GoalDetail, ListQuery, UpdateGoal};

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> ApiResult<Vec<Goal>> {
    ok(goals::list(&state.db, user.id, query).await?)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(input): ValidJson<CreateGoal>,
) -> Created<GoalDetail> {
    created(goals::create(&state.db, user.id, input, now()).await?)
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<GoalDetail> {
    ok(goals::get(&state.db, user.id, id, now()).await?)
}

pub async fn update(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<UpdateGoal>,
) -> ApiResult<GoalDetail> {
    ok(goals::update(&state.db, user.id, id, input, now()).await?)
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    goals::delete(&state.db, user.id, id).await?;
    deleted(id)
}

pub async fn contribute(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<Contribute>,
) -> Created<GoalDetail> {
    created(goals::contribute(&state.db, user.id, id, input, now()).await?)
}
