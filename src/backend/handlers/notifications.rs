use axum::extract::{Path, State};
use serde::Serialize;

use super::{created, deleted, now, ok, ApiResult, Created, Deleted};
use crate::backend::{AppState, AuthUser, ValidJson, ValidQuery};
use crate::database::models::Notification;
use crate::services::notifications::{self, CreateNotification, ListQuery};

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> ApiResult<Vec<Notification>> {
    ok(notifications::list(&state.db, user.id, query).await?)
}

pub async fn create(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(input): ValidJson<CreateNotification>,
) -> Created<Notification> {
    created(notifications::create(&state.db, state.mailer.as_ref(), user.id, input, now()).await?)
}

pub async fn unread_count(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<UnreadCount> {
    let count = notifications::unread_count(&state.db, user.id).await?;
    ok(UnreadCount { count })
}

pub async fn mark_read(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Notification> {
    ok(notifications::mark_read(&state.db, user.id, id, now()).await?)
}

pub async fn mark_all_read(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<MarkedRead> {
    let updated = notifications::mark_all_read(&state.db, user.id, now()).await?;
    ok(MarkedRead { updated })
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    notifications::delete(&state.db, user.id, id).await?;
    deleted(id)
}
