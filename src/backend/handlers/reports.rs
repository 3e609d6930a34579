use axum::{
    extract::{Path, State},
    response::Response,
};
use serde::Deserialize;

use super::{attachment, created, deleted, now, ok, ApiResult, Created, Deleted};
use crate::backend::{AppState, AuthUser, ValidJson, ValidQuery};
use crate::database::models::Report;
use crate::error::Result;
use crate::services::dashboard::{self, DashboardStats, RangeQuery};
use crate::services::export::{self, ExportQuery};
use crate::services::reports::{self, GenerateReport};

#[derive(Debug, Default, Deserialize)]
pub struct DownloadQuery {
    pub format: Option<String>,
}

pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidQuery(range): ValidQuery<RangeQuery>,
) -> ApiResult<DashboardStats> {
    ok(dashboard::stats(&state.db, user.id, range, now()).await?)
}

pub async fn list(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<Vec<Report>> {
    ok(reports::list(&state.db, user.id).await?)
}

pub async fn generate(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(input): ValidJson<GenerateReport>,
) -> Created<Report> {
    created(reports::generate(&state.db, user.id, input, now()).await?)
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Report> {
    ok(reports::get(&state.db, user.id, id).await?)
}

pub async fn delete(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
) -> ApiResult<Deleted> {
    reports::delete(&state.db, user.id, id).await?;
    deleted(id)
}

pub async fn download(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ValidQuery(query): ValidQuery<DownloadQuery>,
) -> Result<Response> {
    let report = reports::get(&state.db, user.id, id).await?;
    let format = query
        .format
        .as_deref()
        .map(|f| export::parse_format(Some(f)))
        .transpose()?;
    Ok(attachment(reports::render(&report, format)?))
}

pub async fn export_data(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidQuery(query): ValidQuery<ExportQuery>,
) -> Result<Response> {
    Ok(attachment(export::export_data(&state.db, user.id, query, now()).await?))
}
