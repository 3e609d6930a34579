// src/backend/handlers/mod.rs
//! Thin HTTP adapters: authenticate, parse, call a service, wrap the result.

pub mod ai;
pub mod auth;
pub mod billing;
pub mod budgets;
pub mod cron;
pub mod goals;
pub mod notifications;
pub mod recurring;
pub mod reports;
pub mod shared_budgets;
pub mod transactions;
pub mod webhooks;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{json, Value};

use crate::error::Result;
use crate::services::reports::Download;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

pub type ApiResult<T> = Result<Json<Envelope<T>>>;
pub type Created<T> = Result<(StatusCode, Json<Envelope<T>>)>;

pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(Envelope { success: true, data }))
}

pub fn created<T: Serialize>(data: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(Envelope { success: true, data })))
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub id: i64,
    pub deleted: bool,
}

pub fn deleted(id: i64) -> ApiResult<Deleted> {
    ok(Deleted { id, deleted: true })
}

pub fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

/// File response with a download disposition.
pub fn attachment(download: Download) -> Response {
    let mut response = download.body.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(download.content_type));
    if let Ok(value) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", download.filename)) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    response
}

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "timestamp": chrono::Utc::now().to_rfc3339() }))
}
