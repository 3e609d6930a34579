use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{now, ok, ApiResult};
use crate::backend::{AppState, AuthUser, ValidQuery};
use crate::database::db::queries::versions;
use crate::database::models::ProjectVersion;
use crate::error::{Error, Result};
use crate::services::webhooks::github::{self, PushEvent, PushOutcome};

#[derive(Debug, Default, Deserialize)]
pub struct VersionQuery {
    pub limit: Option<i64>,
}

pub async fn github_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<Value>> {
    let secret = state
        .config
        .github_webhook_secret
        .as_deref()
        .ok_or_else(|| Error::Config("GitHub webhook secret is not configured".into()))?;
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !github::verify_signature(&body, signature, secret) {
        tracing::warn!("github webhook signature mismatch");
        return Err(Error::Unauthorized);
    }

    let event_name = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("push");
    if event_name != "push" {
        return Ok(Json(json!({ "message": format!("Ignoring {event_name} event") })));
    }

    let event: PushEvent =
        serde_json::from_slice(&body).map_err(|_| Error::BadRequest("Invalid push payload".into()))?;
    Ok(Json(match github::handle_push(&state.db, &event, now()).await? {
        PushOutcome::Recorded(version) => json!({ "message": "Version recorded", "version": version }),
        PushOutcome::Skipped(reason) => json!({ "message": reason }),
    }))
}

pub async fn github_status() -> Json<Value> {
    Json(json!({
        "message": "GitHub webhook endpoint is active",
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

pub async fn versioning(
    State(state): State<AppState>,
    AuthUser(_user): AuthUser,
    ValidQuery(query): ValidQuery<VersionQuery>,
) -> ApiResult<Vec<ProjectVersion>> {
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    ok(versions::list_versions(&state.db, limit).await?)
}
