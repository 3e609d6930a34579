use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};

use super::now;
use crate::backend::{bearer_token, AppState};
use crate::error::{Error, Result};
use crate::services::auth::hash_token;
use crate::services::cron::{self, Job};

/// Scheduler entry point, authenticated with `Authorization: Bearer $CRON_SECRET`.
pub async fn run_job(
    State(state): State<AppState>,
    Path(job): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Value>> {
    let secret = state
        .config
        .cron_secret
        .as_deref()
        .ok_or_else(|| Error::Config("CRON_SECRET is not configured".into()))?;
    // compare digests so the check does not leak the secret's prefix
    let presented = bearer_token(&headers).ok_or(Error::Unauthorized)?;
    if hash_token(presented) != hash_token(secret) {
        tracing::warn!(job = %job, "cron request with a wrong secret");
        return Err(Error::Unauthorized);
    }

    let job: Job = job.parse()?;
    let now = now();
    let stats = cron::run(&state.db, state.mailer.as_ref(), job, now).await?;
    tracing::info!(?job, %stats, "cron job finished");

    Ok(Json(json!({
        "success": true,
        "timestamp": now.and_utc().to_rfc3339(),
        "stats": stats,
    })))
}
