use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};

use super::{now, ok, ApiResult};
use crate::backend::{AppState, AuthUser};
use crate::database::models::Tier;
use crate::error::{Error, Result};
use crate::services::subscriptions::{self, SubscriptionOverview, Usage};
use crate::services::webhooks::stripe::{self, EventOutcome};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageSummary {
    pub tier: Tier,
    pub usage: Usage,
    pub remaining: Usage,
    pub usage_percentage: Value,
}

pub async fn subscription(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<SubscriptionOverview> {
    ok(subscriptions::overview(&state.db, user.id, now()).await?)
}

pub async fn usage(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<UsageSummary> {
    let overview = subscriptions::overview(&state.db, user.id, now()).await?;
    ok(UsageSummary {
        tier: overview.tier,
        usage: overview.usage,
        remaining: overview.remaining,
        usage_percentage: overview.usage_percentage,
    })
}

/// Stripe calls this unauthenticated; the signature is the credential.
pub async fn stripe_webhook(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<Value>> {
    let secret = state
        .config
        .stripe
        .webhook_secret
        .as_deref()
        .ok_or_else(|| Error::Config("Stripe webhook secret is not configured".into()))?;
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| Error::BadRequest("Missing Stripe-Signature header".into()))?;

    let now = now();
    if let Err(reason) = stripe::verify_signature(&body, signature, secret, now.and_utc().timestamp()) {
        tracing::warn!(?reason, "stripe webhook rejected");
        return Err(Error::BadRequest("Invalid signature".into()));
    }

    let event: Value =
        serde_json::from_slice(&body).map_err(|_| Error::BadRequest("Invalid JSON payload".into()))?;
    let outcome = stripe::handle_event(
        &state.db,
        state.mailer.as_ref(),
        state.stripe.as_deref(),
        &state.config.stripe,
        &event,
        now,
    )
    .await?;

    Ok(Json(match outcome {
        EventOutcome::Applied => json!({ "received": true }),
        EventOutcome::Ignored(reason) => json!({ "received": true, "ignored": reason }),
    }))
}
