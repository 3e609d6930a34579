//! Stripe billing events. The payload is trusted only after the
//! `Stripe-Signature` header verifies against the webhook secret.

use chrono::{DateTime, NaiveDateTime};
use serde_json::{json, Value};
use sqlx::{Pool, Sqlite};

use super::{sign_hex, verify_hex};
use crate::config::StripeConfig;
use crate::database::db::queries::subscriptions::{self as q, CheckoutFields, PeriodFields};
use crate::database::db::queries::users;
use crate::database::models::{NewNotification, NotificationType, SubscriptionStatus, Tier};
use crate::error::{Error, Result};
use crate::services::mailer::Mailer;
use crate::services::notifications;

/// Maximum age of a signed payload.
pub const TOLERANCE_SECS: i64 = 300;

#[derive(Debug, PartialEq, Eq)]
pub enum SignatureError {
    Malformed,
    Expired,
    Mismatch,
}

/// Build a header value the way Stripe does; used by tests and local tooling.
pub fn signature_header(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let t = timestamp.to_string();
    format!("t={},v1={}", t, sign_hex(secret, &[t.as_bytes(), b".", payload]))
}

/// `header` is `t=<unix>,v1=<hex>[,v1=<hex>...]`; any matching v1 passes.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str, now_ts: i64) -> Result<(), SignatureError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = Some(v),
            Some(("v1", v)) => signatures.push(v),
            _ => {}
        }
    }

    let t = timestamp.ok_or(SignatureError::Malformed)?;
    let ts: i64 = t.parse().map_err(|_| SignatureError::Malformed)?;
    if signatures.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if (now_ts - ts).abs() > TOLERANCE_SECS {
        return Err(SignatureError::Expired);
    }

    let signed = [t.as_bytes(), b".".as_slice(), payload];
    if signatures.iter().any(|sig| verify_hex(secret, &signed, sig)) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Unknown prices map to FREE.
pub fn tier_for_price(config: &StripeConfig, price_id: &str) -> Tier {
    match price_id {
        p if p == config.price_basic => Tier::Basic,
        p if p == config.price_premium => Tier::Premium,
        p if p == config.price_enterprise => Tier::Enterprise,
        _ => Tier::Free,
    }
}

pub fn status_for(stripe_status: &str) -> SubscriptionStatus {
    match stripe_status {
        "active" => SubscriptionStatus::Active,
        "trialing" => SubscriptionStatus::Trial,
        "canceled" => SubscriptionStatus::Cancelled,
        _ => SubscriptionStatus::Expired,
    }
}

fn str_at<'a>(v: &'a Value, pointer: &str) -> Option<&'a str> {
    v.pointer(pointer).and_then(Value::as_str)
}

fn timestamp_at(v: &Value, pointer: &str) -> Option<NaiveDateTime> {
    v.pointer(pointer)
        .and_then(Value::as_i64)
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.naive_utc())
}

/// Read-only Stripe REST access, present when `STRIPE_SECRET_KEY` is set.
pub struct StripeApi {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeApi {
    pub fn from_config(http: reqwest::Client, config: &StripeConfig) -> Option<Self> {
        let secret_key = config.secret_key.clone()?;
        Some(Self {
            http,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            secret_key,
        })
    }

    pub async fn subscription(&self, id: &str) -> Result<Value> {
        let response = self
            .http
            .get(format!("{}/subscriptions/{id}", self.base_url))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(|e| Error::Internal(format!("stripe request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Internal(format!("stripe returned {status} for subscription {id}")));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Internal(format!("stripe response unreadable: {e}")))
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum EventOutcome {
    Applied,
    Ignored(&'static str),
}

fn user_id_in(object: &Value) -> Option<i64> {
    match object.pointer("/metadata/userId") {
        Some(Value::String(s)) => s.parse::<i64>().ok(),
        Some(Value::Number(n)) => n.as_i64(),
        _ => None,
    }
}

fn price_in(subscription: &Value) -> Option<&str> {
    str_at(subscription, "/items/data/0/price/id")
}

/// The session's subscription: expanded inline, fetched by id, or unknown.
async fn checkout_subscription(api: Option<&StripeApi>, session: &Value) -> Result<Option<Value>> {
    match session.get("subscription") {
        Some(sub @ Value::Object(_)) => Ok(Some(sub.clone())),
        Some(Value::String(id)) => match api {
            Some(api) => api.subscription(id).await.map(Some),
            None => {
                tracing::warn!(stripe_subscription_id = %id, "STRIPE_SECRET_KEY unset, tier waits for a subscription event");
                Ok(None)
            }
        },
        _ => Ok(None),
    }
}

async fn link_subscription(
    pool: &Pool<Sqlite>,
    config: &StripeConfig,
    user_id: i64,
    customer_id: Option<&str>,
    subscription: &Value,
    status: SubscriptionStatus,
    now: NaiveDateTime,
) -> Result<EventOutcome> {
    if users::get_user(pool, user_id).await?.is_none() {
        tracing::warn!(user_id, "stripe event for unknown user");
        return Ok(EventOutcome::Ignored("unknown user"));
    }
    let price_id = price_in(subscription);
    let fields = CheckoutFields {
        tier: price_id.map(|p| tier_for_price(config, p)),
        status,
        customer_id: customer_id.or_else(|| str_at(subscription, "/customer")),
        subscription_id: str_at(subscription, "/id"),
        price_id,
        period_start: timestamp_at(subscription, "/current_period_start"),
        period_end: timestamp_at(subscription, "/current_period_end"),
    };
    let sub = q::upsert_checkout(pool, user_id, &fields, now).await?;
    tracing::info!(user_id, tier = ?sub.tier, status = ?sub.status, "subscription linked");
    Ok(EventOutcome::Applied)
}

/// Apply one verified event to the local subscription state.
pub async fn handle_event(
    pool: &Pool<Sqlite>,
    mailer: &dyn Mailer,
    api: Option<&StripeApi>,
    config: &StripeConfig,
    event: &Value,
    now: NaiveDateTime,
) -> Result<EventOutcome> {
    let kind = str_at(event, "/type").ok_or_else(|| Error::BadRequest("Event type missing".into()))?;
    let object = event
        .pointer("/data/object")
        .ok_or_else(|| Error::BadRequest("Event object missing".into()))?;

    tracing::info!(event_type = kind, event_id = ?str_at(event, "/id"), "stripe event received");

    match kind {
        "checkout.session.completed" => {
            let Some(user_id) = user_id_in(object) else {
                tracing::warn!("checkout session without a userId in metadata");
                return Ok(EventOutcome::Ignored("missing userId"));
            };

            match checkout_subscription(api, object).await? {
                Some(subscription) => {
                    let status = if str_at(&subscription, "/status") == Some("active") {
                        SubscriptionStatus::Active
                    } else {
                        SubscriptionStatus::Trial
                    };
                    link_subscription(pool, config, user_id, str_at(object, "/customer"), &subscription, status, now)
                        .await
                }
                None => {
                    let status = if str_at(object, "/payment_status") == Some("paid") {
                        SubscriptionStatus::Active
                    } else {
                        SubscriptionStatus::Trial
                    };
                    // ids only; the tier arrives with customer.subscription.*
                    let bare = json!({ "id": str_at(object, "/subscription") });
                    link_subscription(pool, config, user_id, str_at(object, "/customer"), &bare, status, now).await
                }
            }
        }
        "customer.subscription.created" | "customer.subscription.updated" => {
            let Some(sub_id) = str_at(object, "/id") else {
                return Ok(EventOutcome::Ignored("missing subscription id"));
            };
            let price_id = price_in(object);
            let status = status_for(str_at(object, "/status").unwrap_or_default());
            let fields = PeriodFields {
                tier: price_id.map(|p| tier_for_price(config, p)),
                status,
                price_id,
                period_start: timestamp_at(object, "/current_period_start"),
                period_end: timestamp_at(object, "/current_period_end"),
                cancel_at_period_end: object
                    .pointer("/cancel_at_period_end")
                    .and_then(Value::as_bool)
                    .unwrap_or(false),
            };
            if q::update_from_stripe(pool, sub_id, &fields, now).await?.is_some() {
                return Ok(EventOutcome::Applied);
            }
            match user_id_in(object) {
                Some(user_id) => link_subscription(pool, config, user_id, None, object, status, now).await,
                None => applied(false, sub_id),
            }
        }
        "customer.subscription.deleted" => {
            let Some(sub_id) = str_at(object, "/id") else {
                return Ok(EventOutcome::Ignored("missing subscription id"));
            };
            let updated = q::set_status(pool, sub_id, Some(Tier::Free), SubscriptionStatus::Cancelled, now).await?;
            applied(updated.is_some(), sub_id)
        }
        "invoice.payment_succeeded" => {
            let Some(sub_id) = str_at(object, "/subscription") else {
                return Ok(EventOutcome::Ignored("invoice without subscription"));
            };
            let updated = q::set_status(pool, sub_id, None, SubscriptionStatus::Active, now).await?;
            applied(updated.is_some(), sub_id)
        }
        "invoice.payment_failed" => {
            let Some(sub_id) = str_at(object, "/subscription") else {
                return Ok(EventOutcome::Ignored("invoice without subscription"));
            };
            let Some(sub) = q::set_status(pool, sub_id, None, SubscriptionStatus::Expired, now).await? else {
                return applied(false, sub_id);
            };
            let note = NewNotification::new(
                sub.user_id,
                NotificationType::SubscriptionRenewal,
                "Payment failed",
                "We couldn't process your subscription payment. Please update your payment method to keep your plan.",
            )
            .priority(2)
            .action_url("/settings/billing")
            .metadata(json!({ "stripeSubscriptionId": sub_id }));
            notifications::notify(pool, mailer, note, now).await?;
            Ok(EventOutcome::Applied)
        }
        other => {
            tracing::info!(event_type = other, "unhandled stripe event");
            Ok(EventOutcome::Ignored("unhandled event type"))
        }
    }
}

fn applied(found: bool, sub_id: &str) -> Result<EventOutcome> {
    if found {
        Ok(EventOutcome::Applied)
    } else {
        tracing::warn!(stripe_subscription_id = sub_id, "event for unknown subscription");
        Ok(EventOutcome::Ignored("unknown subscription"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    #[test]
    fn round_trip_signature() {
        let payload = br#"{"type":"invoice.payment_succeeded"}"#;
        let header = signature_header(payload, "whsec_test", 1_700_000_000);
        assert_eq!(verify_signature(payload, &header, "whsec_test", 1_700_000_100), Ok(()));
    }

    #[test]
    fn rejects_tampering_and_stale_payloads() {
        let payload = br#"{"type":"invoice.payment_succeeded"}"#;
        let header = signature_header(payload, "whsec_test", 1_700_000_000);

        assert_eq!(
            verify_signature(br#"{"type":"invoice.payment_failed"}"#, &header, "whsec_test", 1_700_000_000),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature(payload, &header, "whsec_test", 1_700_000_000 + TOLERANCE_SECS + 1),
            Err(SignatureError::Expired)
        );
        assert_eq!(verify_signature(payload, "v1=abc", "whsec_test", 0), Err(SignatureError::Malformed));
    }

    #[test]
    fn accepts_any_matching_v1() {
        let payload = b"{}";
        let good = signature_header(payload, "whsec_test", 10);
        let sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t=10,v1=deadbeef,v1={sig}");
        assert_eq!(verify_signature(payload, &header, "whsec_test", 10), Ok(()));
    }

    #[test]
    fn price_and_status_mapping() {
        let config = AppConfig::for_database("sqlite::memory:").stripe;
        assert_eq!(tier_for_price(&config, "price_basic_monthly"), Tier::Basic);
        assert_eq!(tier_for_price(&config, "price_business_monthly"), Tier::Enterprise);
        assert_eq!(tier_for_price(&config, "price_unknown"), Tier::Free);

        assert_eq!(status_for("active"), SubscriptionStatus::Active);
        assert_eq!(status_for("canceled"), SubscriptionStatus::Cancelled);
        assert_eq!(status_for("past_due"), SubscriptionStatus::Expired);
    }
}
