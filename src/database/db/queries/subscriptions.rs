use chrono::NaiveDateTime;
use sqlx::SqliteExecutor;

use crate::database::models::{Subscription, SubscriptionStatus, Tier};

/*==========Subscription Queries=========== */

pub async fn get_for_user(ex: impl SqliteExecutor<'_>, user_id: i64) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE user_id = ?")
        .bind(user_id)
        .fetch_optional(ex)
        .await
}

/// `tier: None` keeps whatever tier the row already has (FREE for a new row).
pub struct CheckoutFields<'a> {
    pub tier: Option<Tier>,
    pub status: SubscriptionStatus,
    pub customer_id: Option<&'a str>,
    pub subscription_id: Option<&'a str>,
    pub price_id: Option<&'a str>,
    pub period_start: Option<NaiveDateTime>,
    pub period_end: Option<NaiveDateTime>,
}

/// Insert or replace the user's subscription after a completed checkout.
pub async fn upsert_checkout(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    fields: &CheckoutFields<'_>,
    now: NaiveDateTime,
) -> Result<Subscription, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions (user_id, tier, status, stripe_customer_id, stripe_subscription_id,
                                   stripe_price_id, current_period_start, current_period_end,
                                   cancel_at_period_end, created_at, updated_at)
        VALUES (?, coalesce(?, 'FREE'), ?, ?, ?, ?, ?, ?, 0, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            tier = coalesce(?, subscriptions.tier),
            status = excluded.status,
            stripe_customer_id = coalesce(excluded.stripe_customer_id, subscriptions.stripe_customer_id),
            stripe_subscription_id = coalesce(excluded.stripe_subscription_id, subscriptions.stripe_subscription_id),
            stripe_price_id = coalesce(excluded.stripe_price_id, subscriptions.stripe_price_id),
            current_period_start = coalesce(excluded.current_period_start, subscriptions.current_period_start),
            current_period_end = coalesce(excluded.current_period_end, subscriptions.current_period_end),
            cancel_at_period_end = 0,
            updated_at = excluded.updated_at
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(fields.tier)
    .bind(fields.status)
    .bind(fields.customer_id)
    .bind(fields.subscription_id)
    .bind(fields.price_id)
    .bind(fields.period_start)
    .bind(fields.period_end)
    .bind(now)
    .bind(now)
    .bind(fields.tier)
    .fetch_one(ex)
    .await
}

pub struct PeriodFields<'a> {
    pub tier: Option<Tier>,
    pub status: SubscriptionStatus,
    pub price_id: Option<&'a str>,
    pub period_start: Option<NaiveDateTime>,
    pub period_end: Option<NaiveDateTime>,
    pub cancel_at_period_end: bool,
}

pub async fn update_from_stripe(
    ex: impl SqliteExecutor<'_>,
    stripe_subscription_id: &str,
    fields: &PeriodFields<'_>,
    now: NaiveDateTime,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions
        SET tier = coalesce(?, tier), status = ?, stripe_price_id = coalesce(?, stripe_price_id),
            current_period_start = coalesce(?, current_period_start),
            current_period_end = coalesce(?, current_period_end),
            cancel_at_period_end = ?, updated_at = ?
        WHERE stripe_subscription_id = ?
        RETURNING *
        "#,
    )
    .bind(fields.tier)
    .bind(fields.status)
    .bind(fields.price_id)
    .bind(fields.period_start)
    .bind(fields.period_end)
    .bind(fields.cancel_at_period_end)
    .bind(now)
    .bind(stripe_subscription_id)
    .fetch_optional(ex)
    .await
}

pub async fn set_status(
    ex: impl SqliteExecutor<'_>,
    stripe_subscription_id: &str,
    tier: Option<Tier>,
    status: SubscriptionStatus,
    now: NaiveDateTime,
) -> Result<Option<Subscription>, sqlx::Error> {
    sqlx::query_as::<_, Subscription>(
        r#"
        UPDATE subscriptions
        SET tier = coalesce(?, tier), status = ?, updated_at = ?
        WHERE stripe_subscription_id = ?
        RETURNING *
        "#,
    )
    .bind(tier)
    .bind(status)
    .bind(now)
    .bind(stripe_subscription_id)
    .fetch_optional(ex)
    .await
}
