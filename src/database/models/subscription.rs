use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    Free,
    Basic,
    Premium,
    Enterprise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Trial,
    Cancelled,
    Expired,
}

pub const UNLIMITED: i64 = -1;

/// Per-tier quotas. `-1` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureLimits {
    pub transactions: i64,
    pub ai_requests: i64,
    pub goals: i64,
    pub budgets: i64,
    pub shared_budgets: i64,
    pub reports: i64,
}

impl Tier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Free => "FREE",
            Tier::Basic => "BASIC",
            Tier::Premium => "PREMIUM",
            Tier::Enterprise => "ENTERPRISE",
        }
    }

    pub fn limits(self) -> FeatureLimits {
        match self {
            Tier::Free => FeatureLimits {
                transactions: 50,
                ai_requests: 10,
                goals: 3,
                budgets: 5,
                shared_budgets: 0,
                reports: 3,
            },
            Tier::Basic => FeatureLimits {
                transactions: 500,
                ai_requests: 100,
                goals: 10,
                budgets: 15,
                shared_budgets: 2,
                reports: 20,
            },
            Tier::Premium => FeatureLimits {
                transactions: UNLIMITED,
                ai_requests: UNLIMITED,
                goals: UNLIMITED,
                budgets: UNLIMITED,
                shared_budgets: 10,
                reports: UNLIMITED,
            },
            Tier::Enterprise => FeatureLimits {
                transactions: UNLIMITED,
                ai_requests: UNLIMITED,
                goals: UNLIMITED,
                budgets: UNLIMITED,
                shared_budgets: UNLIMITED,
                reports: UNLIMITED,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: i64,
    pub user_id: i64,
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub stripe_customer_id: Option<String>,
    pub stripe_subscription_id: Option<String>,
    pub stripe_price_id: Option<String>,
    pub current_period_start: Option<NaiveDateTime>,
    pub current_period_end: Option<NaiveDateTime>,
    pub cancel_at_period_end: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
