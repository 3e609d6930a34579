//! Tier limits and usage accounting.

use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::{ai, budgets, goals, reports, shared_budgets, subscriptions, transactions};
use crate::database::models::subscription::UNLIMITED;
use crate::database::models::{FeatureLimits, Subscription, SubscriptionStatus, Tier};
use crate::error::{Error, Result};
use crate::services::period::start_of_month;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Transactions,
    AiRequests,
    Goals,
    Budgets,
    SharedBudgets,
    Reports,
}

impl Feature {
    pub fn name(self) -> &'static str {
        match self {
            Feature::Transactions => "transactions",
            Feature::AiRequests => "aiRequests",
            Feature::Goals => "goals",
            Feature::Budgets => "budgets",
            Feature::SharedBudgets => "sharedBudgets",
            Feature::Reports => "reports",
        }
    }

    fn limit(self, limits: &FeatureLimits) -> i64 {
        match self {
            Feature::Transactions => limits.transactions,
            Feature::AiRequests => limits.ai_requests,
            Feature::Goals => limits.goals,
            Feature::Budgets => limits.budgets,
            Feature::SharedBudgets => limits.shared_budgets,
            Feature::Reports => limits.reports,
        }
    }
}

pub fn can_use(limit: i64, used: i64) -> bool {
    limit == UNLIMITED || used < limit
}

/// `-1` when unlimited.
pub fn remaining(limit: i64, used: i64) -> i64 {
    if limit == UNLIMITED {
        UNLIMITED
    } else {
        (limit - used).max(0)
    }
}

pub fn usage_percentage(limit: i64, used: i64) -> f64 {
    match limit {
        UNLIMITED => 0.0,
        0 => 100.0,
        _ => ((used as f64 / limit as f64) * 100.0).min(100.0),
    }
}

/// Cancelled and expired subscriptions fall back to the free plan.
pub fn effective_tier(subscription: Option<&Subscription>) -> Tier {
    match subscription {
        Some(s) if matches!(s.status, SubscriptionStatus::Active | SubscriptionStatus::Trial) => s.tier,
        _ => Tier::Free,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    pub transactions: i64,
    pub ai_requests: i64,
    pub goals: i64,
    pub budgets: i64,
    pub shared_budgets: i64,
    pub reports: i64,
}

impl Usage {
    fn get(&self, feature: Feature) -> i64 {
        match feature {
            Feature::Transactions => self.transactions,
            Feature::AiRequests => self.ai_requests,
            Feature::Goals => self.goals,
            Feature::Budgets => self.budgets,
            Feature::SharedBudgets => self.shared_budgets,
            Feature::Reports => self.reports,
        }
    }
}

async fn used(pool: &Pool<Sqlite>, user_id: i64, feature: Feature, now: NaiveDateTime) -> Result<i64> {
    let month_start = start_of_month(now);
    let n = match feature {
        Feature::Transactions => transactions::count_created_since(pool, user_id, month_start).await?,
        Feature::AiRequests => {
            ai::count_suggestions_since(pool, user_id, month_start).await?
                + ai::count_analyses_since(pool, user_id, month_start).await?
        }
        Feature::Goals => goals::count_goals(pool, user_id).await?,
        Feature::Budgets => budgets::count_budgets(pool, user_id).await?,
        Feature::SharedBudgets => shared_budgets::count_owned(pool, user_id).await?,
        Feature::Reports => reports::count_reports(pool, user_id).await?,
    };
    Ok(n)
}

pub async fn usage(pool: &Pool<Sqlite>, user_id: i64, now: NaiveDateTime) -> Result<Usage> {
    Ok(Usage {
        transactions: used(pool, user_id, Feature::Transactions, now).await?,
        ai_requests: used(pool, user_id, Feature::AiRequests, now).await?,
        goals: used(pool, user_id, Feature::Goals, now).await?,
        budgets: used(pool, user_id, Feature::Budgets, now).await?,
        shared_budgets: used(pool, user_id, Feature::SharedBudgets, now).await?,
        reports: used(pool, user_id, Feature::Reports, now).await?,
    })
}

/// Fails with `LimitReached` when one more `feature` would exceed the user's plan.
pub async fn ensure_within_limit(pool: &Pool<Sqlite>, user_id: i64, feature: Feature, now: NaiveDateTime) -> Result<()> {
    let subscription = subscriptions::get_for_user(pool, user_id).await?;
    let tier = effective_tier(subscription.as_ref());
    let limit = feature.limit(&tier.limits());
    if limit == UNLIMITED {
        return Ok(());
    }

    let used = used(pool, user_id, feature, now).await?;
    if can_use(limit, used) {
        Ok(())
    } else {
        tracing::info!(user_id, feature = feature.name(), limit, "plan limit reached");
        Err(Error::LimitReached {
            feature: feature.name(),
            tier: tier.as_str().to_string(),
            limit,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionOverview {
    pub tier: Tier,
    pub status: SubscriptionStatus,
    pub cancel_at_period_end: bool,
    pub current_period_end: Option<NaiveDateTime>,
    pub limits: FeatureLimits,
    pub usage: Usage,
    pub remaining: Usage,
    pub usage_percentage: serde_json::Value,
}

pub async fn overview(pool: &Pool<Sqlite>, user_id: i64, now: NaiveDateTime) -> Result<SubscriptionOverview> {
    let subscription = subscriptions::get_for_user(pool, user_id).await?;
    let tier = effective_tier(subscription.as_ref());
    let limits = tier.limits();
    let usage = usage(pool, user_id, now).await?;

    let features = [
        Feature::Transactions,
        Feature::AiRequests,
        Feature::Goals,
        Feature::Budgets,
        Feature::SharedBudgets,
        Feature::Reports,
    ];
    let left = |f: Feature| remaining(f.limit(&limits), usage.get(f));
    let mut percentages = serde_json::Map::new();
    for f in features {
        percentages.insert(f.name().into(), usage_percentage(f.limit(&limits), usage.get(f)).into());
    }

    Ok(SubscriptionOverview {
        tier,
        status: subscription.as_ref().map(|s| s.status).unwrap_or(SubscriptionStatus::Active),
        cancel_at_period_end: subscription.as_ref().map(|s| s.cancel_at_period_end).unwrap_or(false),
        current_period_end: subscription.as_ref().and_then(|s| s.current_period_end),
        limits,
        remaining: Usage {
            transactions: left(Feature::Transactions),
            ai_requests: left(Feature::AiRequests),
            goals: left(Feature::Goals),
            budgets: left(Feature::Budgets),
            shared_budgets: left(Feature::SharedBudgets),
            reports: left(Feature::Reports),
        },
        usage,
        usage_percentage: serde_json::Value::Object(percentages),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unlimited_helpers() {
        assert!(can_use(UNLIMITED, 1_000_000));
        assert_eq!(remaining(UNLIMITED, 5), UNLIMITED);
        assert_eq!(usage_percentage(UNLIMITED, 5), 0.0);
    }

    #[test]
    fn bounded_helpers() {
        assert!(can_use(3, 2));
        assert!(!can_use(3, 3));
        assert!(!can_use(0, 0));
        assert_eq!(remaining(5, 7), 0);
        assert_eq!(usage_percentage(4, 1), 25.0);
        assert_eq!(usage_percentage(0, 0), 100.0);
    }

    #[test]
    fn free_plan_limits() {
        let free = Tier::Free.limits();
        assert_eq!(free.goals, 3);
        assert_eq!(free.shared_budgets, 0);
        assert_eq!(Tier::Premium.limits().shared_budgets, 10);
        assert_eq!(Tier::Enterprise.limits().shared_budgets, UNLIMITED);
        assert_eq!(effective_tier(None), Tier::Free);
    }
}
