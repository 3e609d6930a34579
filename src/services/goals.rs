use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::{goals as q, goals::GoalFields, notifications};
use crate::database::models::{Goal, GoalContribution, GoalMilestone, GoalStatus, NewNotification, NotificationType};
use crate::error::{Error, Result, Validator};
use crate::services::subscriptions::{self, Feature};

pub const MILESTONE_PERCENTAGES: [i64; 4] = [25, 50, 75, 100];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGoal {
    pub name: String,
    pub description: Option<String>,
    pub target_amount: Decimal,
    pub target_date: NaiveDate,
    pub category: Option<String>,
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateGoal {
    pub name: Option<String>,
    pub description: Option<String>,
    pub target_amount: Option<Decimal>,
    pub target_date: Option<NaiveDate>,
    pub category: Option<String>,
    pub priority: Option<i64>,
    pub status: Option<GoalStatus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contribute {
    pub amount: Decimal,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub status: Option<GoalStatus>,
}

fn validate(name: &str, target: Decimal, priority: i64) -> Result<()> {
    Validator::new()
        .check(!name.trim().is_empty(), "name", "Name is required")
        .check(name.trim().chars().count() <= 100, "name", "Name must be at most 100 characters")
        .check(target > Decimal::ZERO, "targetAmount", "Target amount must be positive")
        .check((0..=2).contains(&priority), "priority", "Priority must be between 0 and 2")
        .finish()
}

fn milestone_amount(target: Decimal, percentage: i64) -> Decimal {
    (target * Decimal::from(percentage) / Decimal::ONE_HUNDRED).round_dp(2)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalProgress {
    pub percentage: f64,
    pub remaining: Decimal,
    pub days_remaining: i64,
    pub is_on_track: bool,
}

/// On track when the saved share is at least 90% of the share of time already elapsed.
pub fn progress(goal: &Goal, now: NaiveDateTime) -> GoalProgress {
    let percentage = if goal.target_amount > Decimal::ZERO {
        (goal.current_amount / goal.target_amount * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(0.0)
            .min(100.0)
    } else {
        0.0
    };
    let remaining = (goal.target_amount - goal.current_amount).max(Decimal::ZERO);

    let deadline = goal.target_date.and_hms_opt(0, 0, 0).unwrap_or(now);
    let secs_left = (deadline - now).num_seconds().max(0);
    let days_remaining = (secs_left + 86_399) / 86_400;

    let elapsed = (now - goal.created_at).num_seconds().max(0) as f64;
    let total = elapsed + secs_left as f64;
    let expected = if total > 0.0 { elapsed / total * 100.0 } else { 100.0 };
    let is_on_track = goal.status == GoalStatus::Completed || percentage >= expected * 0.9;

    GoalProgress { percentage, remaining, days_remaining, is_on_track }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalDetail {
    #[serde(flatten)]
    pub goal: Goal,
    pub progress: GoalProgress,
    pub milestones: Vec<GoalMilestone>,
    pub contributions: Vec<GoalContribution>,
}

pub async fn list(pool: &Pool<Sqlite>, user_id: i64, query: ListQuery) -> Result<Vec<Goal>> {
    Ok(q::list_goals(pool, user_id, query.status).await?)
}

pub async fn create(pool: &Pool<Sqlite>, user_id: i64, input: CreateGoal, now: NaiveDateTime) -> Result<GoalDetail> {
    let priority = input.priority.unwrap_or(0);
    validate(&input.name, input.target_amount, priority)?;
    subscriptions::ensure_within_limit(pool, user_id, Feature::Goals, now).await?;

    let category = input
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or("General");
    let fields = GoalFields {
        name: input.name.trim(),
        description: input.description.as_deref(),
        target_amount: input.target_amount,
        target_date: input.target_date,
        category,
        priority,
    };

    let mut tx = pool.begin().await?;
    let goal = q::insert_goal(&mut *tx, user_id, &fields, now).await?;
    for p in MILESTONE_PERCENTAGES {
        q::insert_milestone(&mut *tx, goal.id, p, &milestone_amount(goal.target_amount, p), &format!("{p}% milestone")).await?;
    }
    tx.commit().await?;

    detail_of(pool, goal, now).await
}

async fn detail_of(pool: &Pool<Sqlite>, goal: Goal, now: NaiveDateTime) -> Result<GoalDetail> {
    let milestones = q::milestones(pool, goal.id).await?;
    let contributions = q::contributions(pool, goal.id).await?;
    Ok(GoalDetail { progress: progress(&goal, now), goal, milestones, contributions })
}

pub async fn get(pool: &Pool<Sqlite>, user_id: i64, id: i64, now: NaiveDateTime) -> Result<GoalDetail> {
    let goal = q::get_goal(pool, user_id, id).await?.ok_or(Error::NotFound("Goal"))?;
    detail_of(pool, goal, now).await
}

pub async fn update(pool: &Pool<Sqlite>, user_id: i64, id: i64, input: UpdateGoal, now: NaiveDateTime) -> Result<GoalDetail> {
    let mut tx = pool.begin().await?;
    let mut goal = q::get_goal(&mut *tx, user_id, id).await?.ok_or(Error::NotFound("Goal"))?;

    if let Some(name) = input.name {
        goal.name = name.trim().to_string();
    }
    if let Some(description) = input.description {
        goal.description = Some(description);
    }
    if let Some(target) = input.target_amount {
        goal.target_amount = target;
    }
    if let Some(date) = input.target_date {
        goal.target_date = date;
    }
    if let Some(category) = input.category {
        goal.category = category.trim().to_string();
    }
    if let Some(priority) = input.priority {
        goal.priority = priority;
    }
    if let Some(status) = input.status {
        goal.completed_at = match status {
            GoalStatus::Completed => goal.completed_at.or(Some(now)),
            _ => None,
        };
        goal.status = status;
    }
    validate(&goal.name, goal.target_amount, goal.priority)?;

    let goal = q::update_goal(&mut *tx, &goal, now).await?;
    for m in q::milestones(&mut *tx, goal.id).await? {
        q::set_milestone_amount(&mut *tx, m.id, &milestone_amount(goal.target_amount, m.percentage)).await?;
    }
    tx.commit().await?;

    detail_of(pool, goal, now).await
}

pub async fn delete(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<()> {
    if q::delete_goal(pool, user_id, id).await? {
        Ok(())
    } else {
        Err(Error::NotFound("Goal"))
    }
}

/// Adds to the goal, completes it at the target, and reports newly reached milestones.
pub async fn contribute(
    pool: &Pool<Sqlite>,
    user_id: i64,
    id: i64,
    input: Contribute,
    now: NaiveDateTime,
) -> Result<GoalDetail> {
    if input.amount <= Decimal::ZERO {
        return Err(Error::field("amount", "Contribution must be positive"));
    }

    let mut tx = pool.begin().await?;
    let mut goal = q::get_goal(&mut *tx, user_id, id).await?.ok_or(Error::NotFound("Goal"))?;
    if goal.status == GoalStatus::Cancelled {
        return Err(Error::BadRequest("Cannot contribute to a cancelled goal".into()));
    }

    q::insert_contribution(&mut *tx, goal.id, &input.amount, input.note.as_deref(), now).await?;
    goal.current_amount += input.amount;
    if goal.current_amount >= goal.target_amount && goal.status != GoalStatus::Completed {
        goal.status = GoalStatus::Completed;
        goal.completed_at = Some(now);
    }
    let goal = q::update_goal(&mut *tx, &goal, now).await?;

    let reached = q::milestones(&mut *tx, goal.id)
        .await?
        .into_iter()
        .filter(|m| m.achieved_at.is_none() && goal.current_amount >= m.amount);
    for m in reached.collect::<Vec<_>>() {
        q::mark_milestone_achieved(&mut *tx, m.id, now).await?;
        let note = NewNotification::new(
            user_id,
            NotificationType::GoalMilestone,
            format!("Milestone reached: {}", goal.name),
            format!("You've reached {}% of your goal \"{}\"", m.percentage, goal.name),
        )
        .priority(1)
        .action_url(format!("/goals/{}", goal.id))
        .metadata(json!({ "goalId": goal.id, "milestoneId": m.id, "percentage": m.percentage }))
        .dedupe_key(format!("goal:{}:milestone:{}", goal.id, m.percentage));
        notifications::insert_notification(&mut *tx, &note, now).await?;
    }
    tx.commit().await?;

    tracing::debug!(user_id, goal_id = goal.id, "goal contribution recorded");
    detail_of(pool, goal, now).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn goal(target: i64, current: i64, created: NaiveDateTime, due: NaiveDate) -> Goal {
        Goal {
            id: 1,
            user_id: 1,
            name: "Emergency fund".into(),
            description: None,
            target_amount: Decimal::from(target),
            current_amount: Decimal::from(current),
            target_date: due,
            category: "General".into(),
            priority: 0,
            status: GoalStatus::Active,
            completed_at: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn milestone_amounts() {
        assert_eq!(milestone_amount(Decimal::from(1000), 25), Decimal::from(250));
        assert_eq!(milestone_amount(Decimal::new(999, 0), 50), Decimal::new(49950, 2));
    }

    #[test]
    fn halfway_in_time_and_money_is_on_track() {
        let created = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let due = NaiveDate::from_ymd_opt(2025, 1, 21).unwrap();
        let now = created + Duration::days(10);

        let p = progress(&goal(1000, 500, created, due), now);
        assert_eq!(p.percentage, 50.0);
        assert_eq!(p.remaining, Decimal::from(500));
        assert_eq!(p.days_remaining, 10);
        assert!(p.is_on_track);

        let behind = progress(&goal(1000, 100, created, due), now);
        assert!(!behind.is_on_track);
    }

    #[test]
    fn partial_days_round_up() {
        let created = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        let due = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let now = created + Duration::hours(30);
        assert_eq!(progress(&goal(100, 0, created, due), now).days_remaining, 1);
    }
}
