//! Budgets shared between users with role-based permissions.
//!
//! The owner can do everything. ADMIN members edit and invite, CONTRIBUTOR
//! members edit, VIEWER members only read. Only the owner deletes the budget,
//! changes roles, or grants ADMIN.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::shared_budgets::{self as q, SharedBudgetFields};
use crate::database::db::queries::{transactions, users};
use crate::database::models::{BudgetMember, BudgetRole, NewNotification, NotificationType, SharedBudget};
use crate::error::{Error, Result, Validator};
use crate::services::budgets::validate_fields;
use crate::services::mailer::Mailer;
use crate::services::notifications;
use crate::services::period::month_bounds;
use crate::services::subscriptions::{self, Feature};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Owner,
    Member(BudgetRole),
}

impl Access {
    pub fn can_edit(self) -> bool {
        match self {
            Access::Owner => true,
            Access::Member(role) => role.can_edit(),
        }
    }

    pub fn can_invite(self) -> bool {
        match self {
            Access::Owner => true,
            Access::Member(role) => role.can_invite(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSharedBudget {
    pub name: String,
    pub description: Option<String>,
    pub category: String,
    pub amount: Decimal,
    pub month: u32,
    pub year: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSharedBudget {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub amount: Option<Decimal>,
    pub month: Option<u32>,
    pub year: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Invite {
    pub email: String,
    pub role: BudgetRole,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRole {
    pub user_id: i64,
    pub role: BudgetRole,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedBudgetDetail {
    #[serde(flatten)]
    pub budget: SharedBudget,
    pub role: &'static str,
    pub spent: Decimal,
    pub remaining: Decimal,
    pub members: Vec<BudgetMember>,
}

fn validate(fields: &SharedBudgetFields<'_>) -> Result<()> {
    Validator::new()
        .check(!fields.name.trim().is_empty(), "name", "Name is required")
        .check(fields.name.trim().chars().count() <= 100, "name", "Name must be at most 100 characters")
        .finish()?;
    validate_fields(fields.category, fields.amount, fields.month, fields.year)
}

/// Resolve the caller's access; strangers get 404 so existence is not leaked.
async fn access(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<(SharedBudget, Access)> {
    let budget = q::get_shared_budget(pool, id)
        .await?
        .ok_or(Error::NotFound("Shared budget"))?;
    if budget.owner_id == user_id {
        return Ok((budget, Access::Owner));
    }
    match q::member_role(pool, id, user_id).await? {
        Some(role) => Ok((budget, Access::Member(role))),
        None => Err(Error::NotFound("Shared budget")),
    }
}

async fn detail(pool: &Pool<Sqlite>, budget: SharedBudget, access: Access) -> Result<SharedBudgetDetail> {
    let members = q::members(pool, budget.id).await?;
    let mut user_ids: Vec<i64> = members.iter().map(|m| m.user_id).collect();
    user_ids.push(budget.owner_id);

    let (start, end) = month_bounds(budget.year, budget.month)?;
    let spent = transactions::expense_total(pool, &user_ids, &budget.category, start, end).await?;
    let role = match access {
        Access::Owner => "OWNER",
        Access::Member(role) => role.as_str(),
    };

    Ok(SharedBudgetDetail {
        remaining: (budget.amount - spent).max(Decimal::ZERO),
        spent,
        role,
        members,
        budget,
    })
}

pub async fn list(pool: &Pool<Sqlite>, user_id: i64) -> Result<Vec<SharedBudget>> {
    Ok(q::list_for_user(pool, user_id).await?)
}

pub async fn create(pool: &Pool<Sqlite>, user_id: i64, input: CreateSharedBudget, now: NaiveDateTime) -> Result<SharedBudgetDetail> {
    let fields = SharedBudgetFields {
        name: input.name.trim(),
        description: input.description.as_deref(),
        category: input.category.trim(),
        amount: input.amount,
        month: input.month,
        year: input.year,
    };
    validate(&fields)?;
    subscriptions::ensure_within_limit(pool, user_id, Feature::SharedBudgets, now).await?;

    let budget = q::insert_shared_budget(pool, user_id, &fields, now).await?;
    detail(pool, budget, Access::Owner).await
}

pub async fn get(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<SharedBudgetDetail> {
    let (budget, access) = access(pool, user_id, id).await?;
    detail(pool, budget, access).await
}

pub async fn update(
    pool: &Pool<Sqlite>,
    user_id: i64,
    id: i64,
    input: UpdateSharedBudget,
    now: NaiveDateTime,
) -> Result<SharedBudgetDetail> {
    let (current, access) = access(pool, user_id, id).await?;
    if !access.can_edit() {
        return Err(Error::Forbidden("You do not have permission to edit this budget".into()));
    }

    let name = input.name.as_deref().map(str::trim).unwrap_or(&current.name);
    let category = input.category.as_deref().map(str::trim).unwrap_or(&current.category);
    let fields = SharedBudgetFields {
        name,
        description: input.description.as_deref().or(current.description.as_deref()),
        category,
        amount: input.amount.unwrap_or(current.amount),
        month: input.month.unwrap_or(current.month),
        year: input.year.unwrap_or(current.year),
    };
    validate(&fields)?;

    let updated = q::update_shared_budget(pool, id, &fields, now).await?;
    detail(pool, updated, access).await
}

pub async fn delete(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<()> {
    let (_, access) = access(pool, user_id, id).await?;
    if access != Access::Owner {
        return Err(Error::Forbidden("Only the owner can delete this budget".into()));
    }
    q::delete_shared_budget(pool, id).await?;
    Ok(())
}

pub async fn invite(
    pool: &Pool<Sqlite>,
    mailer: &dyn Mailer,
    user_id: i64,
    id: i64,
    input: Invite,
    now: NaiveDateTime,
) -> Result<BudgetMember> {
    let (budget, access) = access(pool, user_id, id).await?;
    if !access.can_invite() {
        return Err(Error::Forbidden("You do not have permission to invite members".into()));
    }
    if input.role == BudgetRole::Admin && access != Access::Owner {
        return Err(Error::Forbidden("Only the owner can grant the ADMIN role".into()));
    }

    let invitee = users::find_by_email(pool, input.email.trim())
        .await?
        .ok_or(Error::NotFound("User"))?;
    if invitee.id == budget.owner_id || q::member_role(pool, id, invitee.id).await?.is_some() {
        return Err(Error::BadRequest("User is already a member of this budget".into()));
    }

    q::add_member(pool, id, invitee.id, input.role, now).await?;

    let inviter = users::get_user(pool, user_id).await?.map(|u| u.name).unwrap_or_default();
    let note = NewNotification::new(
        invitee.id,
        NotificationType::BudgetShared,
        format!("Shared budget: {}", budget.name),
        format!("{} shared the budget \"{}\" with you", inviter, budget.name),
    )
    .priority(1)
    .action_url(format!("/shared-budgets/{}", budget.id))
    .metadata(json!({ "sharedBudgetId": budget.id, "invitedBy": user_id }));
    notifications::notify(pool, mailer, note, now).await?;

    tracing::info!(shared_budget_id = id, invitee = invitee.id, "member invited");
    q::members(pool, id)
        .await?
        .into_iter()
        .find(|m| m.user_id == invitee.id)
        .ok_or_else(|| Error::Internal("invited member missing".into()))
}

pub async fn permissions(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<Vec<BudgetMember>> {
    access(pool, user_id, id).await?;
    Ok(q::members(pool, id).await?)
}

pub async fn change_role(pool: &Pool<Sqlite>, user_id: i64, id: i64, input: ChangeRole) -> Result<Vec<BudgetMember>> {
    let (_, access) = access(pool, user_id, id).await?;
    if access != Access::Owner {
        return Err(Error::Forbidden("Only the owner can change permissions".into()));
    }
    if !q::set_member_role(pool, id, input.user_id, input.role).await? {
        return Err(Error::NotFound("Member"));
    }
    Ok(q::members(pool, id).await?)
}

pub async fn leave(pool: &Pool<Sqlite>, user_id: i64, id: i64) -> Result<()> {
    let (_, access) = access(pool, user_id, id).await?;
    if access == Access::Owner {
        return Err(Error::BadRequest("The owner cannot leave their own budget".into()));
    }
    q::remove_member(pool, id, user_id).await?;
    Ok(())
}
