//! Data access for the dashboard. Goes through the same services as the HTTP API.

use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::{Pool, Sqlite};

use crate::database::db::queries::users;
use crate::database::models::{BudgetProgress, Goal, Notification, User};
use crate::services::dashboard::{self, DashboardStats, RangeQuery};
use crate::services::goals::{self, GoalProgress};
use crate::services::{budgets, notifications};

#[derive(Clone)]
pub struct Client {
    pool: Pool<Sqlite>,
}

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

impl Client {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn find_user(&self, email: &str) -> Result<Option<User>> {
        Ok(users::find_by_email(&self.pool, &email.trim().to_lowercase()).await?)
    }

    pub async fn overview(&self, user_id: i64) -> Result<DashboardStats> {
        Ok(dashboard::stats(&self.pool, user_id, RangeQuery::default(), now()).await?)
    }

    pub async fn budgets(&self, user_id: i64) -> Result<Vec<BudgetProgress>> {
        Ok(budgets::list(&self.pool, user_id, Default::default(), now()).await?)
    }

    pub async fn goals(&self, user_id: i64) -> Result<Vec<(Goal, GoalProgress)>> {
        let now = now();
        let list = goals::list(&self.pool, user_id, Default::default()).await?;
        Ok(list
            .into_iter()
            .map(|g| {
                let progress = goals::progress(&g, now);
                (g, progress)
            })
            .collect())
    }

    pub async fn notifications(&self, user_id: i64) -> Result<Vec<Notification>> {
        Ok(notifications::list(&self.pool, user_id, Default::default()).await?)
    }

    pub async fn mark_read(&self, user_id: i64, id: i64) -> Result<()> {
        notifications::mark_read(&self.pool, user_id, id, now()).await?;
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64> {
        Ok(notifications::mark_all_read(&self.pool, user_id, now()).await?)
    }
}
