use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ProjectVersion {
    pub id: i64,
    pub version: String,
    pub changelog: String,
    pub deployer: String,
    pub environment: String,
    pub is_current: bool,
    pub created_at: NaiveDateTime,
}
