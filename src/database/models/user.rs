use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    pub name: String,
    #[serde(skip)]
    pub api_token_hash: String,
    #[serde(skip)]
    pub gemini_api_key: Option<String>,
    pub created_at: NaiveDateTime,
}
