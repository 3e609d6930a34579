use chrono::NaiveDateTime;
use serde::Serialize;
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AiSuggestion {
    pub id: i64,
    pub user_id: i64,
    pub transaction_id: Option<i64>,
    pub description: String,
    pub suggested: String,
    pub subcategory: Option<String>,
    pub confidence: f64,
    pub reasoning: String,
    pub accepted: Option<bool>,
    pub actual_category: Option<String>,
    pub created_at: NaiveDateTime,
}
