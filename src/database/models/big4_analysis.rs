use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Big4Variant {
    #[default]
    Big4,
    Baseline,
}

impl Big4Variant {
    pub fn as_str(&self) -> &'static str {
        match self {
            Big4Variant::Big4 => "big4",
            Big4Variant::Baseline => "baseline",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CashflowDiagnosis {
    pub net_cashflow_avg: f64,
    pub trend: String,
    pub variability: String,
    pub assessment: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskLevel {
    Safe,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RiskWindow {
    pub level: RiskLevel,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RiskProjection {
    pub thirty_day: RiskWindow,
    pub sixty_day: RiskWindow,
    pub ninety_day: RiskWindow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StrategicWeakPoints {
    pub structural_issues: Vec<String>,
    pub buffer_status: String,
    pub rhythm_balance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub priority: u32,
    pub action: String,
    pub impact: String,
    pub metric: String,
}

/// The four-part structured answer the model must return.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Big4Report {
    pub cashflow_diagnosis: CashflowDiagnosis,
    pub risk_projection: RiskProjection,
    pub strategic_weak_points: StrategicWeakPoints,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Big4Analysis {
    pub id: i64,
    pub user_id: i64,
    pub variant: Big4Variant,
    pub cashflow_diagnosis: Json<CashflowDiagnosis>,
    pub risk_projection: Json<RiskProjection>,
    pub strategic_weak_points: Json<StrategicWeakPoints>,
    pub recommendations: Json<Vec<Recommendation>>,
    pub prompt_version: String,
    pub response_time_ms: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub confidence_score: f64,
    pub specificity_score: f64,
    pub user_rating: Option<i64>,
    pub was_helpful: Option<bool>,
    pub was_acted_upon: Option<bool>,
    pub feedback_text: Option<String>,
    pub feedback_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}
