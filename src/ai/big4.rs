// src/ai/big4.rs
//! Big 4 decision analysis: cashflow diagnosis, 30/60/90-day risk, weak points
//! and recommendations. A fresh analysis per (user, variant) is reused for a day.

use std::time::Instant;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use super::{aggregator, generate_object, prompts, ModelFactory};
use crate::database::db::queries::ai::{self as q, AnalysisStats, Feedback};
use crate::database::db::queries::users;
use crate::database::models::{Big4Analysis, Big4Report, Big4Variant};
use crate::error::{Error, Result, Validator};
use crate::services::subscriptions::{ensure_within_limit, Feature};

pub const CACHE_TTL_HOURS: i64 = 24;
pub const CONFIDENCE_SCORE: f64 = 90.0;
pub const DEFAULT_LIST_LIMIT: i64 = 5;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub variant: Big4Variant,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub variant: Option<Big4Variant>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackRequest {
    pub user_rating: Option<i64>,
    pub was_helpful: Option<bool>,
    pub was_acted_upon: Option<bool>,
    pub feedback_text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisMetadata {
    pub response_time_ms: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub confidence_score: f64,
    pub specificity_score: f64,
    pub analysis_date: NaiveDateTime,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResponse {
    pub cached: bool,
    pub analysis_id: i64,
    pub variant: Big4Variant,
    pub analysis: Big4Report,
    pub metadata: AnalysisMetadata,
}

impl AnalysisResponse {
    fn from_row(row: Big4Analysis, cached: bool) -> Self {
        Self {
            cached,
            analysis_id: row.id,
            variant: row.variant,
            metadata: AnalysisMetadata {
                response_time_ms: row.response_time_ms,
                prompt_tokens: row.prompt_tokens,
                completion_tokens: row.completion_tokens,
                total_tokens: row.prompt_tokens + row.completion_tokens,
                confidence_score: row.confidence_score,
                specificity_score: row.specificity_score,
                analysis_date: row.created_at,
            },
            analysis: Big4Report {
                cashflow_diagnosis: row.cashflow_diagnosis.0,
                risk_projection: row.risk_projection.0,
                strategic_weak_points: row.strategic_weak_points.0,
                recommendations: row.recommendations.0,
            },
        }
    }
}

/// Rough token count: words times 1.3, rounded up.
pub fn estimate_tokens(text: &str) -> i64 {
    (text.split_whitespace().count() as f64 * 1.3).ceil() as i64
}

/// Share of recommendations, in percent, that name a concrete number.
pub fn specificity_score(report: &Big4Report) -> f64 {
    let total = report.recommendations.len();
    if total == 0 {
        return 0.0;
    }
    let has_digit = |s: &str| s.chars().any(|c| c.is_ascii_digit());
    let specific = report
        .recommendations
        .iter()
        .filter(|r| has_digit(&r.action) || has_digit(&r.metric))
        .count();
    specific as f64 / total as f64 * 100.0
}

pub fn validate_report(report: &Big4Report) -> std::result::Result<(), String> {
    if report.cashflow_diagnosis.assessment.trim().is_empty() {
        return Err("cashflowDiagnosis.assessment is empty".into());
    }
    if report.recommendations.is_empty() {
        return Err("recommendations must not be empty".into());
    }
    if report.recommendations.iter().any(|r| r.action.trim().is_empty()) {
        return Err("every recommendation needs an action".into());
    }
    Ok(())
}

/// Cached result when one is fresh and `force` is off, otherwise a new analysis.
pub async fn analyze(
    pool: &Pool<Sqlite>,
    factory: &dyn ModelFactory,
    user_id: i64,
    request: AnalyzeRequest,
    now: NaiveDateTime,
) -> Result<AnalysisResponse> {
    if !request.force {
        let since = now - Duration::hours(CACHE_TTL_HOURS);
        if let Some(recent) = q::latest_analysis_since(pool, user_id, request.variant, since).await? {
            tracing::info!(user_id, analysis_id = recent.id, variant = request.variant.as_str(), "serving cached analysis");
            return Ok(AnalysisResponse::from_row(recent, true));
        }
    }

    ensure_within_limit(pool, user_id, Feature::AiRequests, now).await?;
    let user_key = users::get_user(pool, user_id).await?.and_then(|u| u.gemini_api_key);
    let model = factory.model_for(user_key.as_deref())?;

    let started = Instant::now();
    let metrics = aggregator::snapshot(pool, user_id, now).await?;
    let prompt = prompts::big4(request.variant, &metrics);
    let report: Big4Report = generate_object(model.as_ref(), &prompt, prompts::BIG4_SCHEMA, validate_report).await?;

    let stats = AnalysisStats {
        prompt_version: prompts::PROMPT_VERSION,
        response_time_ms: started.elapsed().as_millis() as i64,
        prompt_tokens: estimate_tokens(&prompt),
        completion_tokens: 0,
        confidence_score: CONFIDENCE_SCORE,
        specificity_score: specificity_score(&report),
    };
    let saved = q::insert_analysis(pool, user_id, request.variant, &report, &stats, now).await?;

    tracing::info!(
        user_id,
        analysis_id = saved.id,
        variant = request.variant.as_str(),
        response_time_ms = stats.response_time_ms,
        "big4 analysis generated"
    );
    Ok(AnalysisResponse::from_row(saved, false))
}

pub async fn list(pool: &Pool<Sqlite>, user_id: i64, query: ListQuery) -> Result<Vec<Big4Analysis>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT).clamp(1, 50);
    Ok(q::list_analyses(pool, user_id, query.variant, limit).await?)
}

pub async fn feedback(
    pool: &Pool<Sqlite>,
    user_id: i64,
    id: i64,
    input: FeedbackRequest,
    now: NaiveDateTime,
) -> Result<Big4Analysis> {
    Validator::new()
        .check(
            input.user_rating.is_none_or(|r| (1..=5).contains(&r)),
            "userRating",
            "Rating must be between 1 and 5",
        )
        .check(
            input.feedback_text.as_ref().is_none_or(|t| t.len() <= 2000),
            "feedbackText",
            "Feedback must be at most 2000 characters",
        )
        .finish()?;

    let feedback = Feedback {
        user_rating: input.user_rating,
        was_helpful: input.was_helpful,
        was_acted_upon: input.was_acted_upon,
        feedback_text: input.feedback_text.as_deref(),
    };
    q::record_analysis_feedback(pool, user_id, id, &feedback, now)
        .await?
        .ok_or(Error::NotFound("Analysis"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::big4_analysis::{
        CashflowDiagnosis, Recommendation, RiskLevel, RiskProjection, RiskWindow, StrategicWeakPoints,
    };

    fn window(level: RiskLevel) -> RiskWindow {
        RiskWindow { level, description: "ok".into() }
    }

    fn report(actions: &[(&str, &str)]) -> Big4Report {
        Big4Report {
            cashflow_diagnosis: CashflowDiagnosis {
                net_cashflow_avg: 120.0,
                trend: "improving".into(),
                variability: "low".into(),
                assessment: "Healthy surplus".into(),
            },
            risk_projection: RiskProjection {
                thirty_day: window(RiskLevel::Safe),
                sixty_day: window(RiskLevel::Safe),
                ninety_day: window(RiskLevel::Warning),
            },
            strategic_weak_points: StrategicWeakPoints {
                structural_issues: vec![],
                buffer_status: "thin".into(),
                rhythm_balance: "balanced".into(),
            },
            recommendations: actions
                .iter()
                .enumerate()
                .map(|(i, (action, metric))| Recommendation {
                    priority: i as u32 + 1,
                    action: action.to_string(),
                    impact: "better".into(),
                    metric: metric.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn specificity_counts_numeric_recommendations() {
        let r = report(&[("Cut dining by $200", "spend"), ("Review habits", "savings rate 15%"), ("Relax", "mood")]);
        assert!((specificity_score(&r) - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(specificity_score(&report(&[])), 0.0);
    }

    #[test]
    fn token_estimate() {
        assert_eq!(estimate_tokens("one two three"), 4);
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn validation() {
        assert!(validate_report(&report(&[("Save 10%", "rate")])).is_ok());
        assert!(validate_report(&report(&[])).is_err());
        assert!(validate_report(&report(&[("  ", "rate")])).is_err());
    }

    #[test]
    fn risk_levels_are_closed() {
        let bad = r#"{"level":"Moderate","description":"x"}"#;
        assert!(serde_json::from_str::<RiskWindow>(bad).is_err());
    }
}
