use chrono::{NaiveDate, NaiveDateTime};
use sqlx::types::Json;
use sqlx::SqliteExecutor;

use crate::database::models::big4_analysis::Big4Report;
use crate::database::models::{AiSuggestion, Big4Analysis, Big4Variant, FinancialMetrics, FinancialSnapshot};

/*==========AI Suggestion Queries=========== */

pub struct SuggestionFields<'a> {
    pub transaction_id: Option<i64>,
    pub description: &'a str,
    pub suggested: &'a str,
    pub subcategory: Option<&'a str>,
    pub confidence: f64,
    pub reasoning: &'a str,
}

pub async fn insert_suggestion(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    fields: &SuggestionFields<'_>,
    now: NaiveDateTime,
) -> Result<AiSuggestion, sqlx::Error> {
    sqlx::query_as::<_, AiSuggestion>(
        r#"
        INSERT INTO ai_suggestions (user_id, transaction_id, description, suggested, subcategory, confidence, reasoning, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(fields.transaction_id)
    .bind(fields.description)
    .bind(fields.suggested)
    .bind(fields.subcategory)
    .bind(fields.confidence)
    .bind(fields.reasoning)
    .bind(now)
    .fetch_one(ex)
    .await
}

pub async fn record_feedback(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    id: i64,
    accepted: bool,
    actual_category: Option<&str>,
) -> Result<Option<AiSuggestion>, sqlx::Error> {
    sqlx::query_as::<_, AiSuggestion>(
        "UPDATE ai_suggestions SET accepted = ?, actual_category = ? WHERE id = ? AND user_id = ? RETURNING *",
    )
    .bind(accepted)
    .bind(actual_category)
    .bind(id)
    .bind(user_id)
    .fetch_optional(ex)
    .await
}

pub async fn count_suggestions_since(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    since: NaiveDateTime,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM ai_suggestions WHERE user_id = ? AND created_at >= ?")
        .bind(user_id)
        .bind(since)
        .fetch_one(ex)
        .await
}

/*==========Financial Snapshot Queries=========== */

pub async fn latest_snapshot_since(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    since: NaiveDateTime,
) -> Result<Option<FinancialSnapshot>, sqlx::Error> {
    sqlx::query_as::<_, FinancialSnapshot>(
        "SELECT * FROM financial_snapshots WHERE user_id = ? AND created_at >= ? ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(user_id)
    .bind(since)
    .fetch_optional(ex)
    .await
}

pub async fn insert_snapshot(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    period_start: NaiveDate,
    period_end: NaiveDate,
    metrics: &FinancialMetrics,
    now: NaiveDateTime,
) -> Result<FinancialSnapshot, sqlx::Error> {
    sqlx::query_as::<_, FinancialSnapshot>(
        r#"
        INSERT INTO financial_snapshots (user_id, period_start, period_end, metrics, created_at)
        VALUES (?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(period_start)
    .bind(period_end)
    .bind(Json(metrics))
    .bind(now)
    .fetch_one(ex)
    .await
}

/*==========Big 4 Analysis Queries=========== */

pub struct AnalysisStats {
    pub prompt_version: &'static str,
    pub response_time_ms: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub confidence_score: f64,
    pub specificity_score: f64,
}

pub async fn insert_analysis(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    variant: Big4Variant,
    report: &Big4Report,
    stats: &AnalysisStats,
    now: NaiveDateTime,
) -> Result<Big4Analysis, sqlx::Error> {
    sqlx::query_as::<_, Big4Analysis>(
        r#"
        INSERT INTO big4_analyses (user_id, variant, cashflow_diagnosis, risk_projection, strategic_weak_points,
                                   recommendations, prompt_version, response_time_ms, prompt_tokens,
                                   completion_tokens, confidence_score, specificity_score, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(user_id)
    .bind(variant)
    .bind(Json(&report.cashflow_diagnosis))
    .bind(Json(&report.risk_projection))
    .bind(Json(&report.strategic_weak_points))
    .bind(Json(&report.recommendations))
    .bind(stats.prompt_version)
    .bind(stats.response_time_ms)
    .bind(stats.prompt_tokens)
    .bind(stats.completion_tokens)
    .bind(stats.confidence_score)
    .bind(stats.specificity_score)
    .bind(now)
    .fetch_one(ex)
    .await
}

/// Newest analysis of this variant created at or after `since`.
pub async fn latest_analysis_since(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    variant: Big4Variant,
    since: NaiveDateTime,
) -> Result<Option<Big4Analysis>, sqlx::Error> {
    sqlx::query_as::<_, Big4Analysis>(
        r#"
        SELECT * FROM big4_analyses
        WHERE user_id = ? AND variant = ? AND created_at >= ?
        ORDER BY created_at DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(variant)
    .bind(since)
    .fetch_optional(ex)
    .await
}

pub async fn list_analyses(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    variant: Option<Big4Variant>,
    limit: i64,
) -> Result<Vec<Big4Analysis>, sqlx::Error> {
    sqlx::query_as::<_, Big4Analysis>(
        r#"
        SELECT * FROM big4_analyses
        WHERE user_id = ? AND (? IS NULL OR variant = ?)
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(user_id)
    .bind(variant)
    .bind(variant)
    .bind(limit)
    .fetch_all(ex)
    .await
}

pub struct Feedback<'a> {
    pub user_rating: Option<i64>,
    pub was_helpful: Option<bool>,
    pub was_acted_upon: Option<bool>,
    pub feedback_text: Option<&'a str>,
}

pub async fn record_analysis_feedback(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    id: i64,
    feedback: &Feedback<'_>,
    now: NaiveDateTime,
) -> Result<Option<Big4Analysis>, sqlx::Error> {
    sqlx::query_as::<_, Big4Analysis>(
        r#"
        UPDATE big4_analyses
        SET user_rating = coalesce(?, user_rating),
            was_helpful = coalesce(?, was_helpful),
            was_acted_upon = coalesce(?, was_acted_upon),
            feedback_text = coalesce(?, feedback_text),
            feedback_at = ?
        WHERE id = ? AND user_id = ?
        RETURNING *
        "#,
    )
    .bind(feedback.user_rating)
    .bind(feedback.was_helpful)
    .bind(feedback.was_acted_upon)
    .bind(feedback.feedback_text)
    .bind(now)
    .bind(id)
    .bind(user_id)
    .fetch_optional(ex)
    .await
}

pub async fn count_analyses_since(
    ex: impl SqliteExecutor<'_>,
    user_id: i64,
    since: NaiveDateTime,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM big4_analyses WHERE user_id = ? AND created_at >= ?")
        .bind(user_id)
        .bind(since)
        .fetch_one(ex)
        .await
}
