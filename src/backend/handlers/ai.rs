use axum::{
    extract::{Path, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{now, ok, ApiResult};
use crate::ai::big4::{self, AnalysisResponse, AnalyzeRequest, FeedbackRequest, ListQuery};
use crate::ai::categorization::{self, CategorizeRequest, CategorizeResponse, SuggestionFeedback};
use crate::ai::forecast::{self, Forecast, ForecastQuery};
use crate::ai::optimizer::{self, OptimizeQuery, Optimization};
use crate::backend::{AppState, AuthUser, ValidJson, ValidQuery};
use crate::database::models::{AiSuggestion, Big4Analysis};
use crate::error::Error;

/// Per-user window over every AI route. Always reports the window in `X-RateLimit-*`.
pub async fn rate_limit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    req: Request,
    next: Next,
) -> Response {
    let decision = state.rate_limiter.check(user.id);
    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        tracing::info!(user_id = user.id, limit = decision.limit, "ai rate limit exceeded");
        Error::RateLimited { limit: decision.limit, retry_after: decision.reset_after }.into_response()
    };

    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_after));
    response
}

pub async fn categorize(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(input): ValidJson<CategorizeRequest>,
) -> ApiResult<CategorizeResponse> {
    ok(categorization::categorize(&state.db, state.ai.as_ref(), user.id, input, now()).await?)
}

pub async fn categorize_feedback(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(input): ValidJson<SuggestionFeedback>,
) -> ApiResult<AiSuggestion> {
    ok(categorization::record_feedback(&state.db, user.id, input).await?)
}

pub async fn analyze(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(request): ValidJson<AnalyzeRequest>,
) -> ApiResult<AnalysisResponse> {
    ok(big4::analyze(&state.db, state.ai.as_ref(), user.id, request, now()).await?)
}

pub async fn list_analyses(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidQuery(query): ValidQuery<ListQuery>,
) -> ApiResult<Vec<Big4Analysis>> {
    ok(big4::list(&state.db, user.id, query).await?)
}

pub async fn analysis_feedback(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<i64>,
    ValidJson(input): ValidJson<FeedbackRequest>,
) -> ApiResult<Big4Analysis> {
    ok(big4::feedback(&state.db, user.id, id, input, now()).await?)
}

pub async fn forecast(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidQuery(query): ValidQuery<ForecastQuery>,
) -> ApiResult<Forecast> {
    ok(forecast::forecast(&state.db, state.ai.as_ref(), user.id, query, now()).await?)
}

pub async fn optimize_budgets(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidQuery(query): ValidQuery<OptimizeQuery>,
) -> ApiResult<Optimization> {
    ok(optimizer::optimize(&state.db, state.ai.as_ref(), user.id, query, now()).await?)
}
