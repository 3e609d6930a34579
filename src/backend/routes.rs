use axum::{
    middleware,
    routing::{get, patch, post, put},
    Router,
};

use crate::backend::handlers::{
    ai, auth, billing, budgets, cron, goals, notifications, recurring, reports, shared_budgets, transactions, webhooks,
};
use crate::backend::AppState;

pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(account_routes())
        .merge(money_routes())
        .merge(sharing_routes())
        .merge(reporting_routes())
        .merge(ai_routes(state))
        .merge(integration_routes())
}

fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/token/rotate", post(auth::rotate_token))
        .route("/api/auth/api-keys", put(auth::set_api_keys))
        .route("/api/subscription", get(billing::subscription))
        .route("/api/stripe/usage", get(billing::usage))
        .route(
            "/api/notifications",
            get(notifications::list).post(notifications::create),
        )
        .route("/api/notifications/unread-count", get(notifications::unread_count))
        .route("/api/notifications/read-all", post(notifications::mark_all_read))
        .route("/api/notifications/{id}", axum::routing::delete(notifications::delete))
        .route("/api/notifications/{id}/read", patch(notifications::mark_read))
}

fn money_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/transactions",
            get(transactions::list).post(transactions::create),
        )
        .route("/api/transactions/bulk", post(transactions::bulk))
        .route(
            "/api/transactions/{id}",
            get(transactions::get)
                .put(transactions::update)
                .delete(transactions::delete),
        )
        .route("/api/budgets", get(budgets::list).post(budgets::create))
        .route(
            "/api/budgets/{id}",
            put(budgets::update).delete(budgets::delete),
        )
        .route("/api/goals", get(goals::list).post(goals::create))
        .route(
            "/api/goals/{id}",
            get(goals::get).put(goals::update).delete(goals::delete),
        )
        .route("/api/goals/{id}/contributions", post(goals::contribute))
        .route(
            "/api/recurring-transactions",
            get(recurring::list).post(recurring::create),
        )
        .route(
            "/api/recurring-transactions/{id}",
            get(recurring::get)
                .put(recurring::update)
                .delete(recurring::delete),
        )
}

fn sharing_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/shared-budgets",
            get(shared_budgets::list).post(shared_budgets::create),
        )
        .route(
            "/api/shared-budgets/{id}",
            get(shared_budgets::get)
                .put(shared_budgets::update)
                .delete(shared_budgets::delete),
        )
        .route("/api/shared-budgets/{id}/invite", post(shared_budgets::invite))
        .route(
            "/api/shared-budgets/{id}/permissions",
            get(shared_budgets::permissions).patch(shared_budgets::change_role),
        )
        .route("/api/shared-budgets/{id}/leave", post(shared_budgets::leave))
}

fn reporting_routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/stats", get(reports::dashboard))
        .route("/api/reports", get(reports::list).post(reports::generate))
        .route(
            "/api/reports/{id}",
            get(reports::get).delete(reports::delete),
        )
        .route("/api/reports/{id}/download", get(reports::download))
        .route("/api/export/data", get(reports::export_data))
}

/// Every route here shares the per-user AI rate limit.
fn ai_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/ai/categorize", post(ai::categorize))
        .route("/api/ai/categorize/feedback", post(ai::categorize_feedback))
        .route(
            "/api/ai/big4-analysis",
            get(ai::list_analyses).post(ai::analyze),
        )
        .route("/api/ai/big4-analysis/{id}/feedback", patch(ai::analysis_feedback))
        .route("/api/ai/forecast", get(ai::forecast))
        .route("/api/ai/optimize-budgets", get(ai::optimize_budgets))
        .route_layer(middleware::from_fn_with_state(state, ai::rate_limit))
}

/// Callers outside the app: the scheduler, Stripe and GitHub.
fn integration_routes() -> Router<AppState> {
    Router::new()
        .route("/api/cron/{job}", get(cron::run_job))
        .route("/api/stripe/webhook", post(billing::stripe_webhook))
        .route(
            "/api/github/webhook",
            get(webhooks::github_status).post(webhooks::github_webhook),
        )
        .route("/api/versioning", get(webhooks::versioning))
}
