mod extract;
mod handlers;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{routing::get, Router};
use sqlx::{Pool, Sqlite};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::ai::{gemini, GeminiFactory, ModelFactory, RateLimiter};
use crate::config::AppConfig;
use crate::services::mailer::{self, Mailer};
use crate::services::webhooks::stripe::StripeApi;

pub use extract::{bearer_token, AuthUser, ValidJson, ValidQuery};

#[derive(Clone)]
pub struct AppState {
    pub db: Pool<Sqlite>,
    pub config: Arc<AppConfig>,
    pub ai: Arc<dyn ModelFactory>,
    pub mailer: Arc<dyn Mailer>,
    pub rate_limiter: Arc<RateLimiter>,
    pub stripe: Option<Arc<StripeApi>>,
}

impl AppState {
    pub fn new(db: Pool<Sqlite>, config: AppConfig) -> Self {
        let ai = Arc::new(GeminiFactory::new(config.ai.clone()));
        let mailer = mailer::from_config(&config.mail);
        let rate_limiter = Arc::new(RateLimiter::new(
            config.ai.rate_limit,
            Duration::from_secs(config.ai.rate_window_secs),
        ));
        let stripe = StripeApi::from_config(gemini::http_client(), &config.stripe).map(Arc::new);
        Self {
            db,
            config: Arc::new(config),
            ai,
            mailer,
            rate_limiter,
            stripe,
        }
    }

    pub fn with_ai(mut self, ai: Arc<dyn ModelFactory>) -> Self {
        self.ai = ai;
        self
    }

    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .merge(routes::api_routes(state.clone()))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn run_server(pool: Pool<Sqlite>, config: AppConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr;
    let app = build_router(AppState::new(pool, config));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
