//! In-memory app plus helpers for driving the router without a socket.
#![allow(dead_code)]

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sqlx::{Pool, Sqlite};
use tower::ServiceExt;

use finance_flow::ai::{AiError, GenerativeModel, ModelFactory};
use finance_flow::backend::{build_router, AppState};
use finance_flow::database::db::connection::get_db_pool;
use finance_flow::database::db::migrate::run_migrations;
use finance_flow::database::db::queries::subscriptions::{self, CheckoutFields};
use finance_flow::database::models::{SubscriptionStatus, Tier};
use finance_flow::services::mailer::Mailer;
use finance_flow::AppConfig;

pub const CRON_SECRET: &str = "cron-test-secret";
pub const STRIPE_SECRET: &str = "whsec_test";
pub const GITHUB_SECRET: &str = "gh-test-secret";

/// Answers every prompt with the same text, or fails when `reply` is `None`.
pub struct StubModel {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl StubModel {
    pub fn replying(reply: impl Into<String>) -> Self {
        Self { reply: Some(reply.into()), calls: AtomicUsize::new(0) }
    }

    pub fn failing() -> Self {
        Self { reply: None, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerativeModel for StubModel {
    async fn generate(&self, _prompt: &str) -> Result<String, AiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => Err(AiError::Api { status: 503, message: "model unavailable".into() }),
        }
    }
}

struct StubFactory(Arc<StubModel>);

impl ModelFactory for StubFactory {
    fn model_for(&self, _user_key: Option<&str>) -> Result<Arc<dyn GenerativeModel>, AiError> {
        Ok(self.0.clone())
    }
}

/// Keeps every email instead of sending it.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> finance_flow::Result<()> {
        self.sent.lock().unwrap().push(SentMail { to: to.into(), subject: subject.into(), html: html.into() });
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub model: Arc<StubModel>,
    pub mail: Arc<RecordingMailer>,
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Reply {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    pub fn error_code(&self) -> &str {
        self.body["error"]["code"].as_str().unwrap_or_default()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::build(StubModel::failing(), |_| {}).await
    }

    pub async fn with_model(model: StubModel) -> Self {
        Self::build(model, |_| {}).await
    }

    pub async fn build(model: StubModel, tweak: impl FnOnce(&mut AppConfig)) -> Self {
        let pool = get_db_pool("sqlite::memory:").await.expect("in-memory pool");
        run_migrations(&pool).await.expect("migrations");

        let mut config = AppConfig::for_database("sqlite::memory:");
        config.cron_secret = Some(CRON_SECRET.into());
        config.github_webhook_secret = Some(GITHUB_SECRET.into());
        config.stripe.webhook_secret = Some(STRIPE_SECRET.into());
        tweak(&mut config);

        let model = Arc::new(model);
        let mail = Arc::new(RecordingMailer::default());
        let state = AppState::new(pool.clone(), config)
            .with_ai(Arc::new(StubFactory(model.clone())))
            .with_mailer(mail.clone());

        TestApp { router: build_router(state), pool, model, mail }
    }

    pub async fn request(&self, req: Request<Body>) -> Reply {
        let response = self.router.clone().oneshot(req).await.expect("router is infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.expect("body").to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        Reply { status, headers, body }
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.request(req).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> Reply {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Reply {
        self.call(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Reply {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Reply {
        self.call(Method::DELETE, uri, Some(token), None).await
    }

    /// Put a user on a paid plan without going through Stripe.
    pub async fn set_tier(&self, user_id: i64, tier: Tier) {
        let fields = CheckoutFields {
            tier: Some(tier),
            status: SubscriptionStatus::Active,
            customer_id: None,
            subscription_id: None,
            price_id: None,
            period_start: None,
            period_end: None,
        };
        let now = chrono::Utc::now().naive_utc();
        subscriptions::upsert_checkout(&self.pool, user_id, &fields, now).await.expect("plan change");
    }

    /// Registers a user and returns `(user id, bearer token)`.
    pub async fn register(&self, email: &str) -> (i64, String) {
        let name = email.split('@').next().unwrap_or("user");
        let reply = self
            .call(Method::POST, "/api/auth/register", None, Some(json!({ "email": email, "name": name })))
            .await;
        assert_eq!(reply.status, StatusCode::CREATED, "register failed: {}", reply.body);
        let id = reply.data()["user"]["id"].as_i64().expect("user id");
        let token = reply.data()["token"].as_str().expect("token").to_string();
        (id, token)
    }
}

/// Decimal from a JSON string or number.
pub fn dec(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        other => Decimal::from_str(&other.to_string()).expect("decimal number"),
    }
}

pub fn today() -> chrono::NaiveDate {
    chrono::Utc::now().date_naive()
}
