mod common;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use serde_json::json;

use common::{today, StubModel, TestApp};

const BIG4_REPLY: &str = r#"```json
{
  "cashflowDiagnosis": { "netCashflowAvg": 850.5, "trend": "improving", "variability": "moderate", "assessment": "Income covers fixed costs with room to spare." },
  "riskProjection": {
    "thirtyDay": { "level": "Safe", "description": "Buffer covers a month." },
    "sixtyDay": { "level": "Safe", "description": "No large bills due." },
    "ninetyDay": { "level": "Warning", "description": "Insurance renewal lands in month three." }
  },
  "strategicWeakPoints": { "structuralIssues": ["Dining is 30% of spend"], "bufferStatus": "1.2x monthly spend", "rhythmBalance": "Front-loaded" },
  "recommendations": [ { "priority": 1, "action": "Cap dining at $300", "impact": "Saves $120/month", "metric": "Dining under 20%" } ]
}
```"#;

fn coffee() -> serde_json::Value {
    json!({ "description": "STARBUCKS #1234", "amount": "5.75", "type": "EXPENSE" })
}

#[tokio::test]
async fn categorize_falls_back_to_keyword_rules() {
    let app = TestApp::with_model(StubModel::failing()).await;
    let (_, token) = app.register("rules@example.com").await;

    let reply = app.post("/api/ai/categorize", &token, coffee()).await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.data()["category"], "Food & Dining");
    assert_eq!(reply.data()["subcategory"], "Coffee & Cafes");
    assert_eq!(reply.data()["fallback"], true);
    assert!(reply.data()["suggestionId"].is_null());
    assert_eq!(app.model.calls(), 1);

    // fallbacks are free
    let usage = app.get("/api/stripe/usage", &token).await;
    assert_eq!(usage.data()["usage"]["aiRequests"], 0);
}

#[tokio::test]
async fn categorize_stores_model_answers() {
    let reply = r#"{"category":"Food & Dining","subcategory":"Coffee & Cafes","confidence":0.93,"reasoning":"Coffee chain"}"#;
    let app = TestApp::with_model(StubModel::replying(reply)).await;
    let (_, token) = app.register("model@example.com").await;

    let answer = app.post("/api/ai/categorize", &token, coffee()).await;
    assert_eq!(answer.status, StatusCode::OK, "{}", answer.body);
    assert_eq!(answer.data()["fallback"], false);
    let suggestion_id = answer.data()["suggestionId"].as_i64().expect("suggestion stored");

    let feedback = app
        .post(
            "/api/ai/categorize/feedback",
            &token,
            json!({ "suggestionId": suggestion_id, "accepted": false, "actualCategory": "Entertainment" }),
        )
        .await;
    assert_eq!(feedback.status, StatusCode::OK, "{}", feedback.body);

    let usage = app.get("/api/stripe/usage", &token).await;
    assert_eq!(usage.data()["usage"]["aiRequests"], 1);
}

#[tokio::test]
async fn categorize_validates_before_calling_the_model() {
    let app = TestApp::new().await;
    let (_, token) = app.register("blank@example.com").await;

    let reply = app
        .post("/api/ai/categorize", &token, json!({ "description": "", "amount": "0", "type": "EXPENSE" }))
        .await;
    assert_eq!(reply.status, StatusCode::BAD_REQUEST);
    assert_eq!(app.model.calls(), 0);
}

#[tokio::test]
async fn fresh_big4_analysis_is_served_from_cache() {
    let app = TestApp::with_model(StubModel::replying(BIG4_REPLY)).await;
    let (_, token) = app.register("cfo@example.com").await;
    app.post(
        "/api/transactions",
        &token,
        json!({ "amount": "3200.00", "type": "INCOME", "category": "Salary", "description": "Pay", "date": today() }),
    )
    .await;

    let first = app.post("/api/ai/big4-analysis", &token, json!({})).await;
    assert_eq!(first.status, StatusCode::OK, "{}", first.body);
    assert_eq!(first.data()["cached"], false);
    assert_eq!(first.data()["analysis"]["recommendations"][0]["action"], "Cap dining at $300");
    assert_eq!(first.data()["metadata"]["specificityScore"], 100.0);

    let second = app.post("/api/ai/big4-analysis", &token, json!({})).await;
    assert_eq!(second.data()["cached"], true);
    assert_eq!(second.data()["analysisId"], first.data()["analysisId"]);
    assert_eq!(app.model.calls(), 1);

    let forced = app.post("/api/ai/big4-analysis", &token, json!({ "force": true })).await;
    assert_eq!(forced.data()["cached"], false);
    assert_eq!(app.model.calls(), 2);

    let history = app.get("/api/ai/big4-analysis", &token).await;
    assert_eq!(history.data().as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn big4_feedback_is_recorded() {
    let app = TestApp::with_model(StubModel::replying(BIG4_REPLY)).await;
    let (_, token) = app.register("rater@example.com").await;

    let analysis = app.post("/api/ai/big4-analysis", &token, json!({})).await;
    let id = analysis.data()["analysisId"].as_i64().unwrap();

    let reply = app
        .call(
            axum::http::Method::PATCH,
            &format!("/api/ai/big4-analysis/{id}/feedback"),
            Some(&token),
            Some(json!({ "userRating": 4, "wasHelpful": true })),
        )
        .await;
    assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
    assert_eq!(reply.data()["userRating"], 4);
    assert_eq!(reply.data()["wasHelpful"], true);
}

#[tokio::test]
async fn forecast_falls_back_to_statistics() {
    let app = TestApp::with_model(StubModel::failing()).await;
    let (_, token) = app.register("future@example.com").await;

    let empty = app.get("/api/ai/forecast", &token).await;
    assert_eq!(empty.status, StatusCode::OK, "{}", empty.body);
    assert_eq!(app.model.calls(), 0);

    app.post(
        "/api/transactions",
        &token,
        json!({ "amount": "90.00", "type": "EXPENSE", "category": "Transportation", "description": "Fuel", "date": today() }),
    )
    .await;
    let forecast = app.get("/api/ai/forecast?months=2", &token).await;
    assert_eq!(forecast.status, StatusCode::OK, "{}", forecast.body);
    assert_eq!(forecast.data()["fallback"], true);
    assert_eq!(forecast.data()["months"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn ai_routes_share_a_per_user_rate_limit() {
    let app = TestApp::build(StubModel::failing(), |c| c.ai.rate_limit = 2).await;
    let (_, token) = app.register("busy@example.com").await;
    let (_, other) = app.register("calm@example.com").await;

    let first = app.post("/api/ai/categorize", &token, coffee()).await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.header("x-ratelimit-limit"), Some("2"));
    assert_eq!(first.header("x-ratelimit-remaining"), Some("1"));

    let second = app.get("/api/ai/forecast", &token).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.header("x-ratelimit-remaining"), Some("0"));

    let third = app.post("/api/ai/categorize", &token, coffee()).await;
    assert_eq!(third.status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(third.error_code(), "RATE_LIMITED");
    assert!(third.header("retry-after").is_some());
    assert_eq!(third.header("x-ratelimit-remaining"), Some("0"));

    // other users keep their own window
    let theirs = app.post("/api/ai/categorize", &other, coffee()).await;
    assert_eq!(theirs.status, StatusCode::OK);
}
