mod common;

use axum::http::StatusCode;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use common::{dec, TestApp};

async fn spend(app: &TestApp, token: &str, kind: &str, category: &str, description: &str, amount: &str, date: &str) {
    let reply = app
        .post(
            "/api/transactions",
            token,
            json!({ "amount": amount, "type": kind, "category": category, "description": description, "date": date }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
}

/// One user with a March 2025 ledger and a stored monthly report for it.
async fn march_report(app: &TestApp, email: &str) -> (String, i64) {
    let (_, token) = app.register(email).await;
    spend(app, &token, "INCOME", "Salary", "Payroll", "3000.00", "2025-03-01").await;
    spend(app, &token, "EXPENSE", "Housing", "Rent", "1200.00", "2025-03-02").await;
    spend(app, &token, "EXPENSE", "Food & Dining", "Groceries, weekly", "300.00", "2025-03-10").await;
    spend(app, &token, "EXPENSE", "Food & Dining", "Old receipt", "99.00", "2025-02-27").await;

    let reply = app.post("/api/reports", &token, json!({ "type": "MONTHLY", "month": 3, "year": 2025 })).await;
    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let id = reply.data()["id"].as_i64().expect("report id");
    (token, id)
}

#[tokio::test]
async fn monthly_report_is_generated_and_listed() {
    let app = TestApp::new().await;
    let (token, id) = march_report(&app, "ana@example.com").await;

    let report = app.get(&format!("/api/reports/{id}"), &token).await;
    assert_eq!(report.status, StatusCode::OK);
    let data = report.data();
    assert_eq!(data["name"], "Monthly Report - Mar 2025");
    assert_eq!(data["type"], "MONTHLY");
    assert_eq!(data["format"], "JSON");
    assert_eq!(data["startDate"], "2025-03-01");
    assert_eq!(data["endDate"], "2025-03-31");

    let summary = &data["data"]["summary"];
    assert_eq!(dec(&summary["totalIncome"]), Decimal::new(3000, 0));
    assert_eq!(dec(&summary["totalExpense"]), Decimal::new(1500, 0));
    assert_eq!(dec(&summary["net"]), Decimal::new(1500, 0));
    assert_eq!(summary["transactionCount"], 3);
    assert_eq!(summary["topCategories"][0]["category"], "Housing");
    assert_eq!(data["data"]["transactions"].as_array().unwrap().len(), 3);

    let listed = app.get("/api/reports", &token).await;
    let ids: Vec<i64> = listed.data().as_array().unwrap().iter().filter_map(|r| r["id"].as_i64()).collect();
    assert_eq!(ids, vec![id]);
}

#[tokio::test]
async fn custom_reports_need_a_date_range() {
    let app = TestApp::new().await;
    let (_, token) = app.register("range@example.com").await;

    let missing = app.post("/api/reports", &token, json!({ "type": "CUSTOM" })).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    assert!(missing.body["error"]["details"]["fieldErrors"]["startDate"].is_array(), "{}", missing.body);

    let named = app
        .post(
            "/api/reports",
            &token,
            json!({ "type": "CUSTOM", "name": "Q1", "startDate": "2025-01-01", "endDate": "2025-03-31" }),
        )
        .await;
    assert_eq!(named.status, StatusCode::CREATED, "{}", named.body);
    assert_eq!(named.data()["name"], "Q1");
}

#[tokio::test]
async fn free_plan_stops_at_three_reports() {
    let app = TestApp::new().await;
    let (_, token) = app.register("many@example.com").await;

    for month in 1..=3 {
        let reply = app.post("/api/reports", &token, json!({ "type": "MONTHLY", "month": month, "year": 2025 })).await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    }
    let fourth = app.post("/api/reports", &token, json!({ "type": "MONTHLY", "month": 4, "year": 2025 })).await;
    assert_eq!(fourth.status, StatusCode::FORBIDDEN);
    assert_eq!(fourth.error_code(), "FEATURE_LIMIT");
}

#[tokio::test]
async fn report_downloads_as_json_and_csv() {
    let app = TestApp::new().await;
    let (token, id) = march_report(&app, "dl@example.com").await;
    let uri = format!("/api/reports/{id}/download");

    let as_json = app.get(&uri, &token).await;
    assert_eq!(as_json.status, StatusCode::OK);
    assert_eq!(as_json.header("content-type"), Some("application/json"));
    let disposition = format!("attachment; filename=\"report-{id}-2025-03-01.json\"");
    assert_eq!(as_json.header("content-disposition"), Some(disposition.as_str()));
    assert_eq!(dec(&as_json.body["summary"]["totalExpense"]), Decimal::new(1500, 0));
    assert!(as_json.body.get("success").is_none());

    let as_csv = app.get(&format!("{uri}?format=csv"), &token).await;
    assert_eq!(as_csv.status, StatusCode::OK);
    assert_eq!(as_csv.header("content-type"), Some("text/csv"));
    let disposition = format!("attachment; filename=\"report-{id}-2025-03-01.csv\"");
    assert_eq!(as_csv.header("content-disposition"), Some(disposition.as_str()));

    let text = as_csv.body.as_str().expect("csv text");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Report,Monthly Report - Mar 2025");
    assert_eq!(lines[1], "Period,2025-03-01,2025-03-31");
    assert!(lines.iter().any(|l| l.starts_with("Food & Dining,EXPENSE,300.00,1,")), "{text}");
    assert!(text.contains("2025-03-10,EXPENSE,Food & Dining,\"Groceries, weekly\",300.00"), "{text}");
    assert!(!text.contains("Old receipt"));

    let bad = app.get(&format!("{uri}?format=xml"), &token).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert_eq!(bad.error_code(), "VALIDATION_ERROR");
}

#[tokio::test]
async fn reports_are_private_to_their_owner() {
    let app = TestApp::new().await;
    let (owner, id) = march_report(&app, "owner@example.com").await;
    let (_, other) = app.register("other@example.com").await;
    let uri = format!("/api/reports/{id}");

    assert_eq!(app.get(&uri, &other).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get(&format!("{uri}/download"), &other).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, &other).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/reports", &other).await.data(), &json!([]));

    let removed = app.delete(&uri, &owner).await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.data()["deleted"], true);
    assert_eq!(app.get(&uri, &owner).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.delete(&uri, &owner).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn export_contains_only_the_callers_data() {
    let app = TestApp::new().await;
    let (_, token) = app.register("mine@example.com").await;
    let (_, other) = app.register("theirs@example.com").await;
    spend(&app, &token, "EXPENSE", "Transport", "Bus pass", "45.00", "2025-05-02").await;
    spend(&app, &other, "EXPENSE", "Transport", "Taxi home", "30.00", "2025-05-03").await;
    let budget = app
        .post("/api/budgets", &token, json!({ "category": "Transport", "amount": "100.00", "month": 5, "year": 2025 }))
        .await;
    assert_eq!(budget.status, StatusCode::CREATED, "{}", budget.body);

    let as_json = app.get("/api/export/data?format=json", &token).await;
    assert_eq!(as_json.status, StatusCode::OK);
    assert_eq!(as_json.header("content-type"), Some("application/json"));
    let disposition = as_json.header("content-disposition").unwrap_or_default();
    assert!(disposition.starts_with("attachment; filename=\"financeflow-export-"), "{disposition}");
    assert!(disposition.ends_with(".json\""), "{disposition}");

    let txns = as_json.body["transactions"].as_array().expect("transactions");
    let descriptions: Vec<&str> = txns.iter().filter_map(|t| t["description"].as_str()).collect();
    assert_eq!(descriptions, vec!["Bus pass"]);
    assert_eq!(as_json.body["budgets"].as_array().map(Vec::len), Some(1));
    assert_eq!(as_json.body["goals"], json!([]));
    assert_eq!(as_json.body["recurringTransactions"], json!([]));
    assert!(as_json.body["exportedAt"].is_string());

    let as_csv = app.get("/api/export/data?format=CSV", &token).await;
    assert_eq!(as_csv.status, StatusCode::OK);
    assert_eq!(as_csv.header("content-type"), Some("text/csv"));
    let text = match &as_csv.body {
        Value::String(text) => text.as_str(),
        other => panic!("expected csv text, got {other}"),
    };
    assert!(text.starts_with("TRANSACTIONS\nDate,Type,Category,Description,Amount,Notes\n2025-05-02,EXPENSE,Transport,Bus pass,45.00,\n"), "{text}");
    assert!(text.contains("\nBUDGETS\nCategory,Amount,Month,Year\nTransport,100.00,5,2025\n"), "{text}");
    assert!(!text.contains("Taxi home"));

    let bad = app.get("/api/export/data?format=pdf", &token).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
    assert!(bad.body["error"]["details"]["fieldErrors"]["format"].is_array(), "{}", bad.body);
}
