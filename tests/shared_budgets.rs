mod common;

use axum::http::{Method, StatusCode};
use chrono::Datelike;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use common::{dec, today, TestApp};
use finance_flow::database::models::Tier;

struct Household {
    app: TestApp,
    owner: String,
    budget: String,
}

/// A Premium owner with one shared grocery budget for this month.
async fn household() -> Household {
    let app = TestApp::new().await;
    let (owner_id, owner) = app.register("owner@example.com").await;
    app.set_tier(owner_id, Tier::Premium).await;

    let now = today();
    let created = app
        .post(
            "/api/shared-budgets",
            &owner,
            json!({ "name": "Household", "category": "Groceries", "amount": "600.00", "month": now.month(), "year": now.year() }),
        )
        .await;
    assert_eq!(created.status, StatusCode::CREATED, "{}", created.body);
    assert_eq!(created.data()["role"], "OWNER");
    let budget = format!("/api/shared-budgets/{}", created.data()["id"]);

    Household { app, owner, budget }
}

impl Household {
    async fn invite(&self, token: &str, email: &str, role: &str) -> common::Reply {
        self.app
            .post(&format!("{}/invite", self.budget), token, json!({ "email": email, "role": role }))
            .await
    }

    async fn join(&self, email: &str, role: &str) -> (i64, String) {
        let (id, token) = self.app.register(email).await;
        let reply = self.invite(&self.owner, email, role).await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        (id, token)
    }
}

#[tokio::test]
async fn free_plan_cannot_share_budgets() {
    let app = TestApp::new().await;
    let (_, token) = app.register("solo@example.com").await;

    let reply = app
        .post(
            "/api/shared-budgets",
            &token,
            json!({ "name": "Trip", "category": "Travel", "amount": "900.00", "month": 6, "year": 2026 }),
        )
        .await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);
    assert_eq!(reply.error_code(), "FEATURE_LIMIT");
}

#[tokio::test]
async fn invited_members_see_the_budget_and_get_notified() {
    let home = household().await;
    let (member_id, member) = home.app.register("partner@example.com").await;

    let invite = home.invite(&home.owner, "PARTNER@example.com", "CONTRIBUTOR").await;
    assert_eq!(invite.status, StatusCode::CREATED, "{}", invite.body);
    assert_eq!(invite.data()["userId"], member_id);
    assert_eq!(invite.data()["role"], "CONTRIBUTOR");

    let again = home.invite(&home.owner, "partner@example.com", "VIEWER").await;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);

    let seen = home.app.get(&home.budget, &member).await;
    assert_eq!(seen.status, StatusCode::OK);
    assert_eq!(seen.data()["role"], "CONTRIBUTOR");
    assert_eq!(seen.data()["members"].as_array().unwrap().len(), 1);

    let listed = home.app.get("/api/shared-budgets", &member).await;
    assert_eq!(listed.data().as_array().unwrap().len(), 1);

    let notes = home.app.get("/api/notifications", &member).await;
    assert_eq!(notes.data()[0]["type"], "BUDGET_SHARED");
    assert_eq!(notes.data()[0]["title"], "Shared budget: Household");
}

#[tokio::test]
async fn member_spending_counts_toward_the_shared_budget() {
    let home = household().await;
    let (_, member) = home.join("cook@example.com", "CONTRIBUTOR").await;

    home.app
        .post(
            "/api/transactions",
            &member,
            json!({ "amount": "75.25", "type": "EXPENSE", "category": "Groceries", "description": "Market", "date": today() }),
        )
        .await;

    let detail = home.app.get(&home.budget, &home.owner).await;
    assert_eq!(dec(&detail.data()["spent"]), Decimal::new(7525, 2));
    assert_eq!(dec(&detail.data()["remaining"]), Decimal::new(52475, 2));
}

#[tokio::test]
async fn only_the_owner_grants_admin() {
    let home = household().await;
    let (_, admin) = home.join("admin@example.com", "ADMIN").await;
    home.app.register("newcomer@example.com").await;
    home.app.register("helper@example.com").await;

    let escalate = home.invite(&admin, "newcomer@example.com", "ADMIN").await;
    assert_eq!(escalate.status, StatusCode::FORBIDDEN);

    let allowed = home.invite(&admin, "helper@example.com", "VIEWER").await;
    assert_eq!(allowed.status, StatusCode::CREATED, "{}", allowed.body);
}

#[tokio::test]
async fn viewers_cannot_edit_or_invite() {
    let home = household().await;
    let (_, viewer) = home.join("viewer@example.com", "VIEWER").await;
    home.app.register("friend@example.com").await;

    let edit = home.app.put(&home.budget, &viewer, json!({ "amount": "1.00" })).await;
    assert_eq!(edit.status, StatusCode::FORBIDDEN);
    assert_eq!(edit.error_code(), "FORBIDDEN");

    let invite = home.invite(&viewer, "friend@example.com", "VIEWER").await;
    assert_eq!(invite.status, StatusCode::FORBIDDEN);

    let unchanged = home.app.get(&home.budget, &home.owner).await;
    assert_eq!(dec(&unchanged.data()["amount"]), Decimal::new(60000, 2));
}

#[tokio::test]
async fn contributors_edit_but_only_the_owner_deletes() {
    let home = household().await;
    let (_, contributor) = home.join("editor@example.com", "CONTRIBUTOR").await;

    let edit = home.app.put(&home.budget, &contributor, json!({ "amount": "650.00" })).await;
    assert_eq!(edit.status, StatusCode::OK, "{}", edit.body);
    assert_eq!(dec(&edit.data()["amount"]), Decimal::new(65000, 2));

    assert_eq!(home.app.delete(&home.budget, &contributor).await.status, StatusCode::FORBIDDEN);
    assert_eq!(home.app.delete(&home.budget, &home.owner).await.status, StatusCode::OK);
    assert_eq!(home.app.get(&home.budget, &contributor).await.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn strangers_get_not_found() {
    let home = household().await;
    let (_, stranger) = home.app.register("stranger@example.com").await;

    assert_eq!(home.app.get(&home.budget, &stranger).await.status, StatusCode::NOT_FOUND);
    let edit = home.app.put(&home.budget, &stranger, json!({ "amount": "1.00" })).await;
    assert_eq!(edit.status, StatusCode::NOT_FOUND);
    let perms = home.app.get(&format!("{}/permissions", home.budget), &stranger).await;
    assert_eq!(perms.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn owner_changes_roles_and_cannot_leave() {
    let home = household().await;
    let (member_id, member) = home.join("promoted@example.com", "VIEWER").await;
    let permissions = format!("{}/permissions", home.budget);

    let by_member = home
        .app
        .call(Method::PATCH, &permissions, Some(&member), Some(json!({ "userId": member_id, "role": "ADMIN" })))
        .await;
    assert_eq!(by_member.status, StatusCode::FORBIDDEN);

    let promoted = home
        .app
        .call(Method::PATCH, &permissions, Some(&home.owner), Some(json!({ "userId": member_id, "role": "ADMIN" })))
        .await;
    assert_eq!(promoted.status, StatusCode::OK, "{}", promoted.body);
    let row = promoted
        .data()
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["userId"] == member_id)
        .cloned()
        .unwrap_or(Value::Null);
    assert_eq!(row["role"], "ADMIN");

    let missing = home
        .app
        .call(Method::PATCH, &permissions, Some(&home.owner), Some(json!({ "userId": 9999, "role": "VIEWER" })))
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let owner_leaves = home.app.post(&format!("{}/leave", home.budget), &home.owner, json!({})).await;
    assert_eq!(owner_leaves.status, StatusCode::BAD_REQUEST);

    let member_leaves = home.app.post(&format!("{}/leave", home.budget), &member, json!({})).await;
    assert_eq!(member_leaves.status, StatusCode::OK, "{}", member_leaves.body);
    assert_eq!(home.app.get(&home.budget, &member).await.status, StatusCode::NOT_FOUND);
}
