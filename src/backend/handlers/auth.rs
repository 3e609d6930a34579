use axum::extract::State;
use serde::{Deserialize, Serialize};

use super::{created, now, ok, ApiResult, Created};
use crate::backend::{AppState, AuthUser, ValidJson};
use crate::database::models::User;
use crate::services::auth::{self, RegisterRequest};

#[derive(Debug, Serialize)]
pub struct Credentials {
    pub user: User,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct RotatedToken {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeys {
    pub gemini_api_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStatus {
    pub gemini_api_key_set: bool,
}

pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Created<Credentials> {
    let (user, token) = auth::register(&state.db, &req, now()).await?;
    created(Credentials { user, token })
}

pub async fn me(AuthUser(user): AuthUser) -> ApiResult<User> {
    ok(user)
}

pub async fn rotate_token(State(state): State<AppState>, AuthUser(user): AuthUser) -> ApiResult<RotatedToken> {
    let token = auth::rotate_token(&state.db, user.id).await?;
    ok(RotatedToken { token })
}

pub async fn set_api_keys(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    ValidJson(keys): ValidJson<ApiKeys>,
) -> ApiResult<ApiKeyStatus> {
    auth::set_gemini_key(&state.db, user.id, keys.gemini_api_key.as_deref()).await?;
    ok(ApiKeyStatus { gemini_api_key_set: keys.gemini_api_key.is_some() })
}
