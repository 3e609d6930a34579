use chrono::NaiveDateTime;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::database::db::queries::users;
use crate::database::models::User;
use crate::error::{Error, Result, Validator};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
}

impl RegisterRequest {
    fn validate(&self) -> Result<()> {
        let email = self.email.trim();
        Validator::new()
            .check(email.len() <= 254 && email.contains('@') && !email.starts_with('@') && !email.ends_with('@'), "email", "Invalid email address")
            .check(!self.name.trim().is_empty(), "name", "Name is required")
            .check(self.name.trim().chars().count() <= 100, "name", "Name must be at most 100 characters")
            .finish()
    }
}

/// Opaque bearer token; only its SHA-256 is stored.
pub fn generate_token() -> String {
    format!("ff_{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub async fn register(pool: &Pool<Sqlite>, req: &RegisterRequest, now: NaiveDateTime) -> Result<(User, String)> {
    req.validate()?;
    let email = req.email.trim().to_lowercase();

    if users::find_by_email(pool, &email).await?.is_some() {
        return Err(Error::Conflict("An account with this email already exists".into()));
    }

    let token = generate_token();
    let user = users::create_user(pool, &email, req.name.trim(), &hash_token(&token), now).await?;
    tracing::info!(user_id = user.id, "user registered");
    Ok((user, token))
}

pub async fn authenticate(pool: &Pool<Sqlite>, token: &str) -> Result<Option<User>> {
    Ok(users::find_by_token_hash(pool, &hash_token(token)).await?)
}

pub async fn rotate_token(pool: &Pool<Sqlite>, user_id: i64) -> Result<String> {
    let token = generate_token();
    if !users::set_token_hash(pool, user_id, &hash_token(&token)).await? {
        return Err(Error::NotFound("User"));
    }
    tracing::info!(user_id, "api token rotated");
    Ok(token)
}

/// Store (or clear, with `None`) the user's own Gemini key.
pub async fn set_gemini_key(pool: &Pool<Sqlite>, user_id: i64, key: Option<&str>) -> Result<()> {
    let key = key.map(str::trim);
    if let Some(k) = key {
        if k.is_empty() || k.len() > 200 {
            return Err(Error::field("geminiApiKey", "API key must be 1-200 characters"));
        }
    }
    users::set_gemini_key(pool, user_id, key).await?;
    Ok(())
}
