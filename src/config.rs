// src/config.rs
//! Runtime configuration read from the environment (`.env` is loaded by `main`).

use std::env;
use std::net::SocketAddr;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct StripeConfig {
    pub webhook_secret: Option<String>,
    /// Used to look up subscriptions named by checkout sessions.
    pub secret_key: Option<String>,
    pub api_base: String,
    pub price_basic: String,
    pub price_premium: String,
    pub price_enterprise: String,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub rate_limit: u32,
    pub rate_window_secs: u64,
}

#[derive(Debug, Clone)]
pub struct MailConfig {
    pub resend_api_key: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub app_url: String,
    pub cron_secret: Option<String>,
    pub github_webhook_secret: Option<String>,
    pub stripe: StripeConfig,
    pub ai: AiConfig,
    pub mail: MailConfig,
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> Result<T> {
    match env_opt(name) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| Error::Config(format!("{name} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env_opt("DATABASE_URL")
            .ok_or_else(|| Error::Config("DATABASE_URL must be set".into()))?;

        Ok(Self {
            database_url,
            bind_addr: env_parse("BIND_ADDR", SocketAddr::from(([127, 0, 0, 1], 3000)))?,
            app_url: env_or("APP_URL", "http://localhost:3000"),
            cron_secret: env_opt("CRON_SECRET"),
            github_webhook_secret: env_opt("GITHUB_WEBHOOK_SECRET"),
            stripe: StripeConfig {
                webhook_secret: env_opt("STRIPE_WEBHOOK_SECRET"),
                secret_key: env_opt("STRIPE_SECRET_KEY"),
                api_base: env_or("STRIPE_API_BASE", "https://api.stripe.com/v1"),
                price_basic: env_or("STRIPE_PRICE_BASIC", "price_basic_monthly"),
                price_premium: env_or("STRIPE_PRICE_PREMIUM", "price_premium_monthly"),
                price_enterprise: env_or("STRIPE_PRICE_ENTERPRISE", "price_business_monthly"),
            },
            ai: AiConfig {
                api_key: env_opt("GEMINI_API_KEY"),
                model: env_or("GEMINI_MODEL", "gemini-1.5-flash"),
                base_url: env_or(
                    "GEMINI_BASE_URL",
                    "https://generativelanguage.googleapis.com/v1beta",
                ),
                temperature: env_parse("AI_TEMPERATURE", 0.7)?,
                max_tokens: env_parse("AI_MAX_TOKENS", 1000)?,
                rate_limit: env_parse("AI_RATE_LIMIT", 10)?,
                rate_window_secs: env_parse("AI_RATE_WINDOW_SECS", 60)?,
            },
            mail: MailConfig {
                resend_api_key: env_opt("RESEND_API_KEY"),
                from: env_or("RESEND_FROM_EMAIL", "FinanceFlow <notifications@financeflow.app>"),
            },
        })
    }

    /// Configuration for tests and tools: everything optional is switched off.
    pub fn for_database(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            app_url: "http://localhost:3000".into(),
            cron_secret: None,
            github_webhook_secret: None,
            stripe: StripeConfig {
                webhook_secret: None,
                secret_key: None,
                api_base: "https://api.stripe.com/v1".into(),
                price_basic: "price_basic_monthly".into(),
                price_premium: "price_premium_monthly".into(),
                price_enterprise: "price_business_monthly".into(),
            },
            ai: AiConfig {
                api_key: None,
                model: "gemini-1.5-flash".into(),
                base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
                temperature: 0.7,
                max_tokens: 1000,
                rate_limit: 10,
                rate_window_secs: 60,
            },
            mail: MailConfig {
                resend_api_key: None,
                from: "FinanceFlow <notifications@financeflow.app>".into(),
            },
        }
    }
}
