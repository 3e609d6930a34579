// src/ai/categorization.rs
//! Transaction categorization: model first, keyword rules when the model fails.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use super::{generate_object, prompts, ModelFactory};
use crate::database::db::queries::ai::{self as q, SuggestionFields};
use crate::database::db::queries::users;
use crate::database::models::{AiSuggestion, TransactionType};
use crate::error::{Error, Result, Validator};
use crate::services::subscriptions::{ensure_within_limit, Feature};

pub const EXPENSE_CATEGORIES: [&str; 12] = [
    "Food & Dining",
    "Transportation",
    "Shopping",
    "Entertainment",
    "Bills & Utilities",
    "Healthcare",
    "Education",
    "Travel",
    "Personal Care",
    "Housing",
    "Insurance",
    "Other",
];

pub const INCOME_CATEGORIES: [&str; 7] = ["Salary", "Freelance", "Investment", "Gift", "Refund", "Business", "Other"];

pub const RULE_CONFIDENCE: f64 = 0.6;
pub const UNMATCHED_CONFIDENCE: f64 = 0.3;

struct Rule {
    keywords: &'static [&'static str],
    category: &'static str,
    subcategory: &'static str,
}

const RULES: &[Rule] = &[
    Rule { keywords: &["grocery", "supermarket", "walmart", "target"], category: "Food & Dining", subcategory: "Groceries" },
    Rule { keywords: &["starbucks", "coffee", "cafe"], category: "Food & Dining", subcategory: "Coffee & Cafes" },
    Rule { keywords: &["restaurant", "pizza", "burger", "food"], category: "Food & Dining", subcategory: "Restaurants" },
    Rule { keywords: &["gas", "fuel", "shell", "chevron"], category: "Transportation", subcategory: "Gas" },
    Rule { keywords: &["uber", "lyft", "taxi"], category: "Transportation", subcategory: "Ride Share" },
    Rule { keywords: &["amazon", "ebay", "shopping"], category: "Shopping", subcategory: "Online Shopping" },
    Rule { keywords: &["netflix", "spotify", "hulu"], category: "Bills & Utilities", subcategory: "Streaming Services" },
    Rule { keywords: &["electric", "power", "utility"], category: "Bills & Utilities", subcategory: "Electric" },
    Rule { keywords: &["gym", "fitness"], category: "Personal Care", subcategory: "Gym" },
];

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeRequest {
    pub description: String,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub merchant: Option<String>,
    pub transaction_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Categorization {
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    pub confidence: f64,
    pub reasoning: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeResponse {
    #[serde(flatten)]
    pub result: Categorization,
    /// Set when the model answered and the suggestion was stored.
    pub suggestion_id: Option<i64>,
    pub fallback: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionFeedback {
    pub suggestion_id: i64,
    pub accepted: bool,
    pub actual_category: Option<String>,
}

/// Keyword rules over description and merchant.
pub fn fallback(description: &str, merchant: Option<&str>) -> Categorization {
    let description = description.to_lowercase();
    let merchant = merchant.unwrap_or_default().to_lowercase();

    RULES
        .iter()
        .find(|rule| rule.keywords.iter().any(|k| description.contains(k) || merchant.contains(k)))
        .map(|rule| Categorization {
            category: rule.category.to_string(),
            subcategory: Some(rule.subcategory.to_string()),
            confidence: RULE_CONFIDENCE,
            reasoning: "Fallback rule-based categorization".into(),
        })
        .unwrap_or_else(|| Categorization {
            category: "Other".into(),
            subcategory: None,
            confidence: UNMATCHED_CONFIDENCE,
            reasoning: "No matching pattern found".into(),
        })
}

fn validate_answer(answer: &Categorization) -> std::result::Result<(), String> {
    if answer.category.trim().is_empty() {
        return Err("category is empty".into());
    }
    if !(0.0..=1.0).contains(&answer.confidence) {
        return Err(format!("confidence {} is outside 0..1", answer.confidence));
    }
    Ok(())
}

pub async fn categorize(
    pool: &Pool<Sqlite>,
    factory: &dyn ModelFactory,
    user_id: i64,
    input: CategorizeRequest,
    now: NaiveDateTime,
) -> Result<CategorizeResponse> {
    Validator::new()
        .check(!input.description.trim().is_empty(), "description", "Description is required")
        .check(input.amount > Decimal::ZERO, "amount", "Amount must be positive")
        .finish()?;
    ensure_within_limit(pool, user_id, Feature::AiRequests, now).await?;

    let user_key = users::get_user(pool, user_id).await?.and_then(|u| u.gemini_api_key);
    let prompt = prompts::categorization(
        &input.description,
        &input.amount.to_string(),
        input.kind,
        input.merchant.as_deref(),
    );

    let answer = match factory.model_for(user_key.as_deref()) {
        Ok(model) => generate_object(model.as_ref(), &prompt, prompts::CATEGORIZATION_SCHEMA, validate_answer).await,
        Err(e) => Err(e),
    };

    match answer {
        Ok(result) => {
            let saved = q::insert_suggestion(
                pool,
                user_id,
                &SuggestionFields {
                    transaction_id: input.transaction_id,
                    description: &input.description,
                    suggested: &result.category,
                    subcategory: result.subcategory.as_deref(),
                    confidence: result.confidence,
                    reasoning: &result.reasoning,
                },
                now,
            )
            .await?;
            Ok(CategorizeResponse { result, suggestion_id: Some(saved.id), fallback: false })
        }
        Err(e) => {
            tracing::warn!(error = %e, user_id, "categorization fell back to keyword rules");
            Ok(CategorizeResponse {
                result: fallback(&input.description, input.merchant.as_deref()),
                suggestion_id: None,
                fallback: true,
            })
        }
    }
}

pub async fn record_feedback(pool: &Pool<Sqlite>, user_id: i64, input: SuggestionFeedback) -> Result<AiSuggestion> {
    q::record_feedback(pool, user_id, input.suggestion_id, input.accepted, input.actual_category.as_deref())
        .await?
        .ok_or(Error::NotFound("Suggestion"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_rules() {
        let c = fallback("STARBUCKS #1234", None);
        assert_eq!(c.category, "Food & Dining");
        assert_eq!(c.subcategory.as_deref(), Some("Coffee & Cafes"));
        assert_eq!(c.confidence, RULE_CONFIDENCE);

        let c = fallback("card payment", Some("Uber Trip"));
        assert_eq!(c.category, "Transportation");

        let c = fallback("mystery charge", None);
        assert_eq!(c.category, "Other");
        assert_eq!(c.subcategory, None);
        assert_eq!(c.confidence, UNMATCHED_CONFIDENCE);
    }

    #[test]
    fn first_matching_rule_wins() {
        // "grocery" rule precedes the "food" rule
        assert_eq!(fallback("grocery food run", None).subcategory.as_deref(), Some("Groceries"));
    }

    #[test]
    fn answer_validation() {
        let mut answer = fallback("gym", None);
        assert!(validate_answer(&answer).is_ok());
        answer.confidence = 1.5;
        assert!(validate_answer(&answer).is_err());
    }
}
