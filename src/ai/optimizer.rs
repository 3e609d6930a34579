// src/ai/optimizer.rs
//! Budget optimizer: compares monthly actuals against this month's budgets and
//! asks the model how to reallocate.

use std::collections::HashMap;

use chrono::{Datelike, Months, NaiveDateTime};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};

use super::{generate_object, prompts, ModelFactory};
use crate::database::db::queries::{budgets, transactions, users};
use crate::database::models::{Budget, Transaction, TransactionType};
use crate::error::Result;

pub const DEFAULT_MONTHS: u32 = 3;
pub const MAX_MONTHS: u32 = 6;
pub const BAND_PCT: f64 = 10.0;
pub const MAX_SUGGESTIONS: usize = 5;
pub const FALLBACK_CONFIDENCE: f64 = 0.7;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptimizeQuery {
    pub months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetLine {
    pub category: String,
    pub budget: Decimal,
    pub actual: Decimal,
    pub variance: Decimal,
    pub variance_pct: f64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VarianceAnalysis {
    pub over_budget: Vec<BudgetLine>,
    pub under_budget: Vec<BudgetLine>,
    pub balanced: Vec<BudgetLine>,
}

impl VarianceAnalysis {
    pub fn budget_count(&self) -> usize {
        self.over_budget.len() + self.under_budget.len() + self.balanced.len()
    }

    pub fn all(&self) -> impl Iterator<Item = &BudgetLine> {
        self.over_budget.iter().chain(&self.under_budget).chain(&self.balanced)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionPriority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reallocation {
    pub from_category: String,
    pub to_category: String,
    pub amount: Decimal,
    pub reason: String,
    pub impact: String,
    pub priority: SuggestionPriority,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OptimizationAnswer {
    #[serde(default)]
    pub suggestions: Vec<Reallocation>,
    #[serde(default)]
    pub insights: Vec<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Optimization {
    pub suggestions: Vec<Reallocation>,
    pub total_savings: Decimal,
    pub confidence: f64,
    pub analysis: VarianceAnalysis,
    pub insights: Vec<String>,
    pub fallback: bool,
    pub generated_at: NaiveDateTime,
}

/// Average monthly EXPENSE spend per category over `months`.
pub fn monthly_actuals(txns: &[Transaction], months: u32) -> HashMap<String, Decimal> {
    let mut totals: HashMap<String, Decimal> = HashMap::new();
    for t in txns.iter().filter(|t| t.kind == TransactionType::Expense) {
        *totals.entry(t.category.clone()).or_default() += t.amount;
    }
    let months = Decimal::from(months.max(1));
    totals.into_iter().map(|(c, total)| (c, (total / months).round_dp(2))).collect()
}

/// Bands each budget as over, under or within ±10% of actual spend.
pub fn analyze_variance(budgets: &[Budget], actuals: &HashMap<String, Decimal>) -> VarianceAnalysis {
    let mut analysis = VarianceAnalysis::default();
    for b in budgets {
        let actual = actuals.get(&b.category).copied().unwrap_or_default();
        let variance = actual - b.amount;
        let variance_pct = if b.amount > Decimal::ZERO {
            (variance / b.amount * Decimal::ONE_HUNDRED).to_f64().unwrap_or(0.0)
        } else {
            0.0
        };
        let line = BudgetLine { category: b.category.clone(), budget: b.amount, actual, variance, variance_pct };

        if variance_pct > BAND_PCT {
            analysis.over_budget.push(line);
        } else if variance_pct < -BAND_PCT {
            analysis.under_budget.push(line);
        } else {
            analysis.balanced.push(line);
        }
    }
    analysis.over_budget.sort_by(|a, b| b.variance.cmp(&a.variance));
    analysis.under_budget.sort_by(|a, b| a.variance.cmp(&b.variance));
    analysis
}

fn validate_answer(answer: &OptimizationAnswer) -> std::result::Result<(), String> {
    if !(0.0..=1.0).contains(&answer.confidence) {
        return Err(format!("confidence {} is outside 0..1", answer.confidence));
    }
    if answer.suggestions.iter().any(|s| s.amount <= Decimal::ZERO) {
        return Err("suggestion amounts must be positive".into());
    }
    Ok(())
}

pub fn fallback_answer() -> OptimizationAnswer {
    OptimizationAnswer {
        suggestions: vec![],
        insights: vec![
            "Your budgets are generally well-aligned with actual spending.".into(),
            "Consider reviewing categories with >20% variance.".into(),
        ],
        confidence: FALLBACK_CONFIDENCE,
    }
}

pub async fn optimize(
    pool: &Pool<Sqlite>,
    factory: &dyn ModelFactory,
    user_id: i64,
    query: OptimizeQuery,
    now: NaiveDateTime,
) -> Result<Optimization> {
    let months = query.months.unwrap_or(DEFAULT_MONTHS).clamp(1, MAX_MONTHS);
    let today = now.date();
    let since = today.checked_sub_months(Months::new(months)).unwrap_or(today);

    let budgets = budgets::budgets_for_month(pool, user_id, today.month(), today.year()).await?;
    let txns = transactions::transactions_between(pool, user_id, since, today).await?;
    let analysis = analyze_variance(&budgets, &monthly_actuals(&txns, months));

    let answer = if budgets.is_empty() {
        Err(super::AiError::Schema("no budgets to optimize".into()))
    } else {
        let user_key = users::get_user(pool, user_id).await?.and_then(|u| u.gemini_api_key);
        match factory.model_for(user_key.as_deref()) {
            Ok(model) => {
                let prompt = prompts::optimization(&analysis, months);
                generate_object(model.as_ref(), &prompt, prompts::OPTIMIZATION_SCHEMA, validate_answer).await
            }
            Err(e) => Err(e),
        }
    };

    let (mut answer, fallback) = match answer {
        Ok(a) => (a, false),
        Err(e) => {
            tracing::warn!(error = %e, user_id, "budget optimization fell back to defaults");
            (fallback_answer(), true)
        }
    };
    answer.suggestions.truncate(MAX_SUGGESTIONS);
    let total_savings: Decimal = answer.suggestions.iter().map(|s| s.amount).sum();

    tracing::info!(user_id, suggestions = answer.suggestions.len(), "budget optimization completed");
    Ok(Optimization {
        suggestions: answer.suggestions,
        total_savings,
        confidence: answer.confidence,
        analysis,
        insights: answer.insights,
        fallback,
        generated_at: now,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn budget(category: &str, amount: i64) -> Budget {
        let at = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        Budget {
            id: 1,
            user_id: 1,
            category: category.into(),
            amount: Decimal::from(amount),
            month: 3,
            year: 2025,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn bands_at_ten_percent() {
        let actuals: HashMap<String, Decimal> = [
            ("Dining".to_string(), Decimal::from(150)),
            ("Groceries".to_string(), Decimal::from(405)),
            ("Travel".to_string(), Decimal::from(20)),
        ]
        .into_iter()
        .collect();
        let budgets = vec![budget("Dining", 100), budget("Groceries", 400), budget("Travel", 200), budget("Gifts", 50)];

        let a = analyze_variance(&budgets, &actuals);
        assert_eq!(a.over_budget.iter().map(|l| l.category.as_str()).collect::<Vec<_>>(), ["Dining"]);
        assert_eq!(a.balanced.iter().map(|l| l.category.as_str()).collect::<Vec<_>>(), ["Groceries"]);
        // Travel -180 sorts before Gifts -50
        assert_eq!(a.under_budget.iter().map(|l| l.category.as_str()).collect::<Vec<_>>(), ["Travel", "Gifts"]);
        assert_eq!(a.budget_count(), 4);
    }

    #[test]
    fn suggestions_must_move_money() {
        let mut answer = fallback_answer();
        assert!(validate_answer(&answer).is_ok());
        answer.suggestions.push(Reallocation {
            from_category: "Travel".into(),
            to_category: "Dining".into(),
            amount: Decimal::ZERO,
            reason: "r".into(),
            impact: "i".into(),
            priority: SuggestionPriority::High,
        });
        assert!(validate_answer(&answer).is_err());
    }
}
