// src/ai/prompts.rs
//! Prompt text and the JSON shapes the model is asked to return.

use std::fmt::Write;

use crate::database::models::{Big4Variant, FinancialMetrics, RecurringTransaction, TransactionType};

use super::categorization::{EXPENSE_CATEGORIES, INCOME_CATEGORIES};
use super::forecast::CategoryForecast;
use super::optimizer::VarianceAnalysis;

pub const PROMPT_VERSION: &str = "v1.0";

/*==========Categorization=========== */

pub const CATEGORIZATION_SCHEMA: &str = r#"{
  "category": "string (one of the listed categories)",
  "subcategory": "string (optional)",
  "confidence": "number between 0 and 1",
  "reasoning": "string (one sentence)"
}"#;

pub fn categorization(description: &str, amount: &str, kind: TransactionType, merchant: Option<&str>) -> String {
    let categories = match kind {
        TransactionType::Expense => EXPENSE_CATEGORIES.as_slice(),
        TransactionType::Income => INCOME_CATEGORIES.as_slice(),
    };
    let mut prompt = String::from(
        "You are a financial transaction categorization assistant. \
         Pick the single best category for this transaction.\n\n",
    );
    let _ = writeln!(prompt, "Description: {description}");
    let _ = writeln!(prompt, "Amount: ${amount}");
    let _ = writeln!(prompt, "Type: {}", kind.as_str().to_lowercase());
    if let Some(merchant) = merchant {
        let _ = writeln!(prompt, "Merchant: {merchant}");
    }
    let _ = write!(prompt, "\nAvailable categories: {}", categories.join(", "));
    prompt
}

/*==========Big 4=========== */

pub const BIG4_SCHEMA: &str = r#"{
  "cashflowDiagnosis": { "netCashflowAvg": number, "trend": string, "variability": string, "assessment": string },
  "riskProjection": {
    "thirtyDay": { "level": "Safe" | "Warning" | "Critical", "description": string },
    "sixtyDay": { "level": "Safe" | "Warning" | "Critical", "description": string },
    "ninetyDay": { "level": "Safe" | "Warning" | "Critical", "description": string }
  },
  "strategicWeakPoints": { "structuralIssues": [string], "bufferStatus": string, "rhythmBalance": string },
  "recommendations": [ { "priority": number, "action": string, "impact": string, "metric": string } ]
}"#;

pub fn big4(variant: Big4Variant, m: &FinancialMetrics) -> String {
    match variant {
        Big4Variant::Big4 => big4_executive(m),
        Big4Variant::Baseline => big4_baseline(m),
    }
}

fn big4_executive(m: &FinancialMetrics) -> String {
    let sign = if m.cashflow_trend_pct > 0.0 { "+" } else { "" };
    let mut prompt = format!(
        "Role: You are a strategic CFO and senior financial analyst.\n\n\
         Task: Analyze the provided financial data to generate an \"Executive Decision Snapshot.\"\n\n\
         Constraints:\n\
         - Do NOT provide accounting summaries\n\
         - Focus purely on decision intelligence\n\
         - Output must be concise and structured\n\
         - Be specific with numbers and percentages\n\n\
         ## Context Data\n\
         Period: {start} to {end} (90 days)\n\
         Net Cashflow: ${net:.2}/month ({sign}{trend:.1}% vs previous month)\n\
         Discretionary Spending Variability: {var:.1}% MoM\n\
         Burn Rate: ${burn:.2}/month\n\
         Current Buffer: ${buffer:.2} ({multiple:.1}x monthly average)\n\
         Income: ${income:.2}/month (stability: {stability})\n\n\
         Monthly Breakdown:\n",
        start = m.period_start,
        end = m.period_end,
        net = m.net_cashflow_avg,
        trend = m.cashflow_trend_pct,
        var = m.discretionary_variability_pct,
        burn = m.burn_rate,
        buffer = m.cash_buffer,
        multiple = m.buffer_multiple,
        income = m.monthly_income_avg,
        stability = stability_label(m),
    );
    for month in &m.monthly {
        let _ = writeln!(
            prompt,
            "{}: Income ${:.0}, Expenses ${:.0}, Net ${:.0}",
            month.month, month.income, month.expenses, month.net
        );
    }
    prompt.push_str(
        "\n## Required Output Structure\n\
         1. CASHFLOW DIAGNOSIS\n\
         - Net cash flow average over 90 days with trend analysis\n\
         - Discretionary spending variability analysis\n\
         - Burn rate assessment\n\n\
         2. 30/60/90-DAY RISK PROJECTION\n\
         - Risk Level: Safe, Warning, or Critical\n\
         - Specific risk description\n\n\
         3. STRATEGIC WEAK POINTS\n\
         - Structural issues\n\
         - Cash buffer adequacy\n\
         - Income vs spending rhythm\n\n\
         4. TOP 3 ACTIONABLE RECOMMENDATIONS\n\
         - Priority, Action, Impact, Metric",
    );
    prompt
}

fn big4_baseline(m: &FinancialMetrics) -> String {
    format!(
        "Analyze this financial data and provide financial advice:\n\n\
         Income: ${:.2}/month\n\
         Expenses: ${:.2}/month\n\
         Cash Buffer: ${:.2}\n\
         Net Cashflow: ${:.2}/month\n\n\
         Provide:\n\
         1. Overall financial health assessment\n\
         2. Potential risks\n\
         3. Recommendations for improvement",
        m.monthly_income_avg, m.burn_rate, m.cash_buffer, m.net_cashflow_avg
    )
}

fn stability_label(m: &FinancialMetrics) -> &'static str {
    use crate::database::models::financial_snapshot::IncomeStability::*;
    match m.income_stability {
        Stable => "stable",
        Variable => "variable",
        Volatile => "volatile",
    }
}

/*==========Forecast=========== */

pub const FORECAST_SCHEMA: &str = r#"{
  "categoryExplanations": { "<category name>": "one sentence explanation" },
  "insights": ["actionable insight about spending patterns"],
  "confidence": "number between 0 and 1",
  "methodology": "two sentence summary of the methodology"
}"#;

pub fn forecast(
    transaction_count: usize,
    historical_categories: &[&str],
    months: u32,
    forecasts: &[CategoryForecast],
    recurring: &[RecurringTransaction],
) -> String {
    let mut prompt = format!(
        "You are a financial forecasting assistant. Analyze this spending data and provide insights.\n\n\
         Historical Data (last 6 months):\n\
         - Total transactions: {transaction_count}\n\
         - Categories: {}\n\n\
         Forecast Request:\n\
         - Forecast {months} months ahead\n\
         - Include {} categories\n\n\
         Category Forecasts:\n",
        historical_categories.join(", "),
        forecasts.len(),
    );
    for f in forecasts {
        let _ = writeln!(prompt, "- {}: ${:.2}/month ({})", f.category, f.projected, f.trend.as_str());
    }
    prompt.push_str("\nRecurring Transactions:\n");
    for r in recurring {
        let _ = writeln!(prompt, "- {}: ${} ({:?})", r.description, r.amount, r.frequency);
    }
    prompt.push_str(
        "\nPlease provide:\n\
         1. A brief explanation for each category's forecast (1 sentence each).\n\
         2. 3-5 actionable insights about spending patterns.\n\
         3. Overall forecast confidence (0-1).\n\
         4. Methodology summary (2 sentences).",
    );
    prompt
}

/*==========Budget Optimization=========== */

pub const OPTIMIZATION_SCHEMA: &str = r#"{
  "suggestions": [
    { "fromCategory": string, "toCategory": string, "amount": number, "reason": string, "impact": string, "priority": "high" | "medium" | "low" }
  ],
  "insights": [string],
  "confidence": "number between 0 and 1"
}"#;

pub fn optimization(analysis: &VarianceAnalysis, months: u32) -> String {
    let mut prompt = format!(
        "You are a financial budget optimization expert. Analyze this budget variance data and suggest optimal reallocations.\n\n\
         Current Budgets ({} categories):\n",
        analysis.budget_count()
    );
    for line in analysis.all() {
        let _ = writeln!(prompt, "- {}: ${:.2}/month", line.category, line.budget);
    }
    let _ = write!(prompt, "\nAnalysis Period: {months} months\n\nOver Budget (spending too much):\n");
    section(&mut prompt, &analysis.over_budget, "over");
    prompt.push_str("\nUnder Budget (budget too high):\n");
    section(&mut prompt, &analysis.under_budget, "under");
    prompt.push_str("\nBalanced:\n");
    if analysis.balanced.is_empty() {
        prompt.push_str("None\n");
    }
    for line in &analysis.balanced {
        let _ = writeln!(prompt, "- {}: ${:.2}", line.category, line.budget);
    }
    prompt.push_str(
        "\nPlease provide:\n\
         1. Specific reallocation suggestions (move $X from Category A to Category B)\n\
         2. Reason for each suggestion\n\
         3. Expected impact\n\
         4. Priority (high/medium/low)\n\
         5. 3-5 actionable insights about spending patterns\n\
         6. Overall confidence score (0-1)\n\n\
         Only suggest reallocations if variance is significant (>15%). Limit to 5 suggestions maximum.",
    );
    prompt
}

fn section(prompt: &mut String, lines: &[super::optimizer::BudgetLine], word: &str) {
    if lines.is_empty() {
        prompt.push_str("None\n");
    }
    for line in lines {
        let _ = writeln!(
            prompt,
            "- {}: Budget ${:.2}, Actual ${:.2} ({:.0}% {word})",
            line.category,
            line.budget,
            line.actual,
            line.variance_pct.abs()
        );
    }
}
