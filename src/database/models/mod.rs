pub mod ai_suggestion;
pub mod big4_analysis;
pub mod budget;
pub mod financial_snapshot;
pub mod goal;
pub mod notification;
pub mod project_version;
pub mod recurring_transaction;
pub mod report;
pub mod shared_budget;
pub mod subscription;
pub mod transaction;
pub mod user;

pub use ai_suggestion::AiSuggestion;
pub use big4_analysis::{Big4Analysis, Big4Report, Big4Variant};
pub use budget::{Budget, BudgetProgress};
pub use financial_snapshot::{FinancialMetrics, FinancialSnapshot};
pub use goal::{Goal, GoalContribution, GoalMilestone, GoalStatus};
pub use notification::{NewNotification, Notification, NotificationStatus, NotificationType};
pub use project_version::ProjectVersion;
pub use recurring_transaction::{Frequency, RecurringTransaction};
pub use report::{Report, ReportFormat, ReportType};
pub use shared_budget::{BudgetMember, BudgetRole, SharedBudget};
pub use subscription::{FeatureLimits, Subscription, SubscriptionStatus, Tier};
pub use transaction::{Transaction, TransactionDraft, TransactionType};
pub use user::User;

use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use std::str::FromStr;

// Money is stored as TEXT; parse it back exactly.
pub(crate) fn decimal_column(row: &SqliteRow, column: &str) -> Result<Decimal, sqlx::Error> {
    let text: String = row.try_get(column)?;
    Decimal::from_str(&text)
        .map_err(|e| sqlx::Error::Decode(format!("Invalid Decimal format for {}: {}", column, e).into()))
}
