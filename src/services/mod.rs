//! Business rules. Handlers stay thin: they authenticate, parse, and call in here.
//! Every function takes the current time explicitly so rules are testable.

pub mod auth;
pub mod budgets;
pub mod cron;
pub mod dashboard;
pub mod export;
pub mod goals;
pub mod mailer;
pub mod notifications;
pub mod period;
pub mod recurring;
pub mod reports;
pub mod shared_budgets;
pub mod subscriptions;
pub mod transactions;
pub mod webhooks;
