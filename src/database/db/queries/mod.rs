/*
SQL for every table, grouped by entity.
Reads always exclude soft-deleted transactions and are scoped to the owning user.
Functions that take `impl SqliteExecutor` can run on the pool or inside a transaction.
 */
pub mod ai;
pub mod budgets;
pub mod goals;
pub mod notifications;
pub mod recurring;
pub mod reports;
pub mod shared_budgets;
pub mod subscriptions;
pub mod transactions;
pub mod users;
pub mod versions;

use rust_decimal::Decimal;

pub(crate) fn money(d: &Decimal) -> String {
    d.normalize().to_string()
}
