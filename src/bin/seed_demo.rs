//! Seeds a demo account with three months of activity.
//!
//! cargo run --bin seed_demo

use chrono::{Datelike, Duration, Months, NaiveDate};
use dotenvy::dotenv;
use rust_decimal::Decimal;

use finance_flow::database::db::connection::get_db_pool;
use finance_flow::database::db::migrate::run_migrations;
use finance_flow::database::db::queries::subscriptions::{self, CheckoutFields};
use finance_flow::database::db::queries::users;
use finance_flow::database::models::{Frequency, SubscriptionStatus, Tier, TransactionType};
use finance_flow::services::auth::{self, RegisterRequest};
use finance_flow::services::budgets::{self, CreateBudget};
use finance_flow::services::goals::{self, Contribute, CreateGoal};
use finance_flow::services::recurring::{self, CreateRecurring};
use finance_flow::services::transactions::{self, CreateTransaction};
use finance_flow::{telemetry, AppConfig};

const DEMO_EMAIL: &str = "demo@financeflow.local";

/* (day of month, type, category, description, amount in cents) */
const MONTHLY_ACTIVITY: [(u32, TransactionType, &str, &str, i64); 10] = [
    (1, TransactionType::Income, "Salary", "Monthly salary", 520_000),
    (2, TransactionType::Expense, "Bills & Utilities", "Rent", 180_000),
    (4, TransactionType::Expense, "Food & Dining", "Grocery run", 12_450),
    (7, TransactionType::Expense, "Transportation", "Transit pass", 9_800),
    (10, TransactionType::Expense, "Entertainment", "Streaming subscriptions", 3_297),
    (12, TransactionType::Expense, "Food & Dining", "Dinner out", 6_820),
    (15, TransactionType::Income, "Freelance", "Design contract", 85_000),
    (18, TransactionType::Expense, "Shopping", "Running shoes", 14_999),
    (21, TransactionType::Expense, "Healthcare", "Pharmacy", 2_315),
    (25, TransactionType::Expense, "Food & Dining", "Grocery run", 11_020),
];

fn cents(c: i64) -> Decimal {
    Decimal::new(c, 2)
}

fn day_in_month(first: NaiveDate, day: u32) -> Option<NaiveDate> {
    first.with_day(day)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    telemetry::init_tracing();

    let config = AppConfig::from_env()?;
    let pool = get_db_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let now = chrono::Utc::now().naive_utc();
    let today = now.date();

    if let Some(user) = users::find_by_email(&pool, DEMO_EMAIL).await? {
        let token = auth::rotate_token(&pool, user.id).await?;
        println!("Demo user already exists (id {}). New API token:\n{}", user.id, token);
        return Ok(());
    }

    let (user, token) = auth::register(
        &pool,
        &RegisterRequest { email: DEMO_EMAIL.into(), name: "Demo User".into() },
        now,
    )
    .await?;

    subscriptions::upsert_checkout(
        &pool,
        user.id,
        &CheckoutFields {
            tier: Some(Tier::Premium),
            status: SubscriptionStatus::Active,
            customer_id: None,
            subscription_id: None,
            price_id: None,
            period_start: None,
            period_end: None,
        },
        now,
    )
    .await?;

    let this_month = today.with_day(1).unwrap_or(today);
    let mut created = 0;
    for back in (0..3).rev() {
        let Some(first) = this_month.checked_sub_months(Months::new(back)) else { continue };
        for (day, kind, category, description, amount) in MONTHLY_ACTIVITY {
            let Some(date) = day_in_month(first, day).filter(|d| *d <= today) else { continue };
            transactions::create(
                &pool,
                user.id,
                CreateTransaction {
                    amount: cents(amount),
                    kind,
                    category: category.into(),
                    description: description.into(),
                    notes: None,
                    date,
                },
                now,
            )
            .await?;
            created += 1;
        }
    }

    for (category, amount) in [
        ("Food & Dining", 40_000),
        ("Transportation", 12_000),
        ("Entertainment", 3_000),
        ("Shopping", 20_000),
    ] {
        budgets::create(
            &pool,
            user.id,
            CreateBudget {
                category: category.into(),
                amount: cents(amount),
                month: today.month(),
                year: today.year(),
            },
            now,
        )
        .await?;
    }

    let emergency = goals::create(
        &pool,
        user.id,
        CreateGoal {
            name: "Emergency fund".into(),
            description: Some("Three months of expenses".into()),
            target_amount: cents(900_000),
            target_date: today + Duration::days(365),
            category: Some("Savings".into()),
            priority: Some(2),
        },
        now,
    )
    .await?;
    goals::contribute(
        &pool,
        user.id,
        emergency.goal.id,
        Contribute { amount: cents(250_000), note: Some("Opening deposit".into()) },
        now,
    )
    .await?;

    recurring::create(
        &pool,
        user.id,
        CreateRecurring {
            amount: cents(1_599),
            kind: TransactionType::Expense,
            category: "Entertainment".into(),
            description: "Music streaming".into(),
            notes: None,
            frequency: Frequency::Monthly,
            start_date: today + Duration::days(2),
            end_date: None,
        },
        now,
    )
    .await?;

    tracing::info!(user_id = user.id, transactions = created, "demo data seeded");
    println!("Seeded {} ({} transactions). API token:\n{}", DEMO_EMAIL, created, token);
    Ok(())
}
