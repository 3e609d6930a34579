// src/main.rs
use std::env;

use dotenvy::dotenv;
use finance_flow::services::{cron, mailer};
use finance_flow::{backend, cli, database, telemetry, AppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let args: Vec<String> = env::args().collect();
    let mode = args.get(1).map(String::as_str);

    // the dashboard owns the terminal, so it only logs when asked to
    match mode {
        Some("server") | Some("cron") => telemetry::init_tracing(),
        _ => telemetry::init_quiet(),
    }

    let config = AppConfig::from_env()?;
    let pool = database::db::connection::get_db_pool(&config.database_url).await?;
    database::db::migrate::run_migrations(&pool).await?;

    match mode {
        Some("server") => {
            tracing::info!("starting backend server");
            backend::run_server(pool, config).await?;
        }
        Some("cron") => {
            let job: cron::Job = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("usage: finance-flow cron <daily-checks|weekly-summary|recurring>"))?
                .parse()?;
            let mailer = mailer::from_config(&config.mail);
            let stats = cron::run(&pool, mailer.as_ref(), job, chrono::Utc::now().naive_utc()).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        _ => cli::run(pool).await?,
    }
    Ok(())
}
