use chrono::NaiveDateTime;
use sqlx::SqliteExecutor;

use crate::database::models::ProjectVersion;

/*==========Project Version Queries=========== */

pub async fn clear_current(ex: impl SqliteExecutor<'_>) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE project_versions SET is_current = 0 WHERE is_current = 1")
        .execute(ex)
        .await?;
    Ok(())
}

pub async fn insert_version(
    ex: impl SqliteExecutor<'_>,
    version: &str,
    changelog: &str,
    deployer: &str,
    environment: &str,
    is_current: bool,
    now: NaiveDateTime,
) -> Result<ProjectVersion, sqlx::Error> {
    sqlx::query_as::<_, ProjectVersion>(
        r#"
        INSERT INTO project_versions (version, changelog, deployer, environment, is_current, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        RETURNING *
        "#,
    )
    .bind(version)
    .bind(changelog)
    .bind(deployer)
    .bind(environment)
    .bind(is_current)
    .bind(now)
    .fetch_one(ex)
    .await
}

pub async fn list_versions(ex: impl SqliteExecutor<'_>, limit: i64) -> Result<Vec<ProjectVersion>, sqlx::Error> {
    sqlx::query_as::<_, ProjectVersion>("SELECT * FROM project_versions ORDER BY created_at DESC, id DESC LIMIT ?")
        .bind(limit)
        .fetch_all(ex)
        .await
}
