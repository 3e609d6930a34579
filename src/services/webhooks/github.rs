//! GitHub push webhook: records a project version for pushes to tracked branches.

use std::sync::OnceLock;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::Deserialize;
use sqlx::{Pool, Sqlite};

use super::{sign_hex, verify_hex};
use crate::database::db::queries::versions;
use crate::database::models::ProjectVersion;
use crate::error::Result;

pub const TRACKED_BRANCHES: [&str; 3] = ["main", "master", "dev"];

/// `header` is the `X-Hub-Signature-256` value, `sha256=<hex>`.
pub fn verify_signature(payload: &[u8], header: &str, secret: &str) -> bool {
    header
        .strip_prefix("sha256=")
        .is_some_and(|sig| verify_hex(secret, &[payload], sig))
}

pub fn signature_header(payload: &[u8], secret: &str) -> String {
    format!("sha256={}", sign_hex(secret, &[payload]))
}

#[derive(Debug, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "ref")]
    pub git_ref: Option<String>,
    #[serde(default)]
    pub commits: Vec<Commit>,
}

#[derive(Debug, Deserialize)]
pub struct Commit {
    #[serde(default)]
    pub message: String,
    pub author: Option<Author>,
}

#[derive(Debug, Deserialize)]
pub struct Author {
    pub name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug)]
pub enum PushOutcome {
    Recorded(ProjectVersion),
    Skipped(String),
}

fn version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"v?(\d+\.\d+\.\d+)").unwrap_or_else(|e| unreachable!("{e}")))
}

/// First semantic version mentioned in a commit message, without the `v`.
pub fn extract_version(message: &str) -> Option<String> {
    version_re().captures(message).map(|c| c[1].to_string())
}

pub async fn handle_push(pool: &Pool<Sqlite>, event: &PushEvent, now: NaiveDateTime) -> Result<PushOutcome> {
    let Some(latest) = event.commits.last() else {
        return Ok(PushOutcome::Skipped("No commits to process".into()));
    };
    let branch = event
        .git_ref
        .as_deref()
        .map(|r| r.strip_prefix("refs/heads/").unwrap_or(r))
        .unwrap_or_default();
    if !TRACKED_BRANCHES.contains(&branch) {
        return Ok(PushOutcome::Skipped(format!("Ignoring branch {branch}")));
    }

    let version = extract_version(&latest.message)
        .unwrap_or_else(|| format!("auto-{}", now.and_utc().timestamp_millis()));
    let deployer = latest
        .author
        .as_ref()
        .and_then(|a| a.name.clone().or_else(|| a.username.clone()))
        .unwrap_or_else(|| "unknown".into());
    let production = branch == "main";
    let environment = if production { "production" } else { "development" };

    let mut tx = pool.begin().await?;
    if production {
        versions::clear_current(&mut *tx).await?;
    }
    let saved = versions::insert_version(
        &mut *tx,
        &version,
        latest.message.trim(),
        &deployer,
        environment,
        production,
        now,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(version = %saved.version, branch, environment, "project version recorded");
    Ok(PushOutcome::Recorded(saved))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_from_commit_messages() {
        assert_eq!(extract_version("Release v1.4.2: budgets").as_deref(), Some("1.4.2"));
        assert_eq!(extract_version("bump to 2.0.10").as_deref(), Some("2.0.10"));
        assert_eq!(extract_version("fix typo in v1.2"), None);
    }

    #[test]
    fn github_signatures() {
        let body = br#"{"ref":"refs/heads/main"}"#;
        let header = signature_header(body, "gh-secret");
        assert!(header.starts_with("sha256="));
        assert!(verify_signature(body, &header, "gh-secret"));
        assert!(!verify_signature(body, &header, "other"));
        assert!(!verify_signature(body, header.trim_start_matches("sha256="), "gh-secret"));
    }
}
