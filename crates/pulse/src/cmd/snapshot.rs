//! Snapshot command - print a day's aggregates from a running server
//!
//! # Usage
//!
//! ```bash
//! # Today (UTC)
//! pulse snapshot
//!
//! # A given day, as raw JSON
//! pulse snapshot --date 2024-03-01 --json
//! ```

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use clap::Args;
use pulse_pipeline::Snapshot;

/// Snapshot command arguments
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    /// UTC day (YYYY-MM-DD); defaults to today
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Server base URL
    #[arg(short, long, default_value = "http://127.0.0.1:3001")]
    pub server: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn run(args: SnapshotArgs) -> Result<()> {
    let date = args.date.unwrap_or_else(|| Utc::now().date_naive());
    let url = format!(
        "{}/v1/aggregates/{}",
        args.server.trim_end_matches('/'),
        date.format("%Y-%m-%d")
    );

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .context("failed to build HTTP client")?;

    let response = client
        .get(&url)
        .send()
        .await
        .with_context(|| format!("failed to connect to {}", args.server))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        anyhow::bail!("server returned {status}: {body}");
    }

    let snapshot: Snapshot = response
        .json()
        .await
        .context("failed to parse snapshot")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render(&snapshot));
    }

    Ok(())
}

fn render(snapshot: &Snapshot) -> String {
    let avg = |value: Option<f64>| value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));

    let mut out = format!("Aggregates for {}\n\n", snapshot.date);
    out.push_str("Performance\n");
    out.push_str(&format!("  requests:      {}\n", snapshot.performance.total_requests));
    out.push_str(&format!("  avg cpu:       {}\n", avg(snapshot.performance.avg_cpu)));
    out.push_str(&format!("  avg memory:    {}\n", avg(snapshot.performance.avg_memory)));
    out.push_str("Behavior\n");
    out.push_str(&format!("  sessions:      {}\n", snapshot.behavior.total_sessions));
    out.push_str(&format!("  interactions:  {}\n", snapshot.behavior.total_interactions));
    out.push_str(&format!(
        "  per session:   {}\n",
        avg(snapshot.behavior.avg_interactions_per_session)
    ));
    out.push_str("Errors\n");
    out.push_str(&format!("  total:         {}\n", snapshot.errors.total));
    for (error_type, count) in &snapshot.errors.by_type {
        out.push_str(&format!("  {error_type}: {count}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_day() {
        let snapshot: Snapshot = serde_json::from_value(serde_json::json!({
            "date": "2024-03-01",
            "performance": {"total_requests": 0, "avg_cpu": null, "avg_memory": null},
            "behavior": {"total_sessions": 0, "total_interactions": 0, "avg_interactions_per_session": null},
            "errors": {"total": 2, "by_type": {"TypeError": 2}},
        }))
        .unwrap();

        let text = render(&snapshot);
        assert!(text.starts_with("Aggregates for 2024-03-01"));
        assert!(text.contains("avg cpu:       -"));
        assert!(text.contains("TypeError: 2"));
    }
}
