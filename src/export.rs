use crate::cli::CommonArgs;
use crate::model::{ExportOutput, FileCommitEvent, SCHEMA_VERSION};
use crate::source::load_repository;
use anyhow::Context;
use chrono::Utc;
use console::style;
use std::collections::HashSet;
use std::path::PathBuf;

pub fn exec(common: CommonArgs, repo: Option<PathBuf>, json: bool, ndjson: bool) -> anyhow::Result<()> {
    let loaded = load_repository(&common, repo.as_deref(), 0, None, None)
        .context("Failed to load repository events")?;

    if json {
        let output = ExportOutput {
            version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            repository_path: loaded.repo.path().to_string_lossy().to_string(),
            since: common.since.clone(),
            until: common.until.clone(),
            events: loaded.events,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if ndjson {
        for event in &loaded.events {
            println!("{}", serde_json::to_string(event)?);
        }
    } else {
        output_summary(&loaded.events);
    }

    Ok(())
}

fn output_summary(events: &[FileCommitEvent]) {
    println!("{}", style("Export Summary").bold());
    println!("{}", "─".repeat(50));

    let commits: HashSet<&str> = events.iter().map(|e| e.commit_id.as_str()).collect();
    let files: HashSet<&str> = events.iter().map(|e| e.path.as_str()).collect();
    let authors: HashSet<&str> = events.iter().map(|e| e.author.as_str()).collect();
    let total_added: u64 = events.iter().map(|e| e.lines_added).sum();
    let total_deleted: u64 = events.iter().map(|e| e.lines_deleted).sum();

    println!("Total commits: {}", style(commits.len()).cyan());
    println!("Total files changed: {}", style(files.len()).cyan());
    println!("Total lines added: {}", style(total_added).green());
    println!("Total lines deleted: {}", style(total_deleted).red());
    println!("Unique authors: {}", style(authors.len()).yellow());

    if let (Some(first), Some(last)) = (events.first(), events.last()) {
        println!(
            "Date range: {} to {}",
            style(first.timestamp.format("%Y-%m-%d")).dim(),
            style(last.timestamp.format("%Y-%m-%d")).dim()
        );
    }

    println!("\nUse --json or --ndjson flags to export the raw events.");
}
