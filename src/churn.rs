use crate::cli::{ChurnBy, CommonArgs};
use crate::model::{ChurnEntry, ChurnOutput, FileCommitEvent, SCHEMA_VERSION};
use crate::source::load_repository;
use crate::util::module_key;
use anyhow::Context;
use chrono::Utc;
use console::style;
use std::collections::HashMap;
use std::path::PathBuf;

pub fn exec(
    common: CommonArgs,
    repo: Option<PathBuf>,
    by: ChurnBy,
    depth: Option<u32>,
    json: bool,
    ndjson: bool,
    path: Option<String>,
) -> anyhow::Result<()> {
    let loaded = load_repository(&common, repo.as_deref(), 0, path.as_deref(), None)
        .context("Failed to load repository events")?;

    let churn = compute_churn(&loaded.events, by, depth);

    if json {
        let output = ChurnOutput {
            version: SCHEMA_VERSION,
            generated_at: Utc::now(),
            repository_path: loaded.repo.path().to_string_lossy().to_string(),
            since: common.since.clone(),
            until: common.until.clone(),
            group_by: format!("{by:?}").to_lowercase(),
            depth,
            entries: churn,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else if ndjson {
        for e in &churn {
            println!("{}", serde_json::to_string(e)?);
        }
    } else {
        output_table(&churn, by);
    }

    Ok(())
}

pub fn compute_churn(events: &[FileCommitEvent], by: ChurnBy, depth: Option<u32>) -> Vec<ChurnEntry> {
    let mut map: HashMap<String, ChurnEntry> = HashMap::new();
    for event in events {
        let key = match by {
            ChurnBy::File => event.path.clone(),
            ChurnBy::Module => module_key(&event.path, depth.unwrap_or(1)),
            ChurnBy::Author => event.author.clone(),
        };
        map.entry(key.clone())
            .or_insert_with(|| ChurnEntry::new(key))
            .add_event(event);
    }
    let mut entries: Vec<_> = map.into_values().collect();
    entries.sort_by(|a, b| b.total_lines.cmp(&a.total_lines).then_with(|| a.key.cmp(&b.key)));
    entries
}

fn output_table(churn_data: &[ChurnEntry], by: ChurnBy) {
    let heading = match by {
        ChurnBy::File => "Path",
        ChurnBy::Module => "Module",
        ChurnBy::Author => "Author",
    };
    println!(
        "{:<50} {:>8} {:>8} {:>8} {:>6} {:>8}",
        style(heading).bold(),
        style("Added").bold(),
        style("Deleted").bold(),
        style("Total").bold(),
        style("Commits").bold(),
        style("Authors").bold()
    );
    println!("{}", "─".repeat(98));
    for e in churn_data.iter().take(50) {
        println!(
            "{:<50} {:>8} {:>8} {:>8} {:>6} {:>8}",
            e.key,
            e.added_lines,
            e.deleted_lines,
            e.total_lines,
            e.commit_count,
            e.authors.len()
        );
    }
    if churn_data.len() > 50 {
        println!("\n... and {} more entries", churn_data.len() - 50);
    }
}
