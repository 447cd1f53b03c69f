use super::{analyze, write_csv, CouplingReport, WindowLength};
use crate::cli::CommonArgs;
use crate::cloc::ClocTable;
use crate::model::{CouplingOutput, SCHEMA_VERSION};
use crate::source::load_repository;
use anyhow::{bail, Context};
use chrono::Utc;
use console::style;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct CouplingArgs {
    pub repos: Vec<PathBuf>,
    pub window_days: i64,
    pub path: Option<String>,
    pub cloc: Vec<PathBuf>,
    pub csv: Option<PathBuf>,
    pub json: bool,
    pub top: usize,
}

pub fn exec(common: CommonArgs, args: CouplingArgs) -> anyhow::Result<()> {
    let window = WindowLength::days(args.window_days)?;
    let csv_to_stdout = args.csv.as_deref() == Some(Path::new("-"));

    if csv_to_stdout && args.json {
        bail!("--json and --csv - both write to stdout; pick one");
    }
    if !args.cloc.is_empty() && args.cloc.len() != args.repos.len() {
        bail!(
            "got {} --cloc files for {} repositories; pass one per repository or none",
            args.cloc.len(),
            args.repos.len()
        );
    }

    let cloc_tables = args
        .cloc
        .iter()
        .map(|p| {
            ClocTable::from_path(p).with_context(|| format!("Failed to read cloc file {}", p.display()))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let mut streams = Vec::with_capacity(args.repos.len());
    let mut repositories = Vec::with_capacity(args.repos.len());
    for (repo_index, repo_path) in args.repos.iter().enumerate() {
        let loaded = load_repository(
            &common,
            Some(repo_path.as_path()),
            repo_index,
            args.path.as_deref(),
            cloc_tables.get(repo_index),
        )
        .with_context(|| format!("Failed to load {}", repo_path.display()))?;
        repositories.push(loaded.repo.path().to_string_lossy().to_string());
        streams.push(loaded.events);
    }

    let report = analyze(streams, window).context("Failed to compute coupling")?;

    if let Some(csv_path) = &args.csv {
        let rows = if csv_to_stdout {
            write_csv(&report, io::stdout().lock())?
        } else {
            let file = File::create(csv_path)
                .with_context(|| format!("Failed to create {}", csv_path.display()))?;
            write_csv(&report, BufWriter::new(file))?
        };
        info!(rows, path = %csv_path.display(), "wrote coupling csv");
    }

    if args.json {
        output_json(&report, repositories, &common)?;
    } else if !csv_to_stdout {
        output_table(&report, &repositories, args.top);
    }

    Ok(())
}

fn output_json(report: &CouplingReport, repositories: Vec<String>, common: &CommonArgs) -> anyhow::Result<()> {
    let output = CouplingOutput {
        version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        repositories,
        since: common.since.clone(),
        until: common.until.clone(),
        window_days: report.window_length.as_days(),
        windows_per_repo: report.windows_per_repo.clone(),
        shared_windows: report.shared_windows,
        tuples: report.to_output(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn output_table(report: &CouplingReport, repositories: &[String], top: usize) {
    println!("{}", style("File Coupling").bold());
    println!("{}", "─".repeat(98));
    for (i, (repo, windows)) in repositories.iter().zip(&report.windows_per_repo).enumerate() {
        println!("  [{i}] {repo}  ({} windows with commits)", style(windows).cyan());
    }
    println!(
        "  window: {} day(s), shared windows: {}, distinct tuples: {}",
        style(report.window_length.as_days()).cyan(),
        style(report.shared_windows).yellow(),
        style(report.tuple_count()).yellow()
    );

    if report.tuples.is_empty() {
        println!("\nNo windows with activity in every repository");
        return;
    }

    println!();
    println!("{:>6}  {:<70} {:>16}", style("Times").bold(), style("Tuple").bold(), style("Ratios").bold());
    println!("{}", "─".repeat(98));
    let ranked = report.ranked();
    for (key, tuple) in ranked.iter().take(top) {
        let ratios = tuple
            .files
            .values()
            .map(|f| format!("{:.2}", f.ratio))
            .collect::<Vec<_>>()
            .join("/");
        println!("{:>6}  {:<70} {:>16}", tuple.occurrences, key.paths().join(" <-> "), ratios);
    }
    if ranked.len() > top {
        println!("\n... and {} more tuples", ranked.len() - top);
    }
}
