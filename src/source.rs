use crate::cache::Cache;
use crate::cli::CommonArgs;
use crate::cloc::ClocTable;
use crate::git::GitRepo;
use crate::model::{CommitRecord, DateRange, FileCommitEvent};
use crate::util::{files_matching, short_id};
use anyhow::Context;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

/// A repository opened for analysis together with its ordered event stream.
pub struct LoadedRepo {
    pub repo: GitRepo,
    pub events: Vec<FileCommitEvent>,
}

pub fn load_repository(
    common: &CommonArgs,
    repo_path: Option<&Path>,
    repo_index: usize,
    path_prefix: Option<&str>,
    cloc: Option<&ClocTable>,
) -> anyhow::Result<LoadedRepo> {
    let repo = GitRepo::open(repo_path).context("Failed to open git repository")?;

    let range = repo
        .resolve_range(common.since.as_deref(), common.until.as_deref())
        .context("Failed to resolve date range")?;

    let commits = if common.no_cache {
        repo.collect_commits(&range, common.include_merges, common.binary, &HashSet::new())
            .context("Failed to collect commits from repository")?
    } else {
        let mut cache = Cache::new(common.cache.as_deref(), repo.path())
            .context("Failed to initialize cache")?;
        fetch_commits(&repo, &mut cache, &range, common.include_merges, common.binary)?
    };

    let events = file_events(repo_index, &commits, path_prefix, cloc);
    info!(
        repo = repo_index,
        path = %repo.path().display(),
        commits = commits.len(),
        events = events.len(),
        "loaded event stream"
    );

    Ok(LoadedRepo { repo, events })
}

/// Brings the cache up to date with the repository, then reads `range` back from it.
///
/// The cache always holds merges and binary files; both are filtered on the way out.
pub fn fetch_commits(
    repo: &GitRepo,
    cache: &mut Cache,
    range: &DateRange,
    include_merges: bool,
    binary: bool,
) -> anyhow::Result<Vec<CommitRecord>> {
    let key = repo.cache_key();
    let known = cache
        .known_commit_ids(&key)
        .context("Failed to get cached commit ids")?;

    let fresh = repo
        .collect_commits(range, true, true, &known)
        .context("Failed to collect commits from repository")?;

    if !fresh.is_empty() {
        cache
            .store_commits(&key, &fresh)
            .context("Failed to store commits in cache")?;
    }
    debug!(repo = %key, cached = known.len(), fresh = fresh.len(), "cache refreshed");

    let mut commits = cache
        .get_commits(&key, range)
        .context("Failed to get cached commits")?;

    if !include_merges {
        commits.retain(|c| c.info.parent_ids.len() <= 1);
    }
    if !binary {
        for c in &mut commits {
            c.files.retain(|f| !f.is_binary);
        }
    }

    Ok(commits)
}

/// Flattens commits into per-file events ordered by (timestamp, commit id).
///
/// Without a cloc table, a file's cloc is its line count in the latest commit touching it.
pub fn file_events(
    repo_index: usize,
    commits: &[CommitRecord],
    path_prefix: Option<&str>,
    cloc: Option<&ClocTable>,
) -> Vec<FileCommitEvent> {
    let mut ordered: Vec<&CommitRecord> = commits.iter().collect();
    ordered.sort_by(|a, b| {
        a.info
            .timestamp
            .cmp(&b.info.timestamp)
            .then_with(|| a.info.id.cmp(&b.info.id))
    });

    let mut latest_lines: HashMap<&str, u64> = HashMap::new();
    for commit in &ordered {
        for f in files_matching(&commit.files, path_prefix) {
            latest_lines.insert(f.path.as_str(), u64::from(f.lines));
        }
    }
    let latest_lines = &latest_lines;

    ordered
        .iter()
        .flat_map(|commit| {
            let commit_id = short_id(&commit.info.id);
            files_matching(&commit.files, path_prefix).map(move |f| FileCommitEvent {
                repo_index,
                path: f.path.clone(),
                lines_added: u64::from(f.added_lines),
                lines_deleted: u64::from(f.deleted_lines),
                cloc: match cloc {
                    Some(table) => table.get(&f.path).unwrap_or(0),
                    None => latest_lines.get(f.path.as_str()).copied().unwrap_or(0),
                },
                commit_id: commit_id.clone(),
                author: commit.info.author_name.clone(),
                timestamp: commit.info.timestamp,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommitInfo, FileStats};
    use chrono::{TimeZone, Utc};

    fn commit(id: &str, secs: i64, files: &[(&str, u32)]) -> CommitRecord {
        CommitRecord {
            info: CommitInfo {
                id: id.to_string(),
                author_name: "Grace".to_string(),
                author_email: "grace@example.com".to_string(),
                message: String::new(),
                timestamp: Utc.timestamp_opt(secs, 0).single().unwrap(),
                parent_ids: Vec::new(),
            },
            files: files
                .iter()
                .map(|(path, lines)| FileStats {
                    path: path.to_string(),
                    added_lines: 1,
                    deleted_lines: 0,
                    lines: *lines,
                    is_binary: false,
                })
                .collect(),
        }
    }

    #[test]
    fn events_are_chronological_and_carry_latest_line_count() {
        let commits = vec![
            commit("bbbbbbbbbb", 200, &[("src/a.rs", 20)]),
            commit("aaaaaaaaaa", 100, &[("src/a.rs", 10), ("docs/x.md", 3)]),
        ];
        let events = file_events(2, &commits, Some("src/"), None);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].commit_id, "aaaaaaa");
        assert_eq!(events[1].commit_id, "bbbbbbb");
        assert!(events.iter().all(|e| e.cloc == 20 && e.repo_index == 2));
    }

    #[test]
    fn cloc_table_overrides_line_counts() {
        let table = ClocTable::from_reader("language,filename,blank,comment,code\nRust,./a.rs,0,0,7\n".as_bytes())
            .unwrap();
        let commits = vec![commit("c1", 100, &[("a.rs", 50), ("b.rs", 9)])];
        let events = file_events(0, &commits, None, Some(&table));
        assert_eq!(events[0].cloc, 7);
        assert_eq!(events[1].cloc, 0);
    }
}
