use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

pub const SCHEMA_VERSION: u32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub id: String,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub parent_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStats {
    pub path: String,
    pub added_lines: u32,
    pub deleted_lines: u32,
    /// Line count of the file after the commit, 0 when it was deleted.
    pub lines: u32,
    pub is_binary: bool,
}

impl FileStats {
    /// Folds another change to the same path in the same commit into this one.
    pub fn absorb(&mut self, other: &FileStats) {
        self.added_lines += other.added_lines;
        self.deleted_lines += other.deleted_lines;
        self.lines = self.lines.max(other.lines);
        self.is_binary |= other.is_binary;
    }
}

/// Collapses repeated paths of one commit (a type change shows up as a deletion
/// plus an addition) into a single entry, keeping first-seen order.
pub fn merge_by_path(files: Vec<FileStats>) -> Vec<FileStats> {
    let mut merged: Vec<FileStats> = Vec::with_capacity(files.len());
    let mut index: HashMap<String, usize> = HashMap::new();
    for file in files {
        match index.get(&file.path) {
            Some(&at) => merged[at].absorb(&file),
            None => {
                index.insert(file.path.clone(), merged.len());
                merged.push(file);
            }
        }
    }
    merged
}

/// One commit together with the files it touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub info: CommitInfo,
    pub files: Vec<FileStats>,
}

/// A single file touched by a single commit, as consumed by the coupling engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileCommitEvent {
    pub repo_index: usize,
    pub path: String,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub cloc: u64,
    pub commit_id: String,
    pub author: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnEntry {
    pub key: String,
    pub added_lines: u64,
    pub deleted_lines: u64,
    pub total_lines: u64,
    pub commit_count: u32,
    pub authors: HashSet<String>,
    #[serde(skip)]
    commits: HashSet<String>,
}

impl ChurnEntry {
    pub fn new(key: String) -> Self {
        Self {
            key,
            added_lines: 0,
            deleted_lines: 0,
            total_lines: 0,
            commit_count: 0,
            authors: HashSet::new(),
            commits: HashSet::new(),
        }
    }

    pub fn add_event(&mut self, event: &FileCommitEvent) {
        self.added_lines += event.lines_added;
        self.deleted_lines += event.lines_deleted;
        self.total_lines += event.lines_added + event.lines_deleted;
        if self.commits.insert(event.commit_id.clone()) {
            self.commit_count += 1;
        }
        if self.authors.len() < 100 {
            self.authors.insert(event.author.clone());
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChurnOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub since: Option<String>,
    pub until: Option<String>,
    pub group_by: String,
    pub depth: Option<u32>,
    pub entries: Vec<ChurnEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repository_path: String,
    pub since: Option<String>,
    pub until: Option<String>,
    pub events: Vec<FileCommitEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupleFileOutput {
    pub repo_index: usize,
    pub path: String,
    pub occurrences_in_time_windows: usize,
    pub ratio: f64,
    pub total_commits: usize,
    pub windows_with_commits: usize,
    pub cloc: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub commits: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TupleOutput {
    pub paths: Vec<String>,
    pub occurrences: usize,
    pub files: Vec<TupleFileOutput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CouplingOutput {
    pub version: u32,
    pub generated_at: DateTime<Utc>,
    pub repositories: Vec<String>,
    pub since: Option<String>,
    pub until: Option<String>,
    pub window_days: u32,
    pub windows_per_repo: Vec<usize>,
    pub shared_windows: usize,
    pub tuples: Vec<TupleOutput>,
}

#[derive(Debug, Clone)]
pub struct DateRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new() -> Self {
        Self { since: None, until: None }
    }

    pub fn with_since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }

    pub fn with_until(mut self, until: DateTime<Utc>) -> Self {
        self.until = Some(until);
        self
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if timestamp < &since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if timestamp > &until {
                return false;
            }
        }
        true
    }
}

impl Default for DateRange {
    fn default() -> Self {
        Self::new()
    }
}
