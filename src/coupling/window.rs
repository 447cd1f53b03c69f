use crate::error::{CoupleError, Result};
use crate::model::FileCommitEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

const SECONDS_PER_DAY: i64 = 86_400;

/// Width of a time window, in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowLength {
    days: u32,
}

impl WindowLength {
    pub fn days(days: i64) -> Result<Self> {
        if days <= 0 || days > i64::from(u32::MAX) {
            return Err(CoupleError::InvalidWindowLength(days));
        }
        Ok(Self { days: days as u32 })
    }

    pub fn as_days(&self) -> u32 {
        self.days
    }

    pub fn as_seconds(&self) -> i64 {
        i64::from(self.days) * SECONDS_PER_DAY
    }

    /// Buckets are anchored to the unix epoch, so ids are comparable across repositories.
    pub fn window_of(&self, timestamp: &DateTime<Utc>) -> WindowId {
        WindowId(timestamp.timestamp().div_euclid(self.as_seconds()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct WindowId(pub i64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Activity of one file inside one window of one repository.
///
/// `lines_added`, `lines_deleted` and `window_commits` only cover events that
/// landed in this window. The remaining counters describe the whole stream and
/// are filled in once the stream has been consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct FileWindowRecord {
    pub path: String,
    pub repo_index: usize,
    pub cloc: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub window_commits: Vec<String>,
    pub total_commits: usize,
    pub commits: Vec<String>,
    pub windows_with_commits: usize,
    pub occurrences_in_windows: usize,
}

impl FileWindowRecord {
    fn new(path: &str, repo_index: usize, cloc: u64) -> Self {
        Self {
            path: path.to_string(),
            repo_index,
            cloc,
            lines_added: 0,
            lines_deleted: 0,
            window_commits: Vec::new(),
            total_commits: 0,
            commits: Vec::new(),
            windows_with_commits: 0,
            occurrences_in_windows: 0,
        }
    }
}

pub type WindowFiles = BTreeMap<String, FileWindowRecord>;

/// All non-empty windows of one repository stream.
#[derive(Debug, Clone, PartialEq)]
pub struct BinnedRepo {
    pub repo_index: usize,
    pub windows: BTreeMap<WindowId, WindowFiles>,
}

impl BinnedRepo {
    pub fn window_count(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn get(&self, id: WindowId) -> Option<&WindowFiles> {
        self.windows.get(&id)
    }

    /// Checks the occurrence bounds every record must satisfy after binning.
    pub fn check_bounds(&self) -> Result<()> {
        let total = self.windows.len();
        for (id, files) in &self.windows {
            for record in files.values() {
                if record.windows_with_commits != total
                    || record.occurrences_in_windows == 0
                    || record.occurrences_in_windows > total
                    || record.total_commits < record.occurrences_in_windows
                {
                    return Err(CoupleError::InvariantViolation(format!(
                        "repo {} window {}: {} has {} commits in {} of {} windows",
                        self.repo_index,
                        id,
                        record.path,
                        record.total_commits,
                        record.occurrences_in_windows,
                        total
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
struct PathHistory {
    commits: Vec<String>,
    windows: BTreeSet<WindowId>,
}

/// Folds one repository's events, in arrival order, into per-window file records.
pub fn bin_events<I>(repo_index: usize, events: I, window: WindowLength) -> Result<BinnedRepo>
where
    I: IntoIterator<Item = FileCommitEvent>,
{
    let mut windows: BTreeMap<WindowId, WindowFiles> = BTreeMap::new();
    let mut history: HashMap<String, PathHistory> = HashMap::new();

    for event in events {
        if event.repo_index != repo_index {
            return Err(CoupleError::MixedRepoStream {
                expected: repo_index,
                found: event.repo_index,
            });
        }

        let id = window.window_of(&event.timestamp);
        let record = windows
            .entry(id)
            .or_default()
            .entry(event.path.clone())
            .or_insert_with(|| FileWindowRecord::new(&event.path, repo_index, event.cloc));
        record.cloc = event.cloc;
        record.lines_added += event.lines_added;
        record.lines_deleted += event.lines_deleted;
        record.window_commits.push(event.commit_id.clone());

        let seen = history.entry(event.path).or_default();
        seen.commits.push(event.commit_id);
        seen.windows.insert(id);
    }

    let windows_with_commits = windows.len();
    for files in windows.values_mut() {
        for record in files.values_mut() {
            if let Some(seen) = history.get(&record.path) {
                record.total_commits = seen.commits.len();
                record.commits = seen.commits.clone();
                record.occurrences_in_windows = seen.windows.len();
            }
            record.windows_with_commits = windows_with_commits;
        }
    }

    Ok(BinnedRepo { repo_index, windows })
}
