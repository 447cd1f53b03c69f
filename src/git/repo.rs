use crate::error::{CoupleError, Result};
use crate::model::{merge_by_path, CommitInfo, CommitRecord, DateRange, FileStats};
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use gix::object::tree::diff::ChangeDetached;
use gix::{discover, ObjectId, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use similar::{ChangeTag, TextDiff};
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::debug;

pub struct GitRepo {
    repo: Repository,
    path: PathBuf,
}

impl GitRepo {
    /// Open a repository at `path`, or current dir if `None`
    pub fn open<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        let repo_path = match path {
            Some(p) => p.as_ref().to_path_buf(),
            None => std::env::current_dir()?,
        };

        let repo = discover(&repo_path)?;
        let path = repo.workdir().unwrap_or_else(|| repo.path()).to_path_buf();
        debug!(path = %path.display(), "opened repository");

        Ok(Self { repo, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stable key used to tell repositories apart inside a shared cache.
    pub fn cache_key(&self) -> String {
        self.path
            .canonicalize()
            .unwrap_or_else(|_| self.path.clone())
            .to_string_lossy()
            .to_string()
    }

    pub fn resolve_range(&self, since: Option<&str>, until: Option<&str>) -> Result<DateRange> {
        let mut range = DateRange::new();

        let since_dt = since.map(|s| self.parse_commit_or_date(s)).transpose()?;
        let until_dt = until.map(|u| self.parse_commit_or_date(u)).transpose()?;

        if let (Some(s), Some(u)) = (since_dt, until_dt) {
            if s > u {
                return Err(CoupleError::InvalidDate(format!(
                    "Invalid range: since ({s}) is after until ({u})"
                )));
            }
        }

        if let Some(s) = since_dt {
            range = range.with_since(s);
        }
        if let Some(u) = until_dt {
            range = range.with_until(u);
        }

        Ok(range)
    }

    fn parse_commit_or_date(&self, input: &str) -> Result<DateTime<Utc>> {
        // RFC3339
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Ok(dt.with_timezone(&Utc));
        }

        // YYYY-MM-DD
        if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
            if let Some(datetime) = date.and_hms_opt(0, 0, 0) {
                return Ok(Utc.from_utc_datetime(&datetime));
            }
        }

        // "2 weeks ago", "90d", "1month"
        if let Some(duration) = parse_relative_duration(input) {
            let target = SystemTime::now()
                .checked_sub(duration)
                .ok_or_else(|| CoupleError::InvalidDate(format!("Duration overflow for '{input}'")))?;
            return Ok(DateTime::<Utc>::from(target));
        }

        // Fallback to Git ref
        let id = self
            .repo
            .rev_parse_single(input)
            .map_err(|e| CoupleError::Parse(format!("Invalid commit or date '{input}': {e}")))?;

        let commit = id
            .object()?
            .try_into_commit()
            .map_err(|_| CoupleError::Parse(format!("Not a commit: {input}")))?;

        let secs = commit.time()?.seconds;
        DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| CoupleError::InvalidDate(format!("Invalid timestamp: {secs}")))
    }

    /// Walks history from HEAD and diffs every commit in `range` whose id is not in `known`.
    pub fn collect_commits(
        &self,
        range: &DateRange,
        include_merges: bool,
        binary: bool,
        known: &HashSet<String>,
    ) -> Result<Vec<CommitRecord>> {
        let mut head = self.repo.head()?;
        let head_commit = head.peel_to_commit_in_place()?;

        let mut commits = Vec::new();
        let mut seen: HashSet<ObjectId> = HashSet::new();
        let mut stack: VecDeque<ObjectId> = VecDeque::from([head_commit.id]);

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Collecting commits in {}", self.path.display()));

        while let Some(commit_id) = stack.pop_back() {
            if !seen.insert(commit_id) {
                continue;
            }

            let commit = self.repo.find_commit(commit_id)?;
            let secs = commit.time()?.seconds;
            let timestamp = DateTime::from_timestamp(secs, 0)
                .ok_or_else(|| CoupleError::InvalidDate(format!("Invalid timestamp: {secs}")))?;

            let parents: Vec<ObjectId> = commit.parent_ids().map(|id| id.into()).collect();
            stack.extend(parents.iter().copied());

            if !range.contains(&timestamp) || (!include_merges && parents.len() > 1) {
                continue;
            }

            let id = commit_id.to_string();
            if known.contains(&id) {
                continue;
            }

            let author = commit.author()?;
            let message = commit.message()?;
            let info = CommitInfo {
                id,
                author_name: author.name.to_string(),
                author_email: author.email.to_string(),
                message: message.title.to_string(),
                timestamp,
                parent_ids: parents.iter().map(|id| id.to_string()).collect(),
            };

            let files = self.diff_against_parent(commit_id, parents.first().copied(), binary)?;
            commits.push(CommitRecord { info, files });
            pb.inc(1);
        }

        pb.finish_and_clear();
        debug!(
            path = %self.path.display(),
            walked = seen.len(),
            diffed = commits.len(),
            "collected commits"
        );
        Ok(commits)
    }

    fn diff_against_parent(
        &self,
        commit_id: ObjectId,
        parent_id: Option<ObjectId>,
        binary: bool,
    ) -> Result<Vec<FileStats>> {
        let commit_tree = self.repo.find_commit(commit_id)?.tree()?;
        let parent_tree = match parent_id {
            Some(pid) => Some(self.repo.find_commit(pid)?.tree()?),
            None => None,
        };

        let changes: Vec<ChangeDetached> =
            self.repo
                .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), None)?;

        let mut files = Vec::new();
        for change in changes {
            self.handle_change(change, binary, &mut files);
        }
        Ok(merge_by_path(files))
    }

    fn handle_change(&self, change: ChangeDetached, binary: bool, files: &mut Vec<FileStats>) {
        match change {
            ChangeDetached::Addition { id, location, .. } => {
                if let Ok(obj) = self.repo.find_object(id) {
                    let is_binary = is_binary_object(&obj);
                    if binary || !is_binary {
                        let lines = if is_binary { 0 } else { count_lines(&obj) };
                        files.push(FileStats {
                            path: location.to_string(),
                            added_lines: lines,
                            deleted_lines: 0,
                            lines,
                            is_binary,
                        });
                    }
                }
            }
            ChangeDetached::Deletion { id, location, .. } => {
                if let Ok(obj) = self.repo.find_object(id) {
                    let is_binary = is_binary_object(&obj);
                    if binary || !is_binary {
                        let lines = if is_binary { 0 } else { count_lines(&obj) };
                        files.push(FileStats {
                            path: location.to_string(),
                            added_lines: 0,
                            deleted_lines: lines,
                            lines: 0,
                            is_binary,
                        });
                    }
                }
            }
            ChangeDetached::Modification {
                previous_id,
                id,
                location,
                ..
            } => {
                if let (Ok(old_obj), Ok(new_obj)) =
                    (self.repo.find_object(previous_id), self.repo.find_object(id))
                {
                    let is_binary = is_binary_object(&old_obj) || is_binary_object(&new_obj);
                    if binary || !is_binary {
                        let (added, deleted, lines) = if is_binary {
                            (0, 0, 0)
                        } else {
                            let (added, deleted) = line_diff(&old_obj, &new_obj);
                            (added, deleted, count_lines(&new_obj))
                        };
                        files.push(FileStats {
                            path: location.to_string(),
                            added_lines: added,
                            deleted_lines: deleted,
                            lines,
                            is_binary,
                        });
                    }
                }
            }
            ChangeDetached::Rewrite {
                source_id,
                id,
                source_location,
                location,
                copy,
                ..
            } => {
                if let (Ok(old_obj), Ok(new_obj)) =
                    (self.repo.find_object(source_id), self.repo.find_object(id))
                {
                    let is_binary = is_binary_object(&old_obj) || is_binary_object(&new_obj);
                    if binary || !is_binary {
                        let (added, deleted, lines) = if is_binary {
                            (0, 0, 0)
                        } else {
                            let (added, deleted) = line_diff(&old_obj, &new_obj);
                            (added, deleted, count_lines(&new_obj))
                        };

                        if !copy {
                            files.push(FileStats {
                                path: source_location.to_string(),
                                added_lines: 0,
                                deleted_lines: deleted,
                                lines: 0,
                                is_binary,
                            });
                        }

                        files.push(FileStats {
                            path: location.to_string(),
                            added_lines: added,
                            deleted_lines: 0,
                            lines,
                            is_binary,
                        });
                    }
                }
            }
        }
    }
}

fn is_binary_object(object: &gix::Object) -> bool {
    object.data.as_slice().iter().take(8192).any(|&b| b == 0)
}

fn count_lines(object: &gix::Object) -> u32 {
    std::str::from_utf8(object.data.as_slice())
        .map(|t| t.lines().count() as u32)
        .unwrap_or(0)
}

fn line_diff(old_object: &gix::Object, new_object: &gix::Object) -> (u32, u32) {
    let old_text = std::str::from_utf8(old_object.data.as_slice()).unwrap_or("");
    let new_text = std::str::from_utf8(new_object.data.as_slice()).unwrap_or("");
    count_changes(old_text, new_text)
}

fn count_changes(old_text: &str, new_text: &str) -> (u32, u32) {
    let diff = TextDiff::from_lines(old_text, new_text);
    let mut added = 0u32;
    let mut deleted = 0u32;
    for change in diff.iter_all_changes() {
        match change.tag() {
            ChangeTag::Insert => added += 1,
            ChangeTag::Delete => deleted += 1,
            ChangeTag::Equal => {}
        }
    }
    (added, deleted)
}

fn parse_relative_duration(input: &str) -> Option<Duration> {
    let input = input.trim().to_lowercase();

    let units = [(" days ago", 1), (" weeks ago", 7), (" months ago", 30)];
    for (suffix, days) in units {
        if let Some(n) = input.strip_suffix(suffix) {
            if let Ok(n) = n.trim().parse::<u64>() {
                return n.checked_mul(days * 86400).map(Duration::from_secs);
            }
        }
    }

    humantime::parse_duration(input.trim_start_matches('-')).ok()
}
