use crate::error::{CoupleError, Result};
use crate::model::{merge_by_path, CommitInfo, CommitRecord, DateRange, FileStats, SCHEMA_VERSION};
use chrono::{TimeZone, Utc};
use rusqlite::{params, Connection, ToSql};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

pub const CACHE_DIR_NAME: &str = ".gcouple";

/// Commit cache shared by every repository of a run; rows are keyed by repository.
pub struct Cache {
    conn: Connection,
}

impl Cache {
    pub fn new<CP: AsRef<Path>, RP: AsRef<Path>>(cache_path: Option<CP>, repo_path: RP) -> Result<Self> {
        let cache_dir = match cache_path {
            Some(path) => path.as_ref().to_path_buf(),
            None => repo_path.as_ref().join(CACHE_DIR_NAME),
        };
        std::fs::create_dir_all(&cache_dir)?;
        let db_path = cache_dir.join("cache.db");
        debug!(path = %db_path.display(), "opening cache");
        let conn = Connection::open(&db_path)?;
        let mut cache = Self { conn };
        cache.initialize()?;
        Ok(cache)
    }

    pub fn open_in_memory() -> Result<Self> {
        let mut cache = Self {
            conn: Connection::open_in_memory()?,
        };
        cache.initialize()?;
        Ok(cache)
    }

    fn initialize(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS commits (
                repo TEXT NOT NULL,
                id TEXT NOT NULL,
                author_name TEXT NOT NULL,
                author_email TEXT NOT NULL,
                message TEXT NOT NULL,
                timestamp INTEGER NOT NULL,
                parent_ids TEXT NOT NULL,
                PRIMARY KEY (repo, id)
            );
            CREATE TABLE IF NOT EXISTS files (
                repo TEXT NOT NULL,
                commit_id TEXT NOT NULL,
                path TEXT NOT NULL,
                added_lines INTEGER NOT NULL,
                deleted_lines INTEGER NOT NULL,
                lines INTEGER NOT NULL,
                is_binary INTEGER NOT NULL,
                PRIMARY KEY (repo, commit_id, path),
                FOREIGN KEY (repo, commit_id) REFERENCES commits(repo, id)
            );
            CREATE INDEX IF NOT EXISTS idx_commits_timestamp ON commits(repo, timestamp);
            ",
        )?;
        self.check_schema_version()?;
        Ok(())
    }

    fn check_schema_version(&mut self) -> Result<()> {
        let user_version: i64 = self
            .conn
            .query_row("PRAGMA user_version;", [], |row| row.get(0))?;

        if user_version == 0 {
            let set_stmt = format!("PRAGMA user_version = {SCHEMA_VERSION};");
            self.conn.execute_batch(&set_stmt)?;
        } else if user_version != i64::from(SCHEMA_VERSION) {
            return Err(CoupleError::Cache(format!(
                "Schema version mismatch: expected {SCHEMA_VERSION}, found {user_version}"
            )));
        }

        Ok(())
    }

    pub fn known_commit_ids(&self, repo: &str) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT id FROM commits WHERE repo = ?")?;
        let ids = stmt
            .query_map(params![repo], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(ids)
    }

    /// Cached commits of `repo` inside `range`, oldest first.
    pub fn get_commits(&self, repo: &str, range: &DateRange) -> Result<Vec<CommitRecord>> {
        let mut filter = String::from("WHERE c.repo = ?");
        let mut to_bind: Vec<Box<dyn ToSql>> = vec![Box::new(repo.to_string())];
        if let Some(since) = &range.since {
            filter.push_str(" AND c.timestamp >= ?");
            to_bind.push(Box::new(since.timestamp()));
        }
        if let Some(until) = &range.until {
            filter.push_str(" AND c.timestamp <= ?");
            to_bind.push(Box::new(until.timestamp()));
        }
        let bind_refs: Vec<&dyn ToSql> = to_bind.iter().map(|b| b.as_ref()).collect();

        let mut files_by_commit: HashMap<String, Vec<FileStats>> = HashMap::new();
        let files_query = format!(
            "SELECT f.commit_id, f.path, f.added_lines, f.deleted_lines, f.lines, f.is_binary
             FROM files f
             JOIN commits c ON c.repo = f.repo AND c.id = f.commit_id
             {filter}
             ORDER BY f.path"
        );
        let mut stmt = self.conn.prepare(&files_query)?;
        let rows = stmt.query_map(bind_refs.as_slice(), |row| {
            let commit_id: String = row.get(0)?;
            let is_binary: i64 = row.get(5)?;
            Ok((
                commit_id,
                FileStats {
                    path: row.get(1)?,
                    added_lines: row.get(2)?,
                    deleted_lines: row.get(3)?,
                    lines: row.get(4)?,
                    is_binary: is_binary != 0,
                },
            ))
        })?;
        for row in rows {
            let (commit_id, file) = row?;
            files_by_commit.entry(commit_id).or_default().push(file);
        }

        let commits_query = format!(
            "SELECT c.id, c.author_name, c.author_email, c.message, c.timestamp, c.parent_ids
             FROM commits c
             {filter}
             ORDER BY c.timestamp, c.id"
        );
        let mut stmt = self.conn.prepare(&commits_query)?;
        let infos = stmt
            .query_map(bind_refs.as_slice(), row_to_commit_info)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(infos
            .into_iter()
            .map(|info| {
                let files = files_by_commit.remove(&info.id).unwrap_or_default();
                CommitRecord { info, files }
            })
            .collect())
    }

    pub fn store_commits(&mut self, repo: &str, commits: &[CommitRecord]) -> Result<()> {
        let tx = self.conn.transaction()?;

        {
            let mut insert_commit_stmt = tx.prepare(
                "INSERT OR REPLACE INTO commits (repo, id, author_name, author_email, message, timestamp, parent_ids)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )?;
            let mut delete_files_stmt = tx.prepare("DELETE FROM files WHERE repo = ? AND commit_id = ?")?;
            let mut insert_file_stmt = tx.prepare(
                "INSERT INTO files (repo, commit_id, path, added_lines, deleted_lines, lines, is_binary)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )?;

            for record in commits {
                let info = &record.info;
                insert_commit_stmt.execute(params![
                    repo,
                    info.id,
                    info.author_name,
                    info.author_email,
                    info.message,
                    info.timestamp.timestamp(),
                    serde_json::to_string(&info.parent_ids)?
                ])?;

                delete_files_stmt.execute(params![repo, info.id])?;

                for f in merge_by_path(record.files.clone()) {
                    insert_file_stmt.execute(params![
                        repo,
                        info.id,
                        f.path,
                        f.added_lines,
                        f.deleted_lines,
                        f.lines,
                        i64::from(f.is_binary)
                    ])?;
                }
            }
        }

        tx.commit()?;
        debug!(repo, stored = commits.len(), "cached commits");
        Ok(())
    }
}

fn row_to_commit_info(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommitInfo> {
    let ts: i64 = row.get(4)?;
    let timestamp = Utc.timestamp_opt(ts, 0).single().ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(4, "timestamp".to_string(), rusqlite::types::Type::Integer)
    })?;

    let parent_json: String = row.get(5)?;
    let parent_ids: Vec<String> = serde_json::from_str(&parent_json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
    })?;

    Ok(CommitInfo {
        id: row.get(0)?,
        author_name: row.get(1)?,
        author_email: row.get(2)?,
        message: row.get(3)?,
        timestamp,
        parent_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, secs: i64, paths: &[&str]) -> CommitRecord {
        CommitRecord {
            info: CommitInfo {
                id: id.to_string(),
                author_name: "Ada".to_string(),
                author_email: "ada@example.com".to_string(),
                message: format!("commit {id}"),
                timestamp: Utc.timestamp_opt(secs, 0).single().unwrap(),
                parent_ids: vec!["p".to_string()],
            },
            files: paths
                .iter()
                .map(|p| FileStats {
                    path: p.to_string(),
                    added_lines: 3,
                    deleted_lines: 1,
                    lines: 12,
                    is_binary: false,
                })
                .collect(),
        }
    }

    #[test]
    fn stores_and_reads_back_per_repository() {
        let mut cache = Cache::open_in_memory().unwrap();
        let a = vec![record("c2", 200, &["b.rs"]), record("c1", 100, &["a.rs", "b.rs"])];
        cache.store_commits("/repo/a", &a).unwrap();
        cache.store_commits("/repo/b", &[record("c9", 50, &["x.rs"])]).unwrap();

        let read = cache.get_commits("/repo/a", &DateRange::new()).unwrap();
        assert_eq!(read.len(), 2);
        assert_eq!(read[0], a[1]);
        assert_eq!(read[1], a[0]);

        let known = cache.known_commit_ids("/repo/b").unwrap();
        assert_eq!(known, HashSet::from(["c9".to_string()]));
    }

    #[test]
    fn filters_by_range() {
        let mut cache = Cache::open_in_memory().unwrap();
        cache
            .store_commits("r", &[record("old", 100, &["a.rs"]), record("new", 5_000, &["a.rs"])])
            .unwrap();
        let since = Utc.timestamp_opt(1_000, 0).single().unwrap();
        let read = cache.get_commits("r", &DateRange::new().with_since(since)).unwrap();
        assert_eq!(read.len(), 1);
        assert_eq!(read[0].info.id, "new");
    }

    #[test]
    fn duplicate_paths_are_merged_like_a_fresh_walk() {
        let mut cache = Cache::open_in_memory().unwrap();
        let mut commit = record("c1", 100, &["a.rs", "a.rs", "b.rs"]);
        commit.files[1].lines = 20;
        cache.store_commits("r", std::slice::from_ref(&commit)).unwrap();

        let read = cache.get_commits("r", &DateRange::new()).unwrap();
        let mut expected = merge_by_path(commit.files.clone());
        expected.sort_by(|a, b| a.path.cmp(&b.path));
        let mut files = read[0].files.clone();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(files, expected);
        assert_eq!(files[0].added_lines, 6);
        assert_eq!(files[0].lines, 20);
    }
}
