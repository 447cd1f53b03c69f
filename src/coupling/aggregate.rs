use super::tuples::{TupleKey, WindowTuples};
use super::window::FileWindowRecord;
use crate::error::{CoupleError, Result};
use std::collections::BTreeMap;

/// Identity of a file inside a tuple; equal paths from different repositories stay apart.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileKey {
    pub repo_index: usize,
    pub path: String,
}

/// Accumulated activity of one file over the windows where its tuple occurred.
#[derive(Debug, Clone, PartialEq)]
pub struct FileInTuple {
    pub repo_index: usize,
    pub path: String,
    pub cloc: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub commits: Vec<String>,
    pub total_commits: usize,
    pub windows_with_commits: usize,
    pub occurrences_in_windows: usize,
    /// Tuple occurrences over the file's own window occurrences, in `(0, 1]`.
    pub ratio: f64,
}

impl FileInTuple {
    fn seed(record: &FileWindowRecord) -> Self {
        Self {
            repo_index: record.repo_index,
            path: record.path.clone(),
            cloc: record.cloc,
            lines_added: 0,
            lines_deleted: 0,
            commits: Vec::new(),
            total_commits: record.total_commits,
            windows_with_commits: record.windows_with_commits,
            occurrences_in_windows: record.occurrences_in_windows,
            ratio: 0.0,
        }
    }

    fn absorb(&mut self, record: &FileWindowRecord) {
        self.cloc = record.cloc;
        self.lines_added += record.lines_added;
        self.lines_deleted += record.lines_deleted;
        self.commits.extend(record.window_commits.iter().cloned());
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TupleAggregate {
    pub occurrences: usize,
    pub files: BTreeMap<FileKey, FileInTuple>,
}

pub type TupleMap = BTreeMap<TupleKey, TupleAggregate>;

/// Folds per-window tuples into one map over the whole period, then computes ratios
/// from the final totals.
pub fn aggregate<'a, I>(windows: I) -> Result<TupleMap>
where
    I: IntoIterator<Item = WindowTuples<'a>>,
{
    let mut tuples = TupleMap::new();

    for window in windows {
        for (key, records) in window {
            let tuple = tuples.entry(key).or_default();
            tuple.occurrences += 1;
            for record in records {
                let file_key = FileKey {
                    repo_index: record.repo_index,
                    path: record.path.clone(),
                };
                tuple
                    .files
                    .entry(file_key)
                    .or_insert_with(|| FileInTuple::seed(record))
                    .absorb(record);
            }
        }
    }

    finalize_ratios(&mut tuples)?;
    Ok(tuples)
}

fn finalize_ratios(tuples: &mut TupleMap) -> Result<()> {
    for (key, tuple) in tuples.iter_mut() {
        for file in tuple.files.values_mut() {
            if file.occurrences_in_windows == 0 {
                return Err(CoupleError::InvariantViolation(format!(
                    "{} (repo {}) appears in tuple {} but has no window occurrences",
                    file.path, file.repo_index, key
                )));
            }
            let ratio = tuple.occurrences as f64 / file.occurrences_in_windows as f64;
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(CoupleError::InvariantViolation(format!(
                    "ratio {} for {} (repo {}) in tuple {} is outside (0, 1]",
                    ratio, file.path, file.repo_index, key
                )));
            }
            file.ratio = ratio;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, occurrences: usize) -> FileWindowRecord {
        FileWindowRecord {
            path: path.to_string(),
            repo_index: 0,
            cloc: 5,
            lines_added: 3,
            lines_deleted: 1,
            window_commits: vec!["c1".to_string()],
            total_commits: occurrences,
            commits: vec!["c1".to_string()],
            windows_with_commits: 4,
            occurrences_in_windows: occurrences,
        }
    }

    #[test]
    fn zero_occurrence_file_is_an_invariant_violation() {
        let broken = record("a.rs", 0);
        let mut window = WindowTuples::new();
        window.insert(TupleKey::new(vec!["a.rs".to_string()]), vec![&broken]);
        let err = aggregate(vec![window]).unwrap_err();
        assert!(matches!(err, CoupleError::InvariantViolation(_)));
    }

    #[test]
    fn tuple_seen_more_often_than_its_file_is_rejected() {
        let rec = record("a.rs", 1);
        let key = TupleKey::new(vec!["a.rs".to_string()]);
        let windows: Vec<WindowTuples<'_>> = (0..2)
            .map(|_| {
                let mut w = WindowTuples::new();
                w.insert(key.clone(), vec![&rec]);
                w
            })
            .collect();
        assert!(matches!(
            aggregate(windows),
            Err(CoupleError::InvariantViolation(_))
        ));
    }

    #[test]
    fn sums_churn_over_tuple_windows() {
        let rec = record("a.rs", 2);
        let key = TupleKey::new(vec!["a.rs".to_string()]);
        let windows: Vec<WindowTuples<'_>> = (0..2)
            .map(|_| {
                let mut w = WindowTuples::new();
                w.insert(key.clone(), vec![&rec]);
                w
            })
            .collect();
        let tuples = aggregate(windows).unwrap();
        let tuple = &tuples[&key];
        assert_eq!(tuple.occurrences, 2);
        let file = tuple.files.values().next().unwrap();
        assert_eq!(file.lines_added, 6);
        assert_eq!(file.lines_deleted, 2);
        assert_eq!(file.commits, vec!["c1", "c1"]);
        assert_eq!(file.ratio, 1.0);
    }
}
