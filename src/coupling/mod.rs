//! Time-windowed file coupling across repositories.
//!
//! Each repository's event stream is binned into fixed-length windows anchored to
//! the epoch. Windows where every repository committed are intersected, the files
//! active in each such window are crossed into tuples (one file per repository),
//! and tuple statistics are folded over the whole period.

pub mod aggregate;
pub mod exec;
pub mod intersect;
pub mod rows;
pub mod tuples;
pub mod window;

pub use aggregate::{aggregate, FileInTuple, FileKey, TupleAggregate, TupleMap};
pub use exec::exec;
pub use intersect::{shared_windows, SharedWindow};
pub use rows::{header, rows, write_csv, CouplingRow};
pub use tuples::{window_tuples, TupleKey, WindowTuples};
pub use window::{bin_events, BinnedRepo, FileWindowRecord, WindowFiles, WindowId, WindowLength};

use crate::error::Result;
use crate::model::{FileCommitEvent, TupleFileOutput, TupleOutput};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct CouplingReport {
    pub repo_count: usize,
    pub window_length: WindowLength,
    pub windows_per_repo: Vec<usize>,
    pub shared_windows: usize,
    pub tuples: TupleMap,
}

impl CouplingReport {
    pub fn tuple_count(&self) -> usize {
        self.tuples.len()
    }

    /// Tuples ordered by occurrence count, most frequent first.
    pub fn ranked(&self) -> Vec<(&TupleKey, &TupleAggregate)> {
        let mut ranked: Vec<_> = self.tuples.iter().collect();
        ranked.sort_by(|a, b| b.1.occurrences.cmp(&a.1.occurrences).then_with(|| a.0.cmp(b.0)));
        ranked
    }

    pub fn to_output(&self) -> Vec<TupleOutput> {
        self.tuples
            .iter()
            .map(|(key, tuple)| TupleOutput {
                paths: key.paths().to_vec(),
                occurrences: tuple.occurrences,
                files: tuple
                    .files
                    .values()
                    .map(|f| TupleFileOutput {
                        repo_index: f.repo_index,
                        path: f.path.clone(),
                        occurrences_in_time_windows: f.occurrences_in_windows,
                        ratio: f.ratio,
                        total_commits: f.total_commits,
                        windows_with_commits: f.windows_with_commits,
                        cloc: f.cloc,
                        lines_added: f.lines_added,
                        lines_deleted: f.lines_deleted,
                        commits: f.commits.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Runs the whole engine over one event stream per repository, in repository order.
pub fn analyze<S>(streams: S, window: WindowLength) -> Result<CouplingReport>
where
    S: IntoIterator,
    S::Item: IntoIterator<Item = FileCommitEvent>,
{
    let binned = streams
        .into_iter()
        .enumerate()
        .map(|(repo_index, events)| bin_events(repo_index, events, window))
        .collect::<Result<Vec<_>>>()?;

    for repo in &binned {
        repo.check_bounds()?;
        debug!(repo = repo.repo_index, windows = repo.window_count(), "binned repository");
    }

    let shared = shared_windows(&binned);
    let tuples = aggregate(shared.iter().map(window_tuples))?;

    info!(
        repos = binned.len(),
        shared_windows = shared.len(),
        tuples = tuples.len(),
        window_days = window.as_days(),
        "coupling analysis complete"
    );

    Ok(CouplingReport {
        repo_count: binned.len(),
        window_length: window,
        windows_per_repo: binned.iter().map(BinnedRepo::window_count).collect(),
        shared_windows: shared.len(),
        tuples,
    })
}
