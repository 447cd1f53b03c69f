use super::aggregate::TupleMap;
use super::CouplingReport;
use crate::error::Result;
use std::io;

pub const COMMIT_ID_SEPARATOR: &str = "-";

/// One CSV line: a file seen from inside one of its tuples.
#[derive(Debug, Clone, PartialEq)]
pub struct CouplingRow {
    pub repo_index: usize,
    pub file: String,
    pub how_many_times: usize,
    pub together_with: Vec<String>,
    pub occurrences_in_time_windows: usize,
    pub ratio: f64,
    pub total_commits: usize,
    pub windows_with_commits: usize,
    pub cloc: u64,
    pub lines_added: u64,
    pub lines_deleted: u64,
    pub commit_ids: String,
}

impl CouplingRow {
    pub fn to_record(&self) -> Vec<String> {
        let mut record = Vec::with_capacity(11 + self.together_with.len());
        record.push(self.repo_index.to_string());
        record.push(self.file.clone());
        record.push(self.how_many_times.to_string());
        record.extend(self.together_with.iter().cloned());
        record.push(self.occurrences_in_time_windows.to_string());
        record.push(self.ratio.to_string());
        record.push(self.total_commits.to_string());
        record.push(self.windows_with_commits.to_string());
        record.push(self.cloc.to_string());
        record.push(self.lines_added.to_string());
        record.push(self.lines_deleted.to_string());
        record.push(self.commit_ids.clone());
        record
    }
}

pub fn header(repo_count: usize) -> Vec<String> {
    let mut columns = vec!["repoIndex".to_string(), "file".to_string(), "howManyTimes".to_string()];
    columns.extend((0..repo_count.saturating_sub(1)).map(|i| format!("togetherWith_{i}")));
    columns.extend(
        [
            "occurrenciesInTimeWindows",
            "tupleFileOccurrenciesInTimeWindowsRatio",
            "totNumberOfCommits",
            "totNumberOfTimeWindowsWithCommits",
            "cloc",
            "linesAdded",
            "linesDeleted",
            "commitIds",
        ]
        .iter()
        .map(|c| c.to_string()),
    );
    columns
}

/// Lazily flattens the aggregate into one row per (tuple, file).
pub fn rows(tuples: &TupleMap) -> impl Iterator<Item = CouplingRow> + '_ {
    tuples.iter().flat_map(|(key, tuple)| {
        tuple.files.values().map(move |file| CouplingRow {
            repo_index: file.repo_index,
            file: file.path.clone(),
            how_many_times: tuple.occurrences,
            together_with: key.partners(file.repo_index).map(str::to_string).collect(),
            occurrences_in_time_windows: file.occurrences_in_windows,
            ratio: file.ratio,
            total_commits: file.total_commits,
            windows_with_commits: file.windows_with_commits,
            cloc: file.cloc,
            lines_added: file.lines_added,
            lines_deleted: file.lines_deleted,
            commit_ids: file.commits.join(COMMIT_ID_SEPARATOR),
        })
    })
}

/// Writes the header and every row; returns the number of data rows written.
pub fn write_csv<W: io::Write>(report: &CouplingReport, writer: W) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header(report.repo_count))?;

    let mut written = 0;
    for row in rows(&report.tuples) {
        wtr.write_record(row.to_record())?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_has_one_partner_column_per_other_repo() {
        let h = header(3);
        assert_eq!(&h[..5], &["repoIndex", "file", "howManyTimes", "togetherWith_0", "togetherWith_1"]);
        assert_eq!(h.last().map(String::as_str), Some("commitIds"));
        assert_eq!(header(1).len(), 11);
        assert_eq!(header(0).len(), 11);
    }
}
