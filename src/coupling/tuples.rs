use super::intersect::SharedWindow;
use super::window::FileWindowRecord;
use std::collections::BTreeMap;
use std::fmt;

/// Ordered combination of one path per repository. Position `i` belongs to repository `i`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TupleKey {
    paths: Vec<String>,
}

impl TupleKey {
    pub fn new(paths: Vec<String>) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Paths at every position except `position`, in tuple order.
    pub fn partners(&self, position: usize) -> impl Iterator<Item = &str> + '_ {
        self.paths
            .iter()
            .enumerate()
            .filter(move |(i, _)| *i != position)
            .map(|(_, p)| p.as_str())
    }
}

impl fmt::Display for TupleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.paths.join(", "))
    }
}

pub type WindowTuples<'a> = BTreeMap<TupleKey, Vec<&'a FileWindowRecord>>;

/// Full cross product of the files active in `window`, one file per repository.
pub fn window_tuples<'a>(window: &SharedWindow<'a>) -> WindowTuples<'a> {
    if window.entries.is_empty() {
        return WindowTuples::new();
    }

    let mut combos: Vec<Vec<&'a FileWindowRecord>> = vec![Vec::new()];
    for &files in &window.entries {
        combos = combos
            .into_iter()
            .flat_map(move |prefix| {
                files.values().map(move |record| {
                    let mut next = Vec::with_capacity(prefix.len() + 1);
                    next.extend_from_slice(&prefix);
                    next.push(record);
                    next
                })
            })
            .collect();
    }

    combos
        .into_iter()
        .map(|records| {
            let key = TupleKey::new(records.iter().map(|r| r.path.clone()).collect());
            (key, records)
        })
        .collect()
}
