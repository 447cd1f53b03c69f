use super::window::{BinnedRepo, WindowFiles, WindowId};

/// A window in which every compared repository has at least one commit.
#[derive(Debug, Clone)]
pub struct SharedWindow<'a> {
    pub id: WindowId,
    /// One file table per repository, in repository order.
    pub entries: Vec<&'a WindowFiles>,
}

/// Windows present in all of `repos`, in ascending window order.
pub fn shared_windows(repos: &[BinnedRepo]) -> Vec<SharedWindow<'_>> {
    let Some(first) = repos.first() else {
        return Vec::new();
    };

    first
        .windows
        .keys()
        .filter_map(|&id| {
            let entries = repos
                .iter()
                .map(|repo| repo.get(id))
                .collect::<Option<Vec<_>>>()?;
            Some(SharedWindow { id, entries })
        })
        .collect()
}
