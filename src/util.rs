use crate::model::FileStats;

pub const SHORT_ID_LEN: usize = 7;

pub fn short_id(commit_id: &str) -> String {
    commit_id.chars().take(SHORT_ID_LEN).collect()
}

pub fn files_matching<'a>(
    files: &'a [FileStats],
    path_prefix: Option<&'a str>,
) -> impl Iterator<Item = &'a FileStats> + 'a {
    files.iter().filter(move |fs| {
        if let Some(prefix) = path_prefix {
            fs.path.starts_with(prefix)
        } else {
            true
        }
    })
}

/// Truncates `path` to its first `depth` components; depth 0 keeps the full path.
pub fn module_key(path: &str, depth: u32) -> String {
    let parts: Vec<&str> = path.split('/').collect();
    if depth == 0 || parts.len() <= depth as usize {
        path.to_string()
    } else {
        parts[..depth as usize].join("/")
    }
}
