//! Lines-of-code snapshots produced by `cloc --by-file --csv`.

use crate::error::{CoupleError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClocTable {
    code: HashMap<String, u64>,
}

impl ClocTable {
    pub fn from_path(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(name))
                .ok_or_else(|| CoupleError::Parse(format!("cloc csv has no '{name}' column")))
        };
        let filename_col = column("filename")?;
        let code_col = column("code")?;

        let mut code = HashMap::new();
        for record in rdr.records() {
            let record = record?;
            let (Some(filename), Some(lines)) = (record.get(filename_col), record.get(code_col)) else {
                continue;
            };
            if filename.is_empty() || filename == "SUM" {
                continue;
            }
            let lines = lines
                .parse::<u64>()
                .map_err(|e| CoupleError::Parse(format!("bad code count '{lines}' for {filename}: {e}")))?;
            code.insert(normalize(filename), lines);
        }

        Ok(Self { code })
    }

    pub fn get(&self, path: &str) -> Option<u64> {
        self.code.get(normalize(path).as_str()).copied()
    }
}

fn normalize(path: &str) -> String {
    path.trim_start_matches("./").replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLOC_CSV: &str = "\
language,filename,blank,comment,code,\"github.com/AlDanial/cloc v 1.96\"
Rust,./src/lib.rs,10,4,120
Rust,./src/coupling/window.rs,20,8,210
Markdown,README.md,5,0,40
SUM,,35,12,370
";

    #[test]
    fn reads_code_counts_by_file() {
        let table = ClocTable::from_reader(CLOC_CSV.as_bytes()).unwrap();
        assert_eq!(table.get("src/lib.rs"), Some(120));
        assert_eq!(table.get("./src/coupling/window.rs"), Some(210));
        assert_eq!(table.get("README.md"), Some(40));
        assert_eq!(table.get("missing.rs"), None);
        assert_eq!(table.get(""), None);
    }

    #[test]
    fn missing_columns_are_reported() {
        let err = ClocTable::from_reader("a,b\n1,2\n".as_bytes()).unwrap_err();
        assert!(matches!(err, CoupleError::Parse(_)));
    }
}
