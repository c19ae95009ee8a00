use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::types::ReadResult;

/// Persists reader results under the configured output directory: one JSON
/// line per result (append-only) and markdown bodies as standalone files.
pub struct ResultWriter {
    out_dir: PathBuf,
}

impl ResultWriter {
    pub fn new(base_dir: &Path) -> Result<Self> {
        let out_dir = base_dir.join("reader");
        fs::create_dir_all(&out_dir)
            .context(format!("could not create output directory {:?}", out_dir))?;
        Ok(ResultWriter { out_dir })
    }

    /// Appends each result as one self-contained JSON line. Existing lines
    /// are never rewritten.
    pub fn append_jsonl(&self, name: &str, results: &[ReadResult]) -> Result<PathBuf> {
        let path = self.out_dir.join(name);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context(format!("could not open {:?} for append", path))?;
        for result in results {
            let line = serde_json::to_string(result)?;
            writeln!(file, "{}", line).context(format!("could not append to {:?}", path))?;
        }
        Ok(path)
    }

    /// Writes the content body, overwriting any prior file at that path.
    pub fn write_markdown(&self, name: &str, content: &str) -> Result<PathBuf> {
        let path = self.out_dir.join(name);
        fs::write(&path, content).context(format!("could not write {:?}", path))?;
        Ok(path)
    }

    pub fn read_jsonl(path: &Path) -> Result<Vec<ReadResult>> {
        let raw = fs::read_to_string(path).context(format!("could not read {:?}", path))?;
        let mut results = vec![];
        for line in raw.lines().filter(|l| !l.trim().is_empty()) {
            let result: ReadResult =
                serde_json::from_str(line).context(format!("invalid result line in {:?}", path))?;
            results.push(result);
        }
        Ok(results)
    }
}
