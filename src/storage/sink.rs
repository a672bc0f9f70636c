use crate::model::Outcome;
use crate::storage::OutcomeSink;
use crate::Result;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// Append-only JSON Lines file of outcome records
///
/// The file is opened in append mode for every record; no handle is held
/// between items. Existing lines are never rewritten.
#[derive(Debug, Clone)]
pub struct ResultsSink {
    path: PathBuf,
}

impl ResultsSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl OutcomeSink for ResultsSink {
    /// Appends one record and syncs it to disk before returning
    fn append(&self, outcome: &Outcome) -> Result<()> {
        let mut line = serde_json::to_string(outcome)?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;
        Ok(())
    }
}

/// Reads every line of a results file
///
/// Lines that fail to parse are returned as errors in place so callers can
/// count them without losing the rest of the file. A missing file reads as
/// empty.
pub fn read_outcomes(path: &Path) -> Result<Vec<std::result::Result<Outcome, serde_json::Error>>> {
    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(serde_json::from_str(&line));
    }
    Ok(records)
}
