// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Reads the sentiment corpus from a directory of JSON-lines files:
//
//   corpus/
//     train.jsonl        ← required
//     validation.jsonl   ← optional
//     test.jsonl         ← required
//
// Each line is one record using the column names of the
// published Vietnamese students' feedback dataset:
//
//   {"sentence": "giảng viên dạy rất hay", "sentiment": 2}
//
// Labels are kept exactly as stored; remapping happens later
// in the pipeline, after rebalancing.

use std::{
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::domain::example::RawExample;
use crate::domain::traits::{CorpusSource, SplitName};
use crate::error::{DataError, PipelineResult};

#[derive(Debug, Deserialize)]
struct CorpusRecord {
    sentence:  String,
    sentiment: i64,
}

/// Loads corpus splits from `<dir>/<split>.jsonl`.
pub struct JsonlCorpus {
    dir: PathBuf,
}

impl JsonlCorpus {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn split_path(&self, split: SplitName) -> PathBuf {
        self.dir.join(format!("{}.jsonl", split.as_str()))
    }
}

impl CorpusSource for JsonlCorpus {
    fn load_split(&self, split: SplitName) -> PipelineResult<Option<Vec<RawExample>>> {
        let path = self.split_path(split);
        if !path.exists() {
            tracing::debug!("No '{}' split at '{}'", split.as_str(), path.display());
            return Ok(None);
        }

        let examples = read_jsonl(&path)?;
        tracing::info!(
            "Loaded {} examples for split '{}' from '{}'",
            examples.len(),
            split.as_str(),
            path.display()
        );
        Ok(Some(examples))
    }
}

/// Parse one JSON-lines file. Blank lines are skipped.
fn read_jsonl(path: &Path) -> PipelineResult<Vec<RawExample>> {
    let file   = fs::File::open(path)?;
    let reader = BufReader::new(file);
    let name   = path.display().to_string();

    let mut examples = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: CorpusRecord = serde_json::from_str(&line).map_err(|e| DataError::Malformed {
            source_name: name.clone(),
            line:        i + 1,
            reason:      e.to_string(),
        })?;
        examples.push(RawExample::new(record.sentence, record.sentiment));
    }
    Ok(examples)
}
