// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per epoch and phase (train / validation),
// plus a final "test" row, so learning curves can be plotted
// after the run.
//
// Output file: <checkpoint_dir>/metrics.csv
//
//   epoch,phase,loss,hard_loss,accuracy,precision,recall,f1,lr
//   1,train,0.912300,0.887100,0.521000,0.498000,0.521000,0.503000,3e-4
//   1,validation,0.874500,0.850200,0.560000,0.547000,0.560000,0.550000,3e-4
//
// hard_loss is empty for fine-tuning runs, where loss already is
// the hard cross-entropy.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use crate::error::PipelineResult;
use crate::ml::metrics::ClassificationMetrics;

const HEADER: &str = "epoch,phase,loss,hard_loss,accuracy,precision,recall,f1,lr";

/// One CSV row.
#[derive(Debug, Clone)]
pub struct MetricsRow<'a> {
    pub epoch:         usize,
    pub phase:         &'a str,
    pub loss:          f64,
    pub hard_loss:     Option<f64>,
    pub metrics:       &'a ClassificationMetrics,
    pub learning_rate: f64,
}

pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Starts a fresh file; rows from a previous run in the same directory are replaced.
    pub fn new(dir: impl AsRef<Path>) -> PipelineResult<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    pub fn log(&self, row: &MetricsRow<'_>) -> PipelineResult<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;

        let hard = row.hard_loss.map(|h| format!("{h:.6}")).unwrap_or_default();
        writeln!(
            f,
            "{},{},{:.6},{},{:.6},{:.6},{:.6},{:.6},{:e}",
            row.epoch,
            row.phase,
            row.loss,
            hard,
            row.metrics.accuracy,
            row.metrics.precision,
            row.metrics.recall,
            row.metrics.f1,
            row.learning_rate,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
