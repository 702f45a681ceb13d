// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Persists the single best-so-far model of a run using Burn's
// CompactRecorder. Every save overwrites the previous one.
//
// What gets written:
//
//   checkpoints/
//     best_model.mpk      ← weights (CompactRecorder, half precision)
//     best_model.json     ← CheckpointMeta: architecture, epoch,
//                           val_loss, validation metrics
//     run_config.json     ← the run's FinetuneConfig / DistillConfig
//     results.json        ← TrainingReport, written after the run
//     tokenizer.json      ← written by TokenizerStore
//
// The architecture is saved next to the weights because a model
// must be rebuilt with the exact same shape before its record
// can be loaded into it.
//
// A save writes both files under a `_staging` name first and
// only then renames them into place, so a failed save leaves
// the previous checkpoint untouched.
//
// Every failure is a PipelineError::CheckpointIo naming the path.

use std::{
    fs,
    path::{Path, PathBuf},
};

use burn::{
    prelude::*,
    record::{CompactRecorder, FileRecorder, Recorder},
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};
use crate::ml::adapter::{ClassifierAdapter, ModelSpec};
use crate::ml::metrics::ClassificationMetrics;

pub const RUN_CONFIG_FILE: &str = "run_config.json";
pub const REPORT_FILE:     &str = "results.json";

/// Everything needed to rebuild and describe a saved model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMeta {
    pub model:    ModelSpec,
    pub epoch:    usize,
    pub val_loss: f64,
    pub metrics:  ClassificationMetrics,
}

fn io_error(path: &Path, reason: impl ToString) -> PipelineError {
    PipelineError::CheckpointIo {
        path:   path.display().to_string(),
        reason: reason.to_string(),
    }
}

pub struct CheckpointManager {
    dir:  PathBuf,
    name: String,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { dir: dir.into(), name: name.into() }
    }

    /// Weights path without extension; the recorder appends its own.
    pub fn weights_path(&self) -> PathBuf {
        self.dir.join(&self.name)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", self.name))
    }

    fn staging_name(&self) -> String {
        format!("{}_staging", self.name)
    }

    pub fn exists(&self) -> bool {
        self.meta_path().exists()
    }

    fn ensure_dir(&self) -> PipelineResult<()> {
        fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))
    }

    /// Overwrite the checkpoint with `model` and its metadata.
    ///
    /// If any write fails the previous checkpoint is left as it was.
    /// The old metadata is removed before the new weights are moved in,
    /// so a metadata file never sits next to weights it does not describe.
    pub fn save<B: Backend>(&self, model: &ClassifierAdapter<B>, meta: &CheckpointMeta) -> PipelineResult<()> {
        self.ensure_dir()?;
        let ext = <CompactRecorder as FileRecorder<B>>::file_extension();

        // ── Stage both files ─────────────────────────────────────────────────
        let staged_weights = self.dir.join(self.staging_name());
        CompactRecorder::new()
            .record(model.clone().into_record(), staged_weights.clone())
            .map_err(|e| io_error(&staged_weights, e))?;
        let staged_meta = self.dir.join(format!("{}.json", self.staging_name()));
        self.write_json(&staged_meta, meta)?;

        // ── Swap them in ─────────────────────────────────────────────────────
        let meta_path = self.meta_path();
        match fs::remove_file(&meta_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(&meta_path, e)),
        }
        let weights = self.weights_path();
        let from    = staged_weights.with_extension(ext);
        let to      = weights.with_extension(ext);
        fs::rename(&from, &to).map_err(|e| io_error(&to, e))?;
        fs::rename(&staged_meta, &meta_path).map_err(|e| io_error(&meta_path, e))?;

        tracing::debug!(
            "Saved checkpoint '{}' (epoch {}, val_loss={:.4})",
            weights.display(), meta.epoch, meta.val_loss,
        );
        Ok(())
    }

    pub fn load_meta(&self) -> PipelineResult<CheckpointMeta> {
        self.read_json(&self.meta_path())
    }

    /// Rebuild the saved architecture on `B` and load the weights into it.
    pub fn load_model<B: Backend>(&self, device: &B::Device) -> PipelineResult<(ClassifierAdapter<B>, CheckpointMeta)> {
        let meta    = self.load_meta()?;
        let weights = self.weights_path();

        let record = CompactRecorder::new()
            .load(weights.clone(), device)
            .map_err(|e| io_error(&weights, e))?;
        let model = meta.model.init::<B>(device).load_record(record);

        tracing::info!(
            "Loaded {} checkpoint from epoch {} (val_loss={:.4})",
            meta.model.label(), meta.epoch, meta.val_loss,
        );
        Ok((model, meta))
    }

    pub fn save_run_config<T: Serialize>(&self, config: &T) -> PipelineResult<()> {
        self.ensure_dir()?;
        self.write_json(&self.dir.join(RUN_CONFIG_FILE), config)
    }

    pub fn save_report<T: Serialize>(&self, report: &T) -> PipelineResult<()> {
        self.ensure_dir()?;
        self.write_json(&self.dir.join(REPORT_FILE), report)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> PipelineResult<()> {
        let json = serde_json::to_string_pretty(value).map_err(|e| io_error(path, e))?;
        fs::write(path, json).map_err(|e| io_error(path, e))
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> PipelineResult<T> {
        let json = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
        serde_json::from_str(&json).map_err(|e| io_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::PooledClassifierConfig;
    use burn::backend::NdArray;

    type TB = NdArray;

    fn spec() -> ModelSpec {
        ModelSpec::Pooled(
            PooledClassifierConfig::new(10).with_d_model(4).with_hidden(4).with_dropout(0.0),
        )
    }

    fn meta(epoch: usize, val_loss: f64) -> CheckpointMeta {
        CheckpointMeta { model: spec(), epoch, val_loss, metrics: ClassificationMetrics::default() }
    }

    #[test]
    fn test_save_then_load_restores_weights() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mgr    = CheckpointManager::new(dir.path(), "best_model");
        assert!(!mgr.exists());

        let model = spec().init::<TB>(&device);
        mgr.save(&model, &meta(2, 0.5)).unwrap();
        assert!(mgr.exists());

        let (loaded, m) = mgr.load_model::<TB>(&device).unwrap();
        assert_eq!(m.epoch, 2);

        let ids  = Tensor::<TB, 1, Int>::from_ints([1, 4, 7], &device).reshape([1, 3]);
        let mask = Tensor::<TB, 2, Int>::ones([1, 3], &device);
        let a = model.forward(ids.clone(), mask.clone());
        let b = loaded.forward(ids, mask);
        // Half-precision storage
        let diff: f32 = (a - b).abs().max().into_scalar().elem::<f32>();
        assert!(diff < 1e-2, "weights drifted by {diff}");
    }

    #[test]
    fn test_save_overwrites_previous_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mgr    = CheckpointManager::new(dir.path(), "best_model");
        let model  = spec().init::<TB>(&device);

        mgr.save(&model, &meta(1, 0.9)).unwrap();
        mgr.save(&model, &meta(3, 0.7)).unwrap();

        let m = mgr.load_meta().unwrap();
        assert_eq!(m.epoch, 3);
        assert!((m.val_loss - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_failed_save_keeps_previous_checkpoint() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mgr    = CheckpointManager::new(dir.path(), "best_model");
        let model  = spec().init::<TB>(&device);
        mgr.save(&model, &meta(1, 0.9)).unwrap();

        // The staged metadata cannot be written over a directory
        fs::create_dir(dir.path().join("best_model_staging.json")).unwrap();
        let err = mgr.save(&model, &meta(3, 0.7)).unwrap_err();
        assert!(matches!(err, PipelineError::CheckpointIo { .. }));

        let (_, m) = mgr.load_model::<TB>(&device).unwrap();
        assert_eq!(m.epoch, 1);
        assert!((m.val_loss - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_save_leaves_no_staging_files() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), "best_model");
        mgr.save(&spec().init::<TB>(&Default::default()), &meta(1, 0.5)).unwrap();

        let mut names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["best_model.json", "best_model.mpk"]);
    }

    #[test]
    fn test_missing_checkpoint_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = CheckpointManager::new(dir.path(), "nothing_here");
        match mgr.load_model::<TB>(&Default::default()) {
            Err(PipelineError::CheckpointIo { path, .. }) => assert!(path.ends_with("nothing_here.json")),
            other => panic!("expected CheckpointIo, got {:?}", other.map(|(_, m)| m)),
        }
    }

    #[test]
    fn test_unwritable_directory_reports_path() {
        let dir  = tempfile::tempdir().unwrap();
        // A regular file where the checkpoint directory should be
        let file = dir.path().join("occupied");
        fs::write(&file, b"x").unwrap();

        let mgr = CheckpointManager::new(&file, "best_model");
        let err = mgr.save(&spec().init::<TB>(&Default::default()), &meta(1, 1.0)).unwrap_err();
        assert!(matches!(err, PipelineError::CheckpointIo { .. }));
    }
}
