// ============================================================
// Layer 2 — DistillUseCase
// ============================================================
// Trains a student against a teacher fine-tuned earlier:
//
//   Step 1: Load the teacher's tokenizer + checkpoint (read-only)
//   Step 2: Prepare the corpus with the teacher's vocabulary
//   Step 3: Build the student from its ModelSpec
//   Step 4: Run the distillation loop
//
// Teacher and student must share token ids, so the student's run
// directory receives a copy of the teacher's tokenizer.json.
//
// The student's run directory must differ from the teacher's:
// the run writes its checkpoint, tokenizer, metrics.csv and
// results.json there, and the teacher stays read-only.

use std::{fs, path::{Path, PathBuf}};

use anyhow::{bail, Context, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::application::setup::{prepare_corpus, staged, ArchitectureSettings, CorpusSettings};
use crate::error::{PipelineError, PipelineResult};
use crate::infra::{checkpoint::CheckpointManager, tokenizer_store::TokenizerStore};
use crate::ml::{
    adapter::FrozenTeacher,
    config::DistillConfig,
    controller::run_distillation,
    report::TrainingReport,
    ComputeBackend, ComputeDevice, TrainBackend,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistillSettings {
    pub corpus:       CorpusSettings,
    /// Student architecture
    pub architecture: ArchitectureSettings,
    /// Run directory of the fine-tuned teacher
    pub teacher_dir:  PathBuf,
    pub teacher_name: String,
    pub config:       DistillConfig,
}

pub struct DistillUseCase {
    settings: DistillSettings,
}

impl DistillUseCase {
    pub fn new(settings: DistillSettings) -> Self {
        Self { settings }
    }

    pub fn execute(&self) -> Result<TrainingReport> {
        let s   = &self.settings;
        let run = &s.config.run;
        ensure_separate_run_dir(&s.teacher_dir, &run.checkpoint_dir)
            .map_err(|e| staged(e, "distillation"))?;

        let mut rng = StdRng::seed_from_u64(run.seed);
        let device  = ComputeDevice::default();
        tracing::info!("Using device: {:?}", device);

        // ── Step 1: teacher ──────────────────────────────────────────────────
        let tokenizer = TokenizerStore::new(&s.teacher_dir)
            .load()
            .with_context(|| format!("Cannot load the teacher tokenizer from '{}'", s.teacher_dir.display()))?;
        let (teacher_model, meta) = CheckpointManager::new(&s.teacher_dir, &s.teacher_name)
            .load_model::<ComputeBackend>(&device)
            .with_context(|| {
                format!(
                    "Cannot load teacher '{}' from '{}'. Have you run 'finetune' first?",
                    s.teacher_name, s.teacher_dir.display()
                )
            })?;
        if let Some(limit) = meta.model.max_seq_len() {
            if limit < run.max_seq_len {
                bail!("max_seq_len {} exceeds the teacher's limit of {}", run.max_seq_len, limit);
            }
        }
        tracing::info!(
            "Teacher: {} model from epoch {} (val_loss={:.4}, val_f1={:.3})",
            meta.model.label(), meta.epoch, meta.val_loss, meta.metrics.f1,
        );
        let teacher = FrozenTeacher::<TrainBackend>::new(teacher_model);

        // ── Step 2: corpus ───────────────────────────────────────────────────
        let prepared = prepare_corpus(&s.corpus, &run.checkpoint_dir, Some(tokenizer), run.max_seq_len, &mut rng)?;
        if prepared.vocab_size > meta.model.vocab_size() {
            bail!(
                "tokenizer has {} entries but the teacher embeds only {}",
                prepared.vocab_size, meta.model.vocab_size()
            );
        }

        // ── Steps 3-4: student ───────────────────────────────────────────────
        let spec    = s.architecture.spec(prepared.vocab_size, run.max_seq_len);
        let student = spec.init_seeded::<TrainBackend, _>(&device, &mut rng);

        run_distillation(teacher, &spec, student, &prepared.splits, &s.config, prepared.pad_id, &device, &mut rng)
            .map_err(|e| staged(e, "distillation"))
    }
}

/// Reject a student run directory that resolves to the teacher's.
fn ensure_separate_run_dir(teacher_dir: &Path, run_dir: &Path) -> PipelineResult<()> {
    let same = match (fs::canonicalize(teacher_dir), fs::canonicalize(run_dir)) {
        (Ok(teacher), Ok(run)) => teacher == run,
        _ => teacher_dir == run_dir,
    };
    if same {
        return Err(PipelineError::config(
            "checkpoint_dir",
            format!(
                "'{}' is the teacher's run directory; choose another --checkpoint-dir for the student",
                run_dir.display()
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::setup::ArchitectureKind;
    use crate::error::Stage;

    fn settings(teacher_dir: &Path, run_dir: &Path) -> DistillSettings {
        let mut config = DistillConfig::default();
        config.run.checkpoint_dir = run_dir.to_path_buf();
        DistillSettings {
            corpus: CorpusSettings { data_dir: teacher_dir.join("data"), lexicon: None, vocab_size: 100 },
            architecture: ArchitectureSettings {
                kind: ArchitectureKind::Pooled,
                d_model: 8, num_heads: 2, num_layers: 1, d_ff: 16, hidden: 8, dropout: 0.0,
            },
            teacher_dir:  teacher_dir.to_path_buf(),
            teacher_name: "best_model".to_string(),
            config,
        }
    }

    #[test]
    fn test_student_cannot_write_into_teacher_dir() {
        let dir = tempfile::tempdir().unwrap();
        let teacher_meta = dir.path().join("best_model.json");
        fs::write(&teacher_meta, "{}").unwrap();

        // Same directory spelled differently
        let err = DistillUseCase::new(settings(dir.path(), &dir.path().join(".")))
            .execute()
            .unwrap_err();

        let cause = err.downcast_ref::<PipelineError>().unwrap();
        assert!(matches!(cause, PipelineError::Configuration { .. }));
        assert_eq!(cause.stage(), Stage::Configuration);
        assert_eq!(fs::read_to_string(&teacher_meta).unwrap(), "{}");
        assert!(!dir.path().join("metrics.csv").exists());
    }

    #[test]
    fn test_separate_run_dir_is_accepted() {
        let teacher = tempfile::tempdir().unwrap();
        let student = tempfile::tempdir().unwrap();
        assert!(ensure_separate_run_dir(teacher.path(), student.path()).is_ok());
        // A run directory that does not exist yet is never the teacher's
        assert!(ensure_separate_run_dir(teacher.path(), &student.path().join("new")).is_ok());
        assert!(ensure_separate_run_dir(teacher.path(), teacher.path()).is_err());
    }
}
