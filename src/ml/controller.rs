// ============================================================
// Layer 5 — Training Controller
// ============================================================
// Drives the epoch loop for both kinds of run:
//
//   run_finetune      one trainable classifier, plain cross-entropy
//   run_distillation  trainable student + FrozenTeacher,
//                     DistillationLoss (soft + hard)
//
// Per epoch:
//   1. train pass     forward → loss → finite? → backward
//                     → global-norm clip → optimiser step
//   2. validation     model.valid() on the inner backend, no graph
//   3. scheduler      PlateauScheduler sees the monitored val loss
//   4. decision       TrainingState::advance → checkpoint / stop
//
// The monitored loss is the objective being minimised: CE for
// fine-tuning, the blended loss for distillation (hard CE is
// reported next to it).
//
// After the loop the best checkpoint is reloaded (or the final
// weights are used if none was written) and scored once on test.
//
// Reference: Burn Book §5 (Custom Training Loop)

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use rand::Rng;
use std::sync::Arc;

use crate::data::{
    batcher::{SentimentBatch, SentimentBatcher},
    dataset::{EncodedExample, SentimentDataset},
    pipeline::PreparedSplits,
};
use crate::domain::traits::SplitName;
use crate::error::{DataError, PipelineError, PipelineResult, Stage};
use crate::infra::{
    checkpoint::{CheckpointManager, CheckpointMeta},
    metrics::{MetricsLogger, MetricsRow},
};
use crate::ml::{
    adapter::{ClassifierAdapter, FrozenTeacher, ModelSpec},
    clip::clip_grad_norm,
    config::{DistillConfig, FinetuneConfig, LoopConfig, OptimizerConfig, OptimizerKind},
    loss::{cross_entropy, DistillationLoss},
    metrics::ClassificationMetrics,
    report::{CheckpointFailure, EpochRecord, EvaluationReport, TrainingReport},
    scheduler::PlateauScheduler,
    state::{RunStatus, TrainingState},
};

// ─── Public entry points ─────────────────────────────────────────────────────

/// Fine-tune `model` (built from `spec`) with plain cross-entropy.
pub fn run_finetune<B, R>(
    spec:   &ModelSpec,
    model:  ClassifierAdapter<B>,
    splits: &PreparedSplits,
    config: &FinetuneConfig,
    pad_id: u32,
    device: &B::Device,
    rng:    &mut R,
) -> PipelineResult<TrainingReport>
where
    B: AutodiffBackend,
    R: Rng + ?Sized,
{
    config.validate()?;
    tracing::info!("Fine-tuning {} model ({} parameters)", spec.label(), model.num_params());

    let epoch_loop = EpochLoop::new(spec, &config.run, Objective::CrossEntropy, pad_id, device)?;
    epoch_loop.checkpoints.save_run_config(config)?;
    dispatch(epoch_loop, model, &config.optimizer, splits, rng.gen())
}

/// Train `student` against the soft labels of `teacher`.
pub fn run_distillation<B, R>(
    teacher: FrozenTeacher<B>,
    spec:    &ModelSpec,
    student: ClassifierAdapter<B>,
    splits:  &PreparedSplits,
    config:  &DistillConfig,
    pad_id:  u32,
    device:  &B::Device,
    rng:     &mut R,
) -> PipelineResult<TrainingReport>
where
    B: AutodiffBackend,
    R: Rng + ?Sized,
{
    config.validate()?;
    let loss = config.loss()?;
    tracing::info!(
        "Distilling into {} student ({} parameters): T={}, soft_weight={}, hard_weight={}, teacher trainable={}",
        spec.label(), student.num_params(),
        loss.temperature(), loss.soft_weight(), loss.hard_weight(), teacher.trainable(),
    );

    let objective  = Objective::Distillation { teacher, loss };
    let epoch_loop = EpochLoop::new(spec, &config.run, objective, pad_id, device)?;
    epoch_loop.checkpoints.save_run_config(config)?;
    dispatch(epoch_loop, student, &config.optimizer, splits, rng.gen())
}

/// Score `model` with cross-entropy and classification metrics on `examples`.
pub fn evaluate<B: Backend>(
    model:      &ClassifierAdapter<B>,
    examples:   Vec<EncodedExample>,
    batch_size: usize,
    pad_id:     u32,
    max_len:    usize,
    device:     &B::Device,
) -> PipelineResult<EvaluationReport> {
    if examples.is_empty() {
        return Err(DataError::EmptySplit { split: SplitName::Test.as_str().to_string() }.into());
    }
    let loader = eval_loader::<B>(examples, batch_size.max(1), pad_id, max_len, device);
    let acc = accumulate(model, loader.as_ref(), Stage::Evaluation, 0, |logits, batch| {
        (cross_entropy(logits, batch.labels.clone()), None)
    })?;
    let (loss, _, metrics) = acc.finish();
    Ok(EvaluationReport { loss, metrics })
}

fn dispatch<B: AutodiffBackend>(
    epoch_loop:   EpochLoop<'_, B>,
    model:        ClassifierAdapter<B>,
    optimizer:    &OptimizerConfig,
    splits:       &PreparedSplits,
    shuffle_seed: u64,
) -> PipelineResult<TrainingReport> {
    let lr = optimizer.learning_rate;
    match optimizer.kind {
        OptimizerKind::Adam => {
            let optim = optimizer.adam().init::<B, ClassifierAdapter<B>>();
            epoch_loop.execute(model, optim, lr, splits, shuffle_seed)
        }
        OptimizerKind::AdamW => {
            let optim = optimizer.adamw().init::<B, ClassifierAdapter<B>>();
            epoch_loop.execute(model, optim, lr, splits, shuffle_seed)
        }
    }
}

// ─── Objective ───────────────────────────────────────────────────────────────
enum Objective<B: AutodiffBackend> {
    CrossEntropy,
    Distillation { teacher: FrozenTeacher<B>, loss: DistillationLoss },
}

impl<B: AutodiffBackend> Objective<B> {
    /// (objective, hard CE when it differs from the objective)
    fn train_loss(&self, logits: Tensor<B, 2>, batch: &SentimentBatch<B>) -> (Tensor<B, 1>, Option<Tensor<B, 1>>) {
        match self {
            Objective::CrossEntropy => (cross_entropy(logits, batch.labels.clone()), None),
            Objective::Distillation { teacher, loss } => {
                let teacher_logits = teacher.forward(batch.input_ids.clone(), batch.attention_mask.clone());
                let out = loss.forward(logits, teacher_logits, batch.labels.clone());
                (out.total, Some(out.hard))
            }
        }
    }

    fn eval_loss(
        &self,
        logits: Tensor<B::InnerBackend, 2>,
        batch:  &SentimentBatch<B::InnerBackend>,
    ) -> (Tensor<B::InnerBackend, 1>, Option<Tensor<B::InnerBackend, 1>>) {
        match self {
            Objective::CrossEntropy => (cross_entropy(logits, batch.labels.clone()), None),
            Objective::Distillation { teacher, loss } => {
                let teacher_logits = teacher.forward_inner(batch.input_ids.clone(), batch.attention_mask.clone());
                let out = loss.forward(logits, teacher_logits, batch.labels.clone());
                (out.total, Some(out.hard))
            }
        }
    }
}

// ─── Epoch loop ──────────────────────────────────────────────────────────────
struct EpochLoop<'a, B: AutodiffBackend> {
    spec:        &'a ModelSpec,
    run:         &'a LoopConfig,
    objective:   Objective<B>,
    pad_id:      u32,
    device:      B::Device,
    checkpoints: CheckpointManager,
    logger:      MetricsLogger,
}

impl<'a, B: AutodiffBackend> EpochLoop<'a, B> {
    fn new(
        spec:      &'a ModelSpec,
        run:       &'a LoopConfig,
        objective: Objective<B>,
        pad_id:    u32,
        device:    &B::Device,
    ) -> PipelineResult<Self> {
        if let Some(limit) = spec.max_seq_len() {
            if limit < run.max_seq_len {
                return Err(PipelineError::config(
                    "max_seq_len",
                    format!("{} exceeds the model's positional limit of {limit}", run.max_seq_len),
                ));
            }
        }
        let checkpoints = CheckpointManager::new(&run.checkpoint_dir, &run.checkpoint_name);
        let logger      = MetricsLogger::new(&run.checkpoint_dir)?;
        Ok(Self { spec, run, objective, pad_id, device: device.clone(), checkpoints, logger })
    }

    fn execute<O>(
        self,
        mut model:    ClassifierAdapter<B>,
        mut optim:    O,
        initial_lr:   f64,
        splits:       &PreparedSplits,
        shuffle_seed: u64,
    ) -> PipelineResult<TrainingReport>
    where
        O: Optimizer<ClassifierAdapter<B>, B>,
    {
        for (name, split) in [
            (SplitName::Train, &splits.train),
            (SplitName::Validation, &splits.validation),
            (SplitName::Test, &splits.test),
        ] {
            if split.is_empty() {
                return Err(DataError::EmptySplit { split: name.as_str().to_string() }.into());
            }
        }

        let run = self.run;
        let train_loader = DataLoaderBuilder::new(SentimentBatcher::<B>::new(
                self.device.clone(), self.pad_id, run.max_seq_len,
            ))
            .batch_size(run.batch_size)
            .shuffle(shuffle_seed)
            .num_workers(run.num_workers)
            .build(SentimentDataset::new(splits.train.clone()));
        let val_loader = eval_loader::<B::InnerBackend>(
            splits.validation.clone(), run.batch_size, self.pad_id, run.max_seq_len, &self.device,
        );

        tracing::info!(
            "Training on {} examples, validating on {} (batch_size={}, max_epochs={}, patience={})",
            splits.train.len(), splits.validation.len(), run.batch_size, run.epochs, run.patience,
        );

        let mut state     = TrainingState::new(initial_lr);
        let mut scheduler = PlateauScheduler::new(run.scheduler.clone(), initial_lr);
        let mut train_history       = Vec::new();
        let mut val_history         = Vec::new();
        let mut best_checkpoint     = None;
        let mut checkpoint_failures = Vec::new();

        let stop_reason = loop {
            let epoch = state.epoch + 1;
            let lr    = state.learning_rate;

            // ── Training phase ───────────────────────────────────────────────
            let (trained, train_record) = self.train_epoch(model, &mut optim, train_loader.as_ref(), epoch, lr)?;
            model = trained;

            // ── Validation phase ─────────────────────────────────────────────
            let model_valid = model.valid();
            let (loss, hard_loss, metrics) = accumulate(
                &model_valid, val_loader.as_ref(), Stage::Validation, epoch,
                |logits, batch| self.objective.eval_loss(logits, batch),
            )?.finish();
            let val_record = EpochRecord { epoch, loss, hard_loss, metrics, learning_rate: lr };

            // ── Scheduler + stop/checkpoint decision ─────────────────────────
            state.learning_rate = scheduler.step(val_record.loss);
            let decision = state.advance(val_record.loss, run.epochs, run.patience);

            if decision.checkpoint {
                let meta = CheckpointMeta {
                    model:    self.spec.clone(),
                    epoch,
                    val_loss: val_record.loss,
                    metrics:  val_record.metrics.clone(),
                };
                match self.checkpoints.save(&model_valid, &meta) {
                    Ok(()) => {
                        tracing::info!("New best val_loss={:.4}: checkpoint saved (epoch {})", meta.val_loss, epoch);
                        best_checkpoint = Some(meta);
                    }
                    Err(e) => {
                        tracing::warn!("Epoch {}: checkpoint not saved: {}", epoch, e);
                        checkpoint_failures.push(CheckpointFailure { epoch, reason: e.to_string() });
                    }
                }
            }

            tracing::info!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.1}% | val_f1={:.3} | lr={:.2e}",
                epoch, run.epochs, train_record.loss, val_record.loss,
                val_record.metrics.accuracy * 100.0, val_record.metrics.f1, lr,
            );
            self.log_row(&train_record, "train");
            self.log_row(&val_record, "validation");

            train_history.push(train_record);
            val_history.push(val_record);

            match decision.status {
                RunStatus::Stopped(reason) => break reason,
                RunStatus::Running { patience_counter, .. } if patience_counter > 0 => {
                    tracing::debug!("No improvement for {}/{} epochs", patience_counter, run.patience);
                }
                RunStatus::Running { .. } => {}
            }
        };

        tracing::info!("Stopped after epoch {}: {:?} (best val_loss={:.4})", state.epoch, stop_reason, state.best_val_loss);

        // ── Final test evaluation ────────────────────────────────────────────
        let final_model = match &best_checkpoint {
            Some(_) => match self.checkpoints.load_model::<B::InnerBackend>(&self.device) {
                Ok((best, _)) => best,
                Err(e) => {
                    tracing::warn!("Could not reload best checkpoint, evaluating final weights: {}", e);
                    checkpoint_failures.push(CheckpointFailure { epoch: state.epoch, reason: e.to_string() });
                    model.valid()
                }
            },
            None => model.valid(),
        };

        let test_loader = eval_loader::<B::InnerBackend>(
            splits.test.clone(), run.batch_size, self.pad_id, run.max_seq_len, &self.device,
        );
        let (test_loss, test_hard, test_metrics) = accumulate(
            &final_model, test_loader.as_ref(), Stage::Evaluation, state.epoch,
            |logits, batch| self.objective.eval_loss(logits, batch),
        )?.finish();

        tracing::info!(
            "Test: loss={:.4} | acc={:.1}% | precision={:.3} | recall={:.3} | f1={:.3}",
            test_loss, test_metrics.accuracy * 100.0, test_metrics.precision, test_metrics.recall, test_metrics.f1,
        );
        self.log_row(
            &EpochRecord {
                epoch:         state.epoch,
                loss:          test_loss,
                hard_loss:     test_hard,
                metrics:       test_metrics.clone(),
                learning_rate: state.learning_rate,
            },
            "test",
        );

        let report = TrainingReport {
            model: self.spec.label().to_string(),
            train_history,
            val_history,
            test_loss,
            test_metrics,
            stop_reason,
            best_checkpoint,
            checkpoint_failures,
        };
        if let Err(e) = self.checkpoints.save_report(&report) {
            tracing::warn!("Could not write run report: {}", e);
        }
        Ok(report)
    }

    fn train_epoch<O>(
        &self,
        mut model: ClassifierAdapter<B>,
        optim:     &mut O,
        loader:    &dyn DataLoader<SentimentBatch<B>>,
        epoch:     usize,
        lr:        f64,
    ) -> PipelineResult<(ClassifierAdapter<B>, EpochRecord)>
    where
        O: Optimizer<ClassifierAdapter<B>, B>,
    {
        let mut acc = Accumulator::default();

        for (index, batch) in loader.iter().enumerate() {
            let logits      = model.forward(batch.input_ids.clone(), batch.attention_mask.clone());
            let predictions = predicted_classes(logits.clone().inner());
            let (loss, hard) = self.objective.train_loss(logits, &batch);

            let loss_value = ensure_finite(scalar(loss.clone()), Stage::Training, epoch, index + 1)?;
            let hard_value = hard.map(scalar);

            // Backward pass, global clip, optimiser update
            let grads = GradientsParams::from_grads(loss.backward(), &model);
            let (norm, grads) = clip_grad_norm::<B, _>(&model, grads, self.run.max_grad_norm);
            tracing::debug!("epoch {} batch {}: loss={:.4} grad_norm={:.4}", epoch, index + 1, loss_value, norm);
            model = optim.step(lr, model, grads);

            acc.add(loss_value, hard_value, predictions, &batch.targets);
        }

        let (loss, hard_loss, metrics) = acc.finish();
        Ok((model, EpochRecord { epoch, loss, hard_loss, metrics, learning_rate: lr }))
    }

    fn log_row(&self, record: &EpochRecord, phase: &str) {
        let row = MetricsRow {
            epoch:         record.epoch,
            phase,
            loss:          record.loss,
            hard_loss:     record.hard_loss,
            metrics:       &record.metrics,
            learning_rate: record.learning_rate,
        };
        if let Err(e) = self.logger.log(&row) {
            tracing::warn!("Could not append to '{}': {}", self.logger.csv_path().display(), e);
        }
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Ordered, unshuffled loader for validation and test.
fn eval_loader<B: Backend>(
    examples:   Vec<EncodedExample>,
    batch_size: usize,
    pad_id:     u32,
    max_len:    usize,
    device:     &B::Device,
) -> Arc<dyn DataLoader<SentimentBatch<B>>> {
    DataLoaderBuilder::new(SentimentBatcher::<B>::new(device.clone(), pad_id, max_len))
        .batch_size(batch_size)
        .build(SentimentDataset::new(examples))
}

/// Forward-only pass over `loader`, accumulating loss and predictions.
fn accumulate<B, F>(
    model:   &ClassifierAdapter<B>,
    loader:  &dyn DataLoader<SentimentBatch<B>>,
    stage:   Stage,
    epoch:   usize,
    loss_fn: F,
) -> PipelineResult<Accumulator>
where
    B: Backend,
    F: Fn(Tensor<B, 2>, &SentimentBatch<B>) -> (Tensor<B, 1>, Option<Tensor<B, 1>>),
{
    let mut acc = Accumulator::default();
    for (index, batch) in loader.iter().enumerate() {
        let logits      = model.forward(batch.input_ids.clone(), batch.attention_mask.clone());
        let predictions = predicted_classes(logits.clone());
        let (loss, hard) = loss_fn(logits, &batch);

        let loss_value = ensure_finite(scalar(loss), stage, epoch, index + 1)?;
        acc.add(loss_value, hard.map(scalar), predictions, &batch.targets);
    }
    Ok(acc)
}

/// Example-weighted running sums for one pass.
#[derive(Debug, Default)]
struct Accumulator {
    loss_sum:    f64,
    hard_sum:    Option<f64>,
    seen:        usize,
    predictions: Vec<usize>,
    targets:     Vec<usize>,
}

impl Accumulator {
    fn add(&mut self, loss: f64, hard: Option<f64>, predictions: Vec<usize>, targets: &[usize]) {
        let n = targets.len() as f64;
        self.loss_sum += loss * n;
        if let Some(h) = hard {
            *self.hard_sum.get_or_insert(0.0) += h * n;
        }
        self.seen += targets.len();
        self.predictions.extend(predictions);
        self.targets.extend_from_slice(targets);
    }

    /// (mean loss, mean hard loss, metrics)
    fn finish(self) -> (f64, Option<f64>, ClassificationMetrics) {
        let n = self.seen.max(1) as f64;
        (
            self.loss_sum / n,
            self.hard_sum.map(|h| h / n),
            ClassificationMetrics::compute(&self.predictions, &self.targets),
        )
    }
}

fn scalar<B: Backend>(t: Tensor<B, 1>) -> f64 {
    t.into_scalar().elem::<f64>()
}

fn predicted_classes<B: Backend>(logits: Tensor<B, 2>) -> Vec<usize> {
    // argmax(1) returns [batch, 1]
    logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .into_data()
        .iter::<i64>()
        .map(|c| c as usize)
        .collect()
}

fn ensure_finite(value: f64, stage: Stage, epoch: usize, batch: usize) -> PipelineResult<f64> {
    if value.is_finite() {
        return Ok(value);
    }
    tracing::error!("Non-finite loss {} during {} (epoch {}, batch {})", value, stage, epoch, batch);
    Err(PipelineError::NumericInstability { stage, epoch, batch, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::example::Sentiment;
    use crate::ml::model::PooledClassifierConfig;
    use crate::ml::state::StopReason;
    use burn::backend::{Autodiff, NdArray};
    use rand::{rngs::StdRng, SeedableRng};
    use std::fs;

    type TB = Autodiff<NdArray>;

    const VOCAB: usize = 12;

    /// Class c is signalled by token 5 + c
    fn examples(per_class: usize) -> Vec<EncodedExample> {
        let mut out = Vec::new();
        for i in 0..per_class {
            for label in Sentiment::ALL {
                let cue = 5 + label.index() as u32;
                let len = 2 + i % 3;
                let mut ids = vec![2, cue];
                ids.extend(std::iter::repeat(cue).take(len - 2));
                out.push(EncodedExample { attention_mask: vec![1; ids.len()], input_ids: ids, label });
            }
        }
        out
    }

    fn splits() -> PreparedSplits {
        PreparedSplits { train: examples(6), validation: examples(2), test: examples(2) }
    }

    fn spec() -> ModelSpec {
        ModelSpec::Pooled(
            PooledClassifierConfig::new(VOCAB).with_d_model(8).with_hidden(8).with_dropout(0.0),
        )
    }

    fn loop_config(dir: &std::path::Path, epochs: usize) -> LoopConfig {
        LoopConfig {
            epochs,
            batch_size: 4,
            patience: 3,
            checkpoint_dir: dir.to_path_buf(),
            max_seq_len: 8,
            ..LoopConfig::default()
        }
    }

    #[test]
    fn test_finetune_runs_and_persists_outputs() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(7);

        let config = FinetuneConfig {
            run: loop_config(dir.path(), 3),
            optimizer: OptimizerConfig { learning_rate: 1e-2, ..OptimizerConfig::default() },
        };
        let model  = spec().init_seeded::<TB, _>(&device, &mut rng);
        let report = run_finetune(&spec(), model, &splits(), &config, 0, &device, &mut rng).unwrap();

        assert!(report.epochs_run() >= 1 && report.epochs_run() <= 3);
        assert_eq!(report.train_history.len(), report.val_history.len());
        assert!(report.val_history.iter().all(|r| r.hard_loss.is_none()));
        assert_eq!(report.test_metrics.support(), 6);
        assert!(report.test_loss.is_finite());
        assert!(report.checkpoint_failures.is_empty());

        // Epoch 1 always improves on +∞
        let best = report.best_checkpoint.as_ref().unwrap();
        let min_val = report.val_history.iter().map(|r| r.loss).fold(f64::INFINITY, f64::min);
        assert!((best.val_loss - min_val).abs() < 1e-12);

        for file in ["best_model.json", "run_config.json", "results.json", "metrics.csv"] {
            assert!(dir.path().join(file).exists(), "{file} missing");
        }
        if report.epochs_run() == 3 {
            assert_eq!(report.stop_reason, StopReason::MaxEpochs);
        }
    }

    #[test]
    fn test_checkpoint_write_failure_does_not_stop_training() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(9);
        // A directory where the weights file has to go
        fs::create_dir(dir.path().join("best_model.mpk")).unwrap();

        let config = FinetuneConfig { run: loop_config(dir.path(), 2), ..FinetuneConfig::default() };
        let model  = spec().init_seeded::<TB, _>(&device, &mut rng);
        let report = run_finetune(&spec(), model, &splits(), &config, 0, &device, &mut rng).unwrap();

        assert_eq!(report.epochs_run(), 2);
        assert_eq!(report.stop_reason, StopReason::MaxEpochs);
        // Epoch 1 always tries to save; every attempt failed
        assert!(!report.checkpoint_failures.is_empty());
        assert_eq!(report.checkpoint_failures[0].epoch, 1);
        assert!(report.best_checkpoint.is_none());

        // Final weights were scored since nothing could be reloaded
        assert_eq!(report.test_metrics.support(), 6);
        assert!(report.test_loss.is_finite());
        assert!(!dir.path().join("best_model.json").exists());
        assert!(dir.path().join("results.json").exists());
    }

    #[test]
    fn test_distillation_reports_blended_and_hard_loss() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(11);

        let teacher = FrozenTeacher::<TB>::from_trained(spec().init_seeded::<TB, _>(&device, &mut rng));
        let student = spec().init_seeded::<TB, _>(&device, &mut rng);
        let config  = DistillConfig {
            run: loop_config(dir.path(), 2),
            temperature: 2.0,
            soft_weight: 0.7,
            hard_weight: 0.3,
            ..DistillConfig::default()
        };

        let report = run_distillation(teacher, &spec(), student, &splits(), &config, 0, &device, &mut rng).unwrap();
        assert!(report.train_history.iter().all(|r| r.hard_loss.is_some()));
        assert!(report.val_history.iter().all(|r| r.hard_loss.is_some() && r.loss.is_finite()));
    }

    #[test]
    fn test_non_finite_loss_aborts_with_location() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(3);

        let teacher = FrozenTeacher::<TB>::from_trained(spec().init_seeded::<TB, _>(&device, &mut rng));
        let student = spec().init_seeded::<TB, _>(&device, &mut rng);
        // Dividing f32 logits by this temperature overflows to ±∞
        let config = DistillConfig {
            run: loop_config(dir.path(), 2),
            temperature: 1e-300,
            ..DistillConfig::default()
        };

        match run_distillation(teacher, &spec(), student, &splits(), &config, 0, &device, &mut rng) {
            Err(PipelineError::NumericInstability { stage, epoch, batch, .. }) => {
                assert_eq!(stage, Stage::Training);
                assert_eq!((epoch, batch), (1, 1));
            }
            other => panic!("expected NumericInstability, got {:?}", other.map(|r| r.epochs_run())),
        }
    }

    #[test]
    fn test_empty_validation_split_is_data_error() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(1);
        let mut data = splits();
        data.validation.clear();

        let config = FinetuneConfig { run: loop_config(dir.path(), 1), ..FinetuneConfig::default() };
        let model  = spec().init_seeded::<TB, _>(&device, &mut rng);
        let err    = run_finetune(&spec(), model, &data, &config, 0, &device, &mut rng).unwrap_err();
        assert!(matches!(err, PipelineError::Data(DataError::EmptySplit { .. })));
    }

    #[test]
    fn test_invalid_configuration_rejected_before_training() {
        let dir    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(1);

        let mut config = FinetuneConfig { run: loop_config(dir.path(), 1), ..FinetuneConfig::default() };
        config.run.patience = 0;
        let model = spec().init_seeded::<TB, _>(&device, &mut rng);
        let err   = run_finetune(&spec(), model, &splits(), &config, 0, &device, &mut rng).unwrap_err();
        assert!(matches!(err, PipelineError::Configuration { .. }));
        assert!(!dir.path().join("metrics.csv").exists());
    }

    #[test]
    fn test_evaluate_scores_every_example() {
        let device = Default::default();
        let mut rng = StdRng::seed_from_u64(5);
        let model = spec().init_seeded::<NdArray, _>(&device, &mut rng);

        let report = evaluate(&model, examples(3), 4, 0, 8, &device).unwrap();
        assert_eq!(report.metrics.support(), 9);
        assert!(report.loss.is_finite() && report.loss > 0.0);
    }

    #[test]
    fn test_ensure_finite() {
        assert_eq!(ensure_finite(0.5, Stage::Training, 1, 1).unwrap(), 0.5);
        assert!(ensure_finite(f64::INFINITY, Stage::Validation, 2, 3).is_err());
    }
}
