// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Three subcommands: `finetune`, `distill` and `evaluate`.
// Flag groups shared between them are flattened in with
// #[command(flatten)].
//
// Each Args struct converts into its application-layer settings
// with From, so Layer 2 never sees clap types.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{
    distill_use_case::DistillSettings,
    evaluate_use_case::EvaluateSettings,
    finetune_use_case::FinetuneSettings,
    setup::{ArchitectureKind, ArchitectureSettings, CorpusSettings},
};
use crate::ml::{
    config::{DistillConfig, FinetuneConfig, LoopConfig, OptimizerConfig, OptimizerKind},
    scheduler::PlateauConfig,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fine-tune a classifier with cross-entropy (produces a teacher)
    Finetune(FinetuneArgs),

    /// Distil a fine-tuned teacher into a smaller student
    Distill(DistillArgs),

    /// Score a saved checkpoint on the test split
    Evaluate(EvaluateArgs),
}

// ─── Shared flag groups ──────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct CorpusArgs {
    /// Directory with train.jsonl, test.jsonl and optionally validation.jsonl
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// Lexicon of multi-syllable words; enables word segmentation
    #[arg(long)]
    pub lexicon: Option<PathBuf>,

    /// Vocabulary size when a new tokenizer has to be built
    #[arg(long, default_value_t = 30000)]
    pub vocab_size: usize,
}

impl From<CorpusArgs> for CorpusSettings {
    fn from(a: CorpusArgs) -> Self {
        CorpusSettings { data_dir: a.data_dir, lexicon: a.lexicon, vocab_size: a.vocab_size }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum ArchArg {
    /// Encoder-only transformer with first-token pooling
    Transformer,
    /// Mean-pooled embeddings with an MLP head
    Pooled,
}

#[derive(Args, Debug)]
pub struct ArchArgs {
    #[arg(long, value_enum, default_value_t = ArchArg::Transformer)]
    pub arch: ArchArg,

    /// Hidden dimension of token embeddings
    #[arg(long, default_value_t = 256)]
    pub d_model: usize,

    /// d_model must be divisible by num_heads
    #[arg(long, default_value_t = 8)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 6)]
    pub num_layers: usize,

    /// Inner dimension of the transformer feed-forward network
    #[arg(long, default_value_t = 1024)]
    pub d_ff: usize,

    /// Hidden layer width of the pooled classifier
    #[arg(long, default_value_t = 128)]
    pub hidden: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}

impl From<ArchArgs> for ArchitectureSettings {
    fn from(a: ArchArgs) -> Self {
        ArchitectureSettings {
            kind: match a.arch {
                ArchArg::Transformer => ArchitectureKind::Transformer,
                ArchArg::Pooled      => ArchitectureKind::Pooled,
            },
            d_model:    a.d_model,
            num_heads:  a.num_heads,
            num_layers: a.num_layers,
            d_ff:       a.d_ff,
            hidden:     a.hidden,
            dropout:    a.dropout,
        }
    }
}

#[derive(Args, Debug)]
pub struct LoopArgs {
    /// Output directory: checkpoint, tokenizer, metrics.csv, results.json
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, default_value = "best_model")]
    pub checkpoint_name: String,

    #[arg(long, default_value_t = 10)]
    pub epochs: usize,

    #[arg(long, default_value_t = 8)]
    pub batch_size: usize,

    /// Non-improving epochs tolerated before stopping early
    #[arg(long, default_value_t = 5)]
    pub patience: usize,

    /// Ceiling on the global gradient norm
    #[arg(long, default_value_t = 1.0)]
    pub max_grad_norm: f64,

    /// Learning-rate multiplier on a validation plateau
    #[arg(long, default_value_t = 0.1)]
    pub lr_factor: f64,

    /// Bad epochs before the learning rate is reduced
    #[arg(long, default_value_t = 2)]
    pub lr_patience: usize,

    #[arg(long, default_value_t = 256)]
    pub max_seq_len: usize,

    #[arg(long, default_value_t = 1)]
    pub num_workers: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<LoopArgs> for LoopConfig {
    fn from(a: LoopArgs) -> Self {
        LoopConfig {
            epochs:          a.epochs,
            batch_size:      a.batch_size,
            patience:        a.patience,
            max_grad_norm:   a.max_grad_norm,
            scheduler:       PlateauConfig {
                factor:   a.lr_factor,
                patience: a.lr_patience,
                ..PlateauConfig::default()
            },
            checkpoint_dir:  a.checkpoint_dir,
            checkpoint_name: a.checkpoint_name,
            num_workers:     a.num_workers,
            seed:            a.seed,
            max_seq_len:     a.max_seq_len,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum OptimizerArg {
    Adam,
    Adamw,
}

#[derive(Args, Debug)]
pub struct OptimizerArgs {
    #[arg(long, value_enum, default_value_t = OptimizerArg::Adam)]
    pub optimizer: OptimizerArg,

    #[arg(long, default_value_t = 3e-4)]
    pub lr: f64,

    #[arg(long, default_value_t = 1e-3)]
    pub weight_decay: f64,

    #[arg(long, default_value_t = 0.9)]
    pub beta_1: f32,

    #[arg(long, default_value_t = 0.98)]
    pub beta_2: f32,

    #[arg(long, default_value_t = 1e-8)]
    pub epsilon: f32,
}

impl From<OptimizerArgs> for OptimizerConfig {
    fn from(a: OptimizerArgs) -> Self {
        OptimizerConfig {
            kind: match a.optimizer {
                OptimizerArg::Adam  => OptimizerKind::Adam,
                OptimizerArg::Adamw => OptimizerKind::AdamW,
            },
            learning_rate: a.lr,
            weight_decay:  a.weight_decay,
            beta_1:        a.beta_1,
            beta_2:        a.beta_2,
            epsilon:       a.epsilon,
        }
    }
}

// ─── Subcommands ─────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct FinetuneArgs {
    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub arch: ArchArgs,

    #[command(flatten)]
    pub run: LoopArgs,

    #[command(flatten)]
    pub optim: OptimizerArgs,
}

impl From<FinetuneArgs> for FinetuneSettings {
    fn from(a: FinetuneArgs) -> Self {
        FinetuneSettings {
            corpus:       a.corpus.into(),
            architecture: a.arch.into(),
            config:       FinetuneConfig { run: a.run.into(), optimizer: a.optim.into() },
        }
    }
}

#[derive(Args, Debug)]
pub struct DistillArgs {
    /// Run directory of the fine-tuned teacher; must differ from --checkpoint-dir
    #[arg(long)]
    pub teacher_dir: PathBuf,

    #[arg(long, default_value = "best_model")]
    pub teacher_name: String,

    /// Softmax temperature for the soft-label term
    #[arg(long, default_value_t = 2.0)]
    pub temperature: f64,

    /// Weight of the teacher-matching loss
    #[arg(long, default_value_t = 0.5)]
    pub soft_weight: f64,

    /// Weight of the true-label loss
    #[arg(long, default_value_t = 0.5)]
    pub hard_weight: f64,

    #[command(flatten)]
    pub corpus: CorpusArgs,

    #[command(flatten)]
    pub arch: ArchArgs,

    #[command(flatten)]
    pub run: LoopArgs,

    #[command(flatten)]
    pub optim: OptimizerArgs,
}

impl From<DistillArgs> for DistillSettings {
    fn from(a: DistillArgs) -> Self {
        DistillSettings {
            corpus:       a.corpus.into(),
            architecture: a.arch.into(),
            teacher_dir:  a.teacher_dir,
            teacher_name: a.teacher_name,
            config: DistillConfig {
                run:         a.run.into(),
                optimizer:   a.optim.into(),
                temperature: a.temperature,
                soft_weight: a.soft_weight,
                hard_weight: a.hard_weight,
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Run directory holding the checkpoint and its tokenizer
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: PathBuf,

    #[arg(long, default_value = "best_model")]
    pub checkpoint_name: String,

    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    #[arg(long)]
    pub lexicon: Option<PathBuf>,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 256)]
    pub max_seq_len: usize,
}

impl From<EvaluateArgs> for EvaluateSettings {
    fn from(a: EvaluateArgs) -> Self {
        EvaluateSettings {
            data_dir:        a.data_dir,
            lexicon:         a.lexicon,
            checkpoint_dir:  a.checkpoint_dir,
            checkpoint_name: a.checkpoint_name,
            batch_size:      a.batch_size,
            max_seq_len:     a.max_seq_len,
        }
    }
}
