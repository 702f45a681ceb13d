// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application).
//
//   finetune  — train a classifier with cross-entropy
//   distill   — train a student against a fine-tuned teacher
//   evaluate  — score a saved checkpoint on the test split
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, DistillArgs, EvaluateArgs, FinetuneArgs};

use crate::ml::{metrics::ClassificationMetrics, report::TrainingReport};
use crate::domain::example::Sentiment;

#[derive(Parser, Debug)]
#[command(
    name = "sentiment-distill",
    version,
    about = "Fine-tune a sentiment classifier and distil it into a smaller student."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case; this layer never computes.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Finetune(args) => run_finetune(args),
            Commands::Distill(args)  => run_distill(args),
            Commands::Evaluate(args) => run_evaluate(args),
        }
    }
}

fn run_finetune(args: FinetuneArgs) -> Result<()> {
    use crate::application::finetune_use_case::FinetuneUseCase;

    tracing::info!("Fine-tuning on corpus in: {}", args.corpus.data_dir.display());
    let report = FinetuneUseCase::new(args.into()).execute()?;
    print_report(&report);
    Ok(())
}

fn run_distill(args: DistillArgs) -> Result<()> {
    use crate::application::distill_use_case::DistillUseCase;

    tracing::info!("Distilling teacher from: {}", args.teacher_dir.display());
    let report = DistillUseCase::new(args.into()).execute()?;
    print_report(&report);
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let report = EvaluateUseCase::new(args.into()).execute()?;
    println!("\nTest loss: {:.4}", report.loss);
    print_metrics(&report.metrics);
    Ok(())
}

fn print_report(report: &TrainingReport) {
    println!(
        "\nStopped after {} epoch(s): {:?}",
        report.epochs_run(), report.stop_reason,
    );
    match &report.best_checkpoint {
        Some(best) => println!("Best checkpoint: epoch {} (val_loss={:.4})", best.epoch, best.val_loss),
        None       => println!("No checkpoint was saved; final weights were evaluated."),
    }
    for failure in &report.checkpoint_failures {
        println!("Checkpoint failure at epoch {}: {}", failure.epoch, failure.reason);
    }
    println!("Test loss: {:.4}", report.test_loss);
    print_metrics(&report.test_metrics);
}

fn print_metrics(m: &ClassificationMetrics) {
    println!(
        "accuracy={:.4}  precision={:.4}  recall={:.4}  f1={:.4}",
        m.accuracy, m.precision, m.recall, m.f1,
    );
    println!("\nConfusion matrix (rows = true, columns = predicted):");
    print!("{:>10}", "");
    for s in Sentiment::ALL {
        print!("{:>10}", s.name());
    }
    println!();
    for s in Sentiment::ALL {
        print!("{:>10}", s.name());
        for count in m.confusion[s.index()] {
            print!("{:>10}", count);
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::distill_use_case::DistillSettings;
    use crate::ml::config::OptimizerKind;

    #[test]
    fn test_distill_flags_reach_the_config() {
        let cli = Cli::try_parse_from([
            "sentiment-distill", "distill",
            "--teacher-dir", "runs/teacher",
            "--arch", "pooled",
            "--temperature", "4",
            "--soft-weight", "0.9",
            "--hard-weight", "0.1",
            "--optimizer", "adamw",
            "--patience", "2",
        ])
        .unwrap();

        let Commands::Distill(args) = cli.command else { panic!("wrong subcommand") };
        let settings: DistillSettings = args.into();
        assert_eq!(settings.teacher_name, "best_model");
        assert!((settings.config.temperature - 4.0).abs() < 1e-12);
        assert_eq!(settings.config.optimizer.kind, OptimizerKind::AdamW);
        assert_eq!(settings.config.run.patience, 2);
        assert_eq!(settings.config.run.max_seq_len, 256);
        assert!(settings.config.validate().is_ok());
    }

    #[test]
    fn test_finetune_defaults_match_library_defaults() {
        use crate::application::finetune_use_case::FinetuneSettings;
        use crate::ml::config::FinetuneConfig;

        let cli = Cli::try_parse_from(["sentiment-distill", "finetune"]).unwrap();
        let Commands::Finetune(args) = cli.command else { panic!("wrong subcommand") };
        let settings: FinetuneSettings = args.into();
        let defaults = FinetuneConfig::default();

        assert_eq!(settings.config.run.epochs, defaults.run.epochs);
        assert_eq!(settings.config.run.batch_size, defaults.run.batch_size);
        assert!((settings.config.optimizer.learning_rate - defaults.optimizer.learning_rate).abs() < 1e-15);
        assert_eq!(settings.config.run.scheduler.patience, 2);
    }
}
