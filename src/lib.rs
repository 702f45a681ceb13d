#![recursion_limit = "256"]

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;
pub mod error;

pub use error::{DataError, PipelineError, PipelineResult, Stage};
pub use ml::controller::{evaluate, run_distillation, run_finetune};
