//! Training objectives.
//!
//! * [`cross_entropy`] — plain hard-label loss used for fine-tuning.
//! * [`DistillationLoss`] — temperature-scaled soft-label matching against a
//!   teacher, blended with the hard-label loss:
//!
//! ```text
//! soft  = T² · mean_i [ −Σ_c softmax(t_i / T)_c · log_softmax(s_i / T)_c ]
//! hard  = CE(s, y)
//! total = soft_weight · soft + hard_weight · hard
//! ```
//!
//! The weights are independent; they are not required to sum to one.

use burn::prelude::*;

use crate::error::{PipelineError, PipelineResult};

/// Row-wise log-softmax over the class dimension, shifted by the row max
/// so that `exp` never overflows.
pub fn stable_log_softmax<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 2> {
    let shifted  = logits.clone() - logits.detach().max_dim(1);
    let log_norm = shifted.clone().exp().sum_dim(1).log();
    shifted - log_norm
}

/// Mean cross-entropy between raw logits and integer class labels.
pub fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, labels: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    stable_log_softmax(logits)
        .gather(1, labels.unsqueeze_dim::<2>(1))
        .mean()
        .neg()
}

/// The three loss tensors produced for one batch.
pub struct DistillationOutput<B: Backend> {
    pub total: Tensor<B, 1>,
    /// `None` when `soft_weight == 0`; the teacher term is skipped entirely.
    pub soft: Option<Tensor<B, 1>>,
    pub hard: Tensor<B, 1>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistillationLoss {
    temperature: f64,
    soft_weight: f64,
    hard_weight: f64,
}

impl DistillationLoss {
    /// Fails with a configuration error if `temperature <= 0` or a weight is negative.
    pub fn new(temperature: f64, soft_weight: f64, hard_weight: f64) -> PipelineResult<Self> {
        if !(temperature.is_finite() && temperature > 0.0) {
            return Err(PipelineError::config(
                "temperature",
                format!("must be a positive finite number, got {temperature}"),
            ));
        }
        for (name, w) in [("soft_weight", soft_weight), ("hard_weight", hard_weight)] {
            if !(w.is_finite() && w >= 0.0) {
                return Err(PipelineError::config(name, format!("must be non-negative, got {w}")));
            }
        }
        Ok(Self { temperature, soft_weight, hard_weight })
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn soft_weight(&self) -> f64 {
        self.soft_weight
    }

    pub fn hard_weight(&self) -> f64 {
        self.hard_weight
    }

    /// Soft-label term alone, already multiplied by `T²`.
    ///
    /// Teacher logits are detached here regardless of where they came from.
    pub fn soft_loss<B: Backend>(&self, student: Tensor<B, 2>, teacher: Tensor<B, 2>) -> Tensor<B, 1> {
        let t = self.temperature;
        let teacher_probs    = stable_log_softmax(teacher.detach() / t).exp();
        let student_log_prob = stable_log_softmax(student / t);

        (teacher_probs * student_log_prob)
            .sum_dim(1)
            .mean()
            .neg()
            * (t * t)
    }

    pub fn forward<B: Backend>(
        &self,
        student: Tensor<B, 2>,
        teacher: Tensor<B, 2>,
        labels:  Tensor<B, 1, Int>,
    ) -> DistillationOutput<B> {
        let hard = cross_entropy(student.clone(), labels);

        if self.soft_weight == 0.0 {
            return DistillationOutput {
                total: hard.clone() * self.hard_weight,
                soft:  None,
                hard,
            };
        }

        let soft  = self.soft_loss(student, teacher);
        let total = soft.clone() * self.soft_weight + hard.clone() * self.hard_weight;
        DistillationOutput { total, soft: Some(soft), hard }
    }
}
