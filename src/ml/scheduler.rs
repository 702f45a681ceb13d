// ============================================================
// Layer 5 — Plateau Learning-Rate Scheduler
// ============================================================
// Watches the monitored validation loss once per epoch and cuts
// the learning rate when it stops improving:
//
//   better    ⇔  loss < best · (1 − threshold)
//   bad_epochs > patience  →  lr ← max(lr · factor, min_lr), bad_epochs ← 0
//
// Its counter is separate from the early-stopping counter in
// TrainingState; the two may disagree about "improvement"
// because of the relative threshold.

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateauConfig {
    /// Multiplier applied to the learning rate on a plateau
    pub factor: f64,
    /// Bad epochs tolerated before a reduction
    pub patience: usize,
    /// Relative improvement required to count as "better"
    pub threshold: f64,
    pub min_lr: f64,
}

impl Default for PlateauConfig {
    fn default() -> Self {
        Self { factor: 0.1, patience: 2, threshold: 1e-4, min_lr: 0.0 }
    }
}

impl PlateauConfig {
    pub fn validate(&self) -> PipelineResult<()> {
        if !(self.factor > 0.0 && self.factor < 1.0) {
            return Err(PipelineError::config(
                "scheduler.factor",
                format!("must lie in (0, 1), got {}", self.factor),
            ));
        }
        if !(self.threshold >= 0.0 && self.threshold.is_finite()) {
            return Err(PipelineError::config(
                "scheduler.threshold",
                format!("must be non-negative, got {}", self.threshold),
            ));
        }
        if self.min_lr < 0.0 {
            return Err(PipelineError::config("scheduler.min_lr", "must be non-negative"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PlateauScheduler {
    config:     PlateauConfig,
    lr:         f64,
    best:       f64,
    bad_epochs: usize,
}

impl PlateauScheduler {
    pub fn new(config: PlateauConfig, initial_lr: f64) -> Self {
        Self { config, lr: initial_lr, best: f64::INFINITY, bad_epochs: 0 }
    }

    /// Feed one epoch's monitored loss; returns the learning rate for the next epoch.
    pub fn step(&mut self, val_loss: f64) -> f64 {
        if val_loss < self.best * (1.0 - self.config.threshold) {
            self.best       = val_loss;
            self.bad_epochs = 0;
        } else {
            self.bad_epochs += 1;
        }

        if self.bad_epochs > self.config.patience {
            let reduced = (self.lr * self.config.factor).max(self.config.min_lr);
            if reduced < self.lr {
                tracing::info!("Plateau detected: learning rate {:.3e} → {:.3e}", self.lr, reduced);
                self.lr = reduced;
            }
            self.bad_epochs = 0;
        }

        self.lr
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-12
    }

    #[test]
    fn test_reduces_after_patience_is_exceeded() {
        let mut s = PlateauScheduler::new(PlateauConfig::default(), 1e-3);
        assert!(close(s.step(1.0), 1e-3)); // best
        assert!(close(s.step(1.1), 1e-3)); // bad 1
        assert!(close(s.step(1.2), 1e-3)); // bad 2
        assert!(close(s.step(1.3), 1e-4)); // bad 3 > 2 → cut
        // Counter restarts after a reduction
        assert!(close(s.step(1.3), 1e-4));
        assert!(close(s.step(1.3), 1e-4));
        assert!(close(s.step(1.3), 1e-5));
    }

    #[test]
    fn test_improvement_resets_counter() {
        let mut s = PlateauScheduler::new(PlateauConfig::default(), 1e-3);
        for loss in [1.0, 1.1, 1.1, 0.9, 1.0, 1.0] {
            assert!(close(s.step(loss), 1e-3));
        }
    }

    #[test]
    fn test_tiny_gains_below_threshold_count_as_bad() {
        let cfg = PlateauConfig { patience: 0, threshold: 0.1, ..PlateauConfig::default() };
        let mut s = PlateauScheduler::new(cfg, 1.0);
        s.step(1.0);
        // 0.95 is better, but not by 10 %
        assert!(close(s.step(0.95), 0.1));
    }

    #[test]
    fn test_respects_min_lr() {
        let cfg = PlateauConfig { patience: 0, min_lr: 5e-4, ..PlateauConfig::default() };
        let mut s = PlateauScheduler::new(cfg, 1e-3);
        s.step(1.0);
        assert!(close(s.step(2.0), 5e-4));
        assert!(close(s.step(2.0), 5e-4));
    }

    #[test]
    fn test_validate_rejects_bad_factor() {
        assert!(PlateauConfig::default().validate().is_ok());
        assert!(PlateauConfig { factor: 1.5, ..PlateauConfig::default() }.validate().is_err());
        assert!(PlateauConfig { factor: 0.0, ..PlateauConfig::default() }.validate().is_err());
    }
}
