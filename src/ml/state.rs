// ============================================================
// Layer 5 — Training State Machine
// ============================================================
//
//   Running { epoch, patience_counter }
//       │  advance(val_loss)
//       ├── strictly better than best  → checkpoint, counter ← 0
//       ├── otherwise                  → counter += 1
//       │
//       ├── counter == patience        → Stopped(EarlyStop)
//       ├── epoch == max_epochs        → Stopped(MaxEpochs)
//       └── else                       → Running { epoch + 1, .. }
//
// Mutated exactly once per epoch by the controller. Early stop
// takes precedence when both conditions hold on the last epoch.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    MaxEpochs,
    EarlyStop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running { epoch: usize, patience_counter: usize },
    Stopped(StopReason),
}

/// Outcome of one epoch's stop/continue/checkpoint decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpochDecision {
    /// Validation loss improved: the current weights should be persisted.
    pub checkpoint: bool,
    pub status:     RunStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainingState {
    /// 1-based index of the epoch currently running (0 before the first).
    pub epoch:                      usize,
    pub best_val_loss:              f64,
    pub epochs_without_improvement: usize,
    pub learning_rate:              f64,
}

impl TrainingState {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            epoch: 0,
            best_val_loss: f64::INFINITY,
            epochs_without_improvement: 0,
            learning_rate,
        }
    }

    /// Record the validation loss of the epoch that just finished.
    pub fn advance(&mut self, val_loss: f64, max_epochs: usize, patience: usize) -> EpochDecision {
        self.epoch += 1;

        let checkpoint = val_loss < self.best_val_loss;
        if checkpoint {
            self.best_val_loss = val_loss;
            self.epochs_without_improvement = 0;
        } else {
            self.epochs_without_improvement += 1;
        }

        let status = if self.epochs_without_improvement >= patience {
            RunStatus::Stopped(StopReason::EarlyStop)
        } else if self.epoch >= max_epochs {
            RunStatus::Stopped(StopReason::MaxEpochs)
        } else {
            RunStatus::Running {
                epoch:            self.epoch + 1,
                patience_counter: self.epochs_without_improvement,
            }
        };

        EpochDecision { checkpoint, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive the machine over `losses`; returns (stop epoch, reason, checkpointed epochs).
    fn drive(losses: &[f64], max_epochs: usize, patience: usize) -> (usize, StopReason, Vec<usize>) {
        let mut state = TrainingState::new(1e-3);
        let mut saved = Vec::new();
        for &loss in losses {
            let d = state.advance(loss, max_epochs, patience);
            if d.checkpoint {
                saved.push(state.epoch);
            }
            if let RunStatus::Stopped(reason) = d.status {
                return (state.epoch, reason, saved);
            }
        }
        panic!("ran out of losses before stopping");
    }

    #[test]
    fn test_halts_exactly_patience_epochs_after_last_improvement() {
        for patience in 1..=4 {
            // Improves until epoch 3, never again
            let mut losses = vec![1.0, 0.9, 0.8];
            losses.extend(std::iter::repeat(0.85).take(10));
            let (stop, reason, saved) = drive(&losses, 100, patience);
            assert_eq!(stop, 3 + patience);
            assert_eq!(reason, StopReason::EarlyStop);
            assert_eq!(saved, vec![1, 2, 3]);
        }
    }

    #[test]
    fn test_late_improvement_resets_patience() {
        let (stop, reason, saved) = drive(&[0.9, 0.95, 0.80, 0.97, 0.98, 0.5], 10, 2);
        assert_eq!(saved, vec![1, 3]);
        assert_eq!(stop, 5);
        assert_eq!(reason, StopReason::EarlyStop);
    }

    #[test]
    fn test_two_bad_epochs_after_first_stop_before_late_dip() {
        // With patience 2 the run is already over when the 0.80 would arrive
        let (stop, _, saved) = drive(&[0.9, 0.95, 0.96, 0.80, 0.97, 0.98], 10, 2);
        assert_eq!(stop, 3);
        assert_eq!(saved, vec![1]);
    }

    #[test]
    fn test_equal_loss_is_not_an_improvement() {
        let mut state = TrainingState::new(1e-3);
        assert!(state.advance(0.5, 10, 3).checkpoint);
        assert!(!state.advance(0.5, 10, 3).checkpoint);
        assert_eq!(state.epochs_without_improvement, 1);
    }

    #[test]
    fn test_stops_at_max_epochs() {
        let (stop, reason, _) = drive(&[1.0, 0.9, 0.8, 0.7], 3, 5);
        assert_eq!(stop, 3);
        assert_eq!(reason, StopReason::MaxEpochs);
    }

    #[test]
    fn test_checkpointed_losses_are_non_increasing() {
        let losses = [0.9, 1.2, 0.7, 0.7, 0.95, 0.65, 0.66, 0.3];
        let mut state = TrainingState::new(1e-3);
        let mut recorded = Vec::new();
        for &loss in &losses {
            if state.advance(loss, 100, 100).checkpoint {
                recorded.push(loss);
            }
        }
        assert_eq!(recorded, vec![0.9, 0.7, 0.65, 0.3]);
        assert!(recorded.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_running_status_reports_counter() {
        let mut state = TrainingState::new(1e-3);
        state.advance(1.0, 10, 3);
        let d = state.advance(1.5, 10, 3);
        assert_eq!(d.status, RunStatus::Running { epoch: 3, patience_counter: 1 });
    }
}
