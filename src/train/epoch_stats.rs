use serde::{Deserialize, Serialize};

/// Per-epoch statistics emitted by `train_epochs`.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the loop
/// sends one `EpochStats` value at the end of every completed epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochStats {
    /// 1-based epoch number.
    pub epoch: usize,
    /// Total epochs requested for this run.
    pub total_epochs: usize,
    /// Network training step after this epoch.
    pub training_step: u64,
    /// Validation accuracy in [0, 1], if validation data was supplied.
    pub val_accuracy: Option<f64>,
    /// Wall-clock duration of the epoch's sample pass in milliseconds.
    pub elapsed_ms: u64,
}
