use std::sync::mpsc;
use std::sync::Arc;

use crate::train::cancel::CancelSource;
use crate::train::epoch_stats::EpochStats;

/// Configuration for a `train_epochs` run.
///
/// # Fields
/// - `epochs`     : number of full passes over the training data
/// - `verbose`    : log validation accuracy after every epoch
/// - `progress_tx`: optional channel; one `EpochStats` is sent per
///                   completed epoch. A dropped receiver is ignored.
/// - `cancel`     : optional cancellation source polled after each epoch
pub struct TrainConfig {
    pub epochs: usize,
    pub verbose: bool,
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
    pub cancel: Option<Arc<dyn CancelSource>>,
}

impl TrainConfig {
    /// Creates a `TrainConfig` with no progress channel and no cancel source.
    pub fn new(epochs: usize) -> Self {
        TrainConfig {
            epochs,
            verbose: false,
            progress_tx: None,
            cancel: None,
        }
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn with_cancel(mut self, cancel: Arc<dyn CancelSource>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }
}
