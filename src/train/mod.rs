pub mod cancel;
pub mod epoch_stats;
pub mod loop_fn;
pub mod train_config;

pub use cancel::{CancelSource, NeverCancel};
pub use epoch_stats::EpochStats;
pub use loop_fn::{shuffle_pairs, train_epochs, Validation};
pub use train_config::TrainConfig;
