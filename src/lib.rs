//! A sigmoid feedforward network with one hidden layer, trained by
//! per-sample backpropagation on dense `f64` matrices.

pub mod activation;
pub mod config;
pub mod data;
pub mod error;
pub mod math;
pub mod network;
pub mod train;

// Convenience re-exports
pub use config::{Hyperparams, Overrides};
pub use data::prepare::Dataset;
pub use error::{NetError, Result};
pub use math::matrix::Matrix;
pub use network::network::NeuralNetwork;
pub use train::{train_epochs, CancelSource, EpochStats, NeverCancel, TrainConfig, Validation};
