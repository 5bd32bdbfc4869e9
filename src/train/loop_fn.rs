use std::time::Instant;

use rand::Rng;
use tracing::{info, warn};

use crate::error::{NetError, Result};
use crate::network::network::NeuralNetwork;
use crate::train::epoch_stats::EpochStats;
use crate::train::train_config::TrainConfig;

/// Held-out samples scored after every epoch.
#[derive(Debug, Clone, Copy)]
pub struct Validation<'a> {
    pub inputs: &'a [Vec<f64>],
    pub labels: &'a [usize],
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Trains `network` for up to `config.epochs` epochs and returns the latest
/// snapshot.
///
/// Each epoch shuffles `inputs` and `targets` in place with one shared
/// permutation, then applies a single-sample update for every pair in the
/// new order, feeding each returned snapshot into the next update.
///
/// After the sample pass the loop scores `validation` (when given and either
/// `verbose` or a progress channel is set), emits an `EpochStats`, and polls
/// `config.cancel`. A raised signal ends training there; the caller can tell
/// how far it got from `training_step`.
///
/// # Errors
/// `NetError::Input` if the training set is empty, `inputs` and `targets`
/// differ in length, or any training or validation sample does not fit the
/// network's layer sizes. All samples are checked before the first update.
pub fn train_epochs<R: Rng + ?Sized>(
    mut network: NeuralNetwork,
    inputs: &mut [Vec<f64>],
    targets: &mut [Vec<f64>],
    validation: Option<Validation<'_>>,
    rng: &mut R,
    config: &TrainConfig,
) -> Result<NeuralNetwork> {
    check_samples(&network, inputs, targets, validation)?;

    for epoch in 1..=config.epochs {
        let t_start = Instant::now();

        shuffle_pairs(inputs, targets, rng);
        for (input, target) in inputs.iter().zip(targets.iter()) {
            network = network.train(input, target)?;
        }

        let elapsed_ms = t_start.elapsed().as_millis() as u64;

        let val_accuracy = match validation {
            Some(v) if config.verbose || config.progress_tx.is_some() => {
                Some(network.accuracy(v.inputs, v.labels)?)
            }
            _ => None,
        };

        if config.verbose {
            match val_accuracy {
                Some(acc) => info!(
                    epoch,
                    total = config.epochs,
                    step = network.training_step(),
                    accuracy = acc,
                    "epoch done, validation accuracy {acc:.4}"
                ),
                None => info!(epoch, total = config.epochs, step = network.training_step(), "epoch done"),
            }
        }

        if let Some(ref tx) = config.progress_tx {
            // A receiver that went away only stops reporting, not training.
            let _ = tx.send(EpochStats {
                epoch,
                total_epochs: config.epochs,
                training_step: network.training_step(),
                val_accuracy,
                elapsed_ms,
            });
        }

        if config.is_cancelled() {
            warn!(epoch, total = config.epochs, "cancellation requested, stopping after this epoch");
            break;
        }
    }

    Ok(network)
}

/// In-place Fisher–Yates shuffle applying one permutation to both slices.
///
/// # Panics
/// Panics if the slices differ in length.
pub fn shuffle_pairs<A, B, R: Rng + ?Sized>(a: &mut [A], b: &mut [B], rng: &mut R) {
    assert_eq!(a.len(), b.len(), "paired slices must have equal length");
    for i in (1..a.len()).rev() {
        let j = rng.gen_range(0..=i);
        a.swap(i, j);
        b.swap(i, j);
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn check_samples(
    network: &NeuralNetwork,
    inputs: &[Vec<f64>],
    targets: &[Vec<f64>],
    validation: Option<Validation<'_>>,
) -> Result<()> {
    if inputs.is_empty() {
        return Err(NetError::Input("training set is empty".into()));
    }
    if inputs.len() != targets.len() {
        return Err(NetError::Input(format!(
            "{} training samples but {} targets",
            inputs.len(),
            targets.len()
        )));
    }
    if let Some(i) = inputs.iter().position(|x| x.len() != network.input_size()) {
        return Err(NetError::Input(format!(
            "sample {i} has {} features, network expects {}",
            inputs[i].len(),
            network.input_size()
        )));
    }
    if let Some(i) = targets.iter().position(|t| t.len() != network.output_size()) {
        return Err(NetError::Input(format!(
            "target {i} has {} values, network expects {}",
            targets[i].len(),
            network.output_size()
        )));
    }
    if let Some(v) = validation {
        if v.inputs.len() != v.labels.len() {
            return Err(NetError::Input(format!(
                "{} validation samples but {} labels",
                v.inputs.len(),
                v.labels.len()
            )));
        }
        if let Some(i) = v.inputs.iter().position(|x| x.len() != network.input_size()) {
            return Err(NetError::Input(format!(
                "validation sample {i} has {} features, network expects {}",
                v.inputs[i].len(),
                network.input_size()
            )));
        }
    }
    Ok(())
}
