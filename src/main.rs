use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, SeedableRng};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use sigmanet::data::{csv_to_png, image_to_query_input};
use sigmanet::{train_epochs, Dataset, Hyperparams, NeuralNetwork, Overrides, TrainConfig, Validation};

#[derive(Parser)]
#[command(version, about = "Train and query a sigmoid feedforward network")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train on a label-first CSV file, then report test accuracy
    Train {
        #[arg(long, value_name = "PATH")]
        train: PathBuf,
        #[arg(long, value_name = "PATH")]
        test: PathBuf,
        #[arg(long, value_name = "PATH", default_value = "./neuralnet.weights.json")]
        checkpoint: PathBuf,
        /// JSON file with hyperparameters; flags below override it
        #[arg(long, value_name = "PATH")]
        config: Option<PathBuf>,
        #[arg(long, value_name = "INT")]
        hidden: Option<usize>,
        #[arg(long, value_name = "FLOAT")]
        learning_rate: Option<f64>,
        #[arg(short, long, value_name = "INT")]
        epochs: Option<usize>,
        /// Number of leading test rows scored after every epoch
        #[arg(long, value_name = "INT")]
        validation: Option<usize>,
        #[arg(long, value_name = "INT")]
        seed: Option<u64>,
        /// Continue from the checkpoint if it can be loaded
        #[arg(long)]
        resume: bool,
        /// Skip per-epoch validation logging
        #[arg(short, long)]
        quiet: bool,
    },
    /// Classify a single PNG image with a saved network
    Classify {
        #[arg(long, value_name = "PATH")]
        checkpoint: PathBuf,
        #[arg(long, value_name = "PATH")]
        image: PathBuf,
    },
    /// Convert a label-first CSV file into one PNG per row
    Convert {
        #[arg(long, value_name = "PATH")]
        csv: PathBuf,
        #[arg(long, value_name = "DIR")]
        out: PathBuf,
        #[arg(long, default_value_t = 28)]
        width: u32,
        #[arg(long, default_value_t = 28)]
        height: u32,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .compact()
        .init();

    match Cli::parse().command {
        Command::Train {
            train,
            test,
            checkpoint,
            config,
            hidden,
            learning_rate,
            epochs,
            validation,
            seed,
            resume,
            quiet,
        } => {
            let base = match config {
                Some(path) => Hyperparams::load_json(&path)
                    .with_context(|| format!("loading config {}", path.display()))?,
                None => Hyperparams::default(),
            };
            let params = base.merge(Overrides {
                hidden_size: hidden,
                learning_rate,
                epochs,
                validation_count: validation,
                seed,
            });
            run_train(&params, &train, &test, &checkpoint, resume, !quiet)
        }
        Command::Classify { checkpoint, image } => run_classify(&checkpoint, &image),
        Command::Convert { csv, out, width, height } => {
            let written = csv_to_png(&csv, &out, width, height)
                .with_context(|| format!("converting {}", csv.display()))?;
            info!(images = written, dir = %out.display(), "conversion done");
            Ok(())
        }
    }
}

fn run_train(
    params: &Hyperparams,
    train_path: &Path,
    test_path: &Path,
    checkpoint: &Path,
    resume: bool,
    verbose: bool,
) -> Result<()> {
    let mut rng = StdRng::seed_from_u64(params.seed);

    let mut train = Dataset::from_csv(train_path, params.label_max)
        .with_context(|| format!("reading training data {}", train_path.display()))?;
    let test = Dataset::from_csv(test_path, params.label_max)
        .with_context(|| format!("reading test data {}", test_path.display()))?;
    info!(train = train.len(), test = test.len(), "datasets loaded");

    let network = match resume.then(|| NeuralNetwork::load(checkpoint)) {
        Some(Ok(network)) => {
            info!(step = network.training_step(), "resuming from {}", checkpoint.display());
            network
        }
        Some(Err(e)) => {
            warn!("could not resume from {}: {e}; starting fresh", checkpoint.display());
            fresh_network(params, &mut rng)?
        }
        None => fresh_network(params, &mut rng)?,
    };

    let stop = Arc::new(AtomicBool::new(false));
    let handler_flag = stop.clone();
    ctrlc::set_handler(move || {
        if !handler_flag.swap(true, Ordering::AcqRel) {
            warn!("interrupt detected, stopping training after the current epoch");
        }
    })
    .context("installing interrupt handler")?;

    let (val_set, holdout) = test.split_at(params.validation_count);
    let config = TrainConfig::new(params.epochs).verbose(verbose).with_cancel(stop);
    let validation = (!val_set.is_empty()).then(|| Validation {
        inputs: &val_set.features,
        labels: &val_set.labels,
    });

    info!(epochs = params.epochs, "beginning training");
    let network = train_epochs(network, &mut train.features, &mut train.one_hot, validation, &mut rng, &config)?;

    info!(step = network.training_step(), "storing weights under {}", checkpoint.display());
    network
        .save(checkpoint)
        .with_context(|| format!("writing checkpoint {}", checkpoint.display()))?;

    if holdout.is_empty() {
        warn!("no test rows left after validation, skipping final accuracy");
    } else {
        let accuracy = network.accuracy(&holdout.features, &holdout.labels)?;
        info!(samples = holdout.len(), "test accuracy {accuracy:.4}");
    }
    Ok(())
}

fn fresh_network(params: &Hyperparams, rng: &mut StdRng) -> Result<NeuralNetwork> {
    Ok(NeuralNetwork::new(
        params.input_size,
        params.hidden_size,
        params.output_size,
        params.learning_rate,
        rng,
    )?)
}

fn run_classify(checkpoint: &Path, image: &Path) -> Result<()> {
    let network = NeuralNetwork::load(checkpoint)
        .with_context(|| format!("loading checkpoint {}", checkpoint.display()))?;
    let sample = image_to_query_input(image, network.output_size())
        .with_context(|| format!("reading image {}", image.display()))?;

    let outputs = network.query(&sample.pixels)?;
    let predicted = outputs.row_argmax().unwrap_or(0);
    println!("Image with label {} was classified as {}", sample.label, predicted);
    println!("{:?}", outputs.to_flat());
    Ok(())
}
