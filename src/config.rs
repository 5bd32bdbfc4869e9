use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{NetError, Result};

/// Training hyperparameters.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Hyperparams {
    pub input_size: usize,
    pub hidden_size: usize,
    pub output_size: usize,
    pub learning_rate: f64,
    pub epochs: usize,
    /// Leading rows of the test set scored after every epoch; the rest is
    /// held out for the final accuracy.
    pub validation_count: usize,
    /// Largest class label accepted by dataset preparation.
    pub label_max: usize,
    pub seed: u64,
}

impl Default for Hyperparams {
    fn default() -> Self {
        Hyperparams {
            input_size: 784,
            hidden_size: 200,
            output_size: 10,
            learning_rate: 0.005,
            epochs: 50,
            validation_count: 500,
            label_max: 9,
            seed: 0,
        }
    }
}

/// Per-field overrides, e.g. from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub hidden_size: Option<usize>,
    pub learning_rate: Option<f64>,
    pub epochs: Option<usize>,
    pub validation_count: Option<usize>,
    pub seed: Option<u64>,
}

impl Hyperparams {
    /// Reads hyperparameters from a JSON file; absent keys keep defaults.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Hyperparams> {
        let reader = BufReader::new(File::open(path)?);
        let params: Hyperparams =
            serde_json::from_reader(reader).map_err(|e| NetError::Input(format!("config: {e}")))?;
        Ok(params)
    }

    /// Applies `overrides` on top of `self`; set values win.
    pub fn merge(self, overrides: Overrides) -> Hyperparams {
        Hyperparams {
            hidden_size: overrides.hidden_size.unwrap_or(self.hidden_size),
            learning_rate: overrides.learning_rate.unwrap_or(self.learning_rate),
            epochs: overrides.epochs.unwrap_or(self.epochs),
            validation_count: overrides.validation_count.unwrap_or(self.validation_count),
            seed: overrides.seed.unwrap_or(self.seed),
            ..self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let params: Hyperparams = serde_json::from_str(r#"{"hidden_size": 64, "epochs": 3}"#).unwrap();
        assert_eq!(params.hidden_size, 64);
        assert_eq!(params.epochs, 3);
        assert_eq!(params.input_size, 784);
        assert_eq!(params.learning_rate, 0.005);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_str::<Hyperparams>(r#"{"hiden_size": 64}"#).is_err());
    }

    #[test]
    fn overrides_win() {
        let merged = Hyperparams::default().merge(Overrides {
            epochs: Some(2),
            seed: Some(9),
            ..Overrides::default()
        });
        assert_eq!(merged.epochs, 2);
        assert_eq!(merged.seed, 9);
        assert_eq!(merged.hidden_size, 200);
    }

    #[test]
    fn load_json_reports_bad_files() {
        let path = std::env::temp_dir().join(format!("sigmanet-config-{}.json", std::process::id()));
        std::fs::write(&path, "{ not json").unwrap();
        let err = Hyperparams::load_json(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, Err(NetError::Input(_))));
    }
}
