//! Dataset preparation for label-first CSV data.
//!
//! Each row is `label,p0,p1,...` where every `p` is an integer pixel
//! intensity in [0, 255]. Features are scaled into (0, 1] with
//! `value / 255 * 0.999 + 0.001`; training labels become one-hot vectors
//! with 0.999 at the class index, test labels stay plain integers.
use std::path::Path;

use tracing::debug;

use crate::error::{NetError, Result};

/// Value written at the true class index of a one-hot target.
pub const ONE_HOT_ON: f64 = 0.999;

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Reads a header-less CSV file into string records.
///
/// Rows of differing width are rejected by the reader.
pub fn read_records<P: AsRef<Path>>(path: P) -> Result<Vec<Vec<String>>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?.iter().map(str::to_owned).collect());
    }
    debug!(path = %path.display(), rows = records.len(), "read csv records");
    Ok(records)
}

/// Maps a raw intensity in [0, 255] to `(value / 255) * 0.999 + 0.001`.
pub fn normalize_pixel(value: u8) -> f64 {
    ((value as f64 / 255.0) * 0.999) + 0.001
}

/// Drops the label column of every row and normalizes the pixel fields.
pub fn prepare_dataset<R, S>(records: &[R]) -> Result<Vec<Vec<f64>>>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut width = None;
    let mut out = Vec::with_capacity(records.len());
    for (row_idx, record) in records.iter().enumerate() {
        let fields = record.as_ref();
        if fields.is_empty() {
            return Err(NetError::Input(format!("row {}: empty record", row_idx + 1)));
        }
        let features = fields[1..]
            .iter()
            .enumerate()
            .map(|(col, cell)| parse_pixel(cell.as_ref(), row_idx + 1, col + 2).map(normalize_pixel))
            .collect::<Result<Vec<f64>>>()?;

        match width {
            None => width = Some(features.len()),
            Some(w) if w != features.len() => {
                return Err(NetError::Input(format!(
                    "row {}: {} pixel values, first row has {}",
                    row_idx + 1,
                    features.len(),
                    w
                )));
            }
            Some(_) => {}
        }
        out.push(features);
    }
    Ok(out)
}

/// One-hot encodes the first field of every row over `label_max + 1`
/// classes.
pub fn prepare_train_labels<R, S>(records: &[R], label_max: usize) -> Result<Vec<Vec<f64>>>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    records
        .iter()
        .enumerate()
        .map(|(row_idx, record)| {
            let label = parse_label(record.as_ref(), row_idx + 1, label_max)?;
            let mut one_hot = vec![0.0; label_max + 1];
            one_hot[label] = ONE_HOT_ON;
            Ok(one_hot)
        })
        .collect()
}

/// Extracts the first field of every row as a class index in
/// `[0, label_max]`.
pub fn prepare_test_labels<R, S>(records: &[R], label_max: usize) -> Result<Vec<usize>>
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    records
        .iter()
        .enumerate()
        .map(|(row_idx, record)| parse_label(record.as_ref(), row_idx + 1, label_max))
        .collect()
}

/// Features with both label encodings, row-aligned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<Vec<f64>>,
    pub one_hot: Vec<Vec<f64>>,
    pub labels: Vec<usize>,
}

impl Dataset {
    pub fn from_records<R, S>(records: &[R], label_max: usize) -> Result<Dataset>
    where
        R: AsRef<[S]>,
        S: AsRef<str>,
    {
        Ok(Dataset {
            features: prepare_dataset(records)?,
            one_hot: prepare_train_labels(records, label_max)?,
            labels: prepare_test_labels(records, label_max)?,
        })
    }

    pub fn from_csv<P: AsRef<Path>>(path: P, label_max: usize) -> Result<Dataset> {
        Dataset::from_records(&read_records(path)?, label_max)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Splits into the first `n` rows and the rest. `n` is clamped to `len()`.
    pub fn split_at(mut self, n: usize) -> (Dataset, Dataset) {
        let n = n.min(self.len());
        let rest = Dataset {
            features: self.features.split_off(n),
            one_hot: self.one_hot.split_off(n),
            labels: self.labels.split_off(n),
        };
        (self, rest)
    }
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn parse_pixel(cell: &str, row: usize, col: usize) -> Result<u8> {
    let value: i64 = cell.trim().parse().map_err(|_| {
        NetError::Input(format!("row {row}, column {col}: '{cell}' is not an integer"))
    })?;
    u8::try_from(value).map_err(|_| {
        NetError::Input(format!("row {row}, column {col}: pixel value {value} outside [0, 255]"))
    })
}

fn parse_label<S: AsRef<str>>(fields: &[S], row: usize, label_max: usize) -> Result<usize> {
    let cell: &str = fields
        .first()
        .map(|s| s.as_ref())
        .ok_or_else(|| NetError::Input(format!("row {row}: empty record")))?;
    let value: i64 = cell
        .trim()
        .parse()
        .map_err(|_| NetError::Input(format!("row {row}: label '{cell}' is not an integer")))?;
    match usize::try_from(value) {
        Ok(label) if label <= label_max => Ok(label),
        _ => Err(NetError::Input(format!(
            "row {row}: label {value} is not in allowed range [0, {label_max}]"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn features_drop_label_and_normalize() {
        let features = prepare_dataset(&[vec!["3", "255", "0"]]).unwrap();
        assert_eq!(features, vec![vec![1.0, 0.001]]);
    }

    #[test]
    fn normalized_values_stay_in_bounds() {
        for v in 0..=255u8 {
            let x = normalize_pixel(v);
            assert!(x >= 0.001 && x <= 1.0, "{v} -> {x}");
        }
    }

    #[test]
    fn surrounding_spaces_are_ignored() {
        let records = vec![vec![" 1 ".to_string(), " 51".to_string()]];
        assert_eq!(prepare_test_labels(&records, 9).unwrap(), vec![1]);
        assert_eq!(prepare_dataset(&records).unwrap(), vec![vec![0.2 * 0.999 + 0.001]]);
    }

    #[test]
    fn malformed_pixels_are_input_errors() {
        assert!(matches!(prepare_dataset(&[vec!["1", "12", "abc"]]), Err(NetError::Input(_))));
        assert!(matches!(prepare_dataset(&[vec!["1", "256"]]), Err(NetError::Input(_))));
        assert!(matches!(prepare_dataset(&[vec!["1", "-1"]]), Err(NetError::Input(_))));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = prepare_dataset(&[vec!["1", "0", "0"], vec!["2", "0"]]);
        assert!(matches!(err, Err(NetError::Input(_))));
    }

    #[test]
    fn train_labels_are_one_hot() {
        let labels = prepare_train_labels(&[vec!["2"], vec!["0"]], 3).unwrap();
        assert_eq!(labels, vec![vec![0.0, 0.0, 0.999, 0.0], vec![0.999, 0.0, 0.0, 0.0]]);
    }

    #[test]
    fn labels_outside_range_are_rejected() {
        assert!(matches!(prepare_train_labels(&[vec!["10"]], 9), Err(NetError::Input(_))));
        assert!(matches!(prepare_test_labels(&[vec!["-1"]], 9), Err(NetError::Input(_))));
        assert!(matches!(prepare_test_labels(&[vec!["x"]], 9), Err(NetError::Input(_))));
        assert_eq!(prepare_test_labels(&[vec!["9"]], 9).unwrap(), vec![9]);
    }

    #[test]
    fn dataset_split_keeps_rows_aligned() {
        let records = vec![vec!["0", "0"], vec!["1", "255"], vec!["2", "51"]];
        let (head, tail) = Dataset::from_records(&records, 2).unwrap().split_at(1);
        assert_eq!(head.labels, vec![0]);
        assert_eq!(tail.labels, vec![1, 2]);
        assert_eq!(tail.features[0], vec![1.0]);
        assert_eq!(tail.one_hot[1], vec![0.0, 0.0, 0.999]);

        let (all, none) = Dataset::from_records(&records, 2).unwrap().split_at(10);
        assert_eq!(all.len(), 3);
        assert!(none.is_empty());
    }

    #[test]
    fn reads_csv_file() {
        let path = std::env::temp_dir().join(format!("sigmanet-prepare-{}.csv", std::process::id()));
        std::fs::write(&path, "3,255,0\n1, 0 ,255\n").unwrap();
        let dataset = Dataset::from_csv(&path, 9).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(dataset.labels, vec![3, 1]);
        assert_eq!(dataset.features[1], vec![0.001, 1.0]);
    }

    #[test]
    fn ragged_csv_file_is_rejected() {
        let path = std::env::temp_dir().join(format!("sigmanet-ragged-{}.csv", std::process::id()));
        std::fs::write(&path, "3,255,0\n1,0\n").unwrap();
        let err = read_records(&path);
        std::fs::remove_file(&path).unwrap();
        assert!(matches!(err, Err(NetError::Csv(_))));
    }
}
