//! Grayscale image boundary: PNG files in, flat pixel vectors out.
use std::fs;
use std::path::Path;

use image::GrayImage;
use tracing::debug;

use crate::data::prepare::{read_records, ONE_HOT_ON};
use crate::error::{NetError, Result};

/// Largest label that survives the `{label}-image-{n}.png` naming.
const MAX_FILE_LABEL: usize = 9;

/// A decoded image ready for `NeuralNetwork::query`.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSample {
    /// Row-major grayscale intensities scaled to [0, 1].
    pub pixels: Vec<f64>,
    pub one_hot: Vec<f64>,
    pub label: usize,
}

/// Decodes the image at `path` into a flat grayscale vector.
///
/// The label is the leading digit of the file name, as produced by
/// [`csv_to_png`] (`7-image-12.png` has label 7).
pub fn image_to_query_input<P: AsRef<Path>>(path: P, num_classes: usize) -> Result<ImageSample> {
    let path = path.as_ref();
    let label = path
        .file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.chars().next())
        .and_then(|c| c.to_digit(10))
        .map(|d| d as usize)
        .ok_or_else(|| {
            NetError::Input(format!("{}: file name does not start with a digit label", path.display()))
        })?;
    if label >= num_classes {
        return Err(NetError::Input(format!(
            "{}: label {label} outside {num_classes} classes",
            path.display()
        )));
    }

    let gray = image::open(path)?.to_luma8();
    let pixels = gray.pixels().map(|p| p.0[0] as f64 / 255.0).collect();

    let mut one_hot = vec![0.0; num_classes];
    one_hot[label] = ONE_HOT_ON;

    Ok(ImageSample { pixels, one_hot, label })
}

/// Writes every row of a label-first CSV file as a `width × height`
/// grayscale PNG named `{label}-image-{n}.png` into `target_dir`.
///
/// Labels must be single digits so [`image_to_query_input`] can read them
/// back from the file name. Returns the number of images written.
pub fn csv_to_png<P, Q>(csv_path: P, target_dir: Q, width: u32, height: u32) -> Result<usize>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let target_dir = target_dir.as_ref();
    let n_pixels = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| NetError::Input(format!("a {width}x{height} image is too large")))?;
    fs::create_dir_all(target_dir)?;

    let records = read_records(csv_path)?;
    for (counter, record) in records.iter().enumerate() {
        let row = counter + 1;
        let (label, pixels) = record
            .split_first()
            .ok_or_else(|| NetError::Input(format!("row {row}: empty record")))?;
        let label: usize = label
            .parse()
            .map_err(|_| NetError::Input(format!("row {row}: label '{label}' is not a class index")))?;
        if label > MAX_FILE_LABEL {
            return Err(NetError::Input(format!(
                "row {row}: label {label} does not fit a single-digit file name"
            )));
        }
        if pixels.len() != n_pixels {
            return Err(NetError::Input(format!(
                "row {row}: {} pixel values, a {width}x{height} image needs {n_pixels}",
                pixels.len()
            )));
        }
        let buf = pixels
            .iter()
            .map(|p| {
                p.parse::<u8>()
                    .map_err(|_| NetError::Input(format!("row {row}: '{p}' is not a pixel value in [0, 255]")))
            })
            .collect::<Result<Vec<u8>>>()?;

        let img = GrayImage::from_raw(width, height, buf)
            .ok_or_else(|| NetError::Input(format!("row {row}: pixel buffer does not fit image")))?;
        img.save(target_dir.join(format!("{label}-image-{counter}.png")))?;
    }

    debug!(dir = %target_dir.display(), images = records.len(), "wrote png images");
    Ok(records.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("sigmanet-{name}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn csv_rows_become_labelled_pngs() {
        let dir = scratch_dir("png");
        let csv = dir.join("digits.csv");
        fs::write(&csv, "7,0,51,102,255\n2,255,255,0,0\n").unwrap();

        assert_eq!(csv_to_png(&csv, dir.join("out"), 2, 2).unwrap(), 2);

        let sample = image_to_query_input(dir.join("out").join("7-image-0.png"), 10).unwrap();
        assert_eq!(sample.label, 7);
        assert_eq!(sample.pixels, vec![0.0, 0.2, 0.4, 1.0]);
        assert_eq!(sample.one_hot[7], 0.999);
        assert_eq!(sample.one_hot.iter().filter(|&&v| v == 0.0).count(), 9);

        assert!(dir.join("out").join("2-image-1.png").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn wrong_pixel_count_is_rejected() {
        let dir = scratch_dir("short");
        let csv = dir.join("short.csv");
        fs::write(&csv, "1,0,0,0\n").unwrap();
        assert!(matches!(csv_to_png(&csv, &dir, 2, 2), Err(NetError::Input(_))));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn multi_digit_labels_are_rejected() {
        let dir = scratch_dir("label");
        let csv = dir.join("label.csv");
        fs::write(&csv, "12,0,0,0,0\n").unwrap();
        assert!(matches!(csv_to_png(&csv, dir.join("out"), 2, 2), Err(NetError::Input(_))));
        assert!(!dir.join("out").join("12-image-0.png").exists());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn large_dimensions_do_not_wrap() {
        let dir = scratch_dir("huge");
        let csv = dir.join("huge.csv");
        fs::write(&csv, "1,0\n").unwrap();
        // 65536 * 65536 wraps to 0 in u32
        let err = csv_to_png(&csv, dir.join("out"), 65536, 65536);
        assert!(matches!(err, Err(NetError::Input(_))));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn file_name_must_carry_a_label() {
        let err = image_to_query_input("/tmp/no-label.png", 10);
        assert!(matches!(err, Err(NetError::Input(_))));
    }
}
