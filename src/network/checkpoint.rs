use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;
use tracing::debug;

use crate::error::{NetError, Result};
use crate::math::matrix::Matrix;
use crate::network::network::NeuralNetwork;

/// On-disk layout of a saved network.
///
/// Weight matrices are stored as arrays of rows.
#[derive(Serialize)]
struct CheckpointRef<'a> {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    learning_rate: f64,
    training_step: u64,
    weights_input_hidden: &'a [Vec<f64>],
    weights_hidden_output: &'a [Vec<f64>],
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Checkpoint {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    learning_rate: f64,
    training_step: u64,
    weights_input_hidden: Vec<Vec<f64>>,
    weights_hidden_output: Vec<Vec<f64>>,
}

impl NeuralNetwork {
    /// Encodes the full network state as a JSON document.
    ///
    /// Floats are written in shortest round-trip form, so
    /// [`NeuralNetwork::from_checkpoint_bytes`] restores every weight bit for bit.
    pub fn to_checkpoint_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write_checkpoint(&mut out)?;
        Ok(out)
    }

    /// Decodes a network written by [`NeuralNetwork::to_checkpoint_bytes`].
    pub fn from_checkpoint_bytes(bytes: &[u8]) -> Result<NeuralNetwork> {
        let checkpoint: Checkpoint =
            serde_json::from_slice(bytes).map_err(|e| NetError::Format(e.to_string()))?;
        checkpoint.into_network()
    }

    /// Fails with `NetError::Format` before writing anything if a weight or
    /// the learning rate is not finite, since such a document could not be
    /// read back.
    pub fn write_checkpoint<W: Write>(&self, writer: W) -> Result<()> {
        check_finite("weights_input_hidden", self.weights_input_hidden().as_rows())?;
        check_finite("weights_hidden_output", self.weights_hidden_output().as_rows())?;
        if !self.learning_rate().is_finite() {
            return Err(NetError::Format("learning rate is not finite".into()));
        }
        let checkpoint = CheckpointRef {
            input_size: self.input_size(),
            hidden_size: self.hidden_size(),
            output_size: self.output_size(),
            learning_rate: self.learning_rate(),
            training_step: self.training_step(),
            weights_input_hidden: self.weights_input_hidden().as_rows(),
            weights_hidden_output: self.weights_hidden_output().as_rows(),
        };
        let mut ser = serde_json::Serializer::with_formatter(writer, RowFormatter::default());
        checkpoint.serialize(&mut ser).map_err(|e| {
            if e.is_io() {
                NetError::Io(e.into())
            } else {
                NetError::Format(e.to_string())
            }
        })?;
        ser.into_inner().write_all(b"\n")?;
        Ok(())
    }

    pub fn read_checkpoint<R: Read>(mut reader: R) -> Result<NeuralNetwork> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        NeuralNetwork::from_checkpoint_bytes(&bytes)
    }

    /// Writes the checkpoint to `path`, replacing any existing file.
    ///
    /// The document goes to a sibling `.tmp` file first and is renamed over
    /// `path` only once fully written, so a failed save leaves the previous
    /// checkpoint intact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let written = File::create(&tmp_path).map_err(NetError::from).and_then(|file| {
            let mut writer = BufWriter::new(file);
            self.write_checkpoint(&mut writer)?;
            writer.into_inner().map_err(|e| e.into_error())?.sync_all()?;
            Ok(())
        });
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        fs::rename(&tmp_path, path)?;
        debug!(path = %path.display(), step = self.training_step(), "checkpoint saved");
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<NeuralNetwork> {
        let path = path.as_ref();
        let network = NeuralNetwork::read_checkpoint(BufReader::new(File::open(path)?))?;
        debug!(path = %path.display(), step = network.training_step(), "checkpoint loaded");
        Ok(network)
    }
}

impl Checkpoint {
    fn into_network(self) -> Result<NeuralNetwork> {
        let weights_input_hidden =
            weights_matrix("weights_input_hidden", self.weights_input_hidden, self.hidden_size, self.input_size)?;
        let weights_hidden_output =
            weights_matrix("weights_hidden_output", self.weights_hidden_output, self.output_size, self.hidden_size)?;
        NeuralNetwork::from_parts(
            self.input_size,
            self.hidden_size,
            self.output_size,
            self.learning_rate,
            self.training_step,
            weights_input_hidden,
            weights_hidden_output,
        )
        .map_err(|e| NetError::Format(e.to_string()))
    }
}

fn weights_matrix(name: &str, rows: Vec<Vec<f64>>, n_rows: usize, n_cols: usize) -> Result<Matrix> {
    if rows.len() != n_rows {
        return Err(NetError::Format(format!(
            "{name} has {} rows, declared sizes need {n_rows}",
            rows.len()
        )));
    }
    if let Some(i) = rows.iter().position(|row| row.len() != n_cols) {
        return Err(NetError::Format(format!(
            "{name} row {i} has {} values, declared sizes need {n_cols}",
            rows[i].len()
        )));
    }
    check_finite(name, &rows)?;
    Matrix::from_data(rows).map_err(|e| NetError::Format(e.to_string()))
}

fn check_finite(name: &str, rows: &[Vec<f64>]) -> Result<()> {
    if rows.iter().flatten().any(|w| !w.is_finite()) {
        return Err(NetError::Format(format!("{name} contains a non-finite weight")));
    }
    Ok(())
}

/// Pretty-prints objects and top-level arrays one entry per line but keeps
/// nested arrays on a single line, so a weight matrix takes one line per row.
#[derive(Default)]
struct RowFormatter {
    indent: usize,
    array_depth: usize,
    has_value: bool,
}

impl RowFormatter {
    fn newline<W: ?Sized + Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b"\n")?;
        for _ in 0..self.indent {
            writer.write_all(b"  ")?;
        }
        Ok(())
    }
}

impl Formatter for RowFormatter {
    fn begin_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.array_depth += 1;
        if self.array_depth == 1 {
            self.indent += 1;
            self.has_value = false;
        }
        writer.write_all(b"[")
    }

    fn end_array<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        if self.array_depth == 1 {
            self.indent -= 1;
            if self.has_value {
                self.newline(writer)?;
            }
        }
        self.array_depth -= 1;
        writer.write_all(b"]")
    }

    fn begin_array_value<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if !first {
            writer.write_all(b",")?;
        }
        if self.array_depth == 1 {
            self.newline(writer)?;
        }
        Ok(())
    }

    fn end_array_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        if self.array_depth == 1 {
            self.has_value = true;
        }
        Ok(())
    }

    fn begin_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.indent += 1;
        self.has_value = false;
        writer.write_all(b"{")
    }

    fn end_object<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.indent -= 1;
        if self.has_value {
            self.newline(writer)?;
        }
        writer.write_all(b"}")
    }

    fn begin_object_key<W: ?Sized + Write>(&mut self, writer: &mut W, first: bool) -> io::Result<()> {
        if !first {
            writer.write_all(b",")?;
        }
        self.newline(writer)
    }

    fn begin_object_value<W: ?Sized + Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }

    fn end_object_value<W: ?Sized + Write>(&mut self, _writer: &mut W) -> io::Result<()> {
        self.has_value = true;
        Ok(())
    }
}
