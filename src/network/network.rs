use rand::Rng;

use crate::activation::sigmoid::sigmoid_matrix;
use crate::error::{NetError, Result};
use crate::math::matrix::Matrix;

/// A fully connected network with one sigmoid hidden layer and a sigmoid
/// output layer.
///
/// Shapes never change after construction. A training step does not touch
/// `self`; it returns the next snapshot with updated weights and the step
/// counter advanced by one.
#[derive(Debug, Clone, PartialEq)]
pub struct NeuralNetwork {
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    learning_rate: f64,
    training_step: u64,
    /// hidden_size × input_size
    weights_input_hidden: Matrix,
    /// output_size × hidden_size
    weights_hidden_output: Matrix,
}

/// Activations kept from a forward pass for the backward pass.
struct Forward {
    hidden_outputs: Matrix,
    final_outputs: Matrix,
}

impl NeuralNetwork {
    /// Builds a fresh network with Gaussian weights.
    ///
    /// Input→hidden cells are drawn from N(0, hidden_size^-0.5), then
    /// hidden→output cells from N(0, output_size^-0.5), both from `rng`.
    pub fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        learning_rate: f64,
        rng: &mut R,
    ) -> Result<NeuralNetwork> {
        check_topology(input_size, hidden_size, output_size, learning_rate)?;
        let weights_input_hidden =
            Matrix::random_normal(hidden_size, input_size, (hidden_size as f64).powf(-0.5), rng)?;
        let weights_hidden_output =
            Matrix::random_normal(output_size, hidden_size, (output_size as f64).powf(-0.5), rng)?;
        Ok(NeuralNetwork {
            input_size,
            hidden_size,
            output_size,
            learning_rate,
            training_step: 0,
            weights_input_hidden,
            weights_hidden_output,
        })
    }

    /// Reassembles a network from stored parts, checking every shape.
    pub fn from_parts(
        input_size: usize,
        hidden_size: usize,
        output_size: usize,
        learning_rate: f64,
        training_step: u64,
        weights_input_hidden: Matrix,
        weights_hidden_output: Matrix,
    ) -> Result<NeuralNetwork> {
        check_topology(input_size, hidden_size, output_size, learning_rate)?;
        if weights_input_hidden.shape() != (hidden_size, input_size) {
            return Err(NetError::Shape {
                op: "weights_input_hidden",
                left: weights_input_hidden.shape(),
                right: (hidden_size, input_size),
            });
        }
        if weights_hidden_output.shape() != (output_size, hidden_size) {
            return Err(NetError::Shape {
                op: "weights_hidden_output",
                left: weights_hidden_output.shape(),
                right: (output_size, hidden_size),
            });
        }
        Ok(NeuralNetwork {
            input_size,
            hidden_size,
            output_size,
            learning_rate,
            training_step,
            weights_input_hidden,
            weights_hidden_output,
        })
    }

    pub fn input_size(&self) -> usize {
        self.input_size
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    pub fn output_size(&self) -> usize {
        self.output_size
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Number of single-sample updates applied so far.
    pub fn training_step(&self) -> u64 {
        self.training_step
    }

    pub fn weights_input_hidden(&self) -> &Matrix {
        &self.weights_input_hidden
    }

    pub fn weights_hidden_output(&self) -> &Matrix {
        &self.weights_hidden_output
    }

    /// Forward pass. Returns the output activations as an
    /// `output_size × 1` column.
    pub fn query(&self, inputs: &[f64]) -> Result<Matrix> {
        let inputs = self.input_column(inputs)?;
        Ok(self.forward(&inputs)?.final_outputs)
    }

    /// Index of the strongest output for `inputs`.
    pub fn classify(&self, inputs: &[f64]) -> Result<usize> {
        let outputs = self.query(inputs)?;
        // output_size > 0 is guaranteed at construction
        Ok(outputs.row_argmax().unwrap_or(0))
    }

    /// One stochastic gradient step on a single sample.
    ///
    /// The output delta is `targets - outputs`, so the scaled gradient is
    /// added to the weights.
    pub fn train(&self, inputs: &[f64], targets: &[f64]) -> Result<NeuralNetwork> {
        if targets.len() != self.output_size {
            return Err(NetError::Input(format!(
                "target vector has length {}, expected {}",
                targets.len(),
                self.output_size
            )));
        }
        if let Some(i) = targets.iter().position(|t| !t.is_finite()) {
            return Err(NetError::Input(format!("target value {i} is not finite")));
        }
        let inputs = self.input_column(inputs)?;
        let targets = Matrix::column(targets);
        let Forward { hidden_outputs, final_outputs } = self.forward(&inputs)?;

        let output_errors = targets.zip_with(&final_outputs, |t, o| t - o)?;
        let hidden_errors = self.weights_hidden_output.transpose().dot(&output_errors)?;

        let lr = self.learning_rate;
        let output_delta = output_errors.zip_with(&final_outputs, |e, o| e * o * (1.0 - o))?;
        let weights_hidden_output = self
            .weights_hidden_output
            .zip_with(&output_delta.dot(&hidden_outputs.transpose())?, |w, d| w + lr * d)?;

        let hidden_delta = hidden_errors.zip_with(&hidden_outputs, |e, h| e * h * (1.0 - h))?;
        let weights_input_hidden = self
            .weights_input_hidden
            .zip_with(&hidden_delta.dot(&inputs.transpose())?, |w, d| w + lr * d)?;

        Ok(NeuralNetwork {
            input_size: self.input_size,
            hidden_size: self.hidden_size,
            output_size: self.output_size,
            learning_rate: lr,
            training_step: self.training_step + 1,
            weights_input_hidden,
            weights_hidden_output,
        })
    }

    /// Number of samples whose predicted class equals its label.
    pub fn validate(&self, inputs: &[Vec<f64>], labels: &[usize]) -> Result<usize> {
        if inputs.len() != labels.len() {
            return Err(NetError::Input(format!(
                "{} validation samples but {} labels",
                inputs.len(),
                labels.len()
            )));
        }
        let mut correct = 0;
        for (input, &label) in inputs.iter().zip(labels) {
            if self.classify(input)? == label {
                correct += 1;
            }
        }
        Ok(correct)
    }

    /// Fraction of correctly classified samples; `0.0` for an empty set.
    pub fn accuracy(&self, inputs: &[Vec<f64>], labels: &[usize]) -> Result<f64> {
        let correct = self.validate(inputs, labels)?;
        if labels.is_empty() {
            return Ok(0.0);
        }
        Ok(correct as f64 / labels.len() as f64)
    }

    fn forward(&self, inputs: &Matrix) -> Result<Forward> {
        let hidden_outputs = sigmoid_matrix(&self.weights_input_hidden.dot(inputs)?);
        let final_outputs = sigmoid_matrix(&self.weights_hidden_output.dot(&hidden_outputs)?);
        Ok(Forward { hidden_outputs, final_outputs })
    }

    fn input_column(&self, inputs: &[f64]) -> Result<Matrix> {
        if inputs.len() != self.input_size {
            return Err(NetError::Input(format!(
                "input vector has length {}, expected {}",
                inputs.len(),
                self.input_size
            )));
        }
        if let Some(i) = inputs.iter().position(|x| !x.is_finite()) {
            return Err(NetError::Input(format!("input value {i} is not finite")));
        }
        Ok(Matrix::column(inputs))
    }
}

fn check_topology(
    input_size: usize,
    hidden_size: usize,
    output_size: usize,
    learning_rate: f64,
) -> Result<()> {
    if input_size == 0 || hidden_size == 0 || output_size == 0 {
        return Err(NetError::Input(format!(
            "layer sizes must be positive, got {input_size}/{hidden_size}/{output_size}"
        )));
    }
    if !(learning_rate.is_finite() && learning_rate > 0.0) {
        return Err(NetError::Input(format!(
            "learning rate must be positive and finite, got {learning_rate}"
        )));
    }
    Ok(())
}
