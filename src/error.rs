use thiserror::Error;

/// Every failure the library can surface to a caller.
///
/// Cancellation of a training run is deliberately absent: a cancelled run
/// still returns a usable network.
#[derive(Debug, Error)]
pub enum NetError {
    /// Malformed numeric text, wrong vector length or a label outside the
    /// configured class range.
    #[error("invalid input: {0}")]
    Input(String),

    /// Two matrices with incompatible dimensions were combined.
    #[error("shape mismatch in {op}: {left:?} vs {right:?}")]
    Shape {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A checkpoint could not be decoded into a valid network.
    #[error("malformed checkpoint: {0}")]
    Format(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, NetError>;
