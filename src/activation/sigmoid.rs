use crate::math::matrix::Matrix;

/// Logistic function `1 / (1 + e^-x)`.
///
/// No clamping: large magnitudes saturate to exactly 0.0 or 1.0.
pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Applies [`sigmoid`] to every cell.
pub fn sigmoid_matrix(m: &Matrix) -> Matrix {
    m.map(sigmoid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_is_one_half() {
        assert_eq!(sigmoid(0.0), 0.5);
    }

    #[test]
    fn saturates_without_clamping() {
        assert_eq!(sigmoid(1000.0), 1.0);
        assert_eq!(sigmoid(-1000.0), 0.0);
    }

    #[test]
    fn is_symmetric() {
        let x = 1.7;
        assert!((sigmoid(x) + sigmoid(-x) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn matrix_version_keeps_shape() {
        let m = Matrix::from_data(vec![vec![0.0, 0.0], vec![0.0, 0.0]]).unwrap();
        let out = sigmoid_matrix(&m);
        assert_eq!(out.shape(), (2, 2));
        assert!(out.to_flat().iter().all(|&v| v == 0.5));
    }
}
