use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::error::{NetError, Result};

/// Dense row-major matrix of `f64`.
///
/// Dimensions are fixed for the lifetime of a value and every row has
/// exactly `cols` cells. All operations allocate a fresh result; no method
/// mutates `self`.
#[derive(Debug, Clone, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Matrix {
        Matrix {
            rows,
            cols,
            data: vec![vec![0.0; cols]; rows],
        }
    }

    /// Builds a matrix from rows, rejecting ragged input.
    pub fn from_data(data: Vec<Vec<f64>>) -> Result<Matrix> {
        let cols = data.first().map_or(0, Vec::len);
        if let Some((i, row)) = data.iter().enumerate().find(|(_, row)| row.len() != cols) {
            return Err(NetError::Input(format!(
                "row {} has {} columns, expected {}",
                i,
                row.len(),
                cols
            )));
        }
        Ok(Matrix {
            rows: data.len(),
            cols,
            data,
        })
    }

    /// Turns a vector of length n into an n×1 column matrix.
    pub fn column(values: &[f64]) -> Matrix {
        Matrix {
            rows: values.len(),
            cols: 1,
            data: values.iter().map(|&v| vec![v]).collect(),
        }
    }

    /// Samples every cell independently from N(0, std_dev), row by row.
    pub fn random_normal<R: Rng + ?Sized>(
        rows: usize,
        cols: usize,
        std_dev: f64,
        rng: &mut R,
    ) -> Result<Matrix> {
        let normal = Normal::new(0.0, std_dev)
            .map_err(|e| NetError::Input(format!("invalid standard deviation {std_dev}: {e}")))?;
        let data = (0..rows)
            .map(|_| (0..cols).map(|_| normal.sample(rng)).collect())
            .collect();
        Ok(Matrix { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.data.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn as_rows(&self) -> &[Vec<f64>] {
        &self.data
    }

    /// All cells in row-major order.
    pub fn to_flat(&self) -> Vec<f64> {
        self.data.iter().flatten().copied().collect()
    }

    /// Swaps rows and columns. A matrix without rows is returned as is.
    pub fn transpose(&self) -> Matrix {
        if self.rows == 0 {
            return self.clone();
        }

        let mut res = Matrix::zeros(self.cols, self.rows);
        for i in 0..res.rows {
            for j in 0..res.cols {
                res.data[i][j] = self.data[j][i];
            }
        }
        res
    }

    /// Matrix product `self · rhs`. Requires `self.cols == rhs.rows`.
    pub fn dot(&self, rhs: &Matrix) -> Result<Matrix> {
        if self.cols != rhs.rows {
            return Err(NetError::Shape {
                op: "dot",
                left: self.shape(),
                right: rhs.shape(),
            });
        }

        let mut res = Matrix::zeros(self.rows, rhs.cols);
        for i in 0..res.rows {
            for j in 0..res.cols {
                let mut sum = 0.0;
                for k in 0..self.cols {
                    sum += self.data[i][k] * rhs.data[k][j];
                }
                res.data[i][j] = sum;
            }
        }
        Ok(res)
    }

    /// Combines two equally shaped matrices cell by cell with `op`.
    pub fn zip_with<F>(&self, rhs: &Matrix, op: F) -> Result<Matrix>
    where
        F: Fn(f64, f64) -> f64,
    {
        if self.shape() != rhs.shape() {
            return Err(NetError::Shape {
                op: "zip_with",
                left: self.shape(),
                right: rhs.shape(),
            });
        }

        let data = self
            .data
            .iter()
            .zip(&rhs.data)
            .map(|(row_a, row_b)| row_a.iter().zip(row_b).map(|(&a, &b)| op(a, b)).collect())
            .collect();
        Ok(Matrix {
            rows: self.rows,
            cols: self.cols,
            data,
        })
    }

    pub fn map<F>(&self, functor: F) -> Matrix
    where
        F: Fn(f64) -> f64,
    {
        Matrix {
            rows: self.rows,
            cols: self.cols,
            data: self
                .data
                .iter()
                .map(|row| row.iter().map(|&x| functor(x)).collect())
                .collect(),
        }
    }

    /// Index of the row holding the overall largest cell.
    ///
    /// The current best is only replaced on a strictly greater value, so ties
    /// resolve to the lowest row index. Returns `None` for a matrix without
    /// cells.
    pub fn row_argmax(&self) -> Option<usize> {
        if self.cols == 0 {
            return None;
        }
        let mut best = self.data.first()?[0];
        let mut index = 0;
        for (i, row) in self.data.iter().enumerate() {
            let local = row[1..].iter().fold(row[0], |m, &x| if x > m { x } else { m });
            if local > best {
                best = local;
                index = i;
            }
        }
        Some(index)
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix { rows: 0, cols: 0, data: vec![] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn m(data: Vec<Vec<f64>>) -> Matrix {
        Matrix::from_data(data).unwrap()
    }

    fn identity(n: usize) -> Matrix {
        let mut rows = vec![vec![0.0; n]; n];
        for (i, row) in rows.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        m(rows)
    }

    fn matrix_strategy() -> impl Strategy<Value = Matrix> {
        (1..6usize, 1..6usize).prop_flat_map(|(r, c)| {
            prop::collection::vec(prop::collection::vec(-1e3..1e3f64, c), r)
                .prop_map(|rows| Matrix::from_data(rows).unwrap())
        })
    }

    #[test]
    fn transpose_square() {
        assert_eq!(m(vec![vec![1.0, 3.0], vec![2.0, 4.0]]).transpose(), m(vec![vec![1.0, 2.0], vec![3.0, 4.0]]));
    }

    #[test]
    fn transpose_single_row_and_column() {
        let row = m(vec![vec![1.0, 2.0, 3.0, 4.0]]);
        let col = m(vec![vec![1.0], vec![2.0], vec![3.0], vec![4.0]]);
        assert_eq!(row.transpose(), col);
        assert_eq!(col.transpose(), row);
    }

    #[test]
    fn transpose_without_rows_is_unchanged() {
        let empty = Matrix::default();
        assert_eq!(empty.transpose(), empty);
    }

    #[test]
    fn column_from_vector() {
        let col = Matrix::column(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(col.shape(), (4, 1));
        assert_eq!(col.to_flat(), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn dot_products() {
        let a = m(vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        let v = m(vec![vec![3.0], vec![4.0]]);
        assert_eq!(a.dot(&v).unwrap(), m(vec![vec![11.0], vec![25.0]]));
        assert_eq!(a.dot(&a).unwrap(), m(vec![vec![7.0, 10.0], vec![15.0, 22.0]]));
    }

    #[test]
    fn dot_rejects_incompatible_shapes() {
        let a = Matrix::zeros(2, 3);
        let b = Matrix::zeros(2, 3);
        assert!(matches!(
            a.dot(&b),
            Err(NetError::Shape { op: "dot", left: (2, 3), right: (2, 3) })
        ));
    }

    #[test]
    fn zip_with_adds_cells() {
        let sum = m(vec![vec![1.0], vec![3.0]])
            .zip_with(&m(vec![vec![1.0], vec![-8.0]]), |a, b| a + b)
            .unwrap();
        assert_eq!(sum, m(vec![vec![2.0], vec![-5.0]]));
    }

    #[test]
    fn zip_with_rejects_shape_mismatch() {
        let err = Matrix::zeros(2, 1).zip_with(&Matrix::zeros(1, 2), |a, _| a);
        assert!(matches!(err, Err(NetError::Shape { .. })));
    }

    #[test]
    fn from_data_rejects_ragged_rows() {
        assert!(matches!(
            Matrix::from_data(vec![vec![1.0, 2.0], vec![3.0]]),
            Err(NetError::Input(_))
        ));
    }

    #[test]
    fn row_argmax_picks_largest_row() {
        assert_eq!(m(vec![vec![0.1], vec![0.9], vec![0.3]]).row_argmax(), Some(1));
    }

    #[test]
    fn row_argmax_ties_go_to_first_row() {
        assert_eq!(m(vec![vec![0.9], vec![0.9]]).row_argmax(), Some(0));
    }

    #[test]
    fn row_argmax_considers_every_cell_of_a_row() {
        assert_eq!(m(vec![vec![0.5, 0.2], vec![0.1, 0.7]]).row_argmax(), Some(1));
        assert_eq!(Matrix::default().row_argmax(), None);
    }

    #[test]
    fn random_normal_is_deterministic_for_a_seed() {
        let a = Matrix::random_normal(3, 4, 0.5, &mut StdRng::seed_from_u64(7)).unwrap();
        let b = Matrix::random_normal(3, 4, 0.5, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(a.shape(), (3, 4));
        assert_eq!(a, b);
    }

    #[test]
    fn random_normal_rejects_bad_std_dev() {
        let mut rng = StdRng::seed_from_u64(0);
        assert!(Matrix::random_normal(2, 2, f64::NAN, &mut rng).is_err());
    }

    proptest! {
        #[test]
        fn transpose_is_an_involution(a in matrix_strategy()) {
            prop_assert_eq!(a.transpose().transpose(), a);
        }

        #[test]
        fn identity_is_neutral_for_dot(a in matrix_strategy()) {
            let id = identity(a.cols());
            prop_assert_eq!(a.dot(&id).unwrap(), a);
        }
    }
}
