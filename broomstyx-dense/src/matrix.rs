use crate::error::{check_same_shape, unwrap_or_panic, LinAlgError, Position, Shape};
use crate::vector::Vector;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// A dense, owned, column-major matrix of real numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    pub(crate) data: DMatrix<f64>,
}

impl Default for Matrix {
    fn default() -> Self {
        Self {
            data: DMatrix::zeros(0, 0),
        }
    }
}

impl Matrix {
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            data: DMatrix::zeros(nrows, ncols),
        }
    }

    pub fn identity(n: usize) -> Self {
        Self {
            data: DMatrix::identity(n, n),
        }
    }

    /// Builds a matrix from a list of rows.
    ///
    /// Returns an error if the rows do not all have the same length.
    pub fn from_rows<R: AsRef<[f64]>>(rows: &[R]) -> Result<Self, LinAlgError> {
        let nrows = rows.len();
        let ncols = rows.first().map(|row| row.as_ref().len()).unwrap_or(0);
        for (i, row) in rows.iter().enumerate() {
            let found = row.as_ref().len();
            if found != ncols {
                return Err(LinAlgError::RaggedRows {
                    row: i,
                    expected: ncols,
                    found,
                });
            }
        }
        let data = DMatrix::from_fn(nrows, ncols, |i, j| rows[i].as_ref()[j]);
        Ok(Self { data })
    }

    /// Builds a matrix from entries stored in column-major order.
    ///
    /// # Panics
    ///
    /// Panics if `values.len() != nrows * ncols`.
    pub fn from_column_slice(nrows: usize, ncols: usize, values: &[f64]) -> Self {
        Self {
            data: DMatrix::from_column_slice(nrows, ncols, values),
        }
    }

    pub fn nrows(&self) -> usize {
        self.data.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.data.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    pub fn shape(&self) -> Shape {
        Shape::Matrix(self.nrows(), self.ncols())
    }

    pub fn init(&mut self, nrows: usize, ncols: usize) {
        self.data = DMatrix::zeros(nrows, ncols);
    }

    pub fn erase(&mut self) {
        self.data = DMatrix::zeros(0, 0);
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    /// Entries in column-major order.
    pub fn as_slice(&self) -> &[f64] {
        self.data.as_slice()
    }

    pub fn as_dmatrix(&self) -> &DMatrix<f64> {
        &self.data
    }

    pub fn into_dmatrix(self) -> DMatrix<f64> {
        self.data
    }

    pub fn column(&self, j: usize) -> Result<Vector, LinAlgError> {
        self.check_index(0, j)?;
        Ok(Vector::from(self.data.column(j).into_owned()))
    }

    fn check_index(&self, i: usize, j: usize) -> Result<(), LinAlgError> {
        if self.is_empty() {
            Err(LinAlgError::Uninitialized)
        } else if i >= self.nrows() || j >= self.ncols() {
            Err(LinAlgError::IndexOutOfRange {
                position: Position::Entry(i, j),
                shape: self.shape(),
            })
        } else {
            Ok(())
        }
    }

    pub fn get(&self, i: usize, j: usize) -> Result<f64, LinAlgError> {
        self.check_index(i, j)?;
        Ok(self.data[(i, j)])
    }

    pub fn get_mut(&mut self, i: usize, j: usize) -> Result<&mut f64, LinAlgError> {
        self.check_index(i, j)?;
        Ok(&mut self.data[(i, j)])
    }

    pub fn transpose(&self) -> Matrix {
        Matrix {
            data: self.data.transpose(),
        }
    }

    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |max, x| f64::max(max, x.abs()))
    }

    pub(crate) fn try_add_assign(&mut self, rhs: &Matrix) -> Result<(), LinAlgError> {
        check_same_shape("matrix addition", self.shape(), rhs.shape())?;
        self.data += &rhs.data;
        Ok(())
    }

    pub(crate) fn try_sub_assign(&mut self, rhs: &Matrix) -> Result<(), LinAlgError> {
        check_same_shape("matrix subtraction", self.shape(), rhs.shape())?;
        self.data -= &rhs.data;
        Ok(())
    }

    pub(crate) fn try_rsub_assign(&mut self, lhs: &Matrix) -> Result<(), LinAlgError> {
        check_same_shape("matrix subtraction", lhs.shape(), self.shape())?;
        self.data.neg_mut();
        self.data += &lhs.data;
        Ok(())
    }

    pub fn try_add(&self, rhs: &Matrix) -> Result<Matrix, LinAlgError> {
        check_same_shape("matrix addition", self.shape(), rhs.shape())?;
        Ok(Matrix {
            data: &self.data + &rhs.data,
        })
    }

    pub fn try_sub(&self, rhs: &Matrix) -> Result<Matrix, LinAlgError> {
        check_same_shape("matrix subtraction", self.shape(), rhs.shape())?;
        Ok(Matrix {
            data: &self.data - &rhs.data,
        })
    }

    pub fn try_mul_matrix(&self, rhs: &Matrix) -> Result<Matrix, LinAlgError> {
        if self.ncols() != rhs.nrows() {
            return Err(LinAlgError::DimensionMismatch {
                operation: "matrix multiplication",
                lhs: self.shape(),
                rhs: rhs.shape(),
            });
        }
        Ok(Matrix {
            data: &self.data * &rhs.data,
        })
    }

    pub fn try_mul_vector(&self, rhs: &Vector) -> Result<Vector, LinAlgError> {
        if self.ncols() != rhs.dim() {
            return Err(LinAlgError::DimensionMismatch {
                operation: "matrix-vector multiplication",
                lhs: self.shape(),
                rhs: rhs.shape(),
            });
        }
        Ok(Vector::from(&self.data * &rhs.data))
    }
}

/// Returns the transpose of the given matrix.
pub fn trp(matrix: &Matrix) -> Matrix {
    matrix.transpose()
}

impl Index<(usize, usize)> for Matrix {
    type Output = f64;

    #[track_caller]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        unwrap_or_panic(self.check_index(i, j));
        &self.data[(i, j)]
    }
}

impl IndexMut<(usize, usize)> for Matrix {
    #[track_caller]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        unwrap_or_panic(self.check_index(i, j));
        &mut self.data[(i, j)]
    }
}

impl From<DMatrix<f64>> for Matrix {
    fn from(data: DMatrix<f64>) -> Self {
        Self { data }
    }
}

impl<const R: usize, const C: usize> From<[[f64; C]; R]> for Matrix {
    fn from(rows: [[f64; C]; R]) -> Self {
        Self {
            data: DMatrix::from_fn(R, C, |i, j| rows[i][j]),
        }
    }
}
