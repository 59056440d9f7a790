use crate::error::{unwrap_or_panic, LinAlgError};
use crate::matrix::Matrix;
use crate::vector::Vector;
use log::debug;

impl Matrix {
    /// Computes the inverse by LU factorization with partial pivoting.
    ///
    /// The inverse of an empty matrix is empty.
    pub fn try_inverse(&self) -> Result<Matrix, LinAlgError> {
        if !self.is_square() {
            return Err(LinAlgError::NotSquare {
                nrows: self.nrows(),
                ncols: self.ncols(),
            });
        }
        if self.is_empty() {
            return Ok(Matrix::default());
        }
        let lu = self.data.clone().lu();
        match lu.try_inverse() {
            Some(inverse) => Ok(Matrix::from(inverse)),
            None => {
                debug!("LU factorization of {} matrix produced a zero pivot", self.shape());
                Err(LinAlgError::Singular)
            }
        }
    }

    /// Computes the inverse in place, leaving `self` untouched on failure.
    pub fn try_invert_mut(&mut self) -> Result<(), LinAlgError> {
        let inverse = self.try_inverse()?;
        self.data = inverse.data;
        Ok(())
    }

    /// Solves `self * x = b`.
    pub fn try_solve(&self, b: &Vector) -> Result<Vector, LinAlgError> {
        if !self.is_square() {
            return Err(LinAlgError::NotSquare {
                nrows: self.nrows(),
                ncols: self.ncols(),
            });
        }
        if b.dim() != self.nrows() {
            return Err(LinAlgError::DimensionMismatch {
                operation: "linear solve",
                lhs: self.shape(),
                rhs: b.shape(),
            });
        }
        let lu = self.data.clone().lu();
        lu.solve(b.as_dvector())
            .map(Vector::from)
            .ok_or(LinAlgError::Singular)
    }
}

/// Returns the inverse of a square, non-singular matrix.
///
/// # Panics
///
/// Panics if the matrix is not square or is singular. Use [`Matrix::try_inverse`] to handle
/// these cases.
#[track_caller]
pub fn inv(matrix: &Matrix) -> Matrix {
    unwrap_or_panic(matrix.try_inverse())
}
