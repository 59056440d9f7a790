use crate::error::{check_same_shape, unwrap_or_panic, LinAlgError, Position, Shape};
use crate::matrix::Matrix;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut};

/// A dense, owned vector of real numbers.
///
/// An empty vector (the [`Default`]) has dimension zero and owns no storage. Moving a vector
/// out of a binding with [`std::mem::take`] leaves such an empty vector behind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vector {
    pub(crate) data: DVector<f64>,
}

impl Default for Vector {
    fn default() -> Self {
        Self {
            data: DVector::zeros(0),
        }
    }
}

impl Vector {
    /// A zero-initialized vector with the given dimension.
    pub fn zeros(dim: usize) -> Self {
        Self {
            data: DVector::zeros(dim),
        }
    }

    pub fn from_slice(values: &[f64]) -> Self {
        Self {
            data: DVector::from_column_slice(values),
        }
    }

    pub fn dim(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> Shape {
        Shape::Vector(self.dim())
    }

    /// Replaces the contents with zero-initialized storage of the given dimension.
    pub fn init(&mut self, dim: usize) {
        self.data = DVector::zeros(dim);
    }

    /// Releases the storage, leaving an empty vector.
    pub fn erase(&mut self) {
        self.data = DVector::zeros(0);
    }

    /// Replaces the contents by the given values, resizing as needed.
    pub fn assign(&mut self, values: &[f64]) {
        if self.dim() == values.len() {
            self.data.copy_from_slice(values);
        } else {
            self.data = DVector::from_column_slice(values);
        }
    }

    pub fn fill(&mut self, value: f64) {
        self.data.fill(value);
    }

    pub fn as_slice(&self) -> &[f64] {
        self.data.as_slice()
    }

    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        self.data.as_mut_slice()
    }

    pub fn iter(&self) -> impl '_ + Iterator<Item = &f64> {
        self.data.iter()
    }

    pub fn as_dvector(&self) -> &DVector<f64> {
        &self.data
    }

    pub fn into_dvector(self) -> DVector<f64> {
        self.data
    }

    fn check_index(&self, index: usize) -> Result<(), LinAlgError> {
        if self.is_empty() {
            Err(LinAlgError::Uninitialized)
        } else if index >= self.dim() {
            Err(LinAlgError::IndexOutOfRange {
                position: Position::Linear(index),
                shape: self.shape(),
            })
        } else {
            Ok(())
        }
    }

    pub fn get(&self, index: usize) -> Result<f64, LinAlgError> {
        self.check_index(index)?;
        Ok(self.data[index])
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut f64, LinAlgError> {
        self.check_index(index)?;
        Ok(&mut self.data[index])
    }

    pub fn try_dot(&self, other: &Vector) -> Result<f64, LinAlgError> {
        check_same_shape("dot product", self.shape(), other.shape())?;
        Ok(self.data.dot(&other.data))
    }

    /// Computes the dot product.
    ///
    /// # Panics
    ///
    /// Panics if the dimensions differ.
    #[track_caller]
    pub fn dot(&self, other: &Vector) -> f64 {
        unwrap_or_panic(self.try_dot(other))
    }

    pub fn try_cross(&self, other: &Vector) -> Result<Vector, LinAlgError> {
        for operand in [self, other] {
            if operand.dim() != 3 {
                return Err(LinAlgError::InvalidDimension {
                    operation: "Cross product",
                    expected: 3,
                    found: operand.dim(),
                });
            }
        }
        let (a, b) = (&self.data, &other.data);
        Ok(Vector::from([
            a[1] * b[2] - a[2] * b[1],
            a[2] * b[0] - a[0] * b[2],
            a[0] * b[1] - a[1] * b[0],
        ]))
    }

    /// Computes the cross product of two 3-vectors.
    ///
    /// # Panics
    ///
    /// Panics if either operand is not a 3-vector.
    #[track_caller]
    pub fn cross(&self, other: &Vector) -> Vector {
        unwrap_or_panic(self.try_cross(other))
    }

    /// The tensor (outer) product $a b^T$ of an $m$-vector and an $n$-vector, an $m \times n$ matrix.
    pub fn tensor_product(&self, other: &Vector) -> Matrix {
        Matrix::from(&self.data * other.data.transpose())
    }

    pub fn norm(&self) -> f64 {
        self.data.norm()
    }

    /// Largest absolute entry, zero for an empty vector.
    pub fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0, |max, x| f64::max(max, x.abs()))
    }

    pub(crate) fn try_add_assign(&mut self, rhs: &Vector) -> Result<(), LinAlgError> {
        check_same_shape("vector addition", self.shape(), rhs.shape())?;
        self.data += &rhs.data;
        Ok(())
    }

    pub(crate) fn try_sub_assign(&mut self, rhs: &Vector) -> Result<(), LinAlgError> {
        check_same_shape("vector subtraction", self.shape(), rhs.shape())?;
        self.data -= &rhs.data;
        Ok(())
    }

    /// Stores `lhs - self` in `self`.
    pub(crate) fn try_rsub_assign(&mut self, lhs: &Vector) -> Result<(), LinAlgError> {
        check_same_shape("vector subtraction", lhs.shape(), self.shape())?;
        self.data.neg_mut();
        self.data += &lhs.data;
        Ok(())
    }

    pub fn try_add(&self, rhs: &Vector) -> Result<Vector, LinAlgError> {
        check_same_shape("vector addition", self.shape(), rhs.shape())?;
        Ok(Vector {
            data: &self.data + &rhs.data,
        })
    }

    pub fn try_sub(&self, rhs: &Vector) -> Result<Vector, LinAlgError> {
        check_same_shape("vector subtraction", self.shape(), rhs.shape())?;
        Ok(Vector {
            data: &self.data - &rhs.data,
        })
    }

    /// Computes the vector-matrix product $v^T A$, returned as a vector.
    pub fn try_mul_matrix(&self, matrix: &Matrix) -> Result<Vector, LinAlgError> {
        if self.dim() != matrix.nrows() {
            return Err(LinAlgError::DimensionMismatch {
                operation: "vector-matrix multiplication",
                lhs: self.shape(),
                rhs: matrix.shape(),
            });
        }
        Ok(Vector {
            data: matrix.data.tr_mul(&self.data),
        })
    }
}

impl Index<usize> for Vector {
    type Output = f64;

    #[track_caller]
    fn index(&self, index: usize) -> &f64 {
        unwrap_or_panic(self.check_index(index));
        &self.data[index]
    }
}

impl IndexMut<usize> for Vector {
    #[track_caller]
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        unwrap_or_panic(self.check_index(index));
        &mut self.data[index]
    }
}

impl From<Vec<f64>> for Vector {
    fn from(values: Vec<f64>) -> Self {
        Self {
            data: DVector::from_vec(values),
        }
    }
}

impl<const N: usize> From<[f64; N]> for Vector {
    fn from(values: [f64; N]) -> Self {
        Self::from_slice(&values)
    }
}

impl From<DVector<f64>> for Vector {
    fn from(data: DVector<f64>) -> Self {
        Self { data }
    }
}

impl<'a> IntoIterator for &'a Vector {
    type Item = &'a f64;
    type IntoIter = std::slice::Iter<'a, f64>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}
