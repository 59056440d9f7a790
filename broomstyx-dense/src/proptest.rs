//! Strategies for generating vectors and matrices in property-based tests.
use crate::matrix::Matrix;
use crate::vector::Vector;
use ::proptest::collection::vec;
use ::proptest::prelude::*;
use nalgebra::DMatrix;

// Keep entries in a modest range, so that sums and products of generated values stay far away
// from overflow and loss of all significant digits.
fn entry() -> impl Strategy<Value = f64> {
    -10.0..10.0
}

pub fn vector(dim: usize) -> impl Strategy<Value = Vector> {
    vec(entry(), dim).prop_map(Vector::from)
}

pub fn matrix(nrows: usize, ncols: usize) -> impl Strategy<Value = Matrix> {
    vec(entry(), nrows * ncols).prop_map(move |values| Matrix::from_column_slice(nrows, ncols, &values))
}

/// Square matrices that are strictly diagonally dominant, hence non-singular and well-conditioned.
pub fn well_conditioned_matrix(n: usize) -> impl Strategy<Value = Matrix> {
    vec(-1.0f64..1.0, n * n).prop_map(move |values| {
        let mut data = DMatrix::from_column_slice(n, n, &values);
        for i in 0..n {
            let row_sum: f64 = data.row(i).iter().map(|x| x.abs()).sum();
            data[(i, i)] = row_sum + 1.0;
        }
        Matrix::from(data)
    })
}

/// A pair of matrices of the same, arbitrary shape with at most `max_dim` rows and columns.
pub fn matrix_pair(max_dim: usize) -> impl Strategy<Value = (Matrix, Matrix)> {
    (0..=max_dim, 0..=max_dim).prop_flat_map(|(nrows, ncols)| (matrix(nrows, ncols), matrix(nrows, ncols)))
}

/// A pair of vectors of the same, arbitrary dimension of at most `max_dim`.
pub fn vector_pair(max_dim: usize) -> impl Strategy<Value = (Vector, Vector)> {
    (0..=max_dim).prop_flat_map(|dim| (vector(dim), vector(dim)))
}
