use std::error::Error;
use std::fmt;
use std::fmt::Display;

/// The shape of a dense operand, used for error reporting.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Shape {
    Vector(usize),
    Matrix(usize, usize),
}

impl Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Vector(dim) => write!(f, "[ {} ]", dim),
            Shape::Matrix(nrows, ncols) => write!(f, "[ {} x {} ]", nrows, ncols),
        }
    }
}

/// A position that was used to index into a dense container.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Position {
    Linear(usize),
    Entry(usize, usize),
}

impl Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Linear(i) => write!(f, "({})", i),
            Position::Entry(i, j) => write!(f, "({}, {})", i, j),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinAlgError {
    /// The shapes of the two operands of a binary operation are not compatible.
    DimensionMismatch {
        operation: &'static str,
        lhs: Shape,
        rhs: Shape,
    },
    /// An operation that is only defined for square matrices received a non-square matrix.
    NotSquare { nrows: usize, ncols: usize },
    /// A zero pivot was encountered during LU factorization.
    Singular,
    /// Entry access into a container without storage.
    Uninitialized,
    IndexOutOfRange { position: Position, shape: Shape },
    /// An operation that is only defined for a specific dimension received another.
    InvalidDimension {
        operation: &'static str,
        expected: usize,
        found: usize,
    },
    /// Rows of a nested literal do not all have the same length.
    RaggedRows { row: usize, expected: usize, found: usize },
}

impl Display for LinAlgError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            LinAlgError::DimensionMismatch { operation, lhs, rhs } => {
                write!(f, "Size mismatch in operands for {}: dim(A) = {}, dim(B) = {}", operation, lhs, rhs)
            }
            LinAlgError::NotSquare { nrows, ncols } => {
                write!(f, "Cannot invert non-square matrix: dim(A) = [ {} x {} ]", nrows, ncols)
            }
            LinAlgError::Singular => write!(f, "Cannot invert singular matrix: zero pivot encountered"),
            LinAlgError::Uninitialized => write!(f, "Cannot access entries of an uninitialized (empty) container"),
            LinAlgError::IndexOutOfRange { position, shape } => {
                write!(f, "Index {} is out of range for container with dimensions {}", position, shape)
            }
            LinAlgError::InvalidDimension {
                operation,
                expected,
                found,
            } => {
                write!(f, "{} requires dimension {}, but got {}", operation, expected, found)
            }
            LinAlgError::RaggedRows { row, expected, found } => {
                write!(f, "Row {} has {} entries, but previous rows have {}", row, found, expected)
            }
        }
    }
}

impl Error for LinAlgError {}

pub(crate) fn check_same_shape(operation: &'static str, lhs: Shape, rhs: Shape) -> Result<(), LinAlgError> {
    if lhs == rhs {
        Ok(())
    } else {
        Err(LinAlgError::DimensionMismatch { operation, lhs, rhs })
    }
}

/// Operators cannot return errors, so shape violations abort with the error message.
#[track_caller]
pub(crate) fn unwrap_or_panic<T>(result: Result<T, LinAlgError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("{}", err),
    }
}
