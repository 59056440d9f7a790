//! Operator overloads for [`Vector`] and [`Matrix`].
//!
//! Whenever an operand is passed by value its storage is reused for the result, so an expression
//! chain such as `a * 2.0 + &b - &c` allocates at most once.
use crate::error::unwrap_or_panic;
use crate::matrix::Matrix;
use crate::vector::Vector;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

macro_rules! impl_add_sub {
    ($t:ty) => {
        impl Add<$t> for $t {
            type Output = $t;

            #[track_caller]
            fn add(mut self, rhs: $t) -> $t {
                unwrap_or_panic(self.try_add_assign(&rhs));
                self
            }
        }

        impl<'a> Add<&'a $t> for $t {
            type Output = $t;

            #[track_caller]
            fn add(mut self, rhs: &'a $t) -> $t {
                unwrap_or_panic(self.try_add_assign(rhs));
                self
            }
        }

        impl<'a> Add<$t> for &'a $t {
            type Output = $t;

            #[track_caller]
            fn add(self, mut rhs: $t) -> $t {
                unwrap_or_panic(rhs.try_add_assign(self));
                rhs
            }
        }

        impl<'a, 'b> Add<&'b $t> for &'a $t {
            type Output = $t;

            #[track_caller]
            fn add(self, rhs: &'b $t) -> $t {
                unwrap_or_panic(self.try_add(rhs))
            }
        }

        impl Sub<$t> for $t {
            type Output = $t;

            #[track_caller]
            fn sub(mut self, rhs: $t) -> $t {
                unwrap_or_panic(self.try_sub_assign(&rhs));
                self
            }
        }

        impl<'a> Sub<&'a $t> for $t {
            type Output = $t;

            #[track_caller]
            fn sub(mut self, rhs: &'a $t) -> $t {
                unwrap_or_panic(self.try_sub_assign(rhs));
                self
            }
        }

        impl<'a> Sub<$t> for &'a $t {
            type Output = $t;

            #[track_caller]
            fn sub(self, mut rhs: $t) -> $t {
                unwrap_or_panic(rhs.try_rsub_assign(self));
                rhs
            }
        }

        impl<'a, 'b> Sub<&'b $t> for &'a $t {
            type Output = $t;

            #[track_caller]
            fn sub(self, rhs: &'b $t) -> $t {
                unwrap_or_panic(self.try_sub(rhs))
            }
        }

        impl AddAssign<$t> for $t {
            #[track_caller]
            fn add_assign(&mut self, rhs: $t) {
                unwrap_or_panic(self.try_add_assign(&rhs));
            }
        }

        impl<'a> AddAssign<&'a $t> for $t {
            #[track_caller]
            fn add_assign(&mut self, rhs: &'a $t) {
                unwrap_or_panic(self.try_add_assign(rhs));
            }
        }

        impl SubAssign<$t> for $t {
            #[track_caller]
            fn sub_assign(&mut self, rhs: $t) {
                unwrap_or_panic(self.try_sub_assign(&rhs));
            }
        }

        impl<'a> SubAssign<&'a $t> for $t {
            #[track_caller]
            fn sub_assign(&mut self, rhs: &'a $t) {
                unwrap_or_panic(self.try_sub_assign(rhs));
            }
        }
    };
}

// Scalar operations never fail; division by zero follows IEEE semantics.
macro_rules! impl_scalar_ops {
    ($t:ty) => {
        impl Mul<f64> for $t {
            type Output = $t;

            fn mul(mut self, scalar: f64) -> $t {
                self.data *= scalar;
                self
            }
        }

        impl<'a> Mul<f64> for &'a $t {
            type Output = $t;

            fn mul(self, scalar: f64) -> $t {
                self.clone() * scalar
            }
        }

        impl Mul<$t> for f64 {
            type Output = $t;

            fn mul(self, rhs: $t) -> $t {
                rhs * self
            }
        }

        impl<'a> Mul<&'a $t> for f64 {
            type Output = $t;

            fn mul(self, rhs: &'a $t) -> $t {
                rhs * self
            }
        }

        impl Div<f64> for $t {
            type Output = $t;

            fn div(mut self, scalar: f64) -> $t {
                self.data /= scalar;
                self
            }
        }

        impl<'a> Div<f64> for &'a $t {
            type Output = $t;

            fn div(self, scalar: f64) -> $t {
                self.clone() / scalar
            }
        }

        impl MulAssign<f64> for $t {
            fn mul_assign(&mut self, scalar: f64) {
                self.data *= scalar;
            }
        }

        impl DivAssign<f64> for $t {
            fn div_assign(&mut self, scalar: f64) {
                self.data /= scalar;
            }
        }

        impl Neg for $t {
            type Output = $t;

            fn neg(mut self) -> $t {
                self.data.neg_mut();
                self
            }
        }

        impl<'a> Neg for &'a $t {
            type Output = $t;

            fn neg(self) -> $t {
                -self.clone()
            }
        }
    };
}

impl_add_sub!(Vector);
impl_add_sub!(Matrix);
impl_scalar_ops!(Vector);
impl_scalar_ops!(Matrix);

// Products cannot generally be computed in place, so every operand combination forwards to the
// borrowing implementation.
macro_rules! impl_product {
    ($lhs:ty, $rhs:ty, $out:ty, $method:ident) => {
        impl<'a, 'b> Mul<&'b $rhs> for &'a $lhs {
            type Output = $out;

            #[track_caller]
            fn mul(self, rhs: &'b $rhs) -> $out {
                unwrap_or_panic(self.$method(rhs))
            }
        }

        impl<'a> Mul<$rhs> for &'a $lhs {
            type Output = $out;

            #[track_caller]
            fn mul(self, rhs: $rhs) -> $out {
                self * &rhs
            }
        }

        impl<'b> Mul<&'b $rhs> for $lhs {
            type Output = $out;

            #[track_caller]
            fn mul(self, rhs: &'b $rhs) -> $out {
                &self * rhs
            }
        }

        impl Mul<$rhs> for $lhs {
            type Output = $out;

            #[track_caller]
            fn mul(self, rhs: $rhs) -> $out {
                &self * &rhs
            }
        }
    };
}

impl_product!(Matrix, Matrix, Matrix, try_mul_matrix);
impl_product!(Matrix, Vector, Vector, try_mul_vector);
impl_product!(Vector, Matrix, Vector, try_mul_matrix);
