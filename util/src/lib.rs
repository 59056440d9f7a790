/// Poor man's approx assertion for dense vectors and matrices.
///
/// Works with any pair of operands whose difference provides `max_abs()`.
#[macro_export]
macro_rules! assert_approx_matrix_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let diff = &$x - &$y;

        let max_absdiff = diff.max_abs();
        let approx_eq = max_absdiff <= $tol;

        if !approx_eq {
            println!("abstol: {:e}", $tol);
            println!("left: {:?}", $x);
            println!("right: {:?}", $y);
            println!("max abs diff: {:e}", max_absdiff);
        }
        assert!(approx_eq);
    }};
}

/// Approx assertion for scalars.
#[macro_export]
macro_rules! assert_approx_eq {
    ($x:expr, $y:expr, abstol = $tol:expr) => {{
        let (x, y): (f64, f64) = ($x, $y);
        let absdiff = (x - y).abs();
        if absdiff > $tol {
            panic!(
                "assert_approx_eq!({}, {}) failed: |{:e} - {:e}| = {:e} > {:e}",
                stringify!($x),
                stringify!($y),
                x,
                y,
                absdiff,
                $tol
            );
        }
    }};
}

#[macro_export]
macro_rules! assert_panics {
    ($e:expr) => {{
        use std::panic::catch_unwind;
        use std::stringify;
        let expr_string = stringify!($e);
        let result = catch_unwind(|| $e);
        if result.is_ok() {
            panic!("assert_panics!({}) failed.", expr_string);
        }
    }};
}
