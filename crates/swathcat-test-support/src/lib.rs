//! Shared test fixtures and helpers for the swathcat workspace.
//!
//! ```toml
//! [dev-dependencies]
//! swathcat-test-support = { path = "../swathcat-test-support" }
//! ```

pub mod fixtures;
pub mod paths;

pub use fixtures::*;
pub use paths::*;

/// Skips the current test if the named test data file cannot be found.
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!("SKIPPED: test file '{}' not found. Set TEST_DATA_DIR.", $name);
                return;
            }
        }
    }};
}

/// Approximate floating-point equality, for coordinate and duration
/// comparisons where exact equality is too strict.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr, $epsilon:expr) => {{
        let left: f64 = $left as f64;
        let right: f64 = $right as f64;
        let epsilon: f64 = $epsilon as f64;
        let diff = (left - right).abs();
        if diff > epsilon {
            panic!(
                "assertion failed: `(left ≈ right)`\n  left: `{:?}`,\n right: `{:?}`,\n  diff: `{:?}` > epsilon `{:?}`",
                left, right, diff, epsilon
            );
        }
    }};
}

/// Approximate equality for a `(lon, lat)` coordinate pair.
#[macro_export]
macro_rules! assert_coords_approx_eq {
    (($x1:expr, $y1:expr), ($x2:expr, $y2:expr), $epsilon:expr) => {{
        $crate::assert_approx_eq!($x1, $x2, $epsilon);
        $crate::assert_approx_eq!($y1, $y2, $epsilon);
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn approx_eq_passes_within_epsilon() {
        assert_approx_eq!(1.0001, 1.0, 0.001);
    }

    #[test]
    #[should_panic(expected = "assertion failed")]
    fn approx_eq_fails_outside_epsilon() {
        assert_approx_eq!(1.1, 1.0, 0.001);
    }

    #[test]
    fn coords_approx_eq_passes() {
        assert_coords_approx_eq!((1.0001, 2.0001), (1.0, 2.0), 0.001);
    }
}
