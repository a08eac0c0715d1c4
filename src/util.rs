/// Asserts that a numerical value is in the provided interval `[a,b]` and panics
/// with a helpful message if not
///
/// ### Example
/// ```should_panic
/// # use rl_pg::assert_interval;
/// let actor_lambda = 2.0;
/// assert_interval!(actor_lambda, 0.0, 1.0);
/// ```
/// This will panic with the message "Invalid value for \`actor_lambda\`. Must be in the interval \[0, 1\]."
#[macro_export]
macro_rules! assert_interval {
    ($var:expr, $a:expr, $b:expr) => {
        assert!(
            $var >= $a && $var <= $b,
            "Invalid value for `{}`. Must be in the interval [{}, {}].",
            stringify!($var),
            $a,
            $b,
        );
    };
}

/// Iterate over the columns of a non-empty, rectangular table of rows
pub fn transpose_iter<T: Clone>(rows: &[Vec<T>]) -> impl Iterator<Item = Vec<T>> + '_ {
    assert!(!rows.is_empty());
    let len = rows[0].len();
    assert!(
        rows.iter().all(|r| r.len() == len),
        "All rows must have the same length"
    );
    (0..len).map(move |j| rows.iter().map(|r| r[j].clone()).collect())
}

/// γ<sup>0</sup>, γ<sup>1</sup>, ..., γ<sup>n-1</sup>
pub fn powers(gamma: f64, n: usize) -> Vec<f64> {
    (0..n).map(|i| gamma.powi(i as i32)).collect()
}
