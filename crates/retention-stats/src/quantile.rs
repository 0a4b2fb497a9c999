/// Computes a single quantile from sorted data.
///
/// This function uses linear interpolation between order statistics (the
/// "type 7" definition, the default of R and NumPy). For a dataset with n
/// values, the q-quantile is found at the fractional position `h = (n - 1) * q`
/// and interpolated between the values at `floor(h)` and `ceil(h)`.
///
/// # Arguments
///
/// * `sorted_values` - Values sorted in ascending order
/// * `q` - The quantile to compute (0.0 to 1.0). Values outside are clamped.
///
/// # Returns
///
/// The value at the specified quantile. Returns `f64::NAN` if the input is
/// empty or `q` is NaN.
///
/// # Examples
///
/// ```
/// use retention_stats::quantile::quantile_sorted;
///
/// let values = [1.0, 2.0, 3.0, 4.0];
///
/// assert_eq!(quantile_sorted(&values, 0.0), 1.0);
/// assert_eq!(quantile_sorted(&values, 0.5), 2.5);
/// assert_eq!(quantile_sorted(&values, 1.0), 4.0);
/// ```
#[expect(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]
#[must_use]
pub fn quantile_sorted(sorted_values: &[f64], q: f64) -> f64 {
    debug_assert!(
        sorted_values.is_sorted_by(|a, b| a <= b),
        "values must be sorted in ascending order"
    );

    if sorted_values.is_empty() || q.is_nan() {
        return f64::NAN;
    }
    let last = sorted_values.len() - 1;
    let h = last as f64 * q.clamp(0.0, 1.0);
    let lo = (h.floor() as usize).min(last);
    let hi = (lo + 1).min(last);
    let frac = h - lo as f64;
    sorted_values[lo] + frac * (sorted_values[hi] - sorted_values[lo])
}
