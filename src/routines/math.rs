//! NaN-skipping reductions.
//!
//! Missing values in SSH fields are NaN; like labelled-array reductions,
//! these helpers ignore them and return NaN only when nothing is left.

/// Mean of the finite values, NaN if there are none.
#[inline]
pub fn nanmean<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0_f64, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

/// Population standard deviation (ddof = 0) of the non-NaN values.
pub fn nanstd<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a f64> + Clone,
{
    let mean = nanmean(values.clone());
    if mean.is_nan() {
        return f64::NAN;
    }
    let var = nanmean(
        values
            .into_iter()
            .filter(|v| !v.is_nan())
            .map(|v| (v - mean).powi(2))
            .collect::<Vec<f64>>()
            .iter(),
    );
    var.sqrt()
}

/// Maximum absolute value, ignoring NaN; 0 for an empty input.
pub fn nanmax_abs<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()))
}
