/// Percentile of `values` by linear interpolation between order statistics.
///
/// `p` is a fraction in `[0, 1]` and is clamped to that range. Returns `None`
/// for an empty sample; a single value is returned as-is for every `p`.
pub fn percentile(values: &[f64], p: f64) -> Option<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, p)
}

/// Same as [`percentile`] for a sample already sorted ascending.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    match sorted.len() {
        0 => None,
        1 => Some(sorted[0]),
        n => {
            let idx = p.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = idx.floor() as usize;
            let hi = idx.ceil() as usize;
            let frac = idx - lo as f64;
            Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
        }
    }
}
