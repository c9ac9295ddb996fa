//! Exact sample quantile over a finite batch.

use tb_core::Real;

/// Type-7 sample quantile (linear interpolation between order statistics).
///
/// Returns `None` for an empty slice or a probability outside `[0, 1]`.
pub fn sample_quantile(data: &[Real], prob: Real) -> Option<Real> {
    if data.is_empty() || !(0.0..=1.0).contains(&prob) {
        return None;
    }

    let mut sorted = data.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let h = (sorted.len() - 1) as Real * prob;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    let frac = h - lo as Real;

    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}
