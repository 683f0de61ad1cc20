//! Robust statistics helpers for background estimation.

use ndarray::Array2;
use num_traits::Float;

/// Median of a slice. Sorts in place; returns `None` on empty input.
///
/// Even-length input averages the two middle values.
pub fn median<T: Float>(values: &mut [T]) -> Option<T> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let n = values.len();
    let mid = n / 2;
    if n % 2 == 1 {
        Some(values[mid])
    } else {
        let two = T::one() + T::one();
        Some((values[mid - 1] + values[mid]) / two)
    }
}

/// Percentile `q` (0..=100) of an ascending-sorted slice, with linear
/// interpolation between ranks. Returns `None` on empty input.
pub fn percentile<T: Float>(sorted: &[T], q: f64) -> Option<T> {
    if sorted.is_empty() {
        return None;
    }
    let n = sorted.len();
    if n == 1 {
        return Some(sorted[0]);
    }
    let rank = q.clamp(0.0, 100.0) / 100.0 * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = T::from(rank - lo as f64)?;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Lower and upper percentile bounds of an unsorted sample. Sorts in place.
pub fn percentile_range<T: Float>(values: &mut [T], lo_q: f64, hi_q: f64) -> Option<(T, T)> {
    if values.is_empty() {
        return None;
    }
    values.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    Some((percentile(values, lo_q)?, percentile(values, hi_q)?))
}

/// Gather the plane values selected by a boolean mask.
pub fn masked_values(plane: &Array2<f32>, mask: &Array2<bool>) -> Vec<f32> {
    plane
        .iter()
        .zip(mask.iter())
        .filter_map(|(&v, &keep)| keep.then_some(v))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn median_odd_even() {
        assert_eq!(median(&mut [3.0f32, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0f32, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median::<f32>(&mut []), None);
    }

    #[test]
    fn percentile_interpolates() {
        let v = [0.0f64, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&v, 0.0), Some(0.0));
        assert_eq!(percentile(&v, 100.0), Some(4.0));
        assert_eq!(percentile(&v, 50.0), Some(2.0));
        assert_eq!(percentile(&v, 62.5), Some(2.5));
    }

    #[test]
    fn percentile_range_sorts() {
        let mut v = [5.0f32, 1.0, 3.0, 2.0, 4.0];
        let (lo, hi) = percentile_range(&mut v, 25.0, 75.0).unwrap();
        assert_eq!(lo, 2.0);
        assert_eq!(hi, 4.0);
    }

    #[test]
    fn masked_values_selects() {
        let plane = array![[1.0f32, 2.0], [3.0, 4.0]];
        let mask = array![[true, false], [false, true]];
        assert_eq!(masked_values(&plane, &mask), vec![1.0, 4.0]);
    }
}
