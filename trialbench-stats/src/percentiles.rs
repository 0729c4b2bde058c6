//! Percentile Computation
//!
//! Timing distributions of randomized subjects are often skewed (a Miller-Rabin
//! run on a prime does every round, a composite usually exits after one), so
//! rows carry the median and p95 alongside the mean.

/// Timing percentiles reported per summary row
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Percentiles {
    /// 50th percentile (median)
    pub p50: Option<f64>,
    /// 90th percentile
    pub p90: Option<f64>,
    /// 95th percentile
    pub p95: Option<f64>,
}

/// Compute a single percentile from samples
///
/// Uses linear interpolation between nearest ranks. Returns `None` for an
/// empty slice; there is no percentile of nothing.
///
/// # Examples
///
/// ```
/// # use trialbench_stats::compute_percentile;
/// let samples = vec![1.0, 2.0, 3.0, 4.0, 5.0];
/// assert_eq!(compute_percentile(&samples, 50.0), Some(3.0));
/// assert_eq!(compute_percentile(&[], 50.0), None);
/// ```
pub fn compute_percentile(samples: &[f64], percentile: f64) -> Option<f64> {
    match samples.len() {
        0 => return None,
        1 => return Some(samples[0]),
        _ => {}
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    let p = (percentile / 100.0).clamp(0.0, 1.0);

    let rank = p * (n - 1) as f64;
    let lower_idx = rank.floor() as usize;
    let upper_idx = (lower_idx + 1).min(n - 1);
    let fraction = rank - lower_idx as f64;

    Some(sorted[lower_idx] + fraction * (sorted[upper_idx] - sorted[lower_idx]))
}

/// Compute the timing percentiles used in summary rows
pub fn compute_percentiles(samples: &[f64]) -> Percentiles {
    Percentiles {
        p50: compute_percentile(samples, 50.0),
        p90: compute_percentile(samples, 90.0),
        p95: compute_percentile(samples, 95.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        let samples = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        let p50 = compute_percentile(&samples, 50.0).unwrap();
        assert!((p50 - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_interpolates_between_ranks() {
        let samples = vec![10.0, 20.0];
        let p50 = compute_percentile(&samples, 50.0).unwrap();
        assert!((p50 - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_tail_percentile() {
        let samples: Vec<f64> = (1..=100).map(|x| x as f64).collect();
        let p95 = compute_percentile(&samples, 95.0).unwrap();
        assert!(p95 > 94.0 && p95 < 96.0);
    }

    #[test]
    fn test_single_sample() {
        assert_eq!(compute_percentile(&[42.0], 95.0), Some(42.0));
    }

    #[test]
    fn test_empty_is_undefined() {
        let percentiles = compute_percentiles(&[]);
        assert_eq!(percentiles, Percentiles::default());
        assert!(percentiles.p50.is_none());
    }
}
