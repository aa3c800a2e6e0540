//! Sample moments and order statistics

/// Arithmetic mean; zero for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (n - 1 denominator); zero below two observations
pub fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n as f64 - 1.0)
}

/// Sample standard deviation
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Central moments m2, m3, m4 (population, n denominator)
fn central_moments(values: &[f64]) -> (f64, f64, f64) {
    let n = values.len() as f64;
    let m = mean(values);
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - m;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    (m2 / n, m3 / n, m4 / n)
}

/// Moment skewness g1 = m3 / m2^1.5; zero when the variance vanishes
pub fn skewness(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let (m2, m3, _) = central_moments(values);
    if m2 <= f64::EPSILON * f64::EPSILON {
        return 0.0;
    }
    m3 / m2.powf(1.5)
}

/// Excess kurtosis g2 = m4 / m2^2 - 3; zero when the variance vanishes
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    if values.len() < 4 {
        return 0.0;
    }
    let (m2, _, m4) = central_moments(values);
    if m2 <= f64::EPSILON * f64::EPSILON {
        return 0.0;
    }
    m4 / (m2 * m2) - 3.0
}

/// Percentile with linear interpolation between order statistics
///
/// `q` is in percent (0..=100). Returns NaN for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    percentile_sorted(&sorted, q)
}

/// As [`percentile`], for data already sorted ascending
pub fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let rank = (q.clamp(0.0, 100.0) / 100.0) * (n - 1) as f64;
            let lo = rank.floor() as usize;
            let hi = rank.ceil() as usize;
            let frac = rank - lo as f64;
            sorted[lo] + (sorted[hi] - sorted[lo]) * frac
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_variance() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&values), 5.0);
        assert!((variance(&values) - 32.0 / 7.0).abs() < 1e-12);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(variance(&[1.0]), 0.0);
    }

    #[test]
    fn test_percentile_linear() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&values, 0.0), 1.0);
        assert_eq!(percentile(&values, 100.0), 5.0);
        assert_eq!(percentile(&values, 50.0), 3.0);
        // rank = 0.1 * 4 = 0.4
        assert!((percentile(&values, 10.0) - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_percentile_unsorted_input() {
        let values = [5.0, 1.0, 4.0, 2.0, 3.0];
        assert!((percentile(&values, 25.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_skewness_symmetric() {
        let values = [-2.0, -1.0, 0.0, 1.0, 2.0];
        assert!(skewness(&values).abs() < 1e-12);
    }

    #[test]
    fn test_skewness_right_tail() {
        let values = [0.0, 0.0, 0.0, 0.0, 10.0];
        assert!(skewness(&values) > 1.0);
    }

    #[test]
    fn test_kurtosis_constant() {
        assert_eq!(excess_kurtosis(&[1.0; 10]), 0.0);
        assert_eq!(skewness(&[1.0; 10]), 0.0);
    }

    #[test]
    fn test_kurtosis_two_point() {
        // symmetric two-point distribution has kurtosis 1, excess -2
        let values = [-1.0, 1.0, -1.0, 1.0];
        assert!((excess_kurtosis(&values) + 2.0).abs() < 1e-12);
    }
}
