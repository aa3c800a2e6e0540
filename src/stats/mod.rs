//! Statistics kernel
//!
//! Moments, percentiles, covariance and distribution quantiles used by the
//! risk engines.

mod distributions;
mod moments;

pub use distributions::{chi_squared_sf, normal_cdf, normal_pdf, normal_ppf, student_t_cdf, student_t_pdf, student_t_ppf};
pub use moments::{excess_kurtosis, mean, percentile, percentile_sorted, skewness, std_dev, variance};

use nalgebra::DMatrix;

/// Trading days per year used for annualization
pub const TRADING_DAYS: f64 = 252.0;

/// Volatility below this is treated as zero
pub const VOLATILITY_EPSILON: f64 = 1e-12;

/// Sample covariance of the columns of `data` (n - 1 denominator)
pub fn covariance_matrix(data: &DMatrix<f64>) -> DMatrix<f64> {
    let n = data.nrows();
    let k = data.ncols();
    if n < 2 {
        return DMatrix::zeros(k, k);
    }
    let means = data.row_mean();
    let centered = DMatrix::from_fn(n, k, |i, j| data[(i, j)] - means[j]);
    (centered.transpose() * &centered) / (n as f64 - 1.0)
}

/// Portfolio volatility sqrt(w' S w), floored at zero
pub fn portfolio_volatility(weights: &[f64], covariance: &DMatrix<f64>) -> f64 {
    let w = nalgebra::DVector::from_column_slice(weights);
    w.dot(&(covariance * &w)).max(0.0).sqrt()
}
