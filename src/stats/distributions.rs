//! Distribution quantiles and densities (statrs-backed)

use crate::error::{RiskError, RiskResult};
use statrs::distribution::{ChiSquared, Continuous, ContinuousCDF, Normal, StudentsT};

fn check_probability(p: f64) -> RiskResult<()> {
    if !(p > 0.0 && p < 1.0) {
        return Err(RiskError::Distribution(format!(
            "probability {} outside (0, 1)",
            p
        )));
    }
    Ok(())
}

fn standard_normal() -> RiskResult<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| RiskError::Distribution(e.to_string()))
}

fn student_t(df: f64) -> RiskResult<StudentsT> {
    StudentsT::new(0.0, 1.0, df).map_err(|e| RiskError::Distribution(e.to_string()))
}

/// Standard normal quantile
pub fn normal_ppf(p: f64) -> RiskResult<f64> {
    check_probability(p)?;
    Ok(standard_normal()?.inverse_cdf(p))
}

/// Standard normal CDF
pub fn normal_cdf(x: f64) -> RiskResult<f64> {
    Ok(standard_normal()?.cdf(x))
}

/// Standard normal density
pub fn normal_pdf(x: f64) -> RiskResult<f64> {
    Ok(standard_normal()?.pdf(x))
}

/// Student-t quantile with `df` degrees of freedom (unit scale, not variance-normalized)
pub fn student_t_ppf(p: f64, df: f64) -> RiskResult<f64> {
    check_probability(p)?;
    Ok(student_t(df)?.inverse_cdf(p))
}

/// Student-t density with `df` degrees of freedom
pub fn student_t_pdf(x: f64, df: f64) -> RiskResult<f64> {
    Ok(student_t(df)?.pdf(x))
}

/// Student-t CDF with `df` degrees of freedom
pub fn student_t_cdf(x: f64, df: f64) -> RiskResult<f64> {
    Ok(student_t(df)?.cdf(x))
}

/// Chi-squared survival function P(X > x)
pub fn chi_squared_sf(x: f64, df: f64) -> RiskResult<f64> {
    let dist = ChiSquared::new(df).map_err(|e| RiskError::Distribution(e.to_string()))?;
    if x <= 0.0 {
        return Ok(1.0);
    }
    Ok(dist.sf(x))
}
