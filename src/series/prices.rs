//! Single-asset price series

use super::{check_strictly_increasing, Observation, ReturnSeries};
use crate::error::{RiskError, RiskResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPriceSeries {
    asset: String,
    observations: Vec<Observation>,
}

/// Ordered (timestamp, price) pairs for one asset; prices are strictly positive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceSeries", into = "RawPriceSeries")]
pub struct PriceSeries {
    asset: String,
    timestamps: Vec<DateTime<Utc>>,
    prices: Vec<f64>,
}

impl PriceSeries {
    /// Build a price series from observations
    pub fn new(asset: impl Into<String>, observations: Vec<Observation>) -> RiskResult<Self> {
        let asset = asset.into();
        let (timestamps, prices): (Vec<_>, Vec<_>) = observations
            .into_iter()
            .map(|o| (o.timestamp, o.value))
            .unzip();

        check_strictly_increasing(&asset, &timestamps)?;
        if let Some(pos) = prices.iter().position(|p| !p.is_finite() || *p <= 0.0) {
            return Err(RiskError::InvalidSeries(format!(
                "{}: price at index {} must be positive and finite",
                asset, pos
            )));
        }

        Ok(Self {
            asset,
            timestamps,
            prices,
        })
    }

    /// Build a daily series starting at `start`
    pub fn from_prices(
        asset: impl Into<String>,
        start: DateTime<Utc>,
        prices: &[f64],
    ) -> RiskResult<Self> {
        let observations = prices
            .iter()
            .enumerate()
            .map(|(i, &value)| Observation {
                timestamp: start + Duration::days(i as i64),
                value,
            })
            .collect();
        Self::new(asset, observations)
    }

    pub fn asset(&self) -> &str {
        &self.asset
    }

    pub fn prices(&self) -> &[f64] {
        &self.prices
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn last_price(&self) -> Option<f64> {
        self.prices.last().copied()
    }

    /// Simple returns, stamped at the later observation of each pair
    pub fn returns(&self) -> RiskResult<ReturnSeries> {
        let observations = self
            .prices
            .windows(2)
            .zip(self.timestamps.iter().skip(1))
            .map(|(pair, &timestamp)| Observation {
                timestamp,
                value: pair[1] / pair[0] - 1.0,
            })
            .collect();
        ReturnSeries::new(self.asset.clone(), observations)
    }

    /// Annualized volatility of simple returns (252 trading days)
    pub fn annualized_volatility(&self) -> Option<f64> {
        let returns = self.returns().ok()?;
        if returns.len() < 2 {
            return None;
        }
        Some(crate::stats::std_dev(returns.values()) * crate::stats::TRADING_DAYS.sqrt())
    }
}

impl TryFrom<RawPriceSeries> for PriceSeries {
    type Error = RiskError;

    fn try_from(raw: RawPriceSeries) -> Result<Self, Self::Error> {
        Self::new(raw.asset, raw.observations)
    }
}

impl From<PriceSeries> for RawPriceSeries {
    fn from(series: PriceSeries) -> Self {
        let observations = series
            .timestamps
            .iter()
            .zip(&series.prices)
            .map(|(&timestamp, &value)| Observation { timestamp, value })
            .collect();
        Self {
            asset: series.asset,
            observations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_returns() {
        let series = PriceSeries::from_prices("BTC", start(), &[100.0, 110.0, 99.0]).unwrap();
        let returns = series.returns().unwrap();
        assert_eq!(returns.len(), 2);
        assert!((returns.values()[0] - 0.10).abs() < 1e-12);
        assert!((returns.values()[1] + 0.10).abs() < 1e-12);
        assert_eq!(returns.timestamps()[0], start() + Duration::days(1));
    }

    #[test]
    fn test_rejects_non_positive_price() {
        assert!(PriceSeries::from_prices("BTC", start(), &[100.0, 0.0]).is_err());
        assert!(PriceSeries::from_prices("BTC", start(), &[100.0, -5.0]).is_err());
    }

    #[test]
    fn test_volatility_constant_price() {
        let series = PriceSeries::from_prices("BTC", start(), &[100.0; 10]).unwrap();
        assert_eq!(series.annualized_volatility(), Some(0.0));
    }

    #[test]
    fn test_volatility_single_price() {
        let series = PriceSeries::from_prices("BTC", start(), &[100.0]).unwrap();
        assert!(series.annualized_volatility().is_none());
    }
}
