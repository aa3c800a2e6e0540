//! Single-asset return series

use super::check_strictly_increasing;
use crate::error::{RiskError, RiskResult};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One timestamped observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawReturnSeries {
    asset: String,
    observations: Vec<Observation>,
}

/// Ordered (timestamp, return) pairs for one asset
///
/// Timestamps are strictly increasing and every return is finite. The
/// series cannot be mutated after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawReturnSeries", into = "RawReturnSeries")]
pub struct ReturnSeries {
    asset: String,
    timestamps: Vec<DateTime<Utc>>,
    values: Vec<f64>,
}

impl ReturnSeries {
    /// Build a series from observations
    pub fn new(asset: impl Into<String>, observations: Vec<Observation>) -> RiskResult<Self> {
        let asset = asset.into();
        let (timestamps, values): (Vec<_>, Vec<_>) = observations
            .into_iter()
            .map(|o| (o.timestamp, o.value))
            .unzip();

        check_strictly_increasing(&asset, &timestamps)?;
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(RiskError::InvalidSeries(format!(
                "{}: non-finite return at index {}",
                asset, pos
            )));
        }

        Ok(Self {
            asset,
            timestamps,
            values,
        })
    }

    /// Build a daily series starting at `start`
    pub fn from_values(
        asset: impl Into<String>,
        start: DateTime<Utc>,
        values: &[f64],
    ) -> RiskResult<Self> {
        let observations = values
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

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over (timestamp, return) pairs
    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        self.timestamps
            .iter()
            .zip(&self.values)
            .map(|(&timestamp, &value)| Observation { timestamp, value })
    }
}

impl TryFrom<RawReturnSeries> for ReturnSeries {
    type Error = RiskError;

    fn try_from(raw: RawReturnSeries) -> Result<Self, Self::Error> {
        Self::new(raw.asset, raw.observations)
    }
}

impl From<ReturnSeries> for RawReturnSeries {
    fn from(series: ReturnSeries) -> Self {
        let observations = series.iter().collect();
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
    fn test_from_values() {
        let series = ReturnSeries::from_values("SPY", start(), &[0.01, -0.02, 0.005]).unwrap();
        assert_eq!(series.asset(), "SPY");
        assert_eq!(series.len(), 3);
        assert_eq!(series.values(), &[0.01, -0.02, 0.005]);
        assert_eq!(series.timestamps()[2], start() + Duration::days(2));
    }

    #[test]
    fn test_rejects_duplicate_timestamps() {
        let obs = vec![
            Observation {
                timestamp: start(),
                value: 0.01,
            },
            Observation {
                timestamp: start(),
                value: 0.02,
            },
        ];
        let err = ReturnSeries::new("SPY", obs).unwrap_err();
        assert!(matches!(err, RiskError::InvalidSeries(_)));
    }

    #[test]
    fn test_rejects_decreasing_timestamps() {
        let obs = vec![
            Observation {
                timestamp: start() + Duration::days(1),
                value: 0.01,
            },
            Observation {
                timestamp: start(),
                value: 0.02,
            },
        ];
        assert!(ReturnSeries::new("SPY", obs).is_err());
    }

    #[test]
    fn test_rejects_nan() {
        assert!(ReturnSeries::from_values("SPY", start(), &[0.01, f64::NAN]).is_err());
    }

    #[test]
    fn test_deserialize_validates() {
        let json = r#"{
            "asset": "QQQ",
            "observations": [
                {"timestamp": "2024-01-03T00:00:00Z", "value": 0.01},
                {"timestamp": "2024-01-02T00:00:00Z", "value": 0.02}
            ]
        }"#;
        assert!(serde_json::from_str::<ReturnSeries>(json).is_err());

        let json = r#"{
            "asset": "QQQ",
            "observations": [
                {"timestamp": "2024-01-02T00:00:00Z", "value": 0.01},
                {"timestamp": "2024-01-03T00:00:00Z", "value": 0.02}
            ]
        }"#;
        let series: ReturnSeries = serde_json::from_str(json).unwrap();
        assert_eq!(series.values(), &[0.01, 0.02]);
    }

    #[test]
    fn test_empty_series_is_valid() {
        let series = ReturnSeries::new("EMPTY", vec![]).unwrap();
        assert!(series.is_empty());
    }
}
