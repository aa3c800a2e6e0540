//! Aligned multi-asset return matrix

use super::ReturnSeries;
use crate::error::{RiskError, RiskResult};
use crate::stats;
use chrono::{DateTime, Utc};
use nalgebra::{DMatrix, DVector};
use std::collections::{BTreeMap, HashSet};

/// Returns for several assets on a shared timeline
///
/// Rows are observations, columns are assets in `assets()` order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnMatrix {
    assets: Vec<String>,
    timestamps: Vec<DateTime<Utc>>,
    data: DMatrix<f64>,
}

impl ReturnMatrix {
    /// Inner-join series on their timestamps
    ///
    /// Only timestamps present in every series survive. Asset order follows
    /// the input order.
    pub fn from_series(series: &[ReturnSeries]) -> RiskResult<Self> {
        if series.is_empty() {
            return Err(RiskError::InvalidSeries(
                "return matrix needs at least one asset".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for s in series {
            if !seen.insert(s.asset()) {
                return Err(RiskError::InvalidSeries(format!(
                    "duplicate asset {}",
                    s.asset()
                )));
            }
        }

        let mut table: BTreeMap<DateTime<Utc>, Vec<Option<f64>>> = BTreeMap::new();
        for (col, s) in series.iter().enumerate() {
            for obs in s.iter() {
                table
                    .entry(obs.timestamp)
                    .or_insert_with(|| vec![None; series.len()])[col] = Some(obs.value);
            }
        }

        let mut timestamps = Vec::new();
        let mut rows: Vec<f64> = Vec::new();
        for (ts, row) in table {
            if row.iter().all(Option::is_some) {
                timestamps.push(ts);
                rows.extend(row.into_iter().flatten());
            }
        }

        let data = DMatrix::from_row_slice(timestamps.len(), series.len(), &rows);
        Ok(Self {
            assets: series.iter().map(|s| s.asset().to_string()).collect(),
            timestamps,
            data,
        })
    }

    /// Build from equal-length columns sharing daily timestamps from `start`
    pub fn from_columns(
        assets: Vec<String>,
        start: DateTime<Utc>,
        columns: &[Vec<f64>],
    ) -> RiskResult<Self> {
        if assets.len() != columns.len() {
            return Err(RiskError::InvalidSeries(format!(
                "{} asset names for {} columns",
                assets.len(),
                columns.len()
            )));
        }
        let series = assets
            .iter()
            .zip(columns)
            .map(|(asset, values)| ReturnSeries::from_values(asset.clone(), start, values))
            .collect::<RiskResult<Vec<_>>>()?;
        let lengths: HashSet<usize> = columns.iter().map(Vec::len).collect();
        if lengths.len() > 1 {
            return Err(RiskError::InvalidSeries(
                "columns must have equal length".to_string(),
            ));
        }
        Self::from_series(&series)
    }

    pub fn assets(&self) -> &[String] {
        &self.assets
    }

    pub fn timestamps(&self) -> &[DateTime<Utc>] {
        &self.timestamps
    }

    /// Number of aligned observations
    pub fn observations(&self) -> usize {
        self.data.nrows()
    }

    pub fn asset_count(&self) -> usize {
        self.data.ncols()
    }

    pub fn asset_index(&self, asset: &str) -> Option<usize> {
        self.assets.iter().position(|a| a == asset)
    }

    /// Returns of one asset
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.data.column(index).iter().copied().collect()
    }

    /// Weighted portfolio return per observation
    pub fn portfolio_returns(&self, weights: &[f64]) -> RiskResult<Vec<f64>> {
        if weights.len() != self.asset_count() {
            return Err(RiskError::config(format!(
                "{} weights for {} assets",
                weights.len(),
                self.asset_count()
            )));
        }
        let w = DVector::from_column_slice(weights);
        Ok((&self.data * w).iter().copied().collect())
    }

    /// Sample covariance (n - 1 denominator) scaled by `periods`
    pub fn covariance(&self, periods: f64) -> DMatrix<f64> {
        stats::covariance_matrix(&self.data) * periods
    }

    /// Per-asset sample standard deviation scaled by `sqrt(periods)`
    pub fn volatilities(&self, periods: f64) -> Vec<f64> {
        (0..self.asset_count())
            .map(|i| stats::std_dev(&self.column(i)) * periods.sqrt())
            .collect()
    }

    /// Restrict to the named assets, in the given order
    pub fn select(&self, assets: &[String]) -> RiskResult<Self> {
        let indices = assets
            .iter()
            .map(|a| {
                self.asset_index(a)
                    .ok_or_else(|| RiskError::InvalidSeries(format!("unknown asset {}", a)))
            })
            .collect::<RiskResult<Vec<_>>>()?;
        Ok(Self {
            assets: assets.to_vec(),
            timestamps: self.timestamps.clone(),
            data: self.data.select_columns(indices.iter()),
        })
    }
}
