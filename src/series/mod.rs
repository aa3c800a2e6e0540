//! Input series
//!
//! Validated return/price series and the aligned multi-asset return matrix
//! supplied by the data pipeline.

mod matrix;
mod prices;
mod returns;

pub use matrix::ReturnMatrix;
pub use prices::PriceSeries;
pub use returns::{Observation, ReturnSeries};

use crate::error::{RiskError, RiskResult};
use chrono::{DateTime, Utc};

/// Reject series whose timestamps are not strictly increasing
fn check_strictly_increasing(asset: &str, timestamps: &[DateTime<Utc>]) -> RiskResult<()> {
    for pair in timestamps.windows(2) {
        if pair[1] <= pair[0] {
            return Err(RiskError::InvalidSeries(format!(
                "{}: timestamps must be strictly increasing ({} followed by {})",
                asset, pair[0], pair[1]
            )));
        }
    }
    Ok(())
}
