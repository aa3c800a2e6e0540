//! Stress test inputs, events and results

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::RiskResult;

/// Asset class used to map shocks onto holdings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    Bond,
    Credit,
    Commodity,
    Fx,
    RealEstate,
    Crypto,
}

impl AssetClass {
    /// Annualized volatility assumed when a holding has none on record
    pub fn default_volatility(&self) -> f64 {
        match self {
            AssetClass::Equity => 0.20,
            AssetClass::Bond => 0.06,
            AssetClass::Credit => 0.10,
            AssetClass::Commodity => 0.25,
            AssetClass::Fx => 0.10,
            AssetClass::RealEstate => 0.18,
            AssetClass::Crypto => 0.70,
        }
    }
}

/// A crisis replayed against current holdings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalEvent {
    pub name: String,
    pub date: NaiveDate,
    pub description: String,
    /// Peak-to-trough move per asset class
    pub market_impact: BTreeMap<AssetClass, Decimal>,
    pub duration_days: u32,
    pub recovery_days: u32,
}

impl HistoricalEvent {
    /// Mean impact across classes, applied to unclassified holdings
    pub fn average_shock(&self) -> Option<Decimal> {
        if self.market_impact.is_empty() {
            return None;
        }
        let total: Decimal = self.market_impact.values().copied().sum();
        Some(total / Decimal::from(self.market_impact.len()))
    }
}

/// Synthetic shock scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTemplate {
    pub name: String,
    pub description: String,
    pub shocks: BTreeMap<AssetClass, Decimal>,
    /// Scales the repricing noise
    pub volatility_multiplier: f64,
    /// Annual probability of occurrence
    pub probability: Decimal,
}

/// Holdings to stress
///
/// A holding without a price, or a price without a holding, is zero exposure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    /// Quantity per asset
    pub holdings: BTreeMap<String, Decimal>,
    pub prices: BTreeMap<String, Decimal>,
    #[serde(default)]
    pub asset_classes: BTreeMap<String, AssetClass>,
    /// Annualized volatility per asset
    #[serde(default)]
    pub volatilities: BTreeMap<String, f64>,
    /// Average daily traded quantity per asset
    #[serde(default)]
    pub average_daily_volume: BTreeMap<String, Decimal>,
}

impl Portfolio {
    pub fn with_holding(
        mut self,
        asset: impl Into<String>,
        quantity: Decimal,
        price: Decimal,
        class: AssetClass,
    ) -> Self {
        let asset = asset.into();
        self.holdings.insert(asset.clone(), quantity);
        self.prices.insert(asset.clone(), price);
        self.asset_classes.insert(asset, class);
        self
    }

    /// quantity * price, zero when either is missing
    pub fn exposure(&self, asset: &str) -> Decimal {
        match (self.holdings.get(asset), self.prices.get(asset)) {
            (Some(q), Some(p)) => q * p,
            _ => Decimal::ZERO,
        }
    }

    /// Assets with a non-zero exposure
    pub fn exposures(&self) -> BTreeMap<String, Decimal> {
        self.holdings
            .keys()
            .map(|a| (a.clone(), self.exposure(a)))
            .filter(|(_, v)| !v.is_zero())
            .collect()
    }

    pub fn total_value(&self) -> Decimal {
        self.exposures().values().copied().sum()
    }

    /// Sum of absolute exposures; shorts count at full size
    pub fn gross_exposure(&self) -> Decimal {
        self.exposures().values().map(|v| v.abs()).sum()
    }

    pub fn volatility_of(&self, asset: &str) -> f64 {
        self.volatilities.get(asset).copied().unwrap_or_else(|| {
            self.asset_classes
                .get(asset)
                .map(AssetClass::default_volatility)
                .unwrap_or(AssetClass::Equity.default_volatility())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressTestKind {
    HistoricalReplay,
    Scenario,
    VolatilityShock,
    LiquidityStress,
}

/// Stress applied to one asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetImpact {
    pub asset_class: Option<AssetClass>,
    pub original_value: Decimal,
    pub stressed_value: Decimal,
    /// Fractional move applied
    pub shock: Decimal,
}

/// Outcome of one stress test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestResult {
    pub scenario_name: String,
    pub kind: StressTestKind,
    pub original_value: Decimal,
    pub stressed_value: Decimal,
    pub absolute_loss: Decimal,
    /// Loss as a percentage of gross exposure; negative when the book gains
    pub percentage_loss: f64,
    pub asset_impacts: BTreeMap<String, AssetImpact>,
    pub survival_probability: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility_before: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility_after: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub liquidation_cost: Option<Decimal>,
}

impl StressTestResult {
    pub(super) fn from_impacts(
        scenario_name: impl Into<String>,
        kind: StressTestKind,
        asset_impacts: BTreeMap<String, AssetImpact>,
        survival_probability: f64,
    ) -> Self {
        let original_value: Decimal = asset_impacts.values().map(|i| i.original_value).sum();
        let stressed_value: Decimal = asset_impacts.values().map(|i| i.stressed_value).sum();
        let gross: Decimal = asset_impacts.values().map(|i| i.original_value.abs()).sum();
        let absolute_loss = original_value - stressed_value;
        Self {
            scenario_name: scenario_name.into(),
            kind,
            original_value,
            stressed_value,
            absolute_loss,
            percentage_loss: loss_percentage(absolute_loss, gross),
            asset_impacts,
            survival_probability: survival_probability.clamp(0.0, 1.0),
            volatility_before: None,
            volatility_after: None,
            liquidation_cost: None,
        }
    }

    /// Format as table for CLI output
    pub fn format_table(&self) -> String {
        let mut rows = String::new();
        for (asset, impact) in &self.asset_impacts {
            rows.push_str(&format!(
                "{:<12} {:>14.2} {:>14.2} {:>+8.2}%\n",
                asset,
                impact.original_value,
                impact.stressed_value,
                impact.shock * Decimal::ONE_HUNDRED
            ));
        }
        let mut extra = String::new();
        if let (Some(before), Some(after)) = (self.volatility_before, self.volatility_after) {
            extra.push_str(&format!(
                "Volatility:       {:.2}% -> {:.2}%\n",
                before * 100.0,
                after * 100.0
            ));
        }
        if let Some(cost) = self.liquidation_cost {
            extra.push_str(&format!("Liquidation cost: {:.2}\n", cost));
        }
        format!(
            r#"
══════════════════════════════════════════════════════
               STRESS TEST: {}
══════════════════════════════════════════════════════
Original value:   {:.2}
Stressed value:   {:.2}
Loss:             {:.2} ({:.2}%)
Survival prob.:   {:.3}
{}
ASSET        ORIGINAL       STRESSED       SHOCK
──────────────────────────────────────────────────────
{}══════════════════════════════════════════════════════
"#,
            self.scenario_name,
            self.original_value,
            self.stressed_value,
            self.absolute_loss,
            self.percentage_loss,
            self.survival_probability,
            extra,
            rows,
        )
    }
}

pub(super) fn loss_percentage(loss: Decimal, original: Decimal) -> f64 {
    if original.is_zero() {
        return 0.0;
    }
    (loss / original * Decimal::ONE_HUNDRED)
        .to_f64()
        .unwrap_or(0.0)
}

/// Sub-test of a comprehensive run that could not be priced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedTest {
    pub name: String,
    pub reason: String,
}

/// Aggregate of a comprehensive stress run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestReport {
    pub report_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub portfolio_value: Decimal,
    pub results: Vec<StressTestResult>,
    /// Test with strictly the highest percentage loss
    pub worst_case_scenario: Option<String>,
    /// Percent
    pub worst_case_loss: f64,
    /// Mean of percentage losses at or above their 90th percentile
    pub expected_shortfall: f64,
    /// 95th percentile of percentage losses
    pub stress_var: f64,
    pub failed_tests: Vec<FailedTest>,
    pub recommendation: String,
}

impl StressTestReport {
    pub fn to_json(&self) -> RiskResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON
    pub fn export_json(&self, path: impl AsRef<Path>) -> RiskResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn format_table(&self) -> String {
        let mut rows = String::new();
        for r in &self.results {
            rows.push_str(&format!(
                "{:<26} {:>14.2} {:>9.2}%  {:>5.2}\n",
                r.scenario_name,
                r.absolute_loss,
                r.percentage_loss,
                r.survival_probability
            ));
        }
        for f in &self.failed_tests {
            rows.push_str(&format!("{:<26} FAILED: {}\n", f.name, f.reason));
        }
        format!(
            r#"
══════════════════════════════════════════════════════
               STRESS TEST REPORT
══════════════════════════════════════════════════════
Report:           {}
Portfolio value:  {:.2}
Worst case:       {} ({:.2}%)
Expected short.:  {:.2}%
Stress VaR (95):  {:.2}%

SCENARIO                   LOSS           LOSS %   SURV
───────────────────────────────────────────────────────
{}───────────────────────────────────────────────────────
{}
══════════════════════════════════════════════════════
"#,
            self.report_id,
            self.portfolio_value,
            self.worst_case_scenario.as_deref().unwrap_or("-"),
            self.worst_case_loss,
            self.expected_shortfall,
            self.stress_var,
            rows,
            self.recommendation,
        )
    }
}
