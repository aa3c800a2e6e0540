//! Library of historical events and scenario templates

use super::types::{AssetClass, HistoricalEvent, ScenarioTemplate};
use crate::error::{RiskError, RiskResult};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Events and scenarios a [`StressTestEngine`](super::StressTestEngine) runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StressCatalog {
    events: Vec<HistoricalEvent>,
    scenarios: Vec<ScenarioTemplate>,
}

impl StressCatalog {
    /// Catalog with unique names; rejects duplicates
    pub fn new(events: Vec<HistoricalEvent>, scenarios: Vec<ScenarioTemplate>) -> RiskResult<Self> {
        let mut catalog = Self::default();
        for event in events {
            catalog.add_event(event)?;
        }
        for scenario in scenarios {
            catalog.add_scenario(scenario)?;
        }
        Ok(catalog)
    }

    pub fn add_event(&mut self, event: HistoricalEvent) -> RiskResult<()> {
        if self.event(&event.name).is_some() {
            return Err(RiskError::config(format!("duplicate stress event {}", event.name)));
        }
        self.events.push(event);
        Ok(())
    }

    pub fn add_scenario(&mut self, scenario: ScenarioTemplate) -> RiskResult<()> {
        if self.scenario(&scenario.name).is_some() {
            return Err(RiskError::config(format!(
                "duplicate stress scenario {}",
                scenario.name
            )));
        }
        if !(Decimal::ZERO..=Decimal::ONE).contains(&scenario.probability) {
            return Err(RiskError::config(format!(
                "scenario {} probability must be in [0, 1]",
                scenario.name
            )));
        }
        if !(scenario.volatility_multiplier.is_finite() && scenario.volatility_multiplier >= 0.0) {
            return Err(RiskError::config(format!(
                "scenario {} volatility multiplier must be non-negative",
                scenario.name
            )));
        }
        self.scenarios.push(scenario);
        Ok(())
    }

    pub fn events(&self) -> &[HistoricalEvent] {
        &self.events
    }

    pub fn scenarios(&self) -> &[ScenarioTemplate] {
        &self.scenarios
    }

    pub fn event(&self, name: &str) -> Option<&HistoricalEvent> {
        self.events.iter().find(|e| e.name == name)
    }

    pub fn scenario(&self, name: &str) -> Option<&ScenarioTemplate> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Built-in crises and synthetic scenarios
    pub fn default_library() -> Self {
        Self {
            events: default_events(),
            scenarios: default_scenarios(),
        }
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_default()
}

fn event(
    name: &str,
    date: NaiveDate,
    description: &str,
    impact: &[(AssetClass, Decimal)],
    duration_days: u32,
    recovery_days: u32,
) -> HistoricalEvent {
    HistoricalEvent {
        name: name.to_string(),
        date,
        description: description.to_string(),
        market_impact: impact.iter().copied().collect::<BTreeMap<_, _>>(),
        duration_days,
        recovery_days,
    }
}

fn default_events() -> Vec<HistoricalEvent> {
    use AssetClass::*;
    vec![
        event(
            "2008_financial_crisis",
            date(2008, 9, 15),
            "Lehman collapse and global credit freeze",
            &[
                (Equity, dec!(-0.45)),
                (Bond, dec!(0.05)),
                (Credit, dec!(-0.20)),
                (Commodity, dec!(-0.35)),
                (Fx, dec!(-0.10)),
                (RealEstate, dec!(-0.30)),
            ],
            517,
            1400,
        ),
        event(
            "covid_2020",
            date(2020, 2, 20),
            "Pandemic lockdown crash",
            &[
                (Equity, dec!(-0.34)),
                (Bond, dec!(0.03)),
                (Credit, dec!(-0.12)),
                (Commodity, dec!(-0.30)),
                (Fx, dec!(-0.05)),
                (RealEstate, dec!(-0.25)),
                (Crypto, dec!(-0.50)),
            ],
            33,
            148,
        ),
        event(
            "dotcom_2000",
            date(2000, 3, 10),
            "Technology bubble unwind",
            &[
                (Equity, dec!(-0.49)),
                (Bond, dec!(0.08)),
                (Commodity, dec!(-0.10)),
            ],
            929,
            1800,
        ),
        event(
            "black_monday_1987",
            date(1987, 10, 19),
            "Single-day equity crash",
            &[(Equity, dec!(-0.22)), (Bond, dec!(0.02))],
            1,
            600,
        ),
        event(
            "rate_shock_2022",
            date(2022, 1, 3),
            "Inflation-driven tightening cycle",
            &[
                (Equity, dec!(-0.25)),
                (Bond, dec!(-0.17)),
                (Credit, dec!(-0.15)),
                (Commodity, dec!(0.20)),
                (RealEstate, dec!(-0.28)),
                (Crypto, dec!(-0.65)),
            ],
            282,
            500,
        ),
        event(
            "euro_debt_2011",
            date(2011, 8, 5),
            "European sovereign debt crisis",
            &[
                (Equity, dec!(-0.22)),
                (Bond, dec!(0.04)),
                (Credit, dec!(-0.10)),
                (Commodity, dec!(-0.15)),
                (Fx, dec!(-0.08)),
            ],
            60,
            150,
        ),
    ]
}

fn scenario(
    name: &str,
    description: &str,
    shocks: &[(AssetClass, Decimal)],
    volatility_multiplier: f64,
    probability: Decimal,
) -> ScenarioTemplate {
    ScenarioTemplate {
        name: name.to_string(),
        description: description.to_string(),
        shocks: shocks.iter().copied().collect(),
        volatility_multiplier,
        probability,
    }
}

fn default_scenarios() -> Vec<ScenarioTemplate> {
    use AssetClass::*;
    vec![
        scenario(
            "equity_crash",
            "Broad equity sell-off with flight to quality",
            &[
                (Equity, dec!(-0.30)),
                (Bond, dec!(0.05)),
                (Commodity, dec!(-0.15)),
                (Fx, dec!(-0.05)),
                (Crypto, dec!(-0.45)),
            ],
            2.5,
            dec!(0.05),
        ),
        scenario(
            "rate_spike",
            "Rates up 300bp",
            &[
                (Equity, dec!(-0.10)),
                (Bond, dec!(-0.12)),
                (Credit, dec!(-0.08)),
                (RealEstate, dec!(-0.15)),
            ],
            1.5,
            dec!(0.10),
        ),
        scenario(
            "stagflation",
            "High inflation with contracting growth",
            &[
                (Equity, dec!(-0.15)),
                (Bond, dec!(-0.10)),
                (Commodity, dec!(0.25)),
                (Fx, dec!(-0.05)),
            ],
            1.8,
            dec!(0.08),
        ),
        scenario(
            "crypto_winter",
            "Prolonged digital asset drawdown",
            &[(Crypto, dec!(-0.70)), (Equity, dec!(-0.05))],
            3.0,
            dec!(0.15),
        ),
        scenario(
            "liquidity_crunch",
            "Funding stress and forced deleveraging",
            &[
                (Equity, dec!(-0.20)),
                (Bond, dec!(-0.03)),
                (Credit, dec!(-0.15)),
                (RealEstate, dec!(-0.10)),
            ],
            2.0,
            dec!(0.07),
        ),
    ]
}
