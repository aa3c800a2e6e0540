//! Stress testing end to end

use quant_risk::stress::{
    AssetClass, Portfolio, StressCatalog, StressConfig, StressTestEngine, StressTestReport,
};
use rust_decimal_macros::dec;

fn engine() -> StressTestEngine {
    StressTestEngine::new(StressConfig::default(), StressCatalog::default_library()).unwrap()
}

#[test]
fn test_2008_replay_on_equity_book() {
    let portfolio = Portfolio::default().with_holding("SPY", dec!(1000), dec!(100), AssetClass::Equity);
    let result = engine().replay_event(&portfolio, "2008_financial_crisis").unwrap();

    assert_eq!(result.original_value, dec!(100000));
    assert_eq!(result.stressed_value, dec!(55000));
    assert_eq!(result.absolute_loss, dec!(45000));
    assert!((result.percentage_loss - 45.0).abs() < 1e-9);
}

#[test]
fn test_short_equity_book_gains_in_crash() {
    let portfolio = Portfolio::default().with_holding("SPY", dec!(-1000), dec!(100), AssetClass::Equity);
    let result = engine().replay_event(&portfolio, "2008_financial_crisis").unwrap();

    assert_eq!(result.stressed_value, dec!(-55000));
    assert_eq!(result.absolute_loss, dec!(-45000));
    assert!((result.percentage_loss + 45.0).abs() < 1e-9);

    let report = engine().comprehensive(&portfolio);
    assert_ne!(report.worst_case_scenario.as_deref(), Some("2008_financial_crisis"));
    assert!(report.worst_case_loss > 0.0);
}

#[test]
fn test_comprehensive_worst_case_is_max_loss() {
    let portfolio = Portfolio::default()
        .with_holding("SPY", dec!(500), dec!(100), AssetClass::Equity)
        .with_holding("TLT", dec!(300), dec!(90), AssetClass::Bond)
        .with_holding("BTC", dec!(1), dec!(40000), AssetClass::Crypto);
    let report = engine().comprehensive(&portfolio);

    assert!(report.failed_tests.is_empty());
    let max = report
        .results
        .iter()
        .map(|r| r.percentage_loss)
        .fold(f64::MIN, f64::max);
    assert_eq!(report.worst_case_loss, max);
    let worst = report.worst_case_scenario.as_deref().unwrap();
    assert!(report
        .results
        .iter()
        .any(|r| r.scenario_name == worst && r.percentage_loss == max));
    assert!(report.expected_shortfall <= report.worst_case_loss + 1e-9);
}

#[test]
fn test_report_export_round_trip() {
    let portfolio = Portfolio::default().with_holding("SPY", dec!(10), dec!(400), AssetClass::Equity);
    let report = engine().comprehensive(&portfolio);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stress.json");
    report.export_json(&path).unwrap();

    let loaded: StressTestReport =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(loaded.report_id, report.report_id);
    assert_eq!(loaded.results.len(), report.results.len());
}

#[test]
fn test_portfolio_from_json() {
    let json = r#"{
        "holdings": {"SPY": "100", "GLD": "50"},
        "prices": {"SPY": "450.5", "GLD": "180"},
        "asset_classes": {"SPY": "equity", "GLD": "commodity"}
    }"#;
    let portfolio: Portfolio = serde_json::from_str(json).unwrap();
    assert_eq!(portfolio.total_value(), dec!(54050));

    let result = engine().run_scenario(&portfolio, "equity_crash").unwrap();
    assert!(result.absolute_loss > dec!(0));
}
