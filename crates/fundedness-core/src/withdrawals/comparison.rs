use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::{WithdrawalPolicy, WithdrawalStrategy};
use crate::allocation::ConstantAllocation;
use crate::error::FundednessError;
use crate::monte_carlo::stats::{mean, median, std_dev};
use crate::monte_carlo::{simulate_with_policies, PathOptions, SimulationConfig, SimulationResult};
use crate::types::{with_metadata_f64, ComputationOutput};
use crate::FundednessResult;

/// Seed used when a comparison is requested without one. Every strategy in a
/// comparison must see the same market paths.
pub const DEFAULT_COMPARISON_SEED: u64 = 42;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareInput {
    /// Strategies to compare; empty means fixed SWR, guardrails and VPW.
    #[serde(default)]
    pub strategies: Vec<WithdrawalStrategy>,
    pub initial_wealth: f64,
    #[serde(default = "default_withdrawal_rate")]
    pub withdrawal_rate: f64,
    #[serde(default = "default_stock_weight")]
    pub stock_weight: f64,
    #[serde(default = "default_starting_age")]
    pub starting_age: u32,
    #[serde(default)]
    pub spending_floor: Option<f64>,
    #[serde(default)]
    pub config: SimulationConfig,
}

fn default_withdrawal_rate() -> f64 {
    0.04
}

fn default_stock_weight() -> f64 {
    0.6
}

fn default_starting_age() -> u32 {
    65
}

/// Headline numbers for one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyMetrics {
    pub name: String,
    pub success_rate: f64,
    pub floor_breach_rate: f64,
    pub median_terminal_wealth: f64,
    pub mean_terminal_wealth: f64,
    pub median_initial_spending: f64,
    pub average_spending: f64,
    /// Standard deviation of year-over-year spending changes.
    pub spending_volatility: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyRun {
    pub name: String,
    pub result: SimulationResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonOutput {
    pub strategy_names: Vec<String>,
    pub metrics: Vec<StrategyMetrics>,
    pub results: Vec<StrategyRun>,
}

impl ComparisonOutput {
    pub fn best_by_success_rate(&self) -> Option<&StrategyMetrics> {
        self.metrics.iter().max_by(|a, b| {
            a.success_rate
                .partial_cmp(&b.success_rate)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
    }
}

// ---------------------------------------------------------------------------
// Runs
// ---------------------------------------------------------------------------

/// Simulate one withdrawal policy under a constant stock weight.
///
/// Spending is always tracked since the comparison metrics need it.
pub fn run_strategy_simulation(
    policy: &dyn WithdrawalPolicy,
    initial_wealth: f64,
    config: &SimulationConfig,
    stock_weight: f64,
    starting_age: u32,
    spending_floor: Option<f64>,
) -> FundednessResult<SimulationResult> {
    if !(0.0..=1.0).contains(&stock_weight) {
        return Err(FundednessError::invalid(
            "stock_weight",
            "Must be between 0 and 1",
        ));
    }
    let config = SimulationConfig {
        track_spending: true,
        ..config.clone()
    };
    let allocation = ConstantAllocation::new(stock_weight);
    let options = PathOptions {
        spending_floor,
        starting_age: Some(starting_age),
        floor_indexation: None,
    };
    simulate_with_policies(initial_wealth, policy, &allocation, &config, &options)
}

/// Run every policy against the same seeded market, in parallel.
pub fn compare_policies(
    policies: &[WithdrawalStrategy],
    initial_wealth: f64,
    config: &SimulationConfig,
    stock_weight: f64,
    starting_age: u32,
    spending_floor: Option<f64>,
) -> FundednessResult<Vec<StrategyRun>> {
    policies
        .par_iter()
        .map(|policy| -> FundednessResult<StrategyRun> {
            let result = run_strategy_simulation(
                policy,
                initial_wealth,
                config,
                stock_weight,
                starting_age,
                spending_floor,
            )?;
            Ok(StrategyRun {
                name: policy.name(),
                result,
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Population standard deviation of `s[t] / s[t-1] - 1` over every path,
/// skipping non-finite ratios from zero-spending years.
pub fn spending_volatility(spending_paths: &[Vec<f64>]) -> f64 {
    let changes: Vec<f64> = spending_paths
        .iter()
        .flat_map(|path| path.windows(2).map(|w| w[1] / w[0] - 1.0))
        .filter(|c| c.is_finite())
        .collect();
    if changes.is_empty() {
        return 0.0;
    }
    std_dev(&changes)
}

pub fn strategy_metrics(run: &StrategyRun) -> StrategyMetrics {
    let r = &run.result;
    let spending = r.spending_paths.as_deref().unwrap_or(&[]);
    let initial: Vec<f64> = spending.iter().filter_map(|p| p.first().copied()).collect();
    let all: Vec<f64> = spending.iter().flatten().copied().collect();

    StrategyMetrics {
        name: run.name.clone(),
        success_rate: r.success_rate,
        floor_breach_rate: r.floor_breach_rate,
        median_terminal_wealth: r.median_terminal_wealth,
        mean_terminal_wealth: r.mean_terminal_wealth,
        median_initial_spending: if initial.is_empty() { 0.0 } else { median(&initial) },
        average_spending: if all.is_empty() { 0.0 } else { mean(&all) },
        spending_volatility: spending_volatility(spending),
    }
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// Compare withdrawal strategies on identical market paths.
pub fn compare_strategies(
    input: &CompareInput,
) -> FundednessResult<ComputationOutput<ComparisonOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let strategies = if input.strategies.is_empty() {
        WithdrawalStrategy::default_comparison_set(input.withdrawal_rate, input.starting_age)
    } else {
        input.strategies.clone()
    };
    for s in &strategies {
        s.validate()?;
    }

    let mut config = input.config.clone();
    if config.random_seed.is_none() {
        config.random_seed = Some(DEFAULT_COMPARISON_SEED);
        warnings.push(format!(
            "No random seed supplied; using {DEFAULT_COMPARISON_SEED} for every strategy"
        ));
    }

    let results = compare_policies(
        &strategies,
        input.initial_wealth,
        &config,
        input.stock_weight,
        input.starting_age,
        input.spending_floor,
    )?;
    let metrics: Vec<StrategyMetrics> = results.iter().map(strategy_metrics).collect();

    log::debug!(
        "compared {} strategies over {} paths",
        metrics.len(),
        config.n_simulations
    );

    let output = ComparisonOutput {
        strategy_names: results.iter().map(|r| r.name.clone()).collect(),
        metrics,
        results,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Withdrawal Strategy Comparison (common random numbers)",
        &serde_json::json!({
            "initial_wealth": input.initial_wealth,
            "stock_weight": input.stock_weight,
            "starting_age": input.starting_age,
            "spending_floor": input.spending_floor,
            "n_simulations": config.n_simulations,
            "n_years": config.n_years,
            "random_seed": config.random_seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::withdrawals::{FixedRealSwr, GuardrailsPolicy};

    const SEED: u64 = 42;

    fn config() -> SimulationConfig {
        SimulationConfig {
            n_simulations: 200,
            n_years: 30,
            random_seed: Some(SEED),
            ..SimulationConfig::default()
        }
    }

    fn input(strategies: Vec<WithdrawalStrategy>) -> CompareInput {
        CompareInput {
            strategies,
            initial_wealth: 1_000_000.0,
            withdrawal_rate: 0.04,
            stock_weight: 0.6,
            starting_age: 65,
            spending_floor: None,
            config: config(),
        }
    }

    #[test]
    fn test_default_set() {
        let out = compare_strategies(&input(vec![])).unwrap();
        assert_eq!(out.result.metrics.len(), 3);
        assert_eq!(out.result.strategy_names.len(), 3);
        assert!(out.warnings.is_empty());
        assert!(out.result.best_by_success_rate().is_some());
    }

    #[test]
    fn test_matches_isolated_run() {
        let fixed = FixedRealSwr::new(0.04);
        let capped = FixedRealSwr {
            ceiling_spending: Some(1e12),
            ..FixedRealSwr::new(0.04)
        };
        let out = compare_strategies(&input(vec![
            WithdrawalStrategy::FixedSwr(capped),
            WithdrawalStrategy::Guardrails(GuardrailsPolicy::default()),
        ]))
        .unwrap();

        let isolated =
            run_strategy_simulation(&fixed, 1_000_000.0, &config(), 0.6, 65, None).unwrap();
        assert_eq!(out.result.results[0].result.wealth_paths, isolated.wealth_paths);
    }

    #[test]
    fn test_missing_seed_is_deterministic() {
        let mut a = input(vec![]);
        a.config.random_seed = None;
        let b = a.clone();
        let ra = compare_strategies(&a).unwrap();
        let rb = compare_strategies(&b).unwrap();
        assert_eq!(ra.result.metrics, rb.result.metrics);
        assert_eq!(ra.warnings.len(), 1);
    }

    #[test]
    fn test_initial_spending_metric() {
        let out = compare_strategies(&input(vec![WithdrawalStrategy::FixedSwr(
            FixedRealSwr::new(0.04),
        )]))
        .unwrap();
        let m = &out.result.metrics[0];
        assert!((m.median_initial_spending - 40_000.0).abs() < 1e-6);
        assert!(m.average_spending > 0.0);
    }

    #[test]
    fn test_spending_volatility_skips_zero_years() {
        let paths = vec![vec![100.0, 110.0, 0.0, 50.0]];
        assert!((spending_volatility(&paths) - 0.55).abs() < 1e-12);
        assert_eq!(spending_volatility(&[vec![10.0, 10.0, 10.0]]), 0.0);
        assert_eq!(spending_volatility(&[]), 0.0);
    }

    #[test]
    fn test_invalid_strategy_rejected() {
        let bad = GuardrailsPolicy {
            lower_guardrail: 0.07,
            ..GuardrailsPolicy::default()
        };
        assert!(compare_strategies(&input(vec![WithdrawalStrategy::Guardrails(bad)])).is_err());
    }

    #[test]
    fn test_input_defaults_from_json() {
        let i: CompareInput = serde_json::from_str(r#"{"initial_wealth": 500000}"#).unwrap();
        assert_eq!(i.withdrawal_rate, 0.04);
        assert_eq!(i.stock_weight, 0.6);
        assert_eq!(i.starting_age, 65);
        assert!(i.strategies.is_empty());
    }
}
