use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use super::config::{percentile_label, SimulationConfig};
use super::returns::{generate_shocks, lognormal_return};
use super::stats::{column_percentiles, mean, median};
use crate::allocation::{AllocationPolicy, AllocationStrategy, ScheduledAllocation};
use crate::error::FundednessError;
use crate::types::{with_metadata_f64, ComputationOutput};
use crate::withdrawals::{
    ScheduledSpending, WithdrawalContext, WithdrawalPolicy, WithdrawalStrategy,
};
use crate::FundednessResult;

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Outcome of one Monte Carlo run. Matrices are laid out `[path][year]` and
/// hold end-of-year values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub wealth_paths: Vec<Vec<f64>>,
    pub spending_paths: Option<Vec<Vec<f64>>>,
    pub allocation_paths: Option<Vec<Vec<f64>>>,
    /// Year in which the path hit zero wealth, `None` if it never did.
    pub time_to_ruin: Vec<Option<u32>>,
    /// First year spending fell below the floor; `None` when no floor is set.
    pub time_to_floor_breach: Option<Vec<Option<u32>>>,
    pub wealth_percentiles: BTreeMap<String, Vec<f64>>,
    pub spending_percentiles: Option<BTreeMap<String, Vec<f64>>>,
    /// Fraction of paths still solvent entering each year, i.e. with
    /// `time_to_ruin > year`. Same convention as the floor survival curve.
    pub survival_probability: Vec<f64>,
    pub success_rate: f64,
    pub floor_breach_rate: f64,
    pub median_terminal_wealth: f64,
    pub mean_terminal_wealth: f64,
    pub n_simulations: u32,
    pub n_years: u32,
    pub random_seed: Option<u64>,
}

impl SimulationResult {
    pub fn terminal_wealth(&self) -> Vec<f64> {
        self.wealth_paths
            .iter()
            .map(|p| p.last().copied().unwrap_or(0.0))
            .collect()
    }

    pub fn wealth_percentile(&self, p: u32) -> Option<&[f64]> {
        self.wealth_percentiles
            .get(&percentile_label(p))
            .map(Vec::as_slice)
    }

    pub fn spending_percentile(&self, p: u32) -> Option<&[f64]> {
        self.spending_percentiles
            .as_ref()?
            .get(&percentile_label(p))
            .map(Vec::as_slice)
    }

    /// Fraction of paths that have not yet breached the floor at the end of
    /// each year.
    pub fn floor_survival_probability(&self) -> Option<Vec<f64>> {
        let breaches = self.time_to_floor_breach.as_ref()?;
        let n = breaches.len().max(1) as f64;
        Some(
            (0..self.n_years)
                .map(|year| {
                    breaches
                        .iter()
                        .filter(|b| !matches!(b, Some(t) if *t <= year))
                        .count() as f64
                        / n
                })
                .collect(),
        )
    }

    /// Drop the per-path matrices, keeping percentiles and aggregates.
    pub fn summarize(mut self) -> Self {
        self.wealth_paths.clear();
        self.spending_paths = None;
        self.allocation_paths = None;
        self.time_to_ruin.clear();
        self.time_to_floor_breach = None;
        self
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Per-run settings that sit outside the policies.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PathOptions {
    pub spending_floor: Option<f64>,
    pub starting_age: Option<u32>,
    /// When set, the floor grows at this rate each year.
    pub floor_indexation: Option<f64>,
}

impl PathOptions {
    fn floor_at(&self, year: u32) -> Option<f64> {
        self.spending_floor.map(|f| match self.floor_indexation {
            Some(g) => f * (1.0 + g).powi(year as i32),
            None => f,
        })
    }
}

fn check_len(what: &str, got: usize, n_paths: usize) -> FundednessResult<()> {
    if got != n_paths {
        return Err(FundednessError::invalid(
            what,
            format!("Policy returned {got} values for {n_paths} paths"),
        ));
    }
    Ok(())
}

/// Evolve every path year by year under the given policies.
///
/// Shocks come from one generator seeded by `config.random_seed`, so two
/// runs with the same seed see the same market regardless of policy.
pub fn simulate_with_policies(
    initial_wealth: f64,
    withdrawal: &dyn WithdrawalPolicy,
    allocation: &dyn AllocationPolicy,
    config: &SimulationConfig,
    options: &PathOptions,
) -> FundednessResult<SimulationResult> {
    if !initial_wealth.is_finite() || initial_wealth <= 0.0 {
        return Err(FundednessError::invalid(
            "initial_wealth",
            "Must be positive",
        ));
    }
    if matches!(options.spending_floor, Some(f) if !f.is_finite() || f < 0.0) {
        return Err(FundednessError::invalid(
            "spending_floor",
            "Cannot be negative",
        ));
    }
    config.validate()?;

    let n_paths = config.n_simulations as usize;
    let n_years = config.n_years as usize;
    let market = &config.market_model;

    log::debug!(
        "simulating {n_paths} paths x {n_years} years: {} / {}",
        withdrawal.name(),
        allocation.name()
    );

    let shocks = generate_shocks(n_paths, n_years, config.fat_tail_df(), config.random_seed)?;

    let mut wealth = vec![initial_wealth; n_paths];
    let mut wealth_paths = vec![vec![0.0; n_years]; n_paths];
    let mut spending_paths = vec![vec![0.0; n_years]; n_paths];
    let mut allocation_paths = config
        .track_allocation
        .then(|| vec![vec![0.0; n_years]; n_paths]);
    let mut time_to_ruin: Vec<Option<u32>> = vec![None; n_paths];
    let mut time_to_floor_breach: Option<Vec<Option<u32>>> =
        options.spending_floor.map(|_| vec![None; n_paths]);
    let mut previous_spending: Option<Vec<f64>> = None;
    let mut previous_returns: Option<Vec<f64>> = None;

    for year in 0..config.n_years {
        let t = year as usize;

        let mut ctx = WithdrawalContext::new(&wealth, initial_wealth, year)
            .with_inflation((1.0 + market.inflation_mean).powi(year as i32));
        if let Some(age) = options.starting_age {
            ctx = ctx.with_age(age + year);
        }
        if let Some(prev) = previous_spending.as_deref() {
            ctx = ctx.with_previous_spending(prev);
        }
        if let Some(prev) = previous_returns.as_deref() {
            ctx = ctx.with_market_return(prev);
        }

        let decision = withdrawal.calculate_withdrawal(&ctx);
        check_len("withdrawal", decision.amount.len(), n_paths)?;
        let spending = decision.amount;

        if let (Some(floor), Some(breaches)) = (options.floor_at(year), time_to_floor_breach.as_mut()) {
            for (b, s) in breaches.iter_mut().zip(&spending) {
                if b.is_none() && *s < floor {
                    *b = Some(year);
                }
            }
        }

        let weights = allocation.allocation(&wealth, year, initial_wealth);
        check_len("allocation", weights.len(), n_paths)?;

        let stepped: Vec<(f64, f64)> = (0..n_paths)
            .into_par_iter()
            .map(|i| {
                let w = weights[i].clamp(0.0, 1.0);
                let mu = market.expected_portfolio_return(w, None);
                let sigma = market.portfolio_volatility(w, None);
                let r = lognormal_return(mu, sigma, shocks[i][t]);
                let next = ((wealth[i] - spending[i]).max(0.0) * (1.0 + r)).max(0.0);
                (next, r)
            })
            .collect();

        let (next_wealth, returns): (Vec<f64>, Vec<f64>) = stepped.into_iter().unzip();

        for i in 0..n_paths {
            wealth_paths[i][t] = next_wealth[i];
            spending_paths[i][t] = spending[i];
            if let Some(alloc) = allocation_paths.as_mut() {
                alloc[i][t] = weights[i];
            }
            if next_wealth[i] <= 0.0 && time_to_ruin[i].is_none() {
                time_to_ruin[i] = Some(year + 1);
            }
        }

        wealth = next_wealth;
        previous_spending = Some(spending);
        previous_returns = Some(returns);
    }

    let n = n_paths as f64;
    let survival_probability = (0..n_years as u32)
        .map(|year| {
            time_to_ruin
                .iter()
                .filter(|r| r.map_or(true, |t| t > year))
                .count() as f64
                / n
        })
        .collect();
    let success_rate = time_to_ruin.iter().filter(|r| r.is_none()).count() as f64 / n;
    let floor_breach_rate = time_to_floor_breach
        .as_ref()
        .map(|b| b.iter().filter(|x| x.is_some()).count() as f64 / n)
        .unwrap_or(0.0);
    let terminal: Vec<f64> = wealth_paths.iter().map(|p| p[n_years - 1]).collect();

    let wealth_percentiles = column_percentiles(&wealth_paths, n_years, &config.percentiles);
    let spending_percentiles = config
        .track_spending
        .then(|| column_percentiles(&spending_paths, n_years, &config.percentiles));

    Ok(SimulationResult {
        wealth_paths,
        spending_paths: config.track_spending.then_some(spending_paths),
        allocation_paths,
        time_to_ruin,
        time_to_floor_breach,
        wealth_percentiles,
        spending_percentiles,
        survival_probability,
        success_rate,
        floor_breach_rate,
        median_terminal_wealth: median(&terminal),
        mean_terminal_wealth: mean(&terminal),
        n_simulations: config.n_simulations,
        n_years: config.n_years,
        random_seed: config.random_seed,
    })
}

// ---------------------------------------------------------------------------
// Public entry point
// ---------------------------------------------------------------------------

/// A flat amount or one value per simulated year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schedule {
    Flat(f64),
    PerYear(Vec<f64>),
}

impl Schedule {
    /// One value per year. A longer schedule is cut to `n_years`; a shorter
    /// one repeats its last value.
    pub fn expand(&self, field: &str, n_years: u32) -> FundednessResult<Vec<f64>> {
        let n = n_years as usize;
        match self {
            Schedule::Flat(v) => Ok(vec![*v; n]),
            Schedule::PerYear(v) => {
                let last = *v.last().ok_or_else(|| {
                    FundednessError::invalid(field, "Yearly schedule cannot be empty")
                })?;
                let mut out: Vec<f64> = v.iter().copied().take(n).collect();
                out.resize(n, last);
                Ok(out)
            }
        }
    }
}

/// How spending and allocation are decided.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SpendingSpec {
    /// Real spending schedule, grown at the market's mean inflation.
    Static { annual_spending: Schedule },
    /// Policy-driven spending; allocation falls back to `stock_weight`.
    Dynamic {
        withdrawal: WithdrawalStrategy,
        #[serde(default)]
        allocation: Option<AllocationStrategy>,
    },
}

fn default_stock_weight() -> Schedule {
    Schedule::Flat(0.6)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationInput {
    pub initial_wealth: f64,
    pub spending: SpendingSpec,
    #[serde(default = "default_stock_weight")]
    pub stock_weight: Schedule,
    #[serde(default)]
    pub spending_floor: Option<f64>,
    #[serde(default)]
    pub starting_age: Option<u32>,
    #[serde(default)]
    pub config: SimulationConfig,
}

/// Run a Monte Carlo projection in either static or policy-driven mode.
pub fn run_simulation(
    input: &SimulationInput,
) -> FundednessResult<ComputationOutput<SimulationResult>> {
    let start = Instant::now();
    let config = &input.config;
    let mut warnings: Vec<String> = Vec::new();

    let weights = input.stock_weight.expand("stock_weight", config.n_years)?;
    let default_allocation = AllocationStrategy::Scheduled(ScheduledAllocation { weights });

    let (withdrawal, allocation, mode, floor_indexation) = match &input.spending {
        SpendingSpec::Static { annual_spending } => {
            let amounts = annual_spending.expand("annual_spending", config.n_years)?;
            let inflation = config.market_model.inflation_mean;
            (
                WithdrawalStrategy::Scheduled(ScheduledSpending::new(amounts, inflation)),
                default_allocation,
                "static",
                Some(inflation),
            )
        }
        SpendingSpec::Dynamic {
            withdrawal,
            allocation,
        } => (
            withdrawal.clone(),
            allocation.clone().unwrap_or(default_allocation),
            "dynamic",
            None,
        ),
    };
    withdrawal.validate()?;
    allocation.validate()?;

    let options = PathOptions {
        spending_floor: input.spending_floor,
        starting_age: input.starting_age,
        floor_indexation,
    };

    if config.random_seed.is_none() {
        warnings.push("No random seed supplied; results are not reproducible".into());
    }

    let result = simulate_with_policies(
        input.initial_wealth,
        &withdrawal,
        &allocation,
        config,
        &options,
    )?;

    if result.success_rate < 0.5 {
        warnings.push(format!(
            "Fewer than half of paths survive ({:.1}% success)",
            result.success_rate * 100.0
        ));
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo Retirement Projection (log-normal returns)",
        &serde_json::json!({
            "mode": mode,
            "initial_wealth": input.initial_wealth,
            "withdrawal_policy": withdrawal.name(),
            "allocation_policy": allocation.name(),
            "n_simulations": config.n_simulations,
            "n_years": config.n_years,
            "random_seed": config.random_seed,
            "return_model": config.return_model,
            "fat_tails": config.fat_tail_df().is_some(),
            "spending_floor": input.spending_floor,
        }),
        warnings,
        elapsed,
        result,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::allocation::ConstantAllocation;
    use crate::monte_carlo::returns::generate_returns;
    use crate::withdrawals::{FixedRealSwr, GuardrailsPolicy};

    const SEED: u64 = 42;

    fn config(n: u32, years: u32) -> SimulationConfig {
        SimulationConfig {
            n_simulations: n,
            n_years: years,
            random_seed: Some(SEED),
            ..SimulationConfig::default()
        }
    }

    fn static_input(spending: f64, n: u32, years: u32) -> SimulationInput {
        SimulationInput {
            initial_wealth: 1_000_000.0,
            spending: SpendingSpec::Static {
                annual_spending: Schedule::Flat(spending),
            },
            stock_weight: Schedule::Flat(0.6),
            spending_floor: None,
            starting_age: None,
            config: config(n, years),
        }
    }

    #[test]
    fn test_result_shape() {
        let out = run_simulation(&static_input(40_000.0, 200, 30)).unwrap();
        let r = &out.result;
        assert_eq!(r.wealth_paths.len(), 200);
        assert!(r.wealth_paths.iter().all(|p| p.len() == 30));
        assert_eq!(r.spending_paths.as_ref().unwrap().len(), 200);
        assert!(r.allocation_paths.is_none());
        assert_eq!(r.time_to_ruin.len(), 200);
        assert_eq!(r.survival_probability.len(), 30);
        for key in ["P10", "P25", "P50", "P75", "P90"] {
            assert_eq!(r.wealth_percentiles[key].len(), 30);
        }
        assert_eq!(out.metadata.precision, "ieee754_f64");
    }

    #[test]
    fn test_reproducible_with_seed() {
        let a = run_simulation(&static_input(50_000.0, 300, 25)).unwrap();
        let b = run_simulation(&static_input(50_000.0, 300, 25)).unwrap();
        assert_eq!(a.result.wealth_paths, b.result.wealth_paths);
        assert_eq!(a.result.time_to_ruin, b.result.time_to_ruin);
    }

    #[test]
    fn test_overspending_ruins_in_second_year() {
        let out = run_simulation(&static_input(600_000.0, 200, 10)).unwrap();
        let r = &out.result;
        assert!(r.time_to_ruin.iter().all(|t| *t == Some(2)));
        assert_eq!(r.success_rate, 0.0);
        assert!(r.wealth_paths.iter().all(|p| p[1..].iter().all(|w| *w == 0.0)));
        assert!(!out.warnings.is_empty());
    }

    #[test]
    fn test_zero_spending_always_succeeds() {
        let out = run_simulation(&static_input(0.0, 200, 30)).unwrap();
        assert_eq!(out.result.success_rate, 1.0);
        assert!(out.result.survival_probability.iter().all(|s| *s == 1.0));
    }

    #[test]
    fn test_floor_breach_recorded_first_year_only() {
        let mut input = static_input(20_000.0, 100, 10);
        input.spending_floor = Some(30_000.0);
        let r = run_simulation(&input).unwrap().result;
        let breaches = r.time_to_floor_breach.as_ref().unwrap();
        assert!(breaches.iter().all(|b| *b == Some(0)));
        assert_eq!(r.floor_breach_rate, 1.0);
        assert_eq!(r.floor_survival_probability().unwrap()[0], 0.0);
    }

    #[test]
    fn test_survival_is_non_increasing() {
        let r = run_simulation(&static_input(70_000.0, 500, 40)).unwrap().result;
        for w in r.survival_probability.windows(2) {
            assert!(w[1] <= w[0]);
        }
        let terminal = *r.survival_probability.last().unwrap();
        assert!(terminal >= r.success_rate);
    }

    #[test]
    fn test_survival_counts_paths_entering_each_year() {
        let mut input = static_input(2_000_000.0, 100, 10);
        input.initial_wealth = 1_000_000.0;
        let r = run_simulation(&input).unwrap().result;
        assert!(r.time_to_ruin.iter().all(|t| *t == Some(1)));
        assert_eq!(r.survival_probability[0], 1.0);
        assert!(r.survival_probability[1..].iter().all(|s| *s == 0.0));
        assert_eq!(r.success_rate, 0.0);
    }

    #[test]
    fn test_static_mode_uses_generated_returns() {
        let input = static_input(0.0, 100, 5);
        let r = run_simulation(&input).unwrap().result;
        let returns =
            generate_returns(100, 5, &input.config.market_model, 0.6, None, Some(SEED)).unwrap();
        for (path, rets) in r.wealth_paths.iter().zip(&returns) {
            let mut w = 1_000_000.0;
            for (t, ret) in rets.iter().enumerate() {
                w *= 1.0 + ret;
                assert!((path[t] - w).abs() < 1e-6 * w.max(1.0));
            }
        }
    }

    #[test]
    fn test_dynamic_mode_with_policies() {
        let input = SimulationInput {
            initial_wealth: 1_000_000.0,
            spending: SpendingSpec::Dynamic {
                withdrawal: WithdrawalStrategy::Guardrails(GuardrailsPolicy::default()),
                allocation: Some(AllocationStrategy::Constant(ConstantAllocation::new(0.5))),
            },
            stock_weight: Schedule::Flat(0.6),
            spending_floor: Some(30_000.0),
            starting_age: Some(65),
            config: SimulationConfig {
                track_allocation: true,
                ..config(200, 20)
            },
        };
        let r = run_simulation(&input).unwrap().result;
        let alloc = r.allocation_paths.as_ref().unwrap();
        assert!(alloc.iter().all(|p| p.iter().all(|w| *w == 0.5)));
        let spending = r.spending_paths.as_ref().unwrap();
        assert!((spending[0][0] - 50_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_validation_fails_fast() {
        let mut input = static_input(40_000.0, 200, 30);
        input.initial_wealth = 0.0;
        assert!(run_simulation(&input).is_err());

        let input = static_input(40_000.0, 50, 30);
        assert!(run_simulation(&input).is_err());

        let mut input = static_input(40_000.0, 200, 30);
        input.stock_weight = Schedule::PerYear(vec![]);
        assert!(run_simulation(&input).is_err());

        let mut input = static_input(40_000.0, 200, 30);
        input.stock_weight = Schedule::Flat(1.2);
        assert!(run_simulation(&input).is_err());
    }

    #[test]
    fn test_schedule_truncates_and_pads() {
        let long = Schedule::PerYear(vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(long.expand("annual_spending", 2).unwrap(), vec![1.0, 2.0]);
        let short = Schedule::PerYear(vec![1.0, 2.0]);
        assert_eq!(short.expand("annual_spending", 4).unwrap(), vec![1.0, 2.0, 2.0, 2.0]);
        assert!(Schedule::PerYear(vec![]).expand("stock_weight", 3).is_err());

        let mut input = static_input(40_000.0, 200, 30);
        input.stock_weight = Schedule::PerYear(vec![0.6; 3]);
        let padded = run_simulation(&input).unwrap().result;
        let flat = run_simulation(&static_input(40_000.0, 200, 30)).unwrap().result;
        assert_eq!(padded.wealth_paths, flat.wealth_paths);
    }

    #[test]
    fn test_policy_engine_directly() {
        let policy = FixedRealSwr::new(0.04);
        let alloc = ConstantAllocation::new(0.6);
        let r = simulate_with_policies(
            1_000_000.0,
            &policy,
            &alloc,
            &config(100, 10),
            &PathOptions::default(),
        )
        .unwrap();
        assert!(r.time_to_floor_breach.is_none());
        assert_eq!(r.floor_breach_rate, 0.0);
        assert!(r.wealth_percentile(50).is_some());
        assert!(r.wealth_percentile(33).is_none());
        let summary = r.summarize();
        assert!(summary.wealth_paths.is_empty());
        assert_eq!(summary.wealth_percentiles.len(), 5);
    }

    #[test]
    fn test_input_json() {
        let input: SimulationInput = serde_json::from_str(
            r#"{
                "initial_wealth": 1000000,
                "spending": {"mode": "dynamic", "withdrawal": {"type": "vpw"}},
                "config": {"n_simulations": 100, "n_years": 5, "random_seed": 7}
            }"#,
        )
        .unwrap();
        assert_eq!(input.stock_weight, Schedule::Flat(0.6));
        assert!(run_simulation(&input).is_ok());

        let flat: SimulationInput = serde_json::from_str(
            r#"{"initial_wealth": 1e6, "spending": {"mode": "static", "annual_spending": [1, 2]},
                "config": {"n_simulations": 100, "n_years": 2}}"#,
        )
        .unwrap();
        match flat.spending {
            SpendingSpec::Static { annual_spending } => {
                assert_eq!(annual_spending, Schedule::PerYear(vec![1.0, 2.0]))
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
