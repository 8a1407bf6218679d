//! Withdrawal policies: how much each path spends in a given year.

pub mod amortization;
pub mod comparison;
pub mod fixed;
pub mod guardrails;
pub mod optimal;
pub mod tables;

use serde::{Deserialize, Serialize};

use crate::error::FundednessError;
use crate::FundednessResult;

pub use amortization::AmortizationPolicy;
pub use comparison::{compare_strategies, run_strategy_simulation, CompareInput, ComparisonOutput, StrategyMetrics};
pub use fixed::{FixedRealSwr, PercentOfPortfolio, ScheduledSpending};
pub use guardrails::{FloorCeilingSpending, GuardrailsPolicy};
pub use optimal::MertonOptimalSpending;
pub use tables::{RmdStylePolicy, VpwPolicy};

// ---------------------------------------------------------------------------
// Context and decision
// ---------------------------------------------------------------------------

/// Per-year state handed to a policy. Slices are indexed by path.
#[derive(Debug, Clone, Copy)]
pub struct WithdrawalContext<'a> {
    pub current_wealth: &'a [f64],
    pub initial_wealth: f64,
    pub year: u32,
    pub age: Option<u32>,
    /// Price level relative to year 0.
    pub inflation_cumulative: f64,
    /// Last year's realized spending; `None` in year 0.
    pub previous_spending: Option<&'a [f64]>,
    /// Last year's realized portfolio return; `None` in year 0.
    pub market_return_ytd: Option<&'a [f64]>,
}

impl<'a> WithdrawalContext<'a> {
    pub fn new(current_wealth: &'a [f64], initial_wealth: f64, year: u32) -> Self {
        WithdrawalContext {
            current_wealth,
            initial_wealth,
            year,
            age: None,
            inflation_cumulative: 1.0,
            previous_spending: None,
            market_return_ytd: None,
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_inflation(mut self, inflation_cumulative: f64) -> Self {
        self.inflation_cumulative = inflation_cumulative;
        self
    }

    pub fn with_previous_spending(mut self, previous: &'a [f64]) -> Self {
        self.previous_spending = Some(previous);
        self
    }

    pub fn with_market_return(mut self, returns: &'a [f64]) -> Self {
        self.market_return_ytd = Some(returns);
        self
    }

    pub fn n_paths(&self) -> usize {
        self.current_wealth.len()
    }

    /// Explicit age when known, otherwise `starting_age + year`.
    pub fn age_or(&self, starting_age: u32) -> u32 {
        self.age.unwrap_or(starting_age + self.year)
    }
}

/// Spending per path plus the flags raised while computing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithdrawalDecision {
    pub amount: Vec<f64>,
    /// Proposed amount was below the absolute floor and was raised to it.
    pub floor_breach: Vec<bool>,
    /// Proposed amount was above the absolute ceiling and was lowered to it.
    pub ceiling_hit: Vec<bool>,
    pub guardrail_cut: Vec<bool>,
    pub guardrail_raise: Vec<bool>,
    pub rationale: String,
}

/// Absolute floor and ceiling shared by every withdrawal policy.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SpendingLimits {
    pub floor: Option<f64>,
    pub ceiling: Option<f64>,
}

impl SpendingLimits {
    pub fn new(floor: Option<f64>, ceiling: Option<f64>) -> Self {
        SpendingLimits { floor, ceiling }
    }

    /// Raise to the floor, lower to the ceiling, then cap at available wealth.
    ///
    /// The wealth cap runs last, so a floor can still be undercut on a path
    /// that cannot afford it.
    pub fn apply(&self, proposed: Vec<f64>, wealth: &[f64], rationale: String) -> WithdrawalDecision {
        let n = proposed.len();
        let mut floor_breach = vec![false; n];
        let mut ceiling_hit = vec![false; n];
        let amount = proposed
            .into_iter()
            .zip(wealth)
            .enumerate()
            .map(|(i, (mut a, &w))| {
                if let Some(floor) = self.floor {
                    if a < floor {
                        floor_breach[i] = true;
                        a = floor;
                    }
                }
                if let Some(ceiling) = self.ceiling {
                    if a > ceiling {
                        ceiling_hit[i] = true;
                        a = ceiling;
                    }
                }
                a.min(w.max(0.0)).max(0.0)
            })
            .collect();
        WithdrawalDecision {
            amount,
            floor_breach,
            ceiling_hit,
            guardrail_cut: vec![false; n],
            guardrail_raise: vec![false; n],
            rationale,
        }
    }

    pub fn validate(&self) -> FundednessResult<()> {
        if matches!(self.floor, Some(f) if f < 0.0) {
            return Err(FundednessError::invalid("floor_spending", "Cannot be negative"));
        }
        if matches!(self.ceiling, Some(c) if c < 0.0) {
            return Err(FundednessError::invalid("ceiling_spending", "Cannot be negative"));
        }
        if let (Some(f), Some(c)) = (self.floor, self.ceiling) {
            if f > c {
                return Err(FundednessError::invalid(
                    "floor_spending",
                    "Floor cannot exceed ceiling",
                ));
            }
        }
        Ok(())
    }
}

pub(crate) fn check_rate(field: &str, rate: f64) -> FundednessResult<()> {
    if !(0.0..=1.0).contains(&rate) {
        return Err(FundednessError::invalid(field, "Rate must be between 0 and 1"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Policy trait
// ---------------------------------------------------------------------------

pub trait WithdrawalPolicy: Send + Sync {
    fn name(&self) -> String;

    fn description(&self) -> String;

    /// First-year withdrawal for a given starting portfolio.
    fn initial_withdrawal(&self, initial_wealth: f64) -> f64;

    /// Spending for every path this year. The returned vectors have one
    /// entry per path in `ctx.current_wealth`.
    fn calculate_withdrawal(&self, ctx: &WithdrawalContext<'_>) -> WithdrawalDecision;
}

/// Serializable choice of withdrawal policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WithdrawalStrategy {
    FixedSwr(FixedRealSwr),
    PercentPortfolio(PercentOfPortfolio),
    Guardrails(GuardrailsPolicy),
    Vpw(VpwPolicy),
    RmdStyle(RmdStylePolicy),
    Amortization(AmortizationPolicy),
    MertonOptimal(MertonOptimalSpending),
    FloorCeiling(FloorCeilingSpending),
    Scheduled(ScheduledSpending),
}

impl WithdrawalStrategy {
    /// Default-configured policy by its tag, e.g. `"guardrails"`.
    pub fn by_name(name: &str) -> FundednessResult<Self> {
        let strategy = match name {
            "fixed_swr" => WithdrawalStrategy::FixedSwr(FixedRealSwr::default()),
            "percent_portfolio" => WithdrawalStrategy::PercentPortfolio(PercentOfPortfolio::default()),
            "guardrails" => WithdrawalStrategy::Guardrails(GuardrailsPolicy::default()),
            "vpw" => WithdrawalStrategy::Vpw(VpwPolicy::default()),
            "rmd_style" => WithdrawalStrategy::RmdStyle(RmdStylePolicy::default()),
            "amortization" => WithdrawalStrategy::Amortization(AmortizationPolicy::default()),
            "merton_optimal" => WithdrawalStrategy::MertonOptimal(MertonOptimalSpending::default()),
            other => return Err(FundednessError::UnknownPolicy(other.to_string())),
        };
        Ok(strategy)
    }

    /// Fixed SWR, guardrails starting a point higher, and VPW.
    pub fn default_comparison_set(withdrawal_rate: f64, starting_age: u32) -> Vec<Self> {
        vec![
            WithdrawalStrategy::FixedSwr(FixedRealSwr {
                withdrawal_rate,
                ..FixedRealSwr::default()
            }),
            WithdrawalStrategy::Guardrails(GuardrailsPolicy {
                initial_rate: withdrawal_rate + 0.01,
                ..GuardrailsPolicy::default()
            }),
            WithdrawalStrategy::Vpw(VpwPolicy {
                starting_age,
                ..VpwPolicy::default()
            }),
        ]
    }

    fn policy(&self) -> &dyn WithdrawalPolicy {
        match self {
            WithdrawalStrategy::FixedSwr(p) => p,
            WithdrawalStrategy::PercentPortfolio(p) => p,
            WithdrawalStrategy::Guardrails(p) => p,
            WithdrawalStrategy::Vpw(p) => p,
            WithdrawalStrategy::RmdStyle(p) => p,
            WithdrawalStrategy::Amortization(p) => p,
            WithdrawalStrategy::MertonOptimal(p) => p,
            WithdrawalStrategy::FloorCeiling(p) => p,
            WithdrawalStrategy::Scheduled(p) => p,
        }
    }

    pub fn validate(&self) -> FundednessResult<()> {
        match self {
            WithdrawalStrategy::FixedSwr(p) => p.validate(),
            WithdrawalStrategy::PercentPortfolio(p) => p.validate(),
            WithdrawalStrategy::Guardrails(p) => p.validate(),
            WithdrawalStrategy::Vpw(p) => p.validate(),
            WithdrawalStrategy::RmdStyle(p) => p.validate(),
            WithdrawalStrategy::Amortization(p) => p.validate(),
            WithdrawalStrategy::MertonOptimal(p) => p.validate(),
            WithdrawalStrategy::FloorCeiling(p) => p.validate(),
            WithdrawalStrategy::Scheduled(p) => p.validate(),
        }
    }
}

impl WithdrawalPolicy for WithdrawalStrategy {
    fn name(&self) -> String {
        self.policy().name()
    }

    fn description(&self) -> String {
        self.policy().description()
    }

    fn initial_withdrawal(&self, initial_wealth: f64) -> f64 {
        self.policy().initial_withdrawal(initial_wealth)
    }

    fn calculate_withdrawal(&self, ctx: &WithdrawalContext<'_>) -> WithdrawalDecision {
        self.policy().calculate_withdrawal(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_floor_then_ceiling_then_wealth() {
        let limits = SpendingLimits::new(Some(30_000.0), Some(80_000.0));
        let d = limits.apply(
            vec![20_000.0, 50_000.0, 100_000.0, 50_000.0],
            &[1e6, 1e6, 1e6, 10_000.0],
            String::new(),
        );
        assert_eq!(d.amount, vec![30_000.0, 50_000.0, 80_000.0, 10_000.0]);
        assert_eq!(d.floor_breach, vec![true, false, false, false]);
        assert_eq!(d.ceiling_hit, vec![false, false, true, false]);
    }

    #[test]
    fn test_limits_never_exceed_wealth() {
        let limits = SpendingLimits::new(Some(50_000.0), None);
        let d = limits.apply(vec![10_000.0, 10_000.0], &[20_000.0, -5.0], String::new());
        assert_eq!(d.amount, vec![20_000.0, 0.0]);
        assert_eq!(d.floor_breach, vec![true, true]);
    }

    #[test]
    fn test_limits_validation() {
        assert!(SpendingLimits::new(Some(10.0), Some(5.0)).validate().is_err());
        assert!(SpendingLimits::new(Some(-1.0), None).validate().is_err());
        assert!(SpendingLimits::default().validate().is_ok());
    }

    #[test]
    fn test_context_age_fallback() {
        let w = [1.0];
        let ctx = WithdrawalContext::new(&w, 1.0, 7);
        assert_eq!(ctx.age_or(65), 72);
        assert_eq!(ctx.with_age(80).age_or(65), 80);
    }

    #[test]
    fn test_by_name() {
        assert!(matches!(
            WithdrawalStrategy::by_name("vpw").unwrap(),
            WithdrawalStrategy::Vpw(_)
        ));
        let err = WithdrawalStrategy::by_name("yolo").unwrap_err();
        assert!(matches!(err, FundednessError::UnknownPolicy(ref n) if n == "yolo"));
    }

    #[test]
    fn test_tagged_json() {
        let s: WithdrawalStrategy = serde_json::from_str(
            r#"{"type":"guardrails","initial_rate":0.05,"floor_spending":30000}"#,
        )
        .unwrap();
        match &s {
            WithdrawalStrategy::Guardrails(g) => {
                assert_eq!(g.floor_spending, Some(30_000.0));
                assert_eq!(g.upper_guardrail, 0.06);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(s.validate().is_ok());
        assert!(serde_json::from_str::<WithdrawalStrategy>(r#"{"type":"lottery"}"#).is_err());
    }

    #[test]
    fn test_default_comparison_set() {
        let set = WithdrawalStrategy::default_comparison_set(0.04, 65);
        assert_eq!(set.len(), 3);
        match &set[1] {
            WithdrawalStrategy::Guardrails(g) => assert!((g.initial_rate - 0.05).abs() < 1e-12),
            other => panic!("unexpected {other:?}"),
        }
    }
}
