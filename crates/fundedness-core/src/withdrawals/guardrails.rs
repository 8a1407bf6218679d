use serde::{Deserialize, Serialize};

use super::{check_rate, SpendingLimits, WithdrawalContext, WithdrawalDecision, WithdrawalPolicy};
use crate::error::FundednessError;
use crate::FundednessResult;

/// Guyton-Klinger decision rules.
///
/// Spending follows last year's amount grown by inflation. When that implies
/// a withdrawal rate above the upper guardrail it is cut; below the lower
/// guardrail it is raised, unless last year's return was negative and the
/// down-year rule is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GuardrailsPolicy {
    pub initial_rate: f64,
    pub upper_guardrail: f64,
    pub lower_guardrail: f64,
    pub cut_amount: f64,
    pub raise_amount: f64,
    pub inflation_rate: f64,
    pub no_raise_in_down_year: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_spending: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling_spending: Option<f64>,
}

impl Default for GuardrailsPolicy {
    fn default() -> Self {
        GuardrailsPolicy {
            initial_rate: 0.05,
            upper_guardrail: 0.06,
            lower_guardrail: 0.04,
            cut_amount: 0.10,
            raise_amount: 0.10,
            inflation_rate: 0.025,
            no_raise_in_down_year: true,
            floor_spending: None,
            ceiling_spending: None,
        }
    }
}

impl GuardrailsPolicy {
    fn limits(&self) -> SpendingLimits {
        SpendingLimits::new(self.floor_spending, self.ceiling_spending)
    }

    pub fn validate(&self) -> FundednessResult<()> {
        check_rate("withdrawal.initial_rate", self.initial_rate)?;
        check_rate("withdrawal.upper_guardrail", self.upper_guardrail)?;
        check_rate("withdrawal.lower_guardrail", self.lower_guardrail)?;
        check_rate("withdrawal.cut_amount", self.cut_amount)?;
        if self.raise_amount < 0.0 {
            return Err(FundednessError::invalid(
                "withdrawal.raise_amount",
                "Cannot be negative",
            ));
        }
        if self.lower_guardrail >= self.upper_guardrail {
            return Err(FundednessError::invalid(
                "withdrawal.lower_guardrail",
                "Must be below upper_guardrail",
            ));
        }
        self.limits().validate()
    }
}

impl WithdrawalPolicy for GuardrailsPolicy {
    fn name(&self) -> String {
        "Guardrails".into()
    }

    fn description(&self) -> String {
        format!(
            "Start at {:.1}%, cut {:.0}% above {:.1}%, raise {:.0}% below {:.1}%.",
            self.initial_rate * 100.0,
            self.cut_amount * 100.0,
            self.upper_guardrail * 100.0,
            self.raise_amount * 100.0,
            self.lower_guardrail * 100.0
        )
    }

    fn initial_withdrawal(&self, initial_wealth: f64) -> f64 {
        initial_wealth * self.initial_rate
    }

    fn calculate_withdrawal(&self, ctx: &WithdrawalContext<'_>) -> WithdrawalDecision {
        let n = ctx.n_paths();
        let previous = ctx.previous_spending.filter(|_| ctx.year > 0);
        let mut cuts = vec![false; n];
        let mut raises = vec![false; n];

        let proposed: Vec<f64> = (0..n)
            .map(|i| {
                let base = match previous {
                    Some(prev) => prev[i] * (1.0 + self.inflation_rate),
                    None => ctx.initial_wealth * self.initial_rate,
                };
                let wealth = ctx.current_wealth[i];
                let rate = if wealth > 0.0 { base / wealth } else { f64::INFINITY };

                if rate > self.upper_guardrail {
                    cuts[i] = true;
                    base * (1.0 - self.cut_amount)
                } else if rate < self.lower_guardrail {
                    let down_year = self.no_raise_in_down_year
                        && ctx.market_return_ytd.is_some_and(|r| r[i] < 0.0);
                    if down_year {
                        base
                    } else {
                        raises[i] = true;
                        base * (1.0 + self.raise_amount)
                    }
                } else {
                    base
                }
            })
            .collect();

        let n_cut = cuts.iter().filter(|c| **c).count();
        let n_raise = raises.iter().filter(|r| **r).count();
        let mut decision = self.limits().apply(
            proposed,
            ctx.current_wealth,
            format!("Year {}: {n_cut} cuts, {n_raise} raises", ctx.year),
        );
        decision.guardrail_cut = cuts;
        decision.guardrail_raise = raises;
        decision
    }
}

/// Spending drifts toward a sustainable share of wealth, held between an
/// explicit floor and ceiling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorCeilingSpending {
    pub target_spending: f64,
    pub floor: f64,
    pub ceiling: f64,
    #[serde(default = "default_adjustment_rate")]
    pub adjustment_rate: f64,
    #[serde(default = "default_sustainable_rate")]
    pub sustainable_rate: f64,
}

fn default_adjustment_rate() -> f64 {
    0.05
}

fn default_sustainable_rate() -> f64 {
    0.04
}

impl FloorCeilingSpending {
    pub fn new(target_spending: f64, floor: f64, ceiling: f64) -> Self {
        FloorCeilingSpending {
            target_spending,
            floor,
            ceiling,
            adjustment_rate: default_adjustment_rate(),
            sustainable_rate: default_sustainable_rate(),
        }
    }

    pub fn validate(&self) -> FundednessResult<()> {
        check_rate("withdrawal.adjustment_rate", self.adjustment_rate)?;
        check_rate("withdrawal.sustainable_rate", self.sustainable_rate)?;
        if self.target_spending < 0.0 {
            return Err(FundednessError::invalid(
                "withdrawal.target_spending",
                "Cannot be negative",
            ));
        }
        SpendingLimits::new(Some(self.floor), Some(self.ceiling)).validate()
    }
}

impl WithdrawalPolicy for FloorCeilingSpending {
    fn name(&self) -> String {
        "Floor-Ceiling".into()
    }

    fn description(&self) -> String {
        format!(
            "Target {:.0} per year, kept between {:.0} and {:.0}.",
            self.target_spending, self.floor, self.ceiling
        )
    }

    fn initial_withdrawal(&self, _initial_wealth: f64) -> f64 {
        self.target_spending.clamp(self.floor, self.ceiling)
    }

    fn calculate_withdrawal(&self, ctx: &WithdrawalContext<'_>) -> WithdrawalDecision {
        let proposed = (0..ctx.n_paths())
            .map(|i| {
                let prev = ctx
                    .previous_spending
                    .map_or(self.target_spending, |p| p[i]);
                let sustainable = ctx.current_wealth[i] * self.sustainable_rate;
                prev + self.adjustment_rate * (sustainable - prev)
            })
            .collect();
        SpendingLimits::new(Some(self.floor), Some(self.ceiling)).apply(
            proposed,
            ctx.current_wealth,
            format!("Adjust {:.0}% toward sustainable", self.adjustment_rate * 100.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: f64 = 1_000_000.0;

    #[test]
    fn test_year_zero_uses_initial_rate() {
        let p = GuardrailsPolicy::default();
        let wealth = [W];
        let d = p.calculate_withdrawal(&WithdrawalContext::new(&wealth, W, 0));
        assert_eq!(d.amount, vec![50_000.0]);
        assert_eq!(d.guardrail_cut, vec![false]);
        assert_eq!(d.guardrail_raise, vec![false]);
    }

    #[test]
    fn test_cut_above_upper_guardrail() {
        let p = GuardrailsPolicy::default();
        let wealth = [W];
        let prev = [70_000.0];
        let ctx = WithdrawalContext::new(&wealth, W, 3).with_previous_spending(&prev);
        let d = p.calculate_withdrawal(&ctx);
        let base = 70_000.0 * 1.025;
        assert!((d.amount[0] - base * 0.9).abs() < 1e-9);
        assert!(d.amount[0] < base);
        assert_eq!(d.guardrail_cut, vec![true]);
        assert_eq!(d.floor_breach, vec![false]);
    }

    #[test]
    fn test_raise_below_lower_guardrail() {
        let p = GuardrailsPolicy::default();
        let wealth = [W];
        let prev = [30_000.0];
        let up = [0.05];
        let ctx = WithdrawalContext::new(&wealth, W, 3)
            .with_previous_spending(&prev)
            .with_market_return(&up);
        let d = p.calculate_withdrawal(&ctx);
        let base = 30_000.0 * 1.025;
        assert!((d.amount[0] - base * 1.1).abs() < 1e-9);
        assert_eq!(d.guardrail_raise, vec![true]);
    }

    #[test]
    fn test_no_raise_in_down_year() {
        let p = GuardrailsPolicy::default();
        let wealth = [W, W];
        let prev = [30_000.0, 30_000.0];
        let returns = [-0.10, 0.02];
        let ctx = WithdrawalContext::new(&wealth, W, 3)
            .with_previous_spending(&prev)
            .with_market_return(&returns);
        let d = p.calculate_withdrawal(&ctx);
        assert!((d.amount[0] - 30_750.0).abs() < 1e-9);
        assert_eq!(d.guardrail_raise, vec![false, true]);

        let lenient = GuardrailsPolicy {
            no_raise_in_down_year: false,
            ..GuardrailsPolicy::default()
        };
        let d = lenient.calculate_withdrawal(&ctx);
        assert_eq!(d.guardrail_raise, vec![true, true]);
    }

    #[test]
    fn test_depleted_path_cuts_and_caps() {
        let p = GuardrailsPolicy::default();
        let wealth = [0.0];
        let prev = [40_000.0];
        let ctx = WithdrawalContext::new(&wealth, W, 10).with_previous_spending(&prev);
        let d = p.calculate_withdrawal(&ctx);
        assert_eq!(d.amount, vec![0.0]);
        assert_eq!(d.guardrail_cut, vec![true]);
    }

    #[test]
    fn test_inverted_guardrails_rejected() {
        let p = GuardrailsPolicy {
            lower_guardrail: 0.07,
            ..GuardrailsPolicy::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn test_floor_ceiling_moves_toward_sustainable() {
        let p = FloorCeilingSpending::new(50_000.0, 30_000.0, 80_000.0);
        let wealth = [2_000_000.0, 100_000.0];
        let d = p.calculate_withdrawal(&WithdrawalContext::new(&wealth, W, 0));
        // 50k + 5% of (80k - 50k), and 50k + 5% of (4k - 50k)
        assert!((d.amount[0] - 51_500.0).abs() < 1e-9);
        assert!((d.amount[1] - 47_700.0).abs() < 1e-9);

        let prev = [79_900.0, 30_100.0];
        let ctx = WithdrawalContext::new(&wealth, W, 1).with_previous_spending(&prev);
        let d = p.calculate_withdrawal(&ctx);
        assert!((d.amount[0] - 79_905.0).abs() < 1e-9);
        assert!(d.floor_breach[1]);
        assert_eq!(d.amount[1], 30_000.0);
    }
}
