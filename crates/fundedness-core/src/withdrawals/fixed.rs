use serde::{Deserialize, Serialize};

use super::{check_rate, SpendingLimits, WithdrawalContext, WithdrawalDecision, WithdrawalPolicy};
use crate::error::FundednessError;
use crate::FundednessResult;

/// The "4% rule": a fixed share of initial wealth, grown with inflation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixedRealSwr {
    pub withdrawal_rate: f64,
    pub inflation_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_spending: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling_spending: Option<f64>,
}

impl Default for FixedRealSwr {
    fn default() -> Self {
        FixedRealSwr {
            withdrawal_rate: 0.04,
            inflation_rate: 0.025,
            floor_spending: None,
            ceiling_spending: None,
        }
    }
}

impl FixedRealSwr {
    pub fn new(withdrawal_rate: f64) -> Self {
        FixedRealSwr {
            withdrawal_rate,
            ..FixedRealSwr::default()
        }
    }

    fn limits(&self) -> SpendingLimits {
        SpendingLimits::new(self.floor_spending, self.ceiling_spending)
    }

    pub fn validate(&self) -> FundednessResult<()> {
        check_rate("withdrawal.withdrawal_rate", self.withdrawal_rate)?;
        if self.inflation_rate <= -1.0 {
            return Err(FundednessError::invalid(
                "withdrawal.inflation_rate",
                "Must be greater than -100%",
            ));
        }
        self.limits().validate()
    }
}

impl WithdrawalPolicy for FixedRealSwr {
    fn name(&self) -> String {
        format!("Fixed {:.1}% SWR", self.withdrawal_rate * 100.0)
    }

    fn description(&self) -> String {
        format!(
            "Withdraw {:.1}% of the initial portfolio in year 1, then adjust for {:.1}% inflation annually.",
            self.withdrawal_rate * 100.0,
            self.inflation_rate * 100.0
        )
    }

    fn initial_withdrawal(&self, initial_wealth: f64) -> f64 {
        initial_wealth * self.withdrawal_rate
    }

    fn calculate_withdrawal(&self, ctx: &WithdrawalContext<'_>) -> WithdrawalDecision {
        let base = ctx.initial_wealth * self.withdrawal_rate;
        let inflation_factor = (1.0 + self.inflation_rate).powi(ctx.year as i32);
        let nominal = base * inflation_factor;
        self.limits().apply(
            vec![nominal; ctx.n_paths()],
            ctx.current_wealth,
            format!("Year {}: base {base:.0} x {inflation_factor:.3} inflation", ctx.year),
        )
    }
}

/// Fixed share of current wealth each year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PercentOfPortfolio {
    pub withdrawal_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_spending: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling_spending: Option<f64>,
}

impl Default for PercentOfPortfolio {
    fn default() -> Self {
        PercentOfPortfolio {
            withdrawal_rate: 0.04,
            floor_spending: None,
            ceiling_spending: None,
        }
    }
}

impl PercentOfPortfolio {
    fn limits(&self) -> SpendingLimits {
        SpendingLimits::new(self.floor_spending, self.ceiling_spending)
    }

    pub fn validate(&self) -> FundednessResult<()> {
        check_rate("withdrawal.withdrawal_rate", self.withdrawal_rate)?;
        self.limits().validate()
    }
}

impl WithdrawalPolicy for PercentOfPortfolio {
    fn name(&self) -> String {
        format!("{:.1}% of Portfolio", self.withdrawal_rate * 100.0)
    }

    fn description(&self) -> String {
        format!(
            "Withdraw {:.1}% of the current portfolio value each year.",
            self.withdrawal_rate * 100.0
        )
    }

    fn initial_withdrawal(&self, initial_wealth: f64) -> f64 {
        initial_wealth * self.withdrawal_rate
    }

    fn calculate_withdrawal(&self, ctx: &WithdrawalContext<'_>) -> WithdrawalDecision {
        let proposed = ctx
            .current_wealth
            .iter()
            .map(|w| w * self.withdrawal_rate)
            .collect();
        self.limits().apply(
            proposed,
            ctx.current_wealth,
            format!("{:.1}% of current wealth", self.withdrawal_rate * 100.0),
        )
    }
}

/// Pre-set spending per year in today's dollars, grown with inflation.
/// The last amount repeats past the end of the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSpending {
    pub amounts: Vec<f64>,
    #[serde(default)]
    pub inflation_rate: f64,
}

impl ScheduledSpending {
    pub fn new(amounts: Vec<f64>, inflation_rate: f64) -> Self {
        ScheduledSpending {
            amounts,
            inflation_rate,
        }
    }

    fn real_amount(&self, year: u32) -> f64 {
        self.amounts
            .get(year as usize)
            .or(self.amounts.last())
            .copied()
            .unwrap_or(0.0)
    }

    pub fn validate(&self) -> FundednessResult<()> {
        if self.amounts.is_empty() {
            return Err(FundednessError::InsufficientData(
                "Spending schedule needs at least one amount".into(),
            ));
        }
        if self.amounts.iter().any(|a| !a.is_finite() || *a < 0.0) {
            return Err(FundednessError::invalid(
                "withdrawal.amounts",
                "Spending cannot be negative",
            ));
        }
        Ok(())
    }
}

impl WithdrawalPolicy for ScheduledSpending {
    fn name(&self) -> String {
        "Scheduled Spending".into()
    }

    fn description(&self) -> String {
        "Spend a fixed schedule of real amounts, capped at available wealth.".into()
    }

    fn initial_withdrawal(&self, _initial_wealth: f64) -> f64 {
        self.real_amount(0)
    }

    fn calculate_withdrawal(&self, ctx: &WithdrawalContext<'_>) -> WithdrawalDecision {
        let nominal = self.real_amount(ctx.year) * (1.0 + self.inflation_rate).powi(ctx.year as i32);
        SpendingLimits::default().apply(
            vec![nominal; ctx.n_paths()],
            ctx.current_wealth,
            format!("Scheduled year {}", ctx.year),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_swr_inflates_from_initial() {
        let p = FixedRealSwr::default();
        let wealth = [2_000_000.0, 500_000.0];
        let d = p.calculate_withdrawal(&WithdrawalContext::new(&wealth, 1_000_000.0, 0));
        assert_eq!(d.amount, vec![40_000.0, 40_000.0]);

        let d = p.calculate_withdrawal(&WithdrawalContext::new(&wealth, 1_000_000.0, 2));
        let expected = 40_000.0 * 1.025_f64.powi(2);
        assert!((d.amount[0] - expected).abs() < 1e-9);
        assert_eq!(p.initial_withdrawal(1_000_000.0), 40_000.0);
        assert_eq!(p.name(), "Fixed 4.0% SWR");
    }

    #[test]
    fn test_fixed_swr_capped_by_wealth() {
        let p = FixedRealSwr::default();
        let wealth = [25_000.0, 0.0];
        let d = p.calculate_withdrawal(&WithdrawalContext::new(&wealth, 1_000_000.0, 0));
        assert_eq!(d.amount, vec![25_000.0, 0.0]);
    }

    #[test]
    fn test_percent_of_portfolio() {
        let p = PercentOfPortfolio {
            ceiling_spending: Some(60_000.0),
            ..PercentOfPortfolio::default()
        };
        let wealth = [1_000_000.0, 2_000_000.0];
        let d = p.calculate_withdrawal(&WithdrawalContext::new(&wealth, 1_000_000.0, 5));
        assert_eq!(d.amount, vec![40_000.0, 60_000.0]);
        assert_eq!(d.ceiling_hit, vec![false, true]);
    }

    #[test]
    fn test_scheduled_spending_repeats_last() {
        let p = ScheduledSpending::new(vec![10_000.0, 20_000.0], 0.0);
        let wealth = [1e6];
        let d = p.calculate_withdrawal(&WithdrawalContext::new(&wealth, 1e6, 9));
        assert_eq!(d.amount, vec![20_000.0]);
        assert!(ScheduledSpending::new(vec![], 0.0).validate().is_err());
    }

    #[test]
    fn test_invalid_rate() {
        assert!(FixedRealSwr::new(1.5).validate().is_err());
        assert!(FixedRealSwr::new(0.04).validate().is_ok());
    }
}
