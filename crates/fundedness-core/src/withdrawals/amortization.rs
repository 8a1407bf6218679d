use serde::{Deserialize, Serialize};

use super::{SpendingLimits, WithdrawalContext, WithdrawalDecision, WithdrawalPolicy};
use crate::error::FundednessError;
use crate::FundednessResult;

/// Level payment that would exhaust current wealth by `planning_age` at
/// `expected_return`, recomputed every year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmortizationPolicy {
    pub starting_age: u32,
    pub planning_age: u32,
    /// Expected real return.
    pub expected_return: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_spending: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling_spending: Option<f64>,
}

impl Default for AmortizationPolicy {
    fn default() -> Self {
        AmortizationPolicy {
            starting_age: 65,
            planning_age: 95,
            expected_return: 0.04,
            floor_spending: None,
            ceiling_spending: None,
        }
    }
}

/// `PMT = W·r / (1 − (1+r)^−n)`; `W/n` when r is zero.
pub fn amortized_payment(wealth: f64, rate: f64, years: u32) -> f64 {
    if years == 0 {
        return wealth;
    }
    let n = years as f64;
    if rate == 0.0 {
        return wealth / n;
    }
    wealth * rate / (1.0 - (1.0 + rate).powf(-n))
}

impl AmortizationPolicy {
    fn limits(&self) -> SpendingLimits {
        SpendingLimits::new(self.floor_spending, self.ceiling_spending)
    }

    fn years_remaining(&self, age: u32) -> u32 {
        self.planning_age.saturating_sub(age).max(1)
    }

    pub fn validate(&self) -> FundednessResult<()> {
        if self.expected_return <= -1.0 {
            return Err(FundednessError::invalid(
                "withdrawal.expected_return",
                "Must be greater than -100%",
            ));
        }
        if self.planning_age <= self.starting_age {
            return Err(FundednessError::invalid(
                "withdrawal.planning_age",
                "Must be after starting_age",
            ));
        }
        self.limits().validate()
    }
}

impl WithdrawalPolicy for AmortizationPolicy {
    fn name(&self) -> String {
        "Amortization".into()
    }

    fn description(&self) -> String {
        format!(
            "Level payment to exhaust the portfolio by age {} assuming {:.1}% real return.",
            self.planning_age,
            self.expected_return * 100.0
        )
    }

    fn initial_withdrawal(&self, initial_wealth: f64) -> f64 {
        amortized_payment(
            initial_wealth,
            self.expected_return,
            self.planning_age.saturating_sub(self.starting_age),
        )
    }

    fn calculate_withdrawal(&self, ctx: &WithdrawalContext<'_>) -> WithdrawalDecision {
        let age = ctx.age_or(self.starting_age);
        let years = self.years_remaining(age);
        let proposed = ctx
            .current_wealth
            .iter()
            .map(|&w| amortized_payment(w, self.expected_return, years))
            .collect();
        self.limits().apply(
            proposed,
            ctx.current_wealth,
            format!("Age {age}: {years} years remaining"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_formula() {
        let pmt = amortized_payment(1_000_000.0, 0.04, 30);
        assert!((pmt - 57_830.10).abs() < 0.01, "pmt={pmt}");
        assert_eq!(amortized_payment(300_000.0, 0.0, 30), 10_000.0);
        assert_eq!(amortized_payment(5.0, 0.04, 0), 5.0);
    }

    #[test]
    fn test_final_year_spends_everything() {
        let p = AmortizationPolicy::default();
        let wealth = [100_000.0];
        let d = p.calculate_withdrawal(&WithdrawalContext::new(&wealth, 1e6, 0).with_age(99));
        // one year left at 4%: W·r/(1 − 1/1.04) = W·1.04
        assert_eq!(d.amount, vec![100_000.0]);
    }

    #[test]
    fn test_rate_rises_with_age() {
        let p = AmortizationPolicy::default();
        let wealth = [1_000_000.0];
        let young = p.calculate_withdrawal(&WithdrawalContext::new(&wealth, 1e6, 0));
        let old = p.calculate_withdrawal(&WithdrawalContext::new(&wealth, 1e6, 20));
        assert!(old.amount[0] > young.amount[0]);
        assert!((young.amount[0] - p.initial_withdrawal(1e6)).abs() < 1e-9);
    }
}
