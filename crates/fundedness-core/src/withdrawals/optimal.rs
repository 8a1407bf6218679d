use serde::{Deserialize, Serialize};

use super::{check_rate, SpendingLimits, WithdrawalContext, WithdrawalDecision, WithdrawalPolicy};
use crate::error::FundednessError;
use crate::merton::optimal_spending_rate;
use crate::models::market::MarketModel;
use crate::models::utility::UtilityModel;
use crate::FundednessResult;

/// Utility-optimal consumption: current wealth times the closed-form
/// spending rate for the remaining horizon, smoothed against last year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MertonOptimalSpending {
    pub market: MarketModel,
    pub utility: UtilityModel,
    pub starting_age: u32,
    pub end_age: u32,
    pub smoothing_factor: f64,
    pub min_spending_rate: f64,
    pub max_spending_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_spending: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling_spending: Option<f64>,
}

impl Default for MertonOptimalSpending {
    fn default() -> Self {
        MertonOptimalSpending {
            market: MarketModel::default(),
            utility: UtilityModel::default(),
            starting_age: 65,
            end_age: 100,
            smoothing_factor: 0.5,
            min_spending_rate: 0.02,
            max_spending_rate: 0.15,
            floor_spending: None,
            ceiling_spending: None,
        }
    }
}

impl MertonOptimalSpending {
    fn limits(&self) -> SpendingLimits {
        SpendingLimits::new(self.floor_spending, self.ceiling_spending)
    }

    /// Spending rate for the given remaining horizon, within the rate bounds.
    pub fn optimal_rate(&self, remaining_years: u32) -> f64 {
        optimal_spending_rate(&self.market, &self.utility, Some(remaining_years as f64))
            .clamp(self.min_spending_rate, self.max_spending_rate)
    }

    pub fn validate(&self) -> FundednessResult<()> {
        self.market.validate()?;
        self.utility.validate()?;
        check_rate("withdrawal.smoothing_factor", self.smoothing_factor)?;
        check_rate("withdrawal.min_spending_rate", self.min_spending_rate)?;
        check_rate("withdrawal.max_spending_rate", self.max_spending_rate)?;
        if self.min_spending_rate > self.max_spending_rate {
            return Err(FundednessError::invalid(
                "withdrawal.min_spending_rate",
                "Cannot exceed max_spending_rate",
            ));
        }
        self.limits().validate()
    }
}

impl WithdrawalPolicy for MertonOptimalSpending {
    fn name(&self) -> String {
        "Merton Optimal".into()
    }

    fn description(&self) -> String {
        format!("Utility-optimal spending (gamma={})", self.utility.risk_aversion)
    }

    fn initial_withdrawal(&self, initial_wealth: f64) -> f64 {
        let years = self.end_age.saturating_sub(self.starting_age).max(1);
        initial_wealth * self.optimal_rate(years)
    }

    fn calculate_withdrawal(&self, ctx: &WithdrawalContext<'_>) -> WithdrawalDecision {
        let age = ctx.age_or(self.starting_age);
        let remaining = self.end_age.saturating_sub(age).max(1);
        let rate = self.optimal_rate(remaining);
        let s = self.smoothing_factor;
        let proposed = ctx
            .current_wealth
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let raw = w * rate;
                match ctx.previous_spending {
                    Some(prev) if s > 0.0 => s * prev[i] + (1.0 - s) * raw,
                    _ => raw,
                }
            })
            .collect();
        self.limits().apply(
            proposed,
            ctx.current_wealth,
            format!("Rate: {:.1}%, Remaining: {remaining}y", rate * 100.0),
        )
    }
}
