use serde::{Deserialize, Serialize};

use super::{SpendingLimits, WithdrawalContext, WithdrawalDecision, WithdrawalPolicy};
use crate::allocation::check_weight;
use crate::error::FundednessError;
use crate::FundednessResult;

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

const VPW_AGES: [u32; 8] = [60, 65, 70, 75, 80, 85, 90, 95];
const VPW_STOCK_PCTS: [u32; 5] = [0, 25, 50, 75, 100];

/// Variable percentage withdrawal rates by age row and stock-percentage column.
const VPW_RATES: [[f64; 5]; 8] = [
    [0.037, 0.039, 0.042, 0.046, 0.051],
    [0.041, 0.044, 0.047, 0.052, 0.058],
    [0.047, 0.050, 0.054, 0.060, 0.068],
    [0.054, 0.058, 0.064, 0.071, 0.081],
    [0.064, 0.069, 0.076, 0.086, 0.099],
    [0.078, 0.084, 0.093, 0.106, 0.124],
    [0.097, 0.106, 0.118, 0.135, 0.160],
    [0.127, 0.139, 0.156, 0.180, 0.214],
];

const RMD_FIRST_AGE: u32 = 72;
const RMD_LAST_AGE: u32 = 120;

/// IRS Uniform Lifetime distribution periods for ages 72 through 120.
const RMD_DIVISORS: [f64; 49] = [
    27.4, 26.5, 25.5, 24.6, 23.7, 22.9, 22.0, 21.1, 20.2, 19.4, //
    18.5, 17.7, 16.8, 16.0, 15.2, 14.4, 13.7, 12.9, 12.2, 11.5, //
    10.8, 10.1, 9.5, 8.9, 8.4, 7.8, 7.3, 6.8, 6.4, 6.0, //
    5.6, 5.2, 4.9, 4.6, 4.3, 4.1, 3.9, 3.7, 3.5, 3.4, //
    3.3, 3.1, 3.0, 2.9, 2.8, 2.7, 2.5, 2.3, 2.0,
];

/// Index of the key nearest to `x`, clamped at both ends; ties go low.
fn nearest_index(keys: &[u32], x: u32) -> usize {
    keys.iter()
        .enumerate()
        .min_by_key(|(_, k)| k.abs_diff(x))
        .map_or(0, |(i, _)| i)
}

/// VPW rate for an age and a stock percentage (0-100).
pub fn vpw_rate(age: u32, stock_pct: u32) -> f64 {
    let row = nearest_index(&VPW_AGES, age);
    let col = nearest_index(&VPW_STOCK_PCTS, stock_pct);
    VPW_RATES[row][col]
}

/// RMD distribution period. Below 72 the table is extended one year of
/// divisor per year of age; above 120 it stays at 2.0.
pub fn rmd_divisor(age: u32) -> f64 {
    if age < RMD_FIRST_AGE {
        RMD_DIVISORS[0] + (RMD_FIRST_AGE - age) as f64
    } else if age > RMD_LAST_AGE {
        RMD_DIVISORS[RMD_DIVISORS.len() - 1]
    } else {
        RMD_DIVISORS[(age - RMD_FIRST_AGE) as usize]
    }
}

// ---------------------------------------------------------------------------
// VPW
// ---------------------------------------------------------------------------

/// Variable Percentage Withdrawal: an age- and allocation-dependent share of
/// current wealth, optionally blended with last year's spending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VpwPolicy {
    pub starting_age: u32,
    /// Stock allocation as an integer percentage.
    pub stock_allocation: u32,
    /// 0 is pure VPW, 1 never moves off last year's spending.
    pub smoothing_factor: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_spending: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling_spending: Option<f64>,
}

impl Default for VpwPolicy {
    fn default() -> Self {
        VpwPolicy {
            starting_age: 65,
            stock_allocation: 50,
            smoothing_factor: 0.0,
            floor_spending: None,
            ceiling_spending: None,
        }
    }
}

impl VpwPolicy {
    fn limits(&self) -> SpendingLimits {
        SpendingLimits::new(self.floor_spending, self.ceiling_spending)
    }

    pub fn validate(&self) -> FundednessResult<()> {
        if self.stock_allocation > 100 {
            return Err(FundednessError::invalid(
                "withdrawal.stock_allocation",
                "Percentage must be between 0 and 100",
            ));
        }
        check_weight("withdrawal.smoothing_factor", self.smoothing_factor)?;
        self.limits().validate()
    }
}

impl WithdrawalPolicy for VpwPolicy {
    fn name(&self) -> String {
        "VPW".into()
    }

    fn description(&self) -> String {
        "Variable Percentage Withdrawal based on age and life expectancy. \
         Withdrawal rate increases as you age."
            .into()
    }

    fn initial_withdrawal(&self, initial_wealth: f64) -> f64 {
        initial_wealth * vpw_rate(self.starting_age, self.stock_allocation)
    }

    fn calculate_withdrawal(&self, ctx: &WithdrawalContext<'_>) -> WithdrawalDecision {
        let age = ctx.age_or(self.starting_age);
        let rate = vpw_rate(age, self.stock_allocation);
        let smoothing = self.smoothing_factor;
        let proposed = ctx
            .current_wealth
            .iter()
            .enumerate()
            .map(|(i, w)| {
                let base = w * rate;
                match ctx.previous_spending {
                    Some(prev) if smoothing > 0.0 => smoothing * prev[i] + (1.0 - smoothing) * base,
                    _ => base,
                }
            })
            .collect();
        self.limits().apply(
            proposed,
            ctx.current_wealth,
            format!("Age {age}: VPW rate {:.1}%", rate * 100.0),
        )
    }
}

// ---------------------------------------------------------------------------
// RMD-style
// ---------------------------------------------------------------------------

/// Current wealth divided by the RMD distribution period for the age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RmdStylePolicy {
    pub starting_age: u32,
    /// Scale on the table amount; 1.5 withdraws 150% of the RMD.
    pub multiplier: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor_spending: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceiling_spending: Option<f64>,
}

impl Default for RmdStylePolicy {
    fn default() -> Self {
        RmdStylePolicy {
            starting_age: 65,
            multiplier: 1.0,
            floor_spending: None,
            ceiling_spending: None,
        }
    }
}

impl RmdStylePolicy {
    fn limits(&self) -> SpendingLimits {
        SpendingLimits::new(self.floor_spending, self.ceiling_spending)
    }

    pub fn validate(&self) -> FundednessResult<()> {
        if !self.multiplier.is_finite() || self.multiplier <= 0.0 {
            return Err(FundednessError::invalid(
                "withdrawal.multiplier",
                "Must be positive",
            ));
        }
        self.limits().validate()
    }
}

impl WithdrawalPolicy for RmdStylePolicy {
    fn name(&self) -> String {
        if (self.multiplier - 1.0).abs() < f64::EPSILON {
            "RMD-Style".into()
        } else {
            format!("RMD-Style x {}", self.multiplier)
        }
    }

    fn description(&self) -> String {
        "Withdraw based on IRS RMD table divisors. \
         Withdrawal rate automatically increases with age."
            .into()
    }

    fn initial_withdrawal(&self, initial_wealth: f64) -> f64 {
        initial_wealth / rmd_divisor(self.starting_age) * self.multiplier
    }

    fn calculate_withdrawal(&self, ctx: &WithdrawalContext<'_>) -> WithdrawalDecision {
        let age = ctx.age_or(self.starting_age);
        let divisor = rmd_divisor(age);
        let proposed = ctx
            .current_wealth
            .iter()
            .map(|w| w / divisor * self.multiplier)
            .collect();
        self.limits().apply(
            proposed,
            ctx.current_wealth,
            format!(
                "Age {age}: divisor {divisor}, rate {:.1}%",
                self.multiplier / divisor * 100.0
            ),
        )
    }
}
