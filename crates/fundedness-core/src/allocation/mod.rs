//! Stock allocation policies, evaluated per path per year.

pub mod glidepath;
pub mod wealth;

use serde::{Deserialize, Serialize};

use crate::error::FundednessError;
use crate::FundednessResult;

pub use glidepath::{ConstantAllocation, Glidepath, ScheduledAllocation, VShapedGlidepath};
pub use wealth::{FloorProtectionAllocation, MertonOptimalAllocation, WealthBasedAllocation};

/// Maps current wealth on every path to a stock weight in [0, 1].
pub trait AllocationPolicy: Send + Sync {
    fn name(&self) -> String;

    /// Stock weight for each path; output length matches `wealth`.
    fn allocation(&self, wealth: &[f64], year: u32, initial_wealth: f64) -> Vec<f64>;
}

/// Serializable choice of allocation policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AllocationStrategy {
    Constant(ConstantAllocation),
    Glidepath(Glidepath),
    VShaped(VShapedGlidepath),
    WealthBased(WealthBasedAllocation),
    MertonOptimal(MertonOptimalAllocation),
    FloorProtection(FloorProtectionAllocation),
    Scheduled(ScheduledAllocation),
}

impl Default for AllocationStrategy {
    fn default() -> Self {
        AllocationStrategy::Constant(ConstantAllocation::default())
    }
}

impl AllocationStrategy {
    fn policy(&self) -> &dyn AllocationPolicy {
        match self {
            AllocationStrategy::Constant(p) => p,
            AllocationStrategy::Glidepath(p) => p,
            AllocationStrategy::VShaped(p) => p,
            AllocationStrategy::WealthBased(p) => p,
            AllocationStrategy::MertonOptimal(p) => p,
            AllocationStrategy::FloorProtection(p) => p,
            AllocationStrategy::Scheduled(p) => p,
        }
    }

    pub fn validate(&self) -> FundednessResult<()> {
        match self {
            AllocationStrategy::Constant(p) => check_weight("allocation.stock_weight", p.stock_weight),
            AllocationStrategy::Glidepath(p) => {
                check_weight("allocation.initial_stock_weight", p.initial_stock_weight)?;
                check_weight("allocation.final_stock_weight", p.final_stock_weight)
            }
            AllocationStrategy::VShaped(p) => {
                check_weight("allocation.initial_stock_weight", p.initial_stock_weight)?;
                check_weight("allocation.minimum_stock_weight", p.minimum_stock_weight)?;
                check_weight("allocation.final_stock_weight", p.final_stock_weight)?;
                if p.years_to_final <= p.years_to_minimum {
                    return Err(FundednessError::invalid(
                        "allocation.years_to_final",
                        "Must be after years_to_minimum",
                    ));
                }
                Ok(())
            }
            AllocationStrategy::WealthBased(p) => {
                check_range("allocation", p.min_stock_weight, p.max_stock_weight)?;
                if p.target_wealth <= p.floor_wealth {
                    return Err(FundednessError::invalid(
                        "allocation.target_wealth",
                        "Must exceed floor_wealth",
                    ));
                }
                Ok(())
            }
            AllocationStrategy::MertonOptimal(p) => {
                check_range("allocation", p.min_allocation, p.max_allocation)?;
                p.market.validate()?;
                p.utility.validate()
            }
            AllocationStrategy::FloorProtection(p) => {
                check_range("allocation", p.min_stock_weight, p.max_stock_weight)?;
                if p.multiplier < 0.0 {
                    return Err(FundednessError::invalid(
                        "allocation.multiplier",
                        "Cannot be negative",
                    ));
                }
                Ok(())
            }
            AllocationStrategy::Scheduled(p) => {
                if p.weights.is_empty() {
                    return Err(FundednessError::InsufficientData(
                        "Scheduled allocation needs at least one weight".into(),
                    ));
                }
                p.weights
                    .iter()
                    .try_for_each(|w| check_weight("allocation.weights", *w))
            }
        }
    }
}

impl AllocationPolicy for AllocationStrategy {
    fn name(&self) -> String {
        self.policy().name()
    }

    fn allocation(&self, wealth: &[f64], year: u32, initial_wealth: f64) -> Vec<f64> {
        self.policy().allocation(wealth, year, initial_wealth)
    }
}

pub(crate) fn check_weight(field: &str, w: f64) -> FundednessResult<()> {
    if !(0.0..=1.0).contains(&w) {
        return Err(FundednessError::invalid(field, "Weight must be between 0 and 1"));
    }
    Ok(())
}

fn check_range(field: &str, min: f64, max: f64) -> FundednessResult<()> {
    check_weight(&format!("{field}.min"), min)?;
    check_weight(&format!("{field}.max"), max)?;
    if min > max {
        return Err(FundednessError::invalid(field, "Minimum exceeds maximum"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json() {
        let s: AllocationStrategy =
            serde_json::from_str(r#"{"type":"constant","stock_weight":0.4}"#).unwrap();
        assert_eq!(s.allocation(&[1.0, 2.0], 0, 1.0), vec![0.4, 0.4]);

        let g: AllocationStrategy = serde_json::from_str(r#"{"type":"glidepath"}"#).unwrap();
        assert_eq!(g.allocation(&[1.0], 0, 1.0), vec![0.7]);
    }

    #[test]
    fn test_unknown_type_rejected() {
        let r: Result<AllocationStrategy, _> = serde_json::from_str(r#"{"type":"astrology"}"#);
        assert!(r.is_err());
    }

    #[test]
    fn test_validation() {
        let bad = AllocationStrategy::Constant(ConstantAllocation { stock_weight: 1.2 });
        assert!(bad.validate().is_err());
        let empty = AllocationStrategy::Scheduled(ScheduledAllocation { weights: vec![] });
        assert!(empty.validate().is_err());
        assert!(AllocationStrategy::default().validate().is_ok());
    }
}
