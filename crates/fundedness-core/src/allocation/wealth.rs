use serde::{Deserialize, Serialize};

use super::AllocationPolicy;
use crate::merton::{optimal_risky_share, wealth_adjusted_allocation};
use crate::models::market::MarketModel;
use crate::models::utility::UtilityModel;

/// Interpolates stock weight between a floor and a target wealth level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WealthBasedAllocation {
    pub floor_wealth: f64,
    pub target_wealth: f64,
    pub min_stock_weight: f64,
    pub max_stock_weight: f64,
}

impl Default for WealthBasedAllocation {
    fn default() -> Self {
        WealthBasedAllocation {
            floor_wealth: 500_000.0,
            target_wealth: 2_000_000.0,
            min_stock_weight: 0.2,
            max_stock_weight: 0.8,
        }
    }
}

impl AllocationPolicy for WealthBasedAllocation {
    fn name(&self) -> String {
        format!(
            "Wealth-Based ({:.0}%-{:.0}%)",
            self.min_stock_weight * 100.0,
            self.max_stock_weight * 100.0
        )
    }

    fn allocation(&self, wealth: &[f64], _year: u32, _initial_wealth: f64) -> Vec<f64> {
        let wealth_range = self.target_wealth - self.floor_wealth;
        let weight_range = self.max_stock_weight - self.min_stock_weight;
        wealth
            .iter()
            .map(|w| {
                let progress = ((w - self.floor_wealth) / wealth_range).clamp(0.0, 1.0);
                self.min_stock_weight + progress * weight_range
            })
            .collect()
    }
}

/// Optimal risky share from market and utility assumptions, optionally
/// scaled down as wealth approaches the subsistence floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MertonOptimalAllocation {
    pub market: MarketModel,
    pub utility: UtilityModel,
    pub min_allocation: f64,
    pub max_allocation: f64,
    pub use_wealth_adjustment: bool,
}

impl Default for MertonOptimalAllocation {
    fn default() -> Self {
        MertonOptimalAllocation {
            market: MarketModel::default(),
            utility: UtilityModel::default(),
            min_allocation: 0.0,
            max_allocation: 1.0,
            use_wealth_adjustment: true,
        }
    }
}

impl AllocationPolicy for MertonOptimalAllocation {
    fn name(&self) -> String {
        format!(
            "Merton Optimal ({:.0}%)",
            optimal_risky_share(&self.market, &self.utility) * 100.0
        )
    }

    fn allocation(&self, wealth: &[f64], _year: u32, _initial_wealth: f64) -> Vec<f64> {
        if !self.use_wealth_adjustment {
            let k = optimal_risky_share(&self.market, &self.utility)
                .clamp(self.min_allocation, self.max_allocation);
            return vec![k; wealth.len()];
        }
        wealth
            .iter()
            .map(|&w| {
                wealth_adjusted_allocation(
                    w,
                    &self.market,
                    &self.utility,
                    self.min_allocation,
                    self.max_allocation,
                )
            })
            .collect()
    }
}

/// CPPI-style: stocks are a multiple of the cushion above a reserve that
/// funds `floor_years` of subsistence spending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FloorProtectionAllocation {
    pub utility: UtilityModel,
    pub multiplier: f64,
    pub floor_years: u32,
    pub min_stock_weight: f64,
    pub max_stock_weight: f64,
}

impl Default for FloorProtectionAllocation {
    fn default() -> Self {
        FloorProtectionAllocation {
            utility: UtilityModel::default(),
            multiplier: 3.0,
            floor_years: 10,
            min_stock_weight: 0.1,
            max_stock_weight: 0.9,
        }
    }
}

impl FloorProtectionAllocation {
    pub fn floor_reserve(&self) -> f64 {
        self.utility.subsistence_floor * self.floor_years as f64
    }
}

impl AllocationPolicy for FloorProtectionAllocation {
    fn name(&self) -> String {
        format!("Floor Protection (m={})", self.multiplier)
    }

    fn allocation(&self, wealth: &[f64], _year: u32, _initial_wealth: f64) -> Vec<f64> {
        let reserve = self.floor_reserve();
        wealth
            .iter()
            .map(|&w| {
                let raw = if w > 0.0 {
                    self.multiplier * (w - reserve).max(0.0) / w
                } else {
                    0.0
                };
                raw.clamp(self.min_stock_weight, self.max_stock_weight)
            })
            .collect()
    }
}
