use serde::{Deserialize, Serialize};

use super::AllocationPolicy;

/// Same stock weight every year on every path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConstantAllocation {
    pub stock_weight: f64,
}

impl Default for ConstantAllocation {
    fn default() -> Self {
        ConstantAllocation { stock_weight: 0.6 }
    }
}

impl ConstantAllocation {
    pub fn new(stock_weight: f64) -> Self {
        ConstantAllocation { stock_weight }
    }
}

impl AllocationPolicy for ConstantAllocation {
    fn name(&self) -> String {
        format!("{:.0}% Stocks", self.stock_weight * 100.0)
    }

    fn allocation(&self, wealth: &[f64], _year: u32, _initial_wealth: f64) -> Vec<f64> {
        vec![self.stock_weight; wealth.len()]
    }
}

/// Linear move from an initial to a final weight; declining or rising.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Glidepath {
    pub initial_stock_weight: f64,
    pub final_stock_weight: f64,
    pub years_to_final: u32,
}

impl Default for Glidepath {
    fn default() -> Self {
        Glidepath::declining()
    }
}

impl Glidepath {
    /// 70% stocks falling to 30% over 30 years.
    pub fn declining() -> Self {
        Glidepath {
            initial_stock_weight: 0.7,
            final_stock_weight: 0.3,
            years_to_final: 30,
        }
    }

    /// Bond tent unwind: 30% stocks rising to 70% over 20 years.
    pub fn rising() -> Self {
        Glidepath {
            initial_stock_weight: 0.3,
            final_stock_weight: 0.7,
            years_to_final: 20,
        }
    }

    pub fn weight_at(&self, year: u32) -> f64 {
        let progress = if self.years_to_final == 0 {
            1.0
        } else {
            (year as f64 / self.years_to_final as f64).min(1.0)
        };
        self.initial_stock_weight + progress * (self.final_stock_weight - self.initial_stock_weight)
    }
}

impl AllocationPolicy for Glidepath {
    fn name(&self) -> String {
        let label = if self.final_stock_weight > self.initial_stock_weight {
            "Rising Equity"
        } else {
            "Glidepath"
        };
        format!(
            "{label} ({:.0}% to {:.0}%)",
            self.initial_stock_weight * 100.0,
            self.final_stock_weight * 100.0
        )
    }

    fn allocation(&self, wealth: &[f64], year: u32, _initial_wealth: f64) -> Vec<f64> {
        vec![self.weight_at(year); wealth.len()]
    }
}

/// Falls to a minimum, then rises to a final weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VShapedGlidepath {
    pub initial_stock_weight: f64,
    pub minimum_stock_weight: f64,
    pub final_stock_weight: f64,
    pub years_to_minimum: u32,
    pub years_to_final: u32,
}

impl Default for VShapedGlidepath {
    fn default() -> Self {
        VShapedGlidepath {
            initial_stock_weight: 0.5,
            minimum_stock_weight: 0.3,
            final_stock_weight: 0.6,
            years_to_minimum: 10,
            years_to_final: 30,
        }
    }
}

impl VShapedGlidepath {
    pub fn weight_at(&self, year: u32) -> f64 {
        if year <= self.years_to_minimum {
            let progress = if self.years_to_minimum == 0 {
                1.0
            } else {
                year as f64 / self.years_to_minimum as f64
            };
            self.initial_stock_weight
                + progress * (self.minimum_stock_weight - self.initial_stock_weight)
        } else {
            let span = self.years_to_final.saturating_sub(self.years_to_minimum).max(1);
            let progress = ((year - self.years_to_minimum) as f64 / span as f64).min(1.0);
            self.minimum_stock_weight + progress * (self.final_stock_weight - self.minimum_stock_weight)
        }
    }
}

impl AllocationPolicy for VShapedGlidepath {
    fn name(&self) -> String {
        format!(
            "V-Shaped ({:.0}% to {:.0}% to {:.0}%)",
            self.initial_stock_weight * 100.0,
            self.minimum_stock_weight * 100.0,
            self.final_stock_weight * 100.0
        )
    }

    fn allocation(&self, wealth: &[f64], year: u32, _initial_wealth: f64) -> Vec<f64> {
        vec![self.weight_at(year); wealth.len()]
    }
}

/// Explicit per-year weights; the last weight holds beyond the schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAllocation {
    pub weights: Vec<f64>,
}

impl AllocationPolicy for ScheduledAllocation {
    fn name(&self) -> String {
        "Scheduled".into()
    }

    fn allocation(&self, wealth: &[f64], year: u32, _initial_wealth: f64) -> Vec<f64> {
        let w = self
            .weights
            .get(year as usize)
            .or(self.weights.last())
            .copied()
            .unwrap_or(0.0);
        vec![w; wealth.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant() {
        let p = ConstantAllocation::new(0.6);
        assert_eq!(p.allocation(&[1.0, 5.0, 0.0], 12, 1.0), vec![0.6; 3]);
        assert_eq!(p.name(), "60% Stocks");
    }

    #[test]
    fn test_declining_glidepath() {
        let g = Glidepath::declining();
        assert!((g.weight_at(0) - 0.7).abs() < 1e-12);
        assert!((g.weight_at(15) - 0.5).abs() < 1e-12);
        assert!((g.weight_at(30) - 0.3).abs() < 1e-12);
        assert!((g.weight_at(45) - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_rising_glidepath() {
        let g = Glidepath::rising();
        assert!((g.weight_at(10) - 0.5).abs() < 1e-12);
        assert!((g.weight_at(40) - 0.7).abs() < 1e-12);
        assert!(g.name().starts_with("Rising Equity"));
    }

    #[test]
    fn test_v_shape() {
        let v = VShapedGlidepath::default();
        assert!((v.weight_at(0) - 0.5).abs() < 1e-12);
        assert!((v.weight_at(10) - 0.3).abs() < 1e-12);
        assert!((v.weight_at(20) - 0.45).abs() < 1e-12);
        assert!((v.weight_at(50) - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_schedule_holds_last_weight() {
        let s = ScheduledAllocation {
            weights: vec![0.8, 0.6],
        };
        assert_eq!(s.allocation(&[1.0], 0, 1.0), vec![0.8]);
        assert_eq!(s.allocation(&[1.0], 7, 1.0), vec![0.6]);
    }
}
