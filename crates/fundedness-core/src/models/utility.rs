use serde::{Deserialize, Serialize};

use crate::error::FundednessError;
use crate::FundednessResult;

/// Utility assigned to consumption at or below the subsistence floor.
pub const FLOOR_UTILITY: f64 = -1e10;

/// CRRA utility over consumption above a subsistence floor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtilityModel {
    /// Relative risk aversion (gamma).
    pub risk_aversion: f64,
    pub subsistence_floor: f64,
    pub bequest_weight: f64,
    pub time_preference: f64,
}

impl Default for UtilityModel {
    fn default() -> Self {
        UtilityModel {
            risk_aversion: 3.0,
            subsistence_floor: 30_000.0,
            bequest_weight: 0.0,
            time_preference: 0.02,
        }
    }
}

impl UtilityModel {
    pub fn utility(&self, consumption: f64) -> f64 {
        let excess = consumption - self.subsistence_floor;
        if excess <= 0.0 {
            return FLOOR_UTILITY;
        }
        let gamma = self.risk_aversion;
        if (gamma - 1.0).abs() < f64::EPSILON {
            excess.ln()
        } else {
            excess.powf(1.0 - gamma) / (1.0 - gamma)
        }
    }

    pub fn marginal_utility(&self, consumption: f64) -> f64 {
        let excess = consumption - self.subsistence_floor;
        if excess <= 0.0 {
            return 1e10;
        }
        excess.powf(-self.risk_aversion)
    }

    /// Consumption level whose marginal utility equals `marginal`.
    pub fn inverse_marginal_utility(&self, marginal: f64) -> f64 {
        marginal.powf(-1.0 / self.risk_aversion) + self.subsistence_floor
    }

    /// Certainty-equivalent consumption of a set of equally likely outcomes.
    pub fn certainty_equivalent(&self, consumption: &[f64]) -> f64 {
        if consumption.is_empty() {
            return self.subsistence_floor;
        }
        let expected =
            consumption.iter().map(|&c| self.utility(c)).sum::<f64>() / consumption.len() as f64;
        let gamma = self.risk_aversion;
        if (gamma - 1.0).abs() < f64::EPSILON {
            expected.exp() + self.subsistence_floor
        } else {
            (expected * (1.0 - gamma)).powf(1.0 / (1.0 - gamma)) + self.subsistence_floor
        }
    }

    /// Discounted sum of period utilities, weighted by survival when given.
    pub fn lifetime_utility(&self, consumption_path: &[f64], survival: Option<&[f64]>) -> f64 {
        consumption_path
            .iter()
            .enumerate()
            .map(|(t, &c)| {
                let discount = (1.0 + self.time_preference).powi(-(t as i32));
                let alive = survival.and_then(|s| s.get(t).copied()).unwrap_or(1.0);
                discount * alive * self.utility(c)
            })
            .sum()
    }

    pub fn validate(&self) -> FundednessResult<()> {
        if !self.risk_aversion.is_finite() || self.risk_aversion <= 0.0 {
            return Err(FundednessError::invalid(
                "utility_model.risk_aversion",
                "Must be positive",
            ));
        }
        if self.subsistence_floor < 0.0 {
            return Err(FundednessError::invalid(
                "utility_model.subsistence_floor",
                "Cannot be negative",
            ));
        }
        if self.time_preference <= -1.0 {
            return Err(FundednessError::invalid(
                "utility_model.time_preference",
                "Must be greater than -100%",
            ));
        }
        Ok(())
    }
}
