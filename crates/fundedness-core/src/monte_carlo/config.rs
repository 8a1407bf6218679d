use serde::{Deserialize, Serialize};

use crate::error::FundednessError;
use crate::models::market::MarketModel;
use crate::models::tax::TaxModel;
use crate::models::utility::UtilityModel;
use crate::FundednessResult;

pub const MIN_SIMULATIONS: u32 = 100;
pub const MAX_SIMULATIONS: u32 = 100_000;
pub const MAX_YEARS: u32 = 100;

/// Distribution of the standardized annual shock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnModel {
    #[default]
    Lognormal,
    StudentT,
}

/// Monte Carlo run settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub n_simulations: u32,
    pub n_years: u32,
    /// Optional seed for reproducibility.
    pub random_seed: Option<u64>,
    pub market_model: MarketModel,
    pub tax_model: TaxModel,
    pub utility_model: UtilityModel,
    pub return_model: ReturnModel,
    /// Percentiles to report, 0-100.
    pub percentiles: Vec<u32>,
    pub track_spending: bool,
    pub track_allocation: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig {
            n_simulations: 10_000,
            n_years: 50,
            random_seed: None,
            market_model: MarketModel::default(),
            tax_model: TaxModel::default(),
            utility_model: UtilityModel::default(),
            return_model: ReturnModel::default(),
            percentiles: vec![10, 25, 50, 75, 90],
            track_spending: true,
            track_allocation: false,
        }
    }
}

impl SimulationConfig {
    /// Degrees of freedom for Student-t shocks, or `None` for normal shocks.
    pub fn fat_tail_df(&self) -> Option<f64> {
        (self.market_model.use_fat_tails || self.return_model == ReturnModel::StudentT)
            .then_some(self.market_model.degrees_of_freedom)
    }

    pub fn validate(&self) -> FundednessResult<()> {
        if !(MIN_SIMULATIONS..=MAX_SIMULATIONS).contains(&self.n_simulations) {
            return Err(FundednessError::invalid(
                "n_simulations",
                format!("Must be between {MIN_SIMULATIONS} and {MAX_SIMULATIONS}"),
            ));
        }
        if !(1..=MAX_YEARS).contains(&self.n_years) {
            return Err(FundednessError::invalid(
                "n_years",
                format!("Must be between 1 and {MAX_YEARS}"),
            ));
        }
        if let Some(p) = self.percentiles.iter().find(|p| **p > 100) {
            return Err(FundednessError::invalid(
                "percentiles",
                format!("P{p} is outside 0-100"),
            ));
        }
        self.market_model.validate()?;
        self.tax_model.validate()?;
        self.utility_model.validate()
    }
}

/// Key used for a percentile in result maps, e.g. `P50`.
pub fn percentile_label(p: u32) -> String {
    format!("P{p}")
}
