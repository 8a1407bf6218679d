use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::FundednessError;
use crate::types::{Money, Rate};
use crate::FundednessResult;

/// Category of a future obligation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiabilityType {
    #[default]
    EssentialSpending,
    DiscretionarySpending,
    LegacyGoal,
    Mortgage,
    Debt,
    Healthcare,
    Taxes,
}

/// How an obligation grows over time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InflationLinkage {
    None,
    #[default]
    Cpi,
    Wage,
    Healthcare,
    Custom,
}

/// A recurring future spending obligation, in today's dollars.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Liability {
    pub name: String,
    #[serde(default)]
    pub liability_type: LiabilityType,
    pub annual_amount: Money,
    /// Years from now when payments begin.
    #[serde(default)]
    pub start_year: u32,
    /// Exclusive end year; `None` runs to the planning horizon.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_year: Option<u32>,
    #[serde(default)]
    pub inflation_linkage: InflationLinkage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_inflation_rate: Option<Rate>,
    #[serde(default = "default_probability")]
    pub probability: Rate,
    #[serde(default = "default_is_essential")]
    pub is_essential: bool,
}

fn default_probability() -> Rate {
    Decimal::ONE
}

fn default_is_essential() -> bool {
    true
}

impl Liability {
    pub fn new(name: impl Into<String>, annual_amount: Money) -> Self {
        Liability {
            name: name.into(),
            liability_type: LiabilityType::default(),
            annual_amount,
            start_year: 0,
            end_year: None,
            inflation_linkage: InflationLinkage::default(),
            custom_inflation_rate: None,
            probability: default_probability(),
            is_essential: default_is_essential(),
        }
    }

    pub fn with_type(mut self, liability_type: LiabilityType) -> Self {
        self.liability_type = liability_type;
        self
    }

    pub fn with_years(mut self, start_year: u32, end_year: Option<u32>) -> Self {
        self.start_year = start_year;
        self.end_year = end_year;
        self
    }

    pub fn with_linkage(mut self, linkage: InflationLinkage) -> Self {
        self.inflation_linkage = linkage;
        self
    }

    pub fn with_custom_rate(mut self, rate: Rate) -> Self {
        self.inflation_linkage = InflationLinkage::Custom;
        self.custom_inflation_rate = Some(rate);
        self
    }

    pub fn with_probability(mut self, probability: Rate) -> Self {
        self.probability = probability;
        self
    }

    pub fn discretionary(mut self) -> Self {
        self.is_essential = false;
        self
    }

    /// Nominal growth rate implied by the linkage.
    pub fn inflation_rate(&self, base_inflation: Rate) -> Rate {
        match self.inflation_linkage {
            InflationLinkage::None => Decimal::ZERO,
            InflationLinkage::Cpi => base_inflation,
            InflationLinkage::Wage => base_inflation + dec!(0.01),
            InflationLinkage::Healthcare => base_inflation + dec!(0.02),
            InflationLinkage::Custom => self.custom_inflation_rate.unwrap_or(base_inflation),
        }
    }

    /// Number of payment years given the planning horizon.
    pub fn payment_years(&self, planning_horizon: u32) -> u32 {
        self.end_year
            .unwrap_or(planning_horizon)
            .saturating_sub(self.start_year)
    }

    pub fn validate(&self) -> FundednessResult<()> {
        if self.annual_amount < Decimal::ZERO {
            return Err(FundednessError::invalid(
                format!("liabilities.{}.annual_amount", self.name),
                "Annual amount cannot be negative",
            ));
        }
        if self.probability < Decimal::ZERO || self.probability > Decimal::ONE {
            return Err(FundednessError::invalid(
                format!("liabilities.{}.probability", self.name),
                "Probability must be between 0 and 1",
            ));
        }
        if matches!(self.custom_inflation_rate, Some(r) if r <= dec!(-1)) {
            return Err(FundednessError::invalid(
                format!("liabilities.{}.custom_inflation_rate", self.name),
                "Inflation rate must be greater than -100%",
            ));
        }
        Ok(())
    }
}
