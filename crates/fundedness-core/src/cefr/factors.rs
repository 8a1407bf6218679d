use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::FundednessError;
use crate::models::assets::{AssetClass, ConcentrationLevel, LiquidityClass};
use crate::types::Rate;
use crate::FundednessResult;

/// Fraction of value retained after liquidity frictions.
pub fn default_liquidity_factor(class: LiquidityClass) -> Rate {
    match class {
        LiquidityClass::Cash => dec!(1.00),
        LiquidityClass::TaxableIndex => dec!(0.95),
        LiquidityClass::Retirement => dec!(0.85),
        LiquidityClass::HomeEquity => dec!(0.50),
        LiquidityClass::PrivateBusiness => dec!(0.30),
        LiquidityClass::Restricted => dec!(0.20),
    }
}

/// Fraction of value retained after concentration risk.
pub fn default_concentration_factor(level: ConcentrationLevel) -> Rate {
    match level {
        ConcentrationLevel::Diversified => dec!(0.85),
        ConcentrationLevel::Sector => dec!(0.70),
        ConcentrationLevel::SingleStock => dec!(0.60),
        ConcentrationLevel::Startup => dec!(0.30),
    }
}

pub fn asset_class_reliability(class: AssetClass) -> Rate {
    match class {
        AssetClass::Cash => dec!(1.00),
        AssetClass::Bonds => dec!(0.95),
        AssetClass::Stocks => dec!(1.00),
        AssetClass::RealEstate => dec!(0.90),
        AssetClass::Alternatives => dec!(0.80),
    }
}

/// Liquidity and concentration factors, with optional per-call overrides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorTable {
    pub liquidity: BTreeMap<LiquidityClass, Rate>,
    pub concentration: BTreeMap<ConcentrationLevel, Rate>,
}

impl FactorTable {
    pub fn liquidity_factor(&self, class: LiquidityClass) -> Rate {
        self.liquidity
            .get(&class)
            .copied()
            .unwrap_or_else(|| default_liquidity_factor(class))
    }

    /// Cash and bonds carry no concentration risk; everything else is
    /// concentration factor times asset-class factor.
    pub fn reliability_factor(&self, level: ConcentrationLevel, class: AssetClass) -> Rate {
        let class_factor = asset_class_reliability(class);
        match class {
            AssetClass::Cash | AssetClass::Bonds => class_factor,
            _ => {
                let conc = self
                    .concentration
                    .get(&level)
                    .copied()
                    .unwrap_or_else(|| default_concentration_factor(level));
                conc * class_factor
            }
        }
    }

    pub fn validate(&self) -> FundednessResult<()> {
        let in_range = |r: &Rate| *r >= Decimal::ZERO && *r <= Decimal::ONE;
        if !self.liquidity.values().all(in_range) {
            return Err(FundednessError::invalid(
                "factors.liquidity",
                "Liquidity factors must be between 0 and 1",
            ));
        }
        if !self.concentration.values().all(in_range) {
            return Err(FundednessError::invalid(
                "factors.concentration",
                "Concentration factors must be between 0 and 1",
            ));
        }
        Ok(())
    }
}
