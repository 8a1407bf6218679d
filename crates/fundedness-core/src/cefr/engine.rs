use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::factors::FactorTable;
use super::liabilities::{default_base_inflation, default_discount_rate, liability_details, LiabilityPv};
use crate::error::FundednessError;
use crate::models::assets::{Asset, BalanceSheet};
use crate::models::liabilities::Liability;
use crate::models::tax::TaxModel;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::FundednessResult;

const MAX_PLANNING_HORIZON: u32 = 150;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Net assets over liability PV. `Unbounded` stands for positive net assets
/// with no liabilities to fund.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundedRatio {
    Finite(Decimal),
    Unbounded,
}

impl FundedRatio {
    pub fn value(&self) -> Option<Decimal> {
        match self {
            FundedRatio::Finite(v) => Some(*v),
            FundedRatio::Unbounded => None,
        }
    }

    pub fn is_funded(&self) -> bool {
        match self {
            FundedRatio::Finite(v) => *v >= Decimal::ONE,
            FundedRatio::Unbounded => true,
        }
    }

    pub fn to_f64(&self) -> f64 {
        match self {
            FundedRatio::Finite(v) => v.to_f64().unwrap_or(f64::NAN),
            FundedRatio::Unbounded => f64::INFINITY,
        }
    }

    pub fn interpretation(&self) -> &'static str {
        let v = match self {
            FundedRatio::Unbounded => return "Excellent: no liabilities to fund",
            FundedRatio::Finite(v) => *v,
        };
        if v >= dec!(2.0) {
            "Excellent: very well-funded with substantial cushion"
        } else if v >= dec!(1.5) {
            "Strong: well-funded with good margin"
        } else if v >= Decimal::ONE {
            "Adequate: fully funded but limited cushion"
        } else if v >= dec!(0.8) {
            "Marginal: nearly funded, consider adjustments"
        } else if v >= dec!(0.5) {
            "Concerning: significant funding gap"
        } else {
            "Critical: severe underfunding"
        }
    }
}

impl std::fmt::Display for FundedRatio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FundedRatio::Finite(v) => write!(f, "{}", v.round_dp(4)),
            FundedRatio::Unbounded => write!(f, "inf"),
        }
    }
}

/// Input for a funded-ratio computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CefrInput {
    #[serde(default)]
    pub balance_sheet: BalanceSheet,
    #[serde(default)]
    pub liabilities: Vec<Liability>,
    #[serde(default)]
    pub tax_model: TaxModel,
    #[serde(default = "default_planning_horizon")]
    pub planning_horizon: u32,
    #[serde(default = "default_discount_rate")]
    pub real_discount_rate: Rate,
    #[serde(default = "default_base_inflation")]
    pub base_inflation: Rate,
    /// Overrides for the liquidity and concentration tables.
    #[serde(default)]
    pub factors: FactorTable,
}

fn default_planning_horizon() -> u32 {
    30
}

impl CefrInput {
    pub fn new(balance_sheet: BalanceSheet, liabilities: Vec<Liability>) -> Self {
        CefrInput {
            balance_sheet,
            liabilities,
            tax_model: TaxModel::default(),
            planning_horizon: default_planning_horizon(),
            real_discount_rate: default_discount_rate(),
            base_inflation: default_base_inflation(),
            factors: FactorTable::default(),
        }
    }
}

/// Haircut breakdown for a single asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetHaircutDetail {
    pub name: String,
    pub gross_value: Money,
    pub tax_rate: Rate,
    pub tax_haircut: Money,
    pub after_tax_value: Money,
    pub liquidity_factor: Rate,
    pub liquidity_haircut: Money,
    pub after_liquidity_value: Money,
    pub reliability_factor: Rate,
    pub reliability_haircut: Money,
    pub net_value: Money,
}

impl AssetHaircutDetail {
    pub fn total_haircut(&self) -> Money {
        self.tax_haircut + self.liquidity_haircut + self.reliability_haircut
    }

    pub fn total_haircut_pct(&self) -> Rate {
        if self.gross_value.is_zero() {
            return Decimal::ZERO;
        }
        self.total_haircut() / self.gross_value
    }
}

/// Output of a funded-ratio computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CefrOutput {
    pub cefr: FundedRatio,
    pub is_funded: bool,
    pub interpretation: String,
    pub gross_assets: Money,
    pub total_tax_haircut: Money,
    pub total_liquidity_haircut: Money,
    pub total_reliability_haircut: Money,
    pub total_haircut: Money,
    pub haircut_percentage: Rate,
    pub net_assets: Money,
    pub liability_pv: Money,
    pub funding_gap: Money,
    pub asset_details: Vec<AssetHaircutDetail>,
    pub liability_details: Vec<LiabilityPv>,
}

// ---------------------------------------------------------------------------
// Haircuts
// ---------------------------------------------------------------------------

/// Apply tax, then liquidity, then reliability to a single asset.
///
/// Each stage removes value from what the previous stage left, so the three
/// haircuts plus the net value sum back to the gross value.
pub fn compute_asset_haircuts(
    asset: &Asset,
    tax_model: &TaxModel,
    factors: &FactorTable,
) -> AssetHaircutDetail {
    let gross = asset.value;

    let tax_rate = tax_model.effective_tax_rate(asset.account_type, asset.basis_ratio());
    let tax_haircut = gross * tax_rate;
    let after_tax = gross - tax_haircut;

    let liquidity_factor = factors.liquidity_factor(asset.liquidity_class);
    let liquidity_haircut = after_tax * (Decimal::ONE - liquidity_factor);
    let after_liquidity = after_tax - liquidity_haircut;

    let reliability_factor =
        factors.reliability_factor(asset.concentration_level, asset.asset_class);
    let reliability_haircut = after_liquidity * (Decimal::ONE - reliability_factor);
    let net = after_liquidity - reliability_haircut;

    AssetHaircutDetail {
        name: asset.name.clone(),
        gross_value: gross,
        tax_rate,
        tax_haircut,
        after_tax_value: after_tax,
        liquidity_factor,
        liquidity_haircut,
        after_liquidity_value: after_liquidity,
        reliability_factor,
        reliability_haircut,
        net_value: net,
    }
}

fn validate_input(input: &CefrInput) -> FundednessResult<()> {
    input.balance_sheet.validate()?;
    for l in &input.liabilities {
        l.validate()?;
    }
    input.tax_model.validate()?;
    input.factors.validate()?;
    if input.planning_horizon > MAX_PLANNING_HORIZON {
        return Err(FundednessError::invalid(
            "planning_horizon",
            format!("Must be at most {MAX_PLANNING_HORIZON} years"),
        ));
    }
    if input.real_discount_rate <= dec!(-1) {
        return Err(FundednessError::invalid(
            "real_discount_rate",
            "Discount rate must be greater than -100%",
        ));
    }
    if input.base_inflation <= dec!(-1) {
        return Err(FundednessError::invalid(
            "base_inflation",
            "Inflation must be greater than -100%",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the certainty-equivalent funded ratio.
///
/// Assets are haircut for tax, liquidity and reliability, then compared with
/// the probability-weighted PV of all liabilities. With no liabilities the
/// ratio is unbounded when net assets are positive and zero otherwise.
pub fn compute_cefr(input: &CefrInput) -> FundednessResult<ComputationOutput<CefrOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;

    let asset_details: Vec<AssetHaircutDetail> = input
        .balance_sheet
        .assets
        .iter()
        .map(|a| compute_asset_haircuts(a, &input.tax_model, &input.factors))
        .collect();

    let gross_assets: Money = asset_details.iter().map(|d| d.gross_value).sum();
    let total_tax_haircut: Money = asset_details.iter().map(|d| d.tax_haircut).sum();
    let total_liquidity_haircut: Money = asset_details.iter().map(|d| d.liquidity_haircut).sum();
    let total_reliability_haircut: Money =
        asset_details.iter().map(|d| d.reliability_haircut).sum();
    let total_haircut = total_tax_haircut + total_liquidity_haircut + total_reliability_haircut;
    let net_assets = gross_assets - total_haircut;

    let liability_details = liability_details(
        &input.liabilities,
        input.planning_horizon,
        input.real_discount_rate,
        input.base_inflation,
    )?;
    let liability_pv: Money = liability_details.iter().map(|d| d.present_value).sum();

    let cefr = if liability_pv > Decimal::ZERO {
        let ratio = net_assets.checked_div(liability_pv).ok_or_else(|| {
            FundednessError::invalid(
                "liabilities",
                "Funded ratio overflows: liability PV is too small relative to assets",
            )
        })?;
        FundedRatio::Finite(ratio)
    } else if net_assets > Decimal::ZERO {
        log::warn!("no liabilities to fund; funded ratio is unbounded");
        warnings.push("Liability PV is zero; funded ratio is unbounded".into());
        FundedRatio::Unbounded
    } else {
        log::warn!("no assets and no liabilities; funded ratio reported as 0");
        warnings.push("No assets and no liabilities; funded ratio reported as 0".into());
        FundedRatio::Finite(Decimal::ZERO)
    };

    let haircut_percentage = if gross_assets.is_zero() {
        Decimal::ZERO
    } else {
        total_haircut / gross_assets
    };

    log::debug!(
        "cefr: {} assets, {} liabilities, net={} pv={} ratio={}",
        asset_details.len(),
        input.liabilities.len(),
        net_assets,
        liability_pv,
        cefr
    );

    let output = CefrOutput {
        is_funded: cefr.is_funded(),
        interpretation: cefr.interpretation().to_string(),
        cefr,
        gross_assets,
        total_tax_haircut,
        total_liquidity_haircut,
        total_reliability_haircut,
        total_haircut,
        haircut_percentage,
        net_assets,
        liability_pv,
        funding_gap: liability_pv - net_assets,
        asset_details,
        liability_details,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Certainty-Equivalent Funded Ratio (tax, liquidity, reliability haircuts over liability PV)",
        &serde_json::json!({
            "planning_horizon": input.planning_horizon,
            "real_discount_rate": input.real_discount_rate.to_string(),
            "base_inflation": input.base_inflation.to_string(),
            "total_ordinary_rate": input.tax_model.total_ordinary_rate().to_string(),
            "total_ltcg_rate": input.tax_model.total_ltcg_rate().to_string(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
