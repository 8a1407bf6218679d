use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::FundednessError;
use crate::types::{Money, Rate};
use crate::FundednessResult;

// ---------------------------------------------------------------------------
// Classifications
// ---------------------------------------------------------------------------

/// Tax treatment of the account holding an asset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    #[default]
    Taxable,
    TaxDeferred,
    TaxExempt,
    Hsa,
}

/// Broad investment category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Cash,
    Bonds,
    #[default]
    Stocks,
    RealEstate,
    Alternatives,
}

/// How readily an asset converts to spendable cash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityClass {
    Cash,
    #[default]
    TaxableIndex,
    Retirement,
    HomeEquity,
    PrivateBusiness,
    Restricted,
}

/// Diversification of the holding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConcentrationLevel {
    #[default]
    Diversified,
    Sector,
    SingleStock,
    Startup,
}

// ---------------------------------------------------------------------------
// Asset
// ---------------------------------------------------------------------------

/// A single holding on the household balance sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub value: Money,
    #[serde(default)]
    pub account_type: AccountType,
    #[serde(default)]
    pub asset_class: AssetClass,
    #[serde(default)]
    pub liquidity_class: LiquidityClass,
    #[serde(default)]
    pub concentration_level: ConcentrationLevel,
    /// Tax basis; only meaningful for taxable accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_basis: Option<Money>,
}

impl Asset {
    pub fn new(name: impl Into<String>, value: Money) -> Self {
        Asset {
            name: name.into(),
            value,
            account_type: AccountType::default(),
            asset_class: AssetClass::default(),
            liquidity_class: LiquidityClass::default(),
            concentration_level: ConcentrationLevel::default(),
            cost_basis: None,
        }
    }

    pub fn with_account(mut self, account_type: AccountType) -> Self {
        self.account_type = account_type;
        self
    }

    pub fn with_class(mut self, asset_class: AssetClass) -> Self {
        self.asset_class = asset_class;
        self
    }

    pub fn with_liquidity(mut self, liquidity_class: LiquidityClass) -> Self {
        self.liquidity_class = liquidity_class;
        self
    }

    pub fn with_concentration(mut self, level: ConcentrationLevel) -> Self {
        self.concentration_level = level;
        self
    }

    pub fn with_cost_basis(mut self, basis: Money) -> Self {
        self.cost_basis = Some(basis);
        self
    }

    /// Cost basis as a fraction of value, clamped to [0, 1].
    ///
    /// `None` when the basis is unknown or the value is zero. A basis above
    /// value (an unrealised loss) yields 1, i.e. no gain to tax.
    pub fn basis_ratio(&self) -> Option<Rate> {
        let basis = self.cost_basis?;
        if self.value <= Decimal::ZERO {
            return None;
        }
        if basis >= self.value {
            return Some(Decimal::ONE);
        }
        Some(basis.checked_div(self.value)?.max(Decimal::ZERO))
    }

    pub fn validate(&self) -> FundednessResult<()> {
        if self.value < Decimal::ZERO {
            return Err(FundednessError::invalid(
                format!("assets.{}.value", self.name),
                "Asset value cannot be negative",
            ));
        }
        if matches!(self.cost_basis, Some(b) if b < Decimal::ZERO) {
            return Err(FundednessError::invalid(
                format!("assets.{}.cost_basis", self.name),
                "Cost basis cannot be negative",
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Balance sheet
// ---------------------------------------------------------------------------

/// Collection of household assets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceSheet {
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl BalanceSheet {
    pub fn new(assets: Vec<Asset>) -> Self {
        BalanceSheet { assets }
    }

    pub fn total_value(&self) -> Money {
        self.assets.iter().map(|a| a.value).sum()
    }

    pub fn by_account_type(&self) -> BTreeMap<AccountType, Money> {
        let mut out = BTreeMap::new();
        for a in &self.assets {
            *out.entry(a.account_type).or_insert(Decimal::ZERO) += a.value;
        }
        out
    }

    pub fn by_asset_class(&self) -> BTreeMap<AssetClass, Money> {
        let mut out = BTreeMap::new();
        for a in &self.assets {
            *out.entry(a.asset_class).or_insert(Decimal::ZERO) += a.value;
        }
        out
    }

    pub fn by_liquidity_class(&self) -> BTreeMap<LiquidityClass, Money> {
        let mut out = BTreeMap::new();
        for a in &self.assets {
            *out.entry(a.liquidity_class).or_insert(Decimal::ZERO) += a.value;
        }
        out
    }

    fn class_fraction(&self, class: AssetClass) -> Rate {
        let total = self.total_value();
        if total.is_zero() {
            return Decimal::ZERO;
        }
        let in_class: Money = self
            .assets
            .iter()
            .filter(|a| a.asset_class == class)
            .map(|a| a.value)
            .sum();
        in_class / total
    }

    /// Fraction of total value held in stocks.
    pub fn stock_allocation(&self) -> Rate {
        self.class_fraction(AssetClass::Stocks)
    }

    /// Fraction of total value held in bonds.
    pub fn bond_allocation(&self) -> Rate {
        self.class_fraction(AssetClass::Bonds)
    }

    pub fn validate(&self) -> FundednessResult<()> {
        self.assets.iter().try_for_each(Asset::validate)
    }
}
