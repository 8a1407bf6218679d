use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::FundednessError;
use crate::models::assets::AccountType;
use crate::types::Rate;
use crate::FundednessResult;

/// Federal and state tax rates used to haircut assets to after-tax value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaxModel {
    pub federal_ordinary_rate: Rate,
    pub federal_ltcg_rate: Rate,
    pub federal_stcg_rate: Rate,
    pub state_ordinary_rate: Rate,
    pub state_ltcg_rate: Rate,
    pub niit_rate: Rate,
    pub niit_applies: bool,
    /// Basis ratio assumed for taxable assets with no recorded cost basis.
    pub default_cost_basis_ratio: Rate,
}

impl Default for TaxModel {
    fn default() -> Self {
        TaxModel {
            federal_ordinary_rate: dec!(0.24),
            federal_ltcg_rate: dec!(0.15),
            federal_stcg_rate: dec!(0.24),
            state_ordinary_rate: dec!(0.093),
            state_ltcg_rate: dec!(0.093),
            niit_rate: dec!(0.038),
            niit_applies: true,
            default_cost_basis_ratio: dec!(0.5),
        }
    }
}

impl TaxModel {
    /// A model with every rate set to zero.
    pub fn tax_free() -> Self {
        TaxModel {
            federal_ordinary_rate: Decimal::ZERO,
            federal_ltcg_rate: Decimal::ZERO,
            federal_stcg_rate: Decimal::ZERO,
            state_ordinary_rate: Decimal::ZERO,
            state_ltcg_rate: Decimal::ZERO,
            niit_rate: Decimal::ZERO,
            niit_applies: false,
            default_cost_basis_ratio: Decimal::ONE,
        }
    }

    pub fn total_ordinary_rate(&self) -> Rate {
        self.federal_ordinary_rate + self.state_ordinary_rate
    }

    pub fn total_ltcg_rate(&self) -> Rate {
        let niit = if self.niit_applies {
            self.niit_rate
        } else {
            Decimal::ZERO
        };
        self.federal_ltcg_rate + self.state_ltcg_rate + niit
    }

    /// Effective tax rate on liquidation for the given account type.
    ///
    /// Taxable accounts pay LTCG on the unrealised gain only; `basis_ratio`
    /// falls back to `default_cost_basis_ratio` when unknown.
    pub fn effective_tax_rate(&self, account_type: AccountType, basis_ratio: Option<Rate>) -> Rate {
        match account_type {
            AccountType::TaxExempt | AccountType::Hsa => Decimal::ZERO,
            AccountType::TaxDeferred => self.total_ordinary_rate(),
            AccountType::Taxable => {
                let ratio = basis_ratio.unwrap_or(self.default_cost_basis_ratio);
                (Decimal::ONE - ratio) * self.total_ltcg_rate()
            }
        }
    }

    /// Effective rate per account type using the default basis assumption.
    pub fn haircut_by_account_type(&self) -> BTreeMap<AccountType, Rate> {
        [
            AccountType::Taxable,
            AccountType::TaxDeferred,
            AccountType::TaxExempt,
            AccountType::Hsa,
        ]
        .into_iter()
        .map(|t| (t, self.effective_tax_rate(t, None)))
        .collect()
    }

    pub fn validate(&self) -> FundednessResult<()> {
        let rates = [
            ("federal_ordinary_rate", self.federal_ordinary_rate),
            ("federal_ltcg_rate", self.federal_ltcg_rate),
            ("federal_stcg_rate", self.federal_stcg_rate),
            ("state_ordinary_rate", self.state_ordinary_rate),
            ("state_ltcg_rate", self.state_ltcg_rate),
            ("niit_rate", self.niit_rate),
            ("default_cost_basis_ratio", self.default_cost_basis_ratio),
            ("total_ordinary_rate", self.total_ordinary_rate()),
            ("total_ltcg_rate", self.total_ltcg_rate()),
        ];
        for (field, rate) in rates {
            if rate < Decimal::ZERO || rate > Decimal::ONE {
                return Err(FundednessError::invalid(
                    format!("tax_model.{field}"),
                    "Must be between 0 and 1",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_rates() {
        let t = TaxModel::default();
        assert_eq!(t.total_ordinary_rate(), dec!(0.333));
        assert_eq!(t.total_ltcg_rate(), dec!(0.281));

        let no_niit = TaxModel {
            niit_applies: false,
            ..TaxModel::default()
        };
        assert_eq!(no_niit.total_ltcg_rate(), dec!(0.243));
    }

    #[test]
    fn test_effective_rates_by_account() {
        let t = TaxModel::default();
        assert_eq!(t.effective_tax_rate(AccountType::TaxExempt, None), Decimal::ZERO);
        assert_eq!(t.effective_tax_rate(AccountType::Hsa, Some(dec!(0.1))), Decimal::ZERO);
        assert_eq!(t.effective_tax_rate(AccountType::TaxDeferred, None), dec!(0.333));
        assert_eq!(t.effective_tax_rate(AccountType::Taxable, None), dec!(0.1405));
        assert_eq!(
            t.effective_tax_rate(AccountType::Taxable, Some(dec!(0.8))),
            dec!(0.0562)
        );
    }

    #[test]
    fn test_haircut_table_covers_all_accounts() {
        let table = TaxModel::default().haircut_by_account_type();
        assert_eq!(table.len(), 4);
        assert_eq!(table[&AccountType::Taxable], dec!(0.1405));
    }

    #[test]
    fn test_rates_above_one_rejected() {
        let t = TaxModel {
            federal_ordinary_rate: dec!(0.95),
            ..TaxModel::default()
        };
        assert!(t.validate().is_err());
        assert!(TaxModel::default().validate().is_ok());
        assert!(TaxModel::tax_free().validate().is_ok());
    }
}
