use serde::{Deserialize, Serialize};

use crate::error::FundednessError;
use crate::FundednessResult;

/// Number of modelled asset classes: stocks, bonds, cash, real estate.
pub const N_ASSETS: usize = 4;

pub type Matrix4 = [[f64; N_ASSETS]; N_ASSETS];

/// Capital market assumptions in real terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketModel {
    pub stock_return: f64,
    pub bond_return: f64,
    pub cash_return: f64,
    pub real_estate_return: f64,
    pub stock_volatility: f64,
    pub bond_volatility: f64,
    pub cash_volatility: f64,
    pub real_estate_volatility: f64,
    pub stock_bond_correlation: f64,
    pub stock_real_estate_correlation: f64,
    pub inflation_mean: f64,
    pub inflation_volatility: f64,
    pub real_discount_rate: f64,
    pub use_fat_tails: bool,
    pub degrees_of_freedom: f64,
}

impl Default for MarketModel {
    fn default() -> Self {
        MarketModel {
            stock_return: 0.05,
            bond_return: 0.015,
            cash_return: 0.0,
            real_estate_return: 0.03,
            stock_volatility: 0.16,
            bond_volatility: 0.06,
            cash_volatility: 0.01,
            real_estate_volatility: 0.12,
            stock_bond_correlation: 0.0,
            stock_real_estate_correlation: 0.5,
            inflation_mean: 0.025,
            inflation_volatility: 0.015,
            real_discount_rate: 0.02,
            use_fat_tails: false,
            degrees_of_freedom: 5.0,
        }
    }
}

/// Portfolio weights across the four modelled classes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortfolioWeights {
    pub stocks: f64,
    pub bonds: f64,
    pub cash: f64,
    pub real_estate: f64,
}

impl PortfolioWeights {
    /// Bonds default to the complement of stocks; cash absorbs any remainder.
    pub fn from_stock_bond(stock_weight: f64, bond_weight: Option<f64>) -> Self {
        let bonds = bond_weight.unwrap_or(1.0 - stock_weight);
        PortfolioWeights {
            stocks: stock_weight,
            bonds,
            cash: (1.0 - stock_weight - bonds).max(0.0),
            real_estate: 0.0,
        }
    }

    fn as_array(&self) -> [f64; N_ASSETS] {
        [self.stocks, self.bonds, self.cash, self.real_estate]
    }
}

impl MarketModel {
    pub fn expected_returns(&self) -> [f64; N_ASSETS] {
        [
            self.stock_return,
            self.bond_return,
            self.cash_return,
            self.real_estate_return,
        ]
    }

    pub fn volatilities(&self) -> [f64; N_ASSETS] {
        [
            self.stock_volatility,
            self.bond_volatility,
            self.cash_volatility,
            self.real_estate_volatility,
        ]
    }

    /// Correlation matrix in stocks, bonds, cash, real estate order.
    pub fn correlation_matrix(&self) -> Matrix4 {
        let sb = self.stock_bond_correlation;
        let sre = self.stock_real_estate_correlation;
        [
            [1.0, sb, 0.0, sre],
            [sb, 1.0, 0.1, 0.2],
            [0.0, 0.1, 1.0, 0.0],
            [sre, 0.2, 0.0, 1.0],
        ]
    }

    pub fn covariance_matrix(&self) -> Matrix4 {
        let vols = self.volatilities();
        let corr = self.correlation_matrix();
        let mut cov = [[0.0; N_ASSETS]; N_ASSETS];
        for i in 0..N_ASSETS {
            for j in 0..N_ASSETS {
                cov[i][j] = vols[i] * vols[j] * corr[i][j];
            }
        }
        cov
    }

    /// Lower-triangular Cholesky factor of the covariance matrix.
    pub fn cholesky(&self) -> FundednessResult<Matrix4> {
        let cov = self.covariance_matrix();
        let mut l = [[0.0; N_ASSETS]; N_ASSETS];
        for i in 0..N_ASSETS {
            for j in 0..=i {
                let sum: f64 = (0..j).map(|k| l[i][k] * l[j][k]).sum();
                if i == j {
                    let d = cov[i][i] - sum;
                    if d <= 0.0 {
                        return Err(FundednessError::invalid(
                            "market_model",
                            "Covariance matrix is not positive definite",
                        ));
                    }
                    l[i][j] = d.sqrt();
                } else {
                    l[i][j] = (cov[i][j] - sum) / l[j][j];
                }
            }
        }
        Ok(l)
    }

    pub fn expected_portfolio_return(&self, stock_weight: f64, bond_weight: Option<f64>) -> f64 {
        let w = PortfolioWeights::from_stock_bond(stock_weight, bond_weight).as_array();
        let mu = self.expected_returns();
        // Real estate carries no weight in two-asset portfolios.
        w[0] * mu[0] + w[1] * mu[1] + w[2] * mu[2]
    }

    pub fn portfolio_volatility(&self, stock_weight: f64, bond_weight: Option<f64>) -> f64 {
        let w = PortfolioWeights::from_stock_bond(stock_weight, bond_weight).as_array();
        let cov = self.covariance_matrix();
        let mut var = 0.0;
        for i in 0..N_ASSETS {
            for j in 0..N_ASSETS {
                var += w[i] * w[j] * cov[i][j];
            }
        }
        var.max(0.0).sqrt()
    }

    pub fn validate(&self) -> FundednessResult<()> {
        let vols = [
            ("stock_volatility", self.stock_volatility),
            ("bond_volatility", self.bond_volatility),
            ("cash_volatility", self.cash_volatility),
            ("real_estate_volatility", self.real_estate_volatility),
            ("inflation_volatility", self.inflation_volatility),
        ];
        for (field, v) in vols {
            if !v.is_finite() || v < 0.0 {
                return Err(FundednessError::invalid(
                    format!("market_model.{field}"),
                    "Volatility must be non-negative",
                ));
            }
        }
        let corrs = [
            ("stock_bond_correlation", self.stock_bond_correlation),
            ("stock_real_estate_correlation", self.stock_real_estate_correlation),
        ];
        for (field, c) in corrs {
            if !(-1.0..=1.0).contains(&c) {
                return Err(FundednessError::invalid(
                    format!("market_model.{field}"),
                    "Correlation must be between -1 and 1",
                ));
            }
        }
        let returns = [
            ("stock_return", self.stock_return),
            ("bond_return", self.bond_return),
            ("cash_return", self.cash_return),
            ("real_estate_return", self.real_estate_return),
            ("inflation_mean", self.inflation_mean),
            ("real_discount_rate", self.real_discount_rate),
        ];
        for (field, r) in returns {
            if !r.is_finite() || r <= -1.0 {
                return Err(FundednessError::invalid(
                    format!("market_model.{field}"),
                    "Rate must be finite and greater than -100%",
                ));
            }
        }
        if self.degrees_of_freedom.is_nan() || self.degrees_of_freedom < 3.0 {
            return Err(FundednessError::invalid(
                "market_model.degrees_of_freedom",
                "Must be at least 3 for finite variance",
            ));
        }
        Ok(())
    }
}
