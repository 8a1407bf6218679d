//! Data models shared by the funded-ratio engine and the simulator.

pub mod assets;
pub mod liabilities;
pub mod market;
pub mod tax;
pub mod utility;

pub use assets::{
    AccountType, Asset, AssetClass, BalanceSheet, ConcentrationLevel, LiquidityClass,
};
pub use liabilities::{InflationLinkage, Liability, LiabilityType};
pub use market::MarketModel;
pub use tax::TaxModel;
pub use utility::UtilityModel;
