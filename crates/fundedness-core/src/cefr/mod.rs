//! Certainty-equivalent funded ratio: haircut assets against the present
//! value of future liabilities.

pub mod engine;
pub mod factors;
pub mod liabilities;

pub use engine::{compute_asset_haircuts, compute_cefr, AssetHaircutDetail, CefrInput, CefrOutput, FundedRatio};
pub use factors::FactorTable;
pub use liabilities::{annuity_pv, generate_liability_schedule, LiabilityPv};
