use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;
use statrs::distribution::{Normal, StudentsT};

use crate::error::FundednessError;
use crate::models::market::MarketModel;
use crate::FundednessResult;

// ---------------------------------------------------------------------------
// Shocks
// ---------------------------------------------------------------------------

pub(crate) fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// Standardized shocks laid out `[path][year]`, drawn path-major from a
/// single generator.
///
/// With `fat_tails_df` set, shocks are Student-t draws divided by
/// `sqrt(df / (df - 2))` so they keep unit variance.
pub fn generate_shocks(
    n_paths: usize,
    n_years: usize,
    fat_tails_df: Option<f64>,
    seed: Option<u64>,
) -> FundednessResult<Vec<Vec<f64>>> {
    let mut rng = make_rng(seed);

    let shocks = match fat_tails_df {
        None => {
            let normal = Normal::new(0.0, 1.0).map_err(|e| FundednessError::InvalidInput {
                field: "return_model".into(),
                reason: format!("Invalid Normal parameters: {e}"),
            })?;
            (0..n_paths)
                .map(|_| (0..n_years).map(|_| rng.sample(normal)).collect())
                .collect()
        }
        Some(df) => {
            if df.is_nan() || df <= 2.0 {
                return Err(FundednessError::invalid(
                    "degrees_of_freedom",
                    "Must exceed 2 for unit-variance scaling",
                ));
            }
            let t = StudentsT::new(0.0, 1.0, df).map_err(|e| FundednessError::InvalidInput {
                field: "degrees_of_freedom".into(),
                reason: format!("Invalid Student-t parameters: {e}"),
            })?;
            let scale = (df / (df - 2.0)).sqrt();
            (0..n_paths)
                .map(|_| (0..n_years).map(|_| rng.sample(t) / scale).collect())
                .collect()
        }
    };
    Ok(shocks)
}

/// Arithmetic return with the log-normal drift adjustment.
#[inline]
pub fn lognormal_return(mu: f64, sigma: f64, z: f64) -> f64 {
    mu - 0.5 * sigma * sigma + sigma * z
}

// ---------------------------------------------------------------------------
// Portfolio returns
// ---------------------------------------------------------------------------

/// Annual portfolio returns `[path][year]` for a fixed stock/bond mix.
pub fn generate_returns(
    n_paths: usize,
    n_years: usize,
    market: &MarketModel,
    stock_weight: f64,
    bond_weight: Option<f64>,
    seed: Option<u64>,
) -> FundednessResult<Vec<Vec<f64>>> {
    if !(0.0..=1.0).contains(&stock_weight) {
        return Err(FundednessError::invalid(
            "stock_weight",
            "Must be between 0 and 1",
        ));
    }
    market.validate()?;

    let mu = market.expected_portfolio_return(stock_weight, bond_weight);
    let sigma = market.portfolio_volatility(stock_weight, bond_weight);
    let df = market.use_fat_tails.then_some(market.degrees_of_freedom);

    let shocks = generate_shocks(n_paths, n_years, df, seed)?;
    Ok(shocks
        .into_iter()
        .map(|row| row.into_iter().map(|z| lognormal_return(mu, sigma, z)).collect())
        .collect())
}
