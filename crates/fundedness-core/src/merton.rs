//! Closed-form consumption and portfolio rules under CRRA utility.

use crate::models::market::MarketModel;
use crate::models::utility::UtilityModel;

/// Optimal risky share `k* = (μ − r) / (γσ²)`, with stocks as the risky
/// asset and bonds as the safe one. Zero when volatility or risk aversion
/// is zero.
pub fn optimal_risky_share(market: &MarketModel, utility: &UtilityModel) -> f64 {
    let sigma = market.stock_volatility;
    let gamma = utility.risk_aversion;
    if sigma == 0.0 || gamma == 0.0 {
        return 0.0;
    }
    (market.stock_return - market.bond_return) / (gamma * sigma * sigma)
}

/// Certainty-equivalent portfolio return at risky share `risky_share`
/// (the optimal share when `None`).
pub fn certainty_equivalent_return(
    market: &MarketModel,
    utility: &UtilityModel,
    risky_share: Option<f64>,
) -> f64 {
    let k = risky_share.unwrap_or_else(|| optimal_risky_share(market, utility));
    let r = market.bond_return;
    let sigma = market.stock_volatility;
    r + k * (market.stock_return - r) - utility.risk_aversion * k * k * sigma * sigma / 2.0
}

/// Optimal fraction of wealth to consume this year.
///
/// With a finite horizon the rate is raised to at least the annuity payout
/// rate over the remaining years, so wealth is spent down by the end.
pub fn optimal_spending_rate(
    market: &MarketModel,
    utility: &UtilityModel,
    remaining_years: Option<f64>,
) -> f64 {
    let rce = certainty_equivalent_return(market, utility, None);
    let gamma = utility.risk_aversion;
    let rho = utility.time_preference;

    let mut rate = if (gamma - 1.0).abs() < f64::EPSILON {
        rho
    } else {
        rce - (rce - rho) / gamma
    };

    if let Some(n) = remaining_years.filter(|n| n.is_finite() && *n > 0.0) {
        let payout = if rce > 0.0 {
            let annuity_factor = (1.0 - (1.0 + rce).powf(-n)) / rce;
            1.0 / annuity_factor
        } else {
            1.0 / n
        };
        rate = rate.max(payout);
    }

    rate.max(0.0)
}

/// Optimal allocation scaled by the share of wealth above the subsistence
/// floor; `min_allocation` at or below the floor.
pub fn wealth_adjusted_allocation(
    wealth: f64,
    market: &MarketModel,
    utility: &UtilityModel,
    min_allocation: f64,
    max_allocation: f64,
) -> f64 {
    let floor = utility.subsistence_floor;
    if wealth <= floor {
        return min_allocation;
    }
    let unconstrained = optimal_risky_share(market, utility);
    let adjusted = unconstrained * (wealth - floor) / wealth;
    adjusted.clamp(min_allocation, max_allocation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risky_share_default_market() {
        let k = optimal_risky_share(&MarketModel::default(), &UtilityModel::default());
        // (0.05 - 0.015) / (3 * 0.0256)
        assert!((k - 0.035 / 0.0768).abs() < 1e-12, "k={k}");
    }

    #[test]
    fn test_risky_share_zero_volatility() {
        let market = MarketModel {
            stock_volatility: 0.0,
            ..MarketModel::default()
        };
        assert_eq!(optimal_risky_share(&market, &UtilityModel::default()), 0.0);
    }

    #[test]
    fn test_ce_return_between_bond_and_stock() {
        let m = MarketModel::default();
        let rce = certainty_equivalent_return(&m, &UtilityModel::default(), None);
        assert!(rce > m.bond_return && rce < m.stock_return, "rce={rce}");
    }

    #[test]
    fn test_finite_horizon_raises_rate() {
        let m = MarketModel::default();
        let u = UtilityModel::default();
        let infinite = optimal_spending_rate(&m, &u, None);
        let short = optimal_spending_rate(&m, &u, Some(10.0));
        assert!(short > infinite);
        assert!(short > 0.1, "short={short}");
    }

    #[test]
    fn test_wealth_adjustment() {
        let m = MarketModel::default();
        let u = UtilityModel::default();
        assert_eq!(wealth_adjusted_allocation(20_000.0, &m, &u, 0.1, 1.0), 0.1);
        let rich = wealth_adjusted_allocation(10_000_000.0, &m, &u, 0.0, 1.0);
        let modest = wealth_adjusted_allocation(100_000.0, &m, &u, 0.0, 1.0);
        assert!(rich > modest);
        assert!(rich <= 1.0);
    }
}
