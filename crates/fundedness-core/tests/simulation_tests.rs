use fundedness_core::allocation::{AllocationPolicy, Glidepath, WealthBasedAllocation};
use fundedness_core::monte_carlo::{
    generate_returns, run_simulation, Schedule, SimulationConfig, SimulationInput, SpendingSpec,
};
use fundedness_core::models::MarketModel;
use fundedness_core::withdrawals::{
    compare_strategies, run_strategy_simulation, CompareInput, FixedRealSwr, GuardrailsPolicy,
    VpwPolicy, WithdrawalContext, WithdrawalPolicy, WithdrawalStrategy,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const SEED: u64 = 42;

fn config(n_simulations: u32, n_years: u32) -> SimulationConfig {
    SimulationConfig {
        n_simulations,
        n_years,
        random_seed: Some(SEED),
        ..SimulationConfig::default()
    }
}

fn static_run(spending: f64) -> SimulationInput {
    SimulationInput {
        initial_wealth: 1_000_000.0,
        spending: SpendingSpec::Static {
            annual_spending: Schedule::Flat(spending),
        },
        stock_weight: Schedule::Flat(0.6),
        spending_floor: None,
        starting_age: None,
        config: config(1000, 30),
    }
}

// ===========================================================================
// Engine
// ===========================================================================

#[test]
fn test_identical_seed_is_bit_identical() {
    let a = run_simulation(&static_run(45_000.0)).unwrap().result;
    let b = run_simulation(&static_run(45_000.0)).unwrap().result;
    assert_eq!(a.wealth_paths, b.wealth_paths);
    assert_eq!(a.spending_paths, b.spending_paths);
}

#[test]
fn test_higher_spending_lowers_median_terminal_wealth() {
    let low = run_simulation(&static_run(30_000.0)).unwrap().result;
    let high = run_simulation(&static_run(60_000.0)).unwrap().result;
    assert!(high.median_terminal_wealth < low.median_terminal_wealth);
    assert!(high.success_rate <= low.success_rate);
}

#[test]
fn test_survival_curve_non_increasing() {
    let r = run_simulation(&static_run(65_000.0)).unwrap().result;
    for pair in r.survival_probability.windows(2) {
        assert!(pair[1] <= pair[0] + 1e-12);
    }
}

#[test]
fn test_ruin_is_absorbing() {
    let r = run_simulation(&static_run(90_000.0)).unwrap().result;
    for (path, ruin) in r.wealth_paths.iter().zip(&r.time_to_ruin) {
        if let Some(year) = ruin {
            assert!(path[(*year as usize - 1)..].iter().all(|w| *w == 0.0));
            if *year > 1 {
                assert!(path[*year as usize - 2] > 0.0);
            }
        } else {
            assert!(path.iter().all(|w| *w > 0.0));
        }
    }
}

#[test]
fn test_percentile_bands_are_ordered() {
    let r = run_simulation(&static_run(40_000.0)).unwrap().result;
    let p10 = r.wealth_percentile(10).unwrap();
    let p50 = r.wealth_percentile(50).unwrap();
    let p90 = r.wealth_percentile(90).unwrap();
    for t in 0..30 {
        assert!(p10[t] <= p50[t] && p50[t] <= p90[t]);
    }
}

#[test]
fn test_fat_tails_widen_the_distribution() {
    let mut thin = static_run(0.0);
    thin.config.n_years = 1;
    thin.config.n_simulations = 20_000;
    let mut fat = thin.clone();
    fat.config.market_model.use_fat_tails = true;

    let spread = |input: &SimulationInput| {
        let r = run_simulation(input).unwrap().result;
        let mut terminal = r.terminal_wealth();
        terminal.sort_by(|a, b| a.partial_cmp(b).unwrap());
        terminal[terminal.len() - 1] - terminal[0]
    };
    assert!(spread(&fat) > spread(&thin));
}

#[test]
fn test_returns_matrix_matches_market() {
    let m = MarketModel::default();
    let r = generate_returns(3, 4, &m, 1.0, Some(0.0), Some(SEED)).unwrap();
    assert_eq!(r.len(), 3);
    let again = generate_returns(3, 4, &m, 1.0, Some(0.0), Some(SEED)).unwrap();
    assert_eq!(r, again);
}

#[test]
fn test_dynamic_glidepath_run() {
    let input = SimulationInput {
        initial_wealth: 2_000_000.0,
        spending: SpendingSpec::Dynamic {
            withdrawal: WithdrawalStrategy::Vpw(VpwPolicy::default()),
            allocation: Some(fundedness_core::allocation::AllocationStrategy::Glidepath(
                Glidepath::declining(),
            )),
        },
        stock_weight: Schedule::Flat(0.6),
        spending_floor: None,
        starting_age: Some(65),
        config: SimulationConfig {
            track_allocation: true,
            ..config(200, 30)
        },
    };
    let r = run_simulation(&input).unwrap().result;
    let alloc = r.allocation_paths.unwrap();
    assert!((alloc[0][0] - 0.7).abs() < 1e-12);
    assert!((alloc[0][29] - (0.7 - 0.4 * 29.0 / 30.0)).abs() < 1e-12);
    // VPW never withdraws everything, so no path is ruined.
    assert_eq!(r.success_rate, 1.0);
}

// ===========================================================================
// Policies
// ===========================================================================

#[test]
fn test_guardrail_cut_and_raise() {
    let policy = GuardrailsPolicy::default();
    let prev = [50_000.0, 50_000.0, 50_000.0];
    let wealth = [500_000.0, 2_000_000.0, 2_000_000.0];
    let ytd = [0.05, 0.05, -0.10];
    let base = 50_000.0 * (1.0 + policy.inflation_rate);

    let ctx = WithdrawalContext::new(&wealth, 1_000_000.0, 5)
        .with_previous_spending(&prev)
        .with_market_return(&ytd);
    let d = policy.calculate_withdrawal(&ctx);

    assert!(d.amount[0] < base);
    assert!(d.amount[1] > base);
    assert!((d.amount[2] - base).abs() < 1e-9);
    assert_eq!(d.guardrail_cut, vec![true, false, false]);
    assert_eq!(d.guardrail_raise, vec![false, true, false]);
    assert_eq!(d.floor_breach, vec![false; 3]);
}

#[test]
fn test_wealth_based_allocation_interpolates() {
    let p = WealthBasedAllocation::default();
    let mid = (p.floor_wealth + p.target_wealth) / 2.0;
    let w = p.allocation(&[p.floor_wealth / 2.0, mid, p.target_wealth * 2.0], 0, 1.0);
    assert_eq!(w[0], p.min_stock_weight);
    assert!((w[1] - (p.min_stock_weight + p.max_stock_weight) / 2.0).abs() < 1e-12);
    assert!((w[2] - p.max_stock_weight).abs() < 1e-12);
}

// ===========================================================================
// Comparison
// ===========================================================================

#[test]
fn test_comparison_reuses_the_same_market() {
    let floored = FixedRealSwr {
        floor_spending: Some(1.0),
        ceiling_spending: Some(1e12),
        ..FixedRealSwr::new(0.045)
    };
    let input = CompareInput {
        strategies: vec![
            WithdrawalStrategy::Guardrails(GuardrailsPolicy::default()),
            WithdrawalStrategy::FixedSwr(floored),
        ],
        initial_wealth: 1_000_000.0,
        withdrawal_rate: 0.04,
        stock_weight: 0.5,
        starting_age: 60,
        spending_floor: Some(35_000.0),
        config: config(500, 35),
    };
    let out = compare_strategies(&input).unwrap().result;

    let isolated = run_strategy_simulation(
        &FixedRealSwr::new(0.045),
        1_000_000.0,
        &config(500, 35),
        0.5,
        60,
        Some(35_000.0),
    )
    .unwrap();
    assert_eq!(out.results[1].result.wealth_paths, isolated.wealth_paths);
    assert_eq!(out.metrics[1].success_rate, isolated.success_rate);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn withdrawals_never_exceed_wealth(
        wealth in proptest::collection::vec(0.0f64..3_000_000.0, 1..20),
        year in 0u32..40,
        rate in 0.01f64..0.2,
    ) {
        let policies = [
            WithdrawalStrategy::FixedSwr(FixedRealSwr::new(rate)),
            WithdrawalStrategy::Guardrails(GuardrailsPolicy::default()),
            WithdrawalStrategy::Vpw(VpwPolicy::default()),
        ];
        let ctx = WithdrawalContext::new(&wealth, 1_000_000.0, year).with_age(65 + year);
        for policy in &policies {
            let d = policy.calculate_withdrawal(&ctx);
            prop_assert_eq!(d.amount.len(), wealth.len());
            for (a, w) in d.amount.iter().zip(&wealth) {
                prop_assert!(*a >= 0.0 && *a <= *w);
            }
        }
    }
}
