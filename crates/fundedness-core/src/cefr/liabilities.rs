use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::FundednessError;
use crate::models::liabilities::Liability;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::FundednessResult;

/// Below this spread, r and g are treated as equal.
const RATE_EQUALITY_TOLERANCE: Decimal = dec!(0.0000000001);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Present-value breakdown for a single liability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiabilityPv {
    pub name: String,
    pub present_value: Money,
    /// Undiscounted sum of payments in today's dollars.
    pub nominal_total: Money,
    /// Growth factor at the midpoint of the payment window.
    pub inflation_adjustment: Rate,
    /// Discount factor at the midpoint of the payment window.
    pub discount_factor: Rate,
    pub is_essential: bool,
}

/// Input for the nominal liability schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiabilityScheduleInput {
    pub liabilities: Vec<Liability>,
    #[serde(default = "default_schedule_years")]
    pub n_years: u32,
    #[serde(default = "default_base_inflation")]
    pub base_inflation: Rate,
    #[serde(default = "default_discount_rate")]
    pub real_discount_rate: Rate,
}

fn default_schedule_years() -> u32 {
    30
}

pub(crate) fn default_base_inflation() -> Rate {
    dec!(0.025)
}

pub(crate) fn default_discount_rate() -> Rate {
    dec!(0.02)
}

/// Nominal spending per year plus present-value totals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiabilityScheduleOutput {
    pub schedule: Vec<Money>,
    pub total_nominal: Money,
    pub liability_pv: Money,
    pub essential_liability_pv: Money,
    pub details: Vec<LiabilityPv>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// `base^n` by repeated multiplication; `None` on overflow.
fn checked_pow(base: Decimal, n: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    for _ in 0..n {
        result = result.checked_mul(base)?;
    }
    Some(result)
}

fn overflow(field: &str) -> FundednessError {
    FundednessError::invalid(field, "Compounding overflows over the requested horizon")
}

fn check_rate(field: &str, rate: Rate) -> FundednessResult<()> {
    if rate <= dec!(-1) {
        return Err(FundednessError::invalid(
            field,
            "Rate must be greater than -100%",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Present value
// ---------------------------------------------------------------------------

/// Present value of a growing annuity paid at the end of each year for
/// `years` years, deferred by `start_year`.
///
/// `P · [1 − ((1+g)/(1+r))^n] / (r − g)`, discounted by `(1+r)^start_year`.
/// When r and g coincide the closed form is replaced by `P · n`, undiscounted
/// within the payment window. This sits one period of discount above the
/// closed form's limit `P · n / (1+r)`, so PV steps up at `g = r`. The step
/// is intended; do not replace it with the limit.
pub fn annuity_pv(
    payment: Money,
    years: u32,
    discount_rate: Rate,
    growth_rate: Rate,
    start_year: u32,
) -> FundednessResult<Money> {
    check_rate("discount_rate", discount_rate)?;
    check_rate("growth_rate", growth_rate)?;
    if years == 0 || payment.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let start_discount =
        checked_pow(Decimal::ONE + discount_rate, start_year).ok_or_else(|| overflow("start_year"))?;
    let years_dec = Decimal::from(years);

    if (discount_rate - growth_rate).abs() < RATE_EQUALITY_TOLERANCE {
        return Ok(payment * years_dec / start_discount);
    }

    let ratio = (Decimal::ONE + growth_rate) / (Decimal::ONE + discount_rate);
    let ratio_n = checked_pow(ratio, years).ok_or_else(|| overflow("growth_rate"))?;
    let pv = payment * (Decimal::ONE - ratio_n) / (discount_rate - growth_rate);
    Ok(pv / start_discount)
}

/// Probability-weighted PV of one liability in real terms.
///
/// The liability grows at its linkage rate less base inflation, i.e. its
/// real growth above CPI.
pub fn liability_pv(
    liability: &Liability,
    planning_horizon: u32,
    discount_rate: Rate,
    base_inflation: Rate,
) -> FundednessResult<LiabilityPv> {
    let n = liability.payment_years(planning_horizon);
    let inflation = liability.inflation_rate(base_inflation);
    let real_growth = inflation - base_inflation;

    let pv = annuity_pv(
        liability.annual_amount,
        n,
        discount_rate,
        real_growth,
        liability.start_year,
    )? * liability.probability;

    let inflation_adjustment = checked_pow(Decimal::ONE + inflation, n)
        .and_then(|g| g.sqrt())
        .ok_or_else(|| overflow("inflation"))?;
    let mid_discount = checked_pow(Decimal::ONE + discount_rate, liability.start_year)
        .zip(checked_pow(Decimal::ONE + discount_rate, n).and_then(|d| d.sqrt()))
        .and_then(|(a, b)| a.checked_mul(b))
        .ok_or_else(|| overflow("discount_rate"))?;

    Ok(LiabilityPv {
        name: liability.name.clone(),
        present_value: pv,
        nominal_total: liability.annual_amount * Decimal::from(n),
        inflation_adjustment,
        discount_factor: Decimal::ONE / mid_discount,
        is_essential: liability.is_essential,
    })
}

/// Per-liability PV details in input order.
pub fn liability_details(
    liabilities: &[Liability],
    planning_horizon: u32,
    discount_rate: Rate,
    base_inflation: Rate,
) -> FundednessResult<Vec<LiabilityPv>> {
    liabilities
        .iter()
        .map(|l| liability_pv(l, planning_horizon, discount_rate, base_inflation))
        .collect()
}

/// Sum of probability-weighted liability PVs.
pub fn total_liability_pv(
    liabilities: &[Liability],
    planning_horizon: u32,
    discount_rate: Rate,
    base_inflation: Rate,
) -> FundednessResult<Money> {
    Ok(
        liability_details(liabilities, planning_horizon, discount_rate, base_inflation)?
            .iter()
            .map(|d| d.present_value)
            .sum(),
    )
}

/// PV of the essential liabilities only.
pub fn essential_liability_pv(
    liabilities: &[Liability],
    planning_horizon: u32,
    discount_rate: Rate,
    base_inflation: Rate,
) -> FundednessResult<Money> {
    Ok(
        liability_details(liabilities, planning_horizon, discount_rate, base_inflation)?
            .iter()
            .filter(|d| d.is_essential)
            .map(|d| d.present_value)
            .sum(),
    )
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

/// Nominal, probability-weighted spending per year over `n_years`.
///
/// Each liability contributes `amount × (1 + linkage)^year × probability`
/// for years in `[start_year, min(end_year, n_years))`.
pub fn generate_liability_schedule(
    liabilities: &[Liability],
    n_years: u32,
    base_inflation: Rate,
) -> FundednessResult<Vec<Money>> {
    let mut schedule = vec![Decimal::ZERO; n_years as usize];
    for l in liabilities {
        let end = l.end_year.unwrap_or(n_years).min(n_years);
        if l.start_year >= end {
            continue;
        }
        let growth = Decimal::ONE + l.inflation_rate(base_inflation);
        let mut factor = checked_pow(growth, l.start_year).ok_or_else(|| overflow("inflation"))?;
        for year in l.start_year..end {
            if year > l.start_year {
                factor = factor.checked_mul(growth).ok_or_else(|| overflow("inflation"))?;
            }
            schedule[year as usize] += l.annual_amount * factor * l.probability;
        }
    }
    Ok(schedule)
}

/// Nominal schedule and PV summary for a set of liabilities.
pub fn liability_schedule(
    input: &LiabilityScheduleInput,
) -> FundednessResult<ComputationOutput<LiabilityScheduleOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    check_rate("base_inflation", input.base_inflation)?;
    check_rate("real_discount_rate", input.real_discount_rate)?;
    for l in &input.liabilities {
        l.validate()?;
    }
    if input.liabilities.is_empty() {
        warnings.push("No liabilities supplied; schedule is all zeros".into());
    }

    let schedule =
        generate_liability_schedule(&input.liabilities, input.n_years, input.base_inflation)?;
    let details = liability_details(
        &input.liabilities,
        input.n_years,
        input.real_discount_rate,
        input.base_inflation,
    )?;

    let output = LiabilityScheduleOutput {
        total_nominal: schedule.iter().copied().sum(),
        liability_pv: details.iter().map(|d| d.present_value).sum(),
        essential_liability_pv: details
            .iter()
            .filter(|d| d.is_essential)
            .map(|d| d.present_value)
            .sum(),
        schedule,
        details,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Nominal liability schedule with growing-annuity present values",
        &serde_json::json!({
            "n_years": input.n_years,
            "base_inflation": input.base_inflation.to_string(),
            "real_discount_rate": input.real_discount_rate.to_string(),
            "liabilities": input.liabilities.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::liabilities::InflationLinkage;

    #[test]
    fn test_level_annuity_known_answer() {
        let pv = annuity_pv(dec!(10_000), 10, dec!(0.05), Decimal::ZERO, 0).unwrap();
        assert!((pv - dec!(77_217.35)).abs() < dec!(0.01), "pv={pv}");
    }

    #[test]
    fn test_zero_years_is_zero() {
        let pv = annuity_pv(dec!(10_000), 0, dec!(0.05), dec!(0.02), 3).unwrap();
        assert_eq!(pv, Decimal::ZERO);
    }

    #[test]
    fn test_equal_rates_use_limit() {
        let pv = annuity_pv(dec!(1_000), 10, dec!(0.03), dec!(0.03), 0).unwrap();
        assert_eq!(pv, dec!(10_000));
        let deferred = annuity_pv(dec!(1_000), 10, dec!(0.03), dec!(0.03), 2).unwrap();
        assert!((deferred - dec!(10_000) / dec!(1.0609)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_deferral_discounts() {
        let now = annuity_pv(dec!(10_000), 10, dec!(0.05), Decimal::ZERO, 0).unwrap();
        let later = annuity_pv(dec!(10_000), 10, dec!(0.05), Decimal::ZERO, 5).unwrap();
        let expected = now / checked_pow(dec!(1.05), 5).unwrap();
        assert!((later - expected).abs() < dec!(0.000001));
    }

    #[test]
    fn test_growth_increases_pv() {
        let flat = annuity_pv(dec!(10_000), 20, dec!(0.03), Decimal::ZERO, 0).unwrap();
        let growing = annuity_pv(dec!(10_000), 20, dec!(0.03), dec!(0.02), 0).unwrap();
        assert!(growing > flat);
    }

    #[test]
    fn test_invalid_discount_rate() {
        assert!(annuity_pv(dec!(1), 5, dec!(-1), Decimal::ZERO, 0).is_err());
    }

    #[test]
    fn test_liability_pv_weighted_by_probability() {
        let l = Liability::new("Travel", dec!(10_000))
            .with_years(0, Some(10))
            .with_linkage(InflationLinkage::Cpi)
            .with_probability(dec!(0.5));
        let d = liability_pv(&l, 30, dec!(0.05), dec!(0.025)).unwrap();
        assert!((d.present_value - dec!(38_608.67)).abs() < dec!(0.01), "pv={}", d.present_value);
        assert_eq!(d.nominal_total, dec!(100_000));
        assert!(d.discount_factor < Decimal::ONE);
        assert!(d.inflation_adjustment > Decimal::ONE);
    }

    #[test]
    fn test_essential_subset() {
        let ls = vec![
            Liability::new("Core", dec!(40_000)),
            Liability::new("Fun", dec!(20_000)).discretionary(),
        ];
        let total = total_liability_pv(&ls, 30, dec!(0.02), dec!(0.025)).unwrap();
        let essential = essential_liability_pv(&ls, 30, dec!(0.02), dec!(0.025)).unwrap();
        assert!(essential < total);
        assert!((total - essential * dec!(1.5)).abs() < dec!(0.0001));
    }

    #[test]
    fn test_schedule_window_and_growth() {
        let ls = vec![Liability::new("x", dec!(1_000)).with_years(1, Some(3))];
        let s = generate_liability_schedule(&ls, 5, dec!(0.02)).unwrap();
        assert_eq!(s, vec![dec!(0), dec!(1020), dec!(1040.4), dec!(0), dec!(0)]);
    }

    #[test]
    fn test_schedule_truncated_at_horizon() {
        let ls = vec![Liability::new("x", dec!(100)).with_linkage(InflationLinkage::None)];
        let s = generate_liability_schedule(&ls, 3, dec!(0.02)).unwrap();
        assert_eq!(s, vec![dec!(100); 3]);
    }

    #[test]
    fn test_schedule_output_totals() {
        let input = LiabilityScheduleInput {
            liabilities: vec![Liability::new("x", dec!(100)).with_linkage(InflationLinkage::None)],
            n_years: 4,
            base_inflation: dec!(0.025),
            real_discount_rate: dec!(0.02),
        };
        let out = liability_schedule(&input).unwrap();
        assert_eq!(out.result.total_nominal, dec!(400));
        assert_eq!(out.result.schedule.len(), 4);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
    }
}
