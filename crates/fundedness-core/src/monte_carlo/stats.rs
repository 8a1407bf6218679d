use rayon::prelude::*;
use std::collections::BTreeMap;

use super::config::percentile_label;

/// Sort ascending; NaNs compare equal to everything.
pub fn sort_f64(values: &mut [f64]) {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
}

/// Percentile of a **sorted** slice using linear interpolation between
/// closest ranks. Empty input yields NaN.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return f64::NAN;
    }
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

pub fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sort_f64(&mut sorted);
    percentile_sorted(&sorted, 50.0)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Percentiles of each year column of a `[path][year]` matrix.
pub fn column_percentiles(
    paths: &[Vec<f64>],
    n_years: usize,
    percentiles: &[u32],
) -> BTreeMap<String, Vec<f64>> {
    let by_year: Vec<Vec<f64>> = (0..n_years)
        .into_par_iter()
        .map(|year| {
            let mut column: Vec<f64> = paths.iter().map(|p| p[year]).collect();
            sort_f64(&mut column);
            percentiles
                .iter()
                .map(|&p| percentile_sorted(&column, p as f64))
                .collect()
        })
        .collect();

    percentiles
        .iter()
        .enumerate()
        .map(|(k, &p)| {
            (
                percentile_label(p),
                by_year.iter().map(|row| row[k]).collect(),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentile_interpolation() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile_sorted(&v, 0.0), 1.0);
        assert_eq!(percentile_sorted(&v, 100.0), 4.0);
        assert!((percentile_sorted(&v, 50.0) - 2.5).abs() < 1e-12);
        assert!((percentile_sorted(&v, 25.0) - 1.75).abs() < 1e-12);
        assert!(percentile_sorted(&[], 50.0).is_nan());
    }

    #[test]
    fn test_moments() {
        let v = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_eq!(mean(&v), 5.0);
        assert_eq!(std_dev(&v), 2.0);
        assert_eq!(median(&[3.0, 1.0, 2.0]), 2.0);
    }

    #[test]
    fn test_column_percentiles() {
        let paths = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
        let p = column_percentiles(&paths, 2, &[0, 50, 100]);
        assert_eq!(p["P0"], vec![1.0, 10.0]);
        assert_eq!(p["P50"], vec![2.0, 20.0]);
        assert_eq!(p["P100"], vec![3.0, 30.0]);
    }
}
