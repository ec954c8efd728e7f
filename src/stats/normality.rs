//! Normality tests: Shapiro–Wilk (Royston 1995) and Anderson–Darling

use std::f64::consts::{FRAC_PI_3, PI};

use super::distributions::{normal_cdf, normal_ppf};

/// Evaluate `c[0] + c[1] x + c[2] x² + …`.
fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Shapiro–Wilk `W` statistic and its p-value for `sorted` (ascending, n ≥ 3).
///
/// Callers must ensure the sample has non-zero variance.
pub(crate) fn shapiro_wilk(sorted: &[f64]) -> (f64, f64) {
    const C1: [f64; 6] = [0.0, 0.221_157, -0.147_981, -2.071_19, 4.434_685, -2.706_056];
    const C2: [f64; 6] = [0.0, 0.042_981, -0.293_762, -1.752_461, 5.682_633, -3.582_633];
    const GAMMA: [f64; 2] = [-2.273, 0.459];
    const SMALL_MEAN: [f64; 4] = [0.544, -0.399_78, 0.025_054, -6.714e-4];
    const SMALL_SIGMA: [f64; 4] = [1.3822, -0.778_57, 0.062_767, -0.002_032_2];
    const LARGE_MEAN: [f64; 4] = [-1.5861, -0.310_82, -0.083_751, 0.003_891_5];
    const LARGE_SIGMA: [f64; 3] = [-0.4803, -0.082_676, 0.003_030_2];

    let n = sorted.len();
    let an = n as f64;
    let half = n / 2;

    let coefficients: Vec<f64> = if n == 3 {
        vec![0.5_f64.sqrt()]
    } else {
        let m: Vec<f64> = (1..=half)
            .map(|i| normal_ppf((i as f64 - 0.375) / (an + 0.25)))
            .collect();
        let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / an.sqrt();
        let a1 = poly(&C1, rsn) - m[0] / ssumm2;

        let mut a = vec![0.0; half];
        a[0] = a1;
        let (first, fac) = if n > 5 {
            let a2 = -m[1] / ssumm2 + poly(&C2, rsn);
            a[1] = a2;
            let fac = ((summ2 - 2.0 * m[0].powi(2) - 2.0 * m[1].powi(2))
                / (1.0 - 2.0 * a1.powi(2) - 2.0 * a2.powi(2)))
            .sqrt();
            (2, fac)
        } else {
            let fac = ((summ2 - 2.0 * m[0].powi(2)) / (1.0 - 2.0 * a1.powi(2))).sqrt();
            (1, fac)
        };
        for (ai, mi) in a.iter_mut().zip(&m).skip(first) {
            *ai = -mi / fac;
        }
        a
    };

    let mean = sorted.iter().sum::<f64>() / an;
    let ss: f64 = sorted.iter().map(|x| (x - mean).powi(2)).sum();
    let numerator: f64 = coefficients
        .iter()
        .enumerate()
        .map(|(i, a)| a * (sorted[n - 1 - i] - sorted[i]))
        .sum();
    let w = (numerator * numerator / ss).min(1.0);

    if n == 3 {
        let p = (6.0 / PI) * (w.sqrt().asin() - FRAC_PI_3);
        return (w, p.clamp(0.0, 1.0));
    }

    let mut y = (1.0 - w).ln();
    let (mean, sigma) = if n <= 11 {
        let gamma = poly(&GAMMA, an);
        if y >= gamma {
            return (w, 0.0);
        }
        y = -(gamma - y).ln();
        (poly(&SMALL_MEAN, an), poly(&SMALL_SIGMA, an).exp())
    } else {
        let ln_n = an.ln();
        (poly(&LARGE_MEAN, ln_n), poly(&LARGE_SIGMA, ln_n).exp())
    };
    let p = 1.0 - normal_cdf((y - mean) / sigma);
    (w, p.clamp(0.0, 1.0))
}

/// Anderson–Darling `A²` statistic and the 5% critical value for `sorted`.
///
/// Callers must ensure n ≥ 2 and non-zero variance.
pub(crate) fn anderson_darling(sorted: &[f64]) -> (f64, f64) {
    let n = sorted.len();
    let an = n as f64;
    let mean = sorted.iter().sum::<f64>() / an;
    let std = (sorted.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (an - 1.0)).sqrt();

    let cdf: Vec<f64> = sorted
        .iter()
        .map(|x| normal_cdf((x - mean) / std).clamp(f64::MIN_POSITIVE, 1.0 - f64::EPSILON))
        .collect();
    let sum: f64 = (0..n)
        .map(|i| {
            let weight = 2.0 * (i as f64) + 1.0;
            weight * (cdf[i].ln() + (1.0 - cdf[n - 1 - i]).ln())
        })
        .sum();
    let statistic = -an - sum / an;
    let critical = 0.787 / (1.0 + 4.0 / an - 25.0 / (an * an));
    (statistic, critical)
}
