//! Statistical helpers shared by the analytic operations.
//!
//! Small, allocation-light routines: moments, Pearson correlation, fractional
//! change, trailing means, and a least-squares solver over normal equations.
//! Everything here is pure and panic-free; degenerate inputs degrade to a
//! neutral value or a [`StatsError`].

use thiserror::Error;

/// Errors from the numeric routines.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StatsError {
    #[error("empty input")]
    Empty,
    #[error("linear system is singular")]
    Singular,
    #[error("dimension mismatch between features and targets")]
    DimensionMismatch,
}

/// Arithmetic mean; 0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (ddof = 1); 0 for fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64
}

/// Sample standard deviation; 0 for fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

/// Pearson correlation coefficient.
///
/// Formula: r = Σ[(xi - x̄)(yi - ȳ)] / sqrt(Σ(xi - x̄)² × Σ(yi - ȳ)²)
/// Returns 0 when either series is constant or the lengths differ.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    if x.len() != y.len() || x.is_empty() {
        return 0.0;
    }
    let n = x.len() as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y.iter()).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|a| a * a).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x.powi(2)) * (n * sum_y2 - sum_y.powi(2))).sqrt();

    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

/// Mean fractional change between consecutive values.
///
/// Pairs whose predecessor is 0 are skipped — a 0 → x step has no defined
/// relative change and would poison the mean with infinities. Returns 0 when
/// no valid pair exists.
pub fn mean_fractional_change(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for pair in values.windows(2) {
        if pair[0] != 0.0 {
            sum += (pair[1] - pair[0]) / pair[0];
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Trailing moving average over `window` samples, with the leading partial
/// region back-filled from the first full window (the shape a rolling mean
/// plus forward/backward fill produces).
pub fn trailing_mean_filled(values: &[f64], window: usize) -> Vec<f64> {
    if values.is_empty() || window == 0 {
        return Vec::new();
    }
    if values.len() < window {
        return vec![mean(values); values.len()];
    }
    let mut out = vec![0.0; values.len()];
    for i in (window - 1)..values.len() {
        out[i] = mean(&values[i + 1 - window..=i]);
    }
    let first_full = out[window - 1];
    for slot in out.iter_mut().take(window - 1) {
        *slot = first_full;
    }
    out
}

/// Ordinary least squares over the normal equations.
///
/// `rows` is the feature matrix (one slice per observation), `y` the targets.
/// Returns `k + 1` coefficients with the intercept first. A tiny ridge term on
/// the diagonal keeps the system solvable when a feature column is constant
/// (calendar features frequently are within a short batch).
pub fn least_squares(rows: &[Vec<f64>], y: &[f64]) -> Result<Vec<f64>, StatsError> {
    if rows.is_empty() || y.is_empty() {
        return Err(StatsError::Empty);
    }
    if rows.len() != y.len() {
        return Err(StatsError::DimensionMismatch);
    }
    let k = rows[0].len();
    if rows.iter().any(|r| r.len() != k) {
        return Err(StatsError::DimensionMismatch);
    }

    let dim = k + 1;
    let mut ata = vec![vec![0.0; dim]; dim];
    let mut aty = vec![0.0; dim];

    for (row, &target) in rows.iter().zip(y.iter()) {
        // Augmented row: [1, x1, .., xk]
        let mut aug = Vec::with_capacity(dim);
        aug.push(1.0);
        aug.extend_from_slice(row);

        for i in 0..dim {
            for j in 0..dim {
                ata[i][j] += aug[i] * aug[j];
            }
            aty[i] += aug[i] * target;
        }
    }

    let ridge = 1e-8 * (1.0 + ata.iter().enumerate().map(|(i, r)| r[i].abs()).fold(0.0, f64::max));
    for (i, row) in ata.iter_mut().enumerate() {
        row[i] += ridge;
    }

    solve(&mut ata, &mut aty)
}

/// Evaluate a fitted model (intercept-first coefficients) on one feature row.
pub fn predict(coefficients: &[f64], features: &[f64]) -> f64 {
    let mut value = coefficients[0];
    for (c, x) in coefficients[1..].iter().zip(features.iter()) {
        value += c * x;
    }
    value
}

/// Gaussian elimination with partial pivoting. Consumes its inputs.
fn solve(a: &mut [Vec<f64>], b: &mut [f64]) -> Result<Vec<f64>, StatsError> {
    let n = b.len();

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&p, &q| {
                a[p][col]
                    .abs()
                    .partial_cmp(&a[q][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .ok_or(StatsError::Singular)?;
        if a[pivot_row][col].abs() < 1e-12 {
            return Err(StatsError::Singular);
        }
        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let mut acc = b[row];
        for col in (row + 1)..n {
            acc -= a[row][col] * x[col];
        }
        x[row] = acc / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_empty_is_zero() {
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[2.0, 4.0]), 3.0);
    }

    #[test]
    fn std_dev_of_singleton_is_zero() {
        assert_eq!(std_dev(&[7.0]), 0.0);
        assert!((std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]) - 2.138_089_9).abs() < 1e-6);
    }

    #[test]
    fn pearson_of_perfect_line_is_one() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [2.0, 4.0, 6.0, 8.0];
        assert!((pearson(&x, &y) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn pearson_of_constant_series_is_zero() {
        let x = [5.0, 5.0, 5.0];
        let y = [1.0, 2.0, 3.0];
        assert_eq!(pearson(&x, &y), 0.0);
    }

    #[test]
    fn fractional_change_skips_zero_denominators() {
        // 0 -> 10 is skipped; 10 -> 15 contributes 0.5.
        assert!((mean_fractional_change(&[0.0, 10.0, 15.0]) - 0.5).abs() < 1e-12);
        assert_eq!(mean_fractional_change(&[0.0, 0.0]), 0.0);
    }

    #[test]
    fn trailing_mean_backfills_leading_window() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        let out = trailing_mean_filled(&values, 3);
        // First full window mean is (1+2+3)/3 = 2, back-filled to the front.
        assert_eq!(out, vec![2.0, 2.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn least_squares_recovers_linear_model() {
        // y = 3 + 2a - b
        let rows: Vec<Vec<f64>> = vec![
            vec![1.0, 0.0],
            vec![2.0, 1.0],
            vec![3.0, 5.0],
            vec![4.0, 2.0],
            vec![0.0, 4.0],
        ];
        let y: Vec<f64> = rows.iter().map(|r| 3.0 + 2.0 * r[0] - r[1]).collect();
        let beta = least_squares(&rows, &y).unwrap();
        assert!((beta[0] - 3.0).abs() < 1e-4);
        assert!((beta[1] - 2.0).abs() < 1e-4);
        assert!((beta[2] + 1.0).abs() < 1e-4);
        assert!((predict(&beta, &[5.0, 5.0]) - 8.0).abs() < 1e-3);
    }

    #[test]
    fn least_squares_tolerates_constant_column() {
        // Second feature is constant — collinear with the intercept.
        let rows: Vec<Vec<f64>> = vec![
            vec![1.0, 7.0],
            vec![2.0, 7.0],
            vec![3.0, 7.0],
            vec![4.0, 7.0],
        ];
        let y = vec![2.0, 4.0, 6.0, 8.0];
        let beta = least_squares(&rows, &y).unwrap();
        assert!((predict(&beta, &[5.0, 7.0]) - 10.0).abs() < 1e-3);
    }
}
