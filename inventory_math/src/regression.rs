//! Least squares fitting
//!
//! [`LinearRegression`] fits a single-predictor line; [`solve_least_squares`]
//! solves the ridge-stabilised normal equations for an arbitrary design matrix.

use crate::{MathError, Result};

/// Ordinary least squares line `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearRegression {
    slope: f64,
    intercept: f64,
    r_squared: f64,
}

impl LinearRegression {
    /// Fit a line through paired observations, skipping pairs with a missing value
    pub fn fit(xs: &[f64], ys: &[f64]) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(MathError::InvalidInput(format!(
                "x and y must have the same length ({} vs {})",
                xs.len(),
                ys.len()
            )));
        }

        let pairs: Vec<(f64, f64)> = xs
            .iter()
            .zip(ys)
            .filter(|(x, y)| !x.is_nan() && !y.is_nan())
            .map(|(&x, &y)| (x, y))
            .collect();

        if pairs.len() < 2 {
            return Err(MathError::InsufficientData(
                "Need at least 2 points for linear regression".to_string(),
            ));
        }

        let n = pairs.len() as f64;
        let x_mean = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
        let y_mean = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut denominator = 0.0;
        for (x, y) in &pairs {
            numerator += (x - x_mean) * (y - y_mean);
            denominator += (x - x_mean) * (x - x_mean);
        }

        if denominator.abs() < 1e-10 {
            return Err(MathError::CalculationError(
                "Cannot calculate slope: x values are too similar".to_string(),
            ));
        }

        let slope = numerator / denominator;
        let intercept = y_mean - slope * x_mean;

        let ss_total: f64 = pairs.iter().map(|(_, y)| (y - y_mean).powi(2)).sum();
        let ss_residual: f64 = pairs
            .iter()
            .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
            .sum();
        let r_squared = if ss_total.abs() < 1e-10 {
            1.0
        } else {
            1.0 - ss_residual / ss_total
        };

        Ok(Self {
            slope,
            intercept,
            r_squared,
        })
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Coefficient of determination of the fit
    pub fn r_squared(&self) -> f64 {
        self.r_squared
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Solve `(XᵀX + ridge·I) β = Xᵀy` for β
///
/// `design` holds one row per observation. Rows whose target is missing are
/// ignored. The ridge term keeps nearly collinear designs solvable.
pub fn solve_least_squares(design: &[Vec<f64>], y: &[f64], ridge: f64) -> Result<Vec<f64>> {
    if design.len() != y.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            design.len(),
            y.len()
        )));
    }
    if ridge < 0.0 {
        return Err(MathError::InvalidInput(
            "Ridge penalty must be non-negative".to_string(),
        ));
    }

    let p = match design.first() {
        Some(row) if !row.is_empty() => row.len(),
        _ => {
            return Err(MathError::InsufficientData(
                "Design matrix is empty".to_string(),
            ))
        }
    };

    // Normal equations as an augmented p x (p + 1) matrix
    let mut system = vec![vec![0.0; p + 1]; p];
    let mut used = 0usize;
    for (row, &target) in design.iter().zip(y) {
        if target.is_nan() {
            continue;
        }
        if row.len() != p {
            return Err(MathError::InvalidInput(format!(
                "Design rows must all have {} columns",
                p
            )));
        }
        used += 1;
        for i in 0..p {
            for j in 0..p {
                system[i][j] += row[i] * row[j];
            }
            system[i][p] += row[i] * target;
        }
    }

    if used == 0 {
        return Err(MathError::InsufficientData(
            "No observations with a target value".to_string(),
        ));
    }

    for (i, equation) in system.iter_mut().enumerate() {
        equation[i] += ridge;
    }

    gaussian_elimination(system)
}

fn gaussian_elimination(mut system: Vec<Vec<f64>>) -> Result<Vec<f64>> {
    let p = system.len();

    for col in 0..p {
        let pivot = (col..p)
            .max_by(|&a, &b| system[a][col].abs().total_cmp(&system[b][col].abs()))
            .unwrap_or(col);
        if system[pivot][col].abs() < 1e-12 {
            return Err(MathError::CalculationError(
                "Normal equations are singular".to_string(),
            ));
        }
        system.swap(col, pivot);

        for row in (col + 1)..p {
            let factor = system[row][col] / system[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=p {
                system[row][k] -= factor * system[col][k];
            }
        }
    }

    let mut beta = vec![0.0; p];
    for row in (0..p).rev() {
        let tail: f64 = ((row + 1)..p).map(|k| system[row][k] * beta[k]).sum();
        beta[row] = (system[row][p] - tail) / system[row][row];
    }

    Ok(beta)
}
