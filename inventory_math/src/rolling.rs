//! Trailing window statistics
//!
//! A [`RollingWindow`] keeps the last `period` observations (missing values
//! included) and evaluates a [`RollingStat`] over the non-missing ones.
//! [`rolling_apply`] runs a window over a whole series.

use crate::stats;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

/// Statistic evaluated over a trailing window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RollingStat {
    Mean,
    Std,
    Min,
    Max,
    Sum,
}

impl RollingStat {
    /// Short name used in derived column names
    pub fn name(&self) -> &'static str {
        match self {
            RollingStat::Mean => "mean",
            RollingStat::Std => "std",
            RollingStat::Min => "min",
            RollingStat::Max => "max",
            RollingStat::Sum => "sum",
        }
    }

    /// Evaluate the statistic over a slice, skipping missing values
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        match self {
            RollingStat::Mean => stats::mean(values),
            RollingStat::Std => stats::sample_std(values),
            RollingStat::Min => stats::min(values),
            RollingStat::Max => stats::max(values),
            RollingStat::Sum => stats::sum(values),
        }
    }
}

impl fmt::Display for RollingStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for RollingStat {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(RollingStat::Mean),
            "std" => Ok(RollingStat::Std),
            "min" => Ok(RollingStat::Min),
            "max" => Ok(RollingStat::Max),
            "sum" => Ok(RollingStat::Sum),
            other => Err(MathError::InvalidInput(format!(
                "Unknown rolling statistic: {}",
                other
            ))),
        }
    }
}

/// Fixed-length trailing window
#[derive(Debug, Clone)]
pub struct RollingWindow {
    period: usize,
    min_periods: usize,
    values: VecDeque<f64>,
}

impl RollingWindow {
    /// Create a window of `period` observations that needs at least
    /// `min_periods` non-missing values to produce a result
    pub fn new(period: usize, min_periods: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Window must be greater than zero".to_string(),
            ));
        }
        if min_periods == 0 || min_periods > period {
            return Err(MathError::InvalidInput(format!(
                "min_periods must be between 1 and {}, got {}",
                period, min_periods
            )));
        }

        Ok(Self {
            period,
            min_periods,
            values: VecDeque::with_capacity(period),
        })
    }

    /// Push an observation, evicting the oldest one when the window is full
    pub fn update(&mut self, value: f64) {
        self.values.push_back(value);
        if self.values.len() > self.period {
            self.values.pop_front();
        }
    }

    /// Evaluate `stat` over the current window
    ///
    /// Returns `NaN` while fewer than `min_periods` non-missing values are held.
    pub fn value(&self, stat: RollingStat) -> f64 {
        let (front, back) = self.values.as_slices();
        let valid = stats::count(front) + stats::count(back);
        if valid < self.min_periods {
            return f64::NAN;
        }
        if back.is_empty() {
            stat.evaluate(front)
        } else {
            let contiguous: Vec<f64> = self.values.iter().copied().collect();
            stat.evaluate(&contiguous)
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn reset(&mut self) {
        self.values.clear();
    }
}

/// Apply a trailing window statistic to every position of a series
///
/// Position `i` covers `values[i + 1 - window ..= i]` (clamped at the start).
pub fn rolling_apply(
    values: &[f64],
    window: usize,
    stat: RollingStat,
    min_periods: usize,
) -> Result<Vec<f64>> {
    let mut rolling = RollingWindow::new(window, min_periods)?;
    let mut out = Vec::with_capacity(values.len());
    for &value in values {
        rolling.update(value);
        out.push(rolling.value(stat));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rolling_mean_partial_windows() {
        let out = rolling_apply(&[1.0, 2.0, 3.0, 4.0], 3, RollingStat::Mean, 1).unwrap();
        assert_relative_eq!(out[0], 1.0);
        assert_relative_eq!(out[1], 1.5);
        assert_relative_eq!(out[2], 2.0);
        assert_relative_eq!(out[3], 3.0);
    }

    #[test]
    fn test_rolling_std_single_value_is_missing() {
        let out = rolling_apply(&[4.0, 6.0], 7, RollingStat::Std, 1).unwrap();
        assert!(out[0].is_nan());
        assert_relative_eq!(out[1], 2.0f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_rolling_skips_missing() {
        let out = rolling_apply(&[5.0, f64::NAN, 1.0], 2, RollingStat::Max, 1).unwrap();
        assert_relative_eq!(out[0], 5.0);
        assert_relative_eq!(out[1], 5.0);
        assert_relative_eq!(out[2], 1.0);

        let out = rolling_apply(&[f64::NAN, f64::NAN], 2, RollingStat::Sum, 1).unwrap();
        assert!(out.iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_window_eviction() {
        let mut window = RollingWindow::new(2, 2).unwrap();
        window.update(1.0);
        assert!(window.value(RollingStat::Sum).is_nan());
        window.update(2.0);
        window.update(10.0);
        assert_eq!(window.len(), 2);
        assert_relative_eq!(window.value(RollingStat::Sum), 12.0);
        assert_relative_eq!(window.value(RollingStat::Min), 2.0);
    }

    #[test]
    fn test_invalid_window() {
        assert!(RollingWindow::new(0, 1).is_err());
        assert!(RollingWindow::new(3, 4).is_err());
        assert!("median".parse::<RollingStat>().is_err());
        assert_eq!("std".parse::<RollingStat>().unwrap(), RollingStat::Std);
    }
}
