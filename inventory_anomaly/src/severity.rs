//! Severity classification of anomaly scores
//!
//! Alerts, reports and dashboards all classify through [`classify_severity`].

use crate::error::{AnomalyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level derived from an anomaly score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lower bounds (inclusive) of the critical and high levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SeverityThresholds {
    pub critical: f64,
    pub high: f64,
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self {
            critical: 0.7,
            high: 0.6,
        }
    }
}

impl SeverityThresholds {
    pub fn new(critical: f64, high: f64) -> Result<Self> {
        let thresholds = Self { critical, high };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Reject non-finite or inverted thresholds
    pub fn validate(&self) -> Result<()> {
        if !self.critical.is_finite() || !self.high.is_finite() || self.high > self.critical {
            return Err(AnomalyError::InvalidParameter(format!(
                "Severity thresholds must satisfy high <= critical, got high={} critical={}",
                self.high, self.critical
            )));
        }
        Ok(())
    }
}

/// Classify a score: critical at or above `critical`, high at or above `high`, medium otherwise
pub fn classify_severity(score: f64, thresholds: &SeverityThresholds) -> Severity {
    if score >= thresholds.critical {
        Severity::Critical
    } else if score >= thresholds.high {
        Severity::High
    } else {
        Severity::Medium
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.95, Severity::Critical)]
    #[case(0.7, Severity::Critical)]
    #[case(0.6999, Severity::High)]
    #[case(0.6, Severity::High)]
    #[case(0.5999, Severity::Medium)]
    #[case(0.0, Severity::Medium)]
    #[case(f64::NAN, Severity::Medium)]
    fn test_default_boundaries(#[case] score: f64, #[case] expected: Severity) {
        assert_eq!(classify_severity(score, &SeverityThresholds::default()), expected);
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        assert!(SeverityThresholds::new(0.5, 0.6).is_err());
        assert!(SeverityThresholds::new(0.8, 0.8).is_ok());
    }

    #[test]
    fn test_ordering_and_names() {
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
    }
}
