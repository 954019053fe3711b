//! Reliability scoring and SLA compliance.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::anomaly::round2;

/// Weight of the error-rate component.
pub const ERROR_WEIGHT: f64 = 0.4;
/// Weight of the uptime component.
pub const UPTIME_WEIGHT: f64 = 0.4;
/// Weight of the response-time component.
pub const RESPONSE_WEIGHT: f64 = 0.2;
/// Hours in the default 30-day SLA period.
pub const DEFAULT_SLA_PERIOD_HOURS: f64 = 730.0;

/// Letter grade for a reliability score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum Grade {
    /// 95 and above.
    A,
    /// 90 to 95.
    B,
    /// 80 to 90.
    C,
    /// 70 to 80.
    D,
    /// Below 70.
    F,
}

impl Grade {
    /// Grades a 0-100 score.
    #[must_use]
    pub fn from_score(score: f64) -> Self {
        if score >= 95.0 {
            Self::A
        } else if score >= 90.0 {
            Self::B
        } else if score >= 80.0 {
            Self::C
        } else if score >= 70.0 {
            Self::D
        } else {
            Self::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        };
        write!(f, "{letter}")
    }
}

/// Per-component contributions before weighting, each on a 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    /// `max(0, 100 - error_rate_percent)`.
    pub error_rate: f64,
    /// Uptime percentage as given.
    pub uptime: f64,
    /// `min(100, target / actual * 100)`.
    pub response_time: f64,
}

/// Weighted reliability score with its grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityScore {
    /// Weighted score, rounded to two decimals.
    pub score: f64,
    /// Letter grade.
    pub grade: Grade,
    /// Components, rounded to two decimals.
    pub components: ScoreComponents,
}

/// Outcome of an SLA uptime comparison.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SlaCompliance {
    /// Target uptime percentage.
    pub target_uptime_percent: f64,
    /// Achieved uptime percentage, rounded to two decimals.
    pub achieved_uptime_percent: f64,
    /// Whether achieved meets or exceeds target.
    pub compliant: bool,
    /// `achieved - target`, rounded to two decimals.
    pub variance_percent: f64,
}

/// Computes reliability scores and SLA compliance.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReliabilityScorer;

impl ReliabilityScorer {
    /// Creates a new scorer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Scores error rate, uptime, and latency against a latency target.
    ///
    /// A zero (or negative) response time scores the full response component:
    /// no latency cannot be slow.
    #[must_use]
    pub fn score(
        &self,
        error_rate_percent: f64,
        uptime_percent: f64,
        response_time_ms: f64,
        response_time_target_ms: f64,
    ) -> ReliabilityScore {
        let error_rate = (100.0 - error_rate_percent).max(0.0);
        let uptime = uptime_percent;
        let response_time = if response_time_ms <= 0.0 {
            100.0
        } else {
            (response_time_target_ms / response_time_ms * 100.0).min(100.0)
        };

        let raw = error_rate * ERROR_WEIGHT + uptime * UPTIME_WEIGHT + response_time * RESPONSE_WEIGHT;

        // Grade the unrounded score.
        ReliabilityScore {
            score: round2(raw),
            grade: Grade::from_score(raw),
            components: ScoreComponents {
                error_rate: round2(error_rate),
                uptime: round2(uptime),
                response_time: round2(response_time),
            },
        }
    }

    /// Compares achieved uptime with a target.
    #[must_use]
    pub fn sla_compliance(&self, achieved_uptime_percent: f64, target_uptime_percent: f64) -> SlaCompliance {
        SlaCompliance {
            target_uptime_percent,
            achieved_uptime_percent: round2(achieved_uptime_percent),
            compliant: achieved_uptime_percent >= target_uptime_percent,
            variance_percent: round2(achieved_uptime_percent - target_uptime_percent),
        }
    }

    /// Derives achieved uptime from hours up within a period, then compares it.
    ///
    /// A non-positive period counts as zero uptime.
    #[must_use]
    pub fn sla_compliance_from_hours(
        &self,
        uptime_hours: f64,
        period_hours: f64,
        target_uptime_percent: f64,
    ) -> SlaCompliance {
        let achieved = if period_hours > 0.0 {
            uptime_hours / period_hours * 100.0
        } else {
            0.0
        };
        self.sla_compliance(achieved, target_uptime_percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn good_performance_grades_high() {
        let result = ReliabilityScorer::new().score(0.5, 99.7, 300.0, 1000.0);
        assert!((result.score - 99.68).abs() < 1e-9);
        assert!(matches!(result.grade, Grade::A | Grade::B));
        assert!((result.components.error_rate - 99.5).abs() < 1e-9);
        assert!((result.components.response_time - 100.0).abs() < 1e-9);
    }

    #[test]
    fn poor_performance_scores_below_85() {
        let result = ReliabilityScorer::new().score(8.0, 95.0, 2000.0, 1000.0);
        assert!(result.score < 85.0);
        assert!((result.score - 84.8).abs() < 1e-9);
        assert_eq!(result.grade, Grade::C);
        assert!((result.components.response_time - 50.0).abs() < 1e-9);
    }

    #[test]
    fn error_component_floors_at_zero() {
        let result = ReliabilityScorer::new().score(150.0, 0.0, 1000.0, 1000.0);
        assert!(result.components.error_rate.abs() < f64::EPSILON);
        assert!((result.score - 20.0).abs() < 1e-9);
        assert_eq!(result.grade, Grade::F);
    }

    #[test]
    fn grade_uses_unrounded_score() {
        // 40 + 0.4 * 87.49 + 20 = 94.996
        let result = ReliabilityScorer::new().score(0.0, 87.49, 0.0, 1000.0);
        assert!((result.score - 95.0).abs() < 1e-9);
        assert_eq!(result.grade, Grade::B);
    }

    #[test]
    fn zero_latency_is_best_case() {
        let result = ReliabilityScorer::new().score(0.0, 100.0, 0.0, 1000.0);
        assert!((result.components.response_time - 100.0).abs() < f64::EPSILON);
        assert!((result.score - 100.0).abs() < f64::EPSILON);
    }

    #[test_case(100.0, Grade::A ; "perfect")]
    #[test_case(95.0, Grade::A ; "a edge")]
    #[test_case(94.99, Grade::B ; "just under a")]
    #[test_case(90.0, Grade::B ; "b edge")]
    #[test_case(80.0, Grade::C ; "c edge")]
    #[test_case(70.0, Grade::D ; "d edge")]
    #[test_case(69.99, Grade::F ; "failing")]
    fn grade_thresholds(score: f64, expected: Grade) {
        assert_eq!(Grade::from_score(score), expected);
    }

    #[test]
    fn sla_compliance_compares_uptime() {
        let scorer = ReliabilityScorer::new();
        let met = scorer.sla_compliance(99.8, 99.7);
        assert!(met.compliant);
        assert!((met.variance_percent - 0.1).abs() < 1e-9);

        let missed = scorer.sla_compliance(99.64, 99.7);
        assert!(!missed.compliant);
        assert!((missed.variance_percent + 0.06).abs() < 1e-9);

        assert!(scorer.sla_compliance(99.7, 99.7).compliant);
    }

    #[test]
    fn sla_compliance_from_hours() {
        let scorer = ReliabilityScorer::new();
        assert!(scorer.sla_compliance_from_hours(728.0, DEFAULT_SLA_PERIOD_HOURS, 99.7).compliant);
        assert!(!scorer.sla_compliance_from_hours(700.0, DEFAULT_SLA_PERIOD_HOURS, 99.7).compliant);
        assert!(!scorer.sla_compliance_from_hours(10.0, 0.0, 99.7).compliant);
    }

    #[test]
    fn grade_display() {
        assert_eq!(Grade::A.to_string(), "A");
        assert_eq!(serde_json::to_string(&Grade::F).unwrap_or_default(), "\"F\"");
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn score_stays_in_range(
                error in 0.0f64..200.0,
                uptime in 0.0f64..=100.0,
                latency in 0.0f64..10_000.0,
                target in 1.0f64..5000.0,
            ) {
                let result = ReliabilityScorer::new().score(error, uptime, latency, target);
                prop_assert!((0.0..=100.0).contains(&result.score));
                prop_assert_eq!(result.grade, Grade::from_score(result.score));
            }

            #[test]
            fn more_errors_never_score_higher(a in 0.0f64..100.0, b in 0.0f64..100.0) {
                let scorer = ReliabilityScorer::new();
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(
                    scorer.score(high, 99.0, 500.0, 1000.0).score
                        <= scorer.score(low, 99.0, 500.0, 1000.0).score
                );
            }
        }
    }
}
