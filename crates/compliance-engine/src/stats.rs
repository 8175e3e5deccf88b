//! Finding statistics and compliance scoring

use crate::error::{EngineError, Result};
use serde::{Deserialize, Serialize};
use shared_types::{Finding, Severity};

/// Tally of findings by outcome. `passed` includes informative findings,
/// so the three counts always partition `checks_performed`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStatistics {
    pub checks_performed: usize,
    pub passed: usize,
    pub warnings: usize,
    pub critical: usize,
}

impl AnalysisStatistics {
    pub fn from_findings(findings: &[Finding]) -> Self {
        findings.iter().fold(Self::default(), |mut stats, finding| {
            stats.checks_performed += 1;
            match finding.severity {
                Severity::Pass | Severity::Informative => stats.passed += 1,
                Severity::Warning => stats.warnings += 1,
                Severity::Critical => stats.critical += 1,
            }
            stats
        })
    }

    /// Sum of two tallies
    pub fn merge(self, other: Self) -> Self {
        Self {
            checks_performed: self.checks_performed + other.checks_performed,
            passed: self.passed + other.passed,
            warnings: self.warnings + other.warnings,
            critical: self.critical + other.critical,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.passed + self.warnings + self.critical == self.checks_performed
    }
}

/// Weights turning statistics into a 0-100 score
///
/// `score = clamp(100 x (passed + warning_credit x warnings) / checks
///          - critical_penalty x critical - warning_penalty x warnings, 0, 100)`
///
/// The penalties are absolute points per finding, not proportions. For a
/// fixed number of checks the score falls as the share of critical findings
/// rises. Across specialties with different check counts, the same share
/// scores differently: with the defaults, 2 critical out of 10 scores 70
/// while 19 out of 100 scores 0. A large rule set is therefore judged more
/// harshly per failing article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Fraction of a pass credited for a warning
    pub warning_credit: f64,
    /// Points removed per critical finding
    pub critical_penalty: f64,
    /// Points removed per warning
    pub warning_penalty: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            warning_credit: 0.5,
            critical_penalty: 5.0,
            warning_penalty: 1.0,
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<()> {
        let ok = (0.0..1.0).contains(&self.warning_credit)
            && self.warning_penalty >= 0.0
            && self.critical_penalty > self.warning_penalty
            && self.critical_penalty.is_finite();
        if ok {
            Ok(())
        } else {
            Err(EngineError::InvalidConfig(format!(
                "scoring: need 0 <= warning_credit < 1 and critical_penalty > warning_penalty >= 0, got {:?}",
                self
            )))
        }
    }

    /// Score of one specialty; 100 when nothing was checked
    pub fn score(&self, stats: &AnalysisStatistics) -> f64 {
        if stats.checks_performed == 0 {
            return 100.0;
        }
        let checks = stats.checks_performed as f64;
        let credited = stats.passed as f64 + self.warning_credit * stats.warnings as f64;
        let raw = 100.0 * credited / checks
            - self.critical_penalty * stats.critical as f64
            - self.warning_penalty * stats.warnings as f64;
        round1(raw.clamp(0.0, 100.0))
    }
}

/// Combine specialty scores into one, weighting each by its number of checks.
/// Specialties without checks carry no weight; 100 when none has any.
pub fn aggregate_scores<I>(scores: I) -> f64
where
    I: IntoIterator<Item = (f64, usize)>,
{
    let (weighted, weight) = scores
        .into_iter()
        .filter(|(_, checks)| *checks > 0)
        .fold((0.0, 0.0), |(sum, total), (score, checks)| {
            (sum + score * checks as f64, total + checks as f64)
        });
    if weight == 0.0 {
        100.0
    } else {
        round1((weighted / weight).clamp(0.0, 100.0))
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}
