//! Analysis results and report rendering

use crate::cascade::ComputedValues;
use crate::enrichment::EnrichmentPatch;
use crate::readiness::SectionCompletion;
use crate::specialty::Specialty;
use crate::stats::{aggregate_scores, AnalysisStatistics};
use serde::{Deserialize, Serialize};
use shared_types::{Finding, Severity};
use std::slice;

/// Result of analyzing one specialty
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub specialty: Specialty,
    pub findings: Vec<Finding>,
    pub computed: ComputedValues,
    pub statistics: AnalysisStatistics,
    /// 0..=100
    pub overall_score: f64,
}

impl AnalysisResult {
    /// Findings that count against compliance
    pub fn failures(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.is_failure())
    }

    pub fn status(&self) -> ComplianceStatus {
        ComplianceStatus::from_statistics(&self.statistics)
    }

    /// Patch writing this result's computed values back onto the project
    pub fn enrichment(&self) -> EnrichmentPatch {
        EnrichmentPatch::from_computed(self.specialty, &self.computed)
    }
}

/// Outcome of `analyze_specialty`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SpecialtyAnalysis {
    Analyzed(AnalysisResult),
    /// The readiness gate refused the project; nothing was computed
    InsufficientData {
        specialty: Specialty,
        completion: SectionCompletion,
    },
}

/// Per-specialty entry of a project analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SpecialtyOutcome {
    Analyzed(AnalysisResult),
    InsufficientData {
        specialty: Specialty,
        completion: SectionCompletion,
    },
    /// The analysis failed; `diagnostic` records why
    Failed {
        specialty: Specialty,
        reason: String,
        diagnostic: Finding,
    },
}

impl SpecialtyOutcome {
    pub fn failed(specialty: Specialty, reason: String) -> Self {
        let diagnostic = Finding {
            id: format!("{}.analysis", specialty.id()),
            rule_id: "analysis".to_string(),
            specialty: specialty.id().to_string(),
            article: String::new(),
            regulation: String::new(),
            severity: Severity::Informative,
            description: format!("{} could not be analyzed: {}", specialty.name(), reason),
            actual: None,
            required: None,
        };
        SpecialtyOutcome::Failed {
            specialty,
            reason,
            diagnostic,
        }
    }

    pub fn specialty(&self) -> Specialty {
        match self {
            SpecialtyOutcome::Analyzed(result) => result.specialty,
            SpecialtyOutcome::InsufficientData { specialty, .. }
            | SpecialtyOutcome::Failed { specialty, .. } => *specialty,
        }
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        match self {
            SpecialtyOutcome::Analyzed(result) => Some(result),
            _ => None,
        }
    }

    /// Findings contributed to the project, including a failure diagnostic
    pub fn findings(&self) -> &[Finding] {
        match self {
            SpecialtyOutcome::Analyzed(result) => &result.findings,
            SpecialtyOutcome::InsufficientData { .. } => &[],
            SpecialtyOutcome::Failed { diagnostic, .. } => slice::from_ref(diagnostic),
        }
    }
}

impl From<SpecialtyAnalysis> for SpecialtyOutcome {
    fn from(analysis: SpecialtyAnalysis) -> Self {
        match analysis {
            SpecialtyAnalysis::Analyzed(result) => SpecialtyOutcome::Analyzed(result),
            SpecialtyAnalysis::InsufficientData {
                specialty,
                completion,
            } => SpecialtyOutcome::InsufficientData {
                specialty,
                completion,
            },
        }
    }
}

/// Overall verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// Every check passed
    Compliant,
    /// Warnings but no critical findings
    CompliantWithWarnings,
    /// One or more critical findings
    NonCompliant,
    /// No critical finding, but a specialty that passed the readiness gate
    /// could not be analyzed
    Incomplete,
    /// No specialty had enough data to be analyzed
    NotAnalyzed,
}

impl ComplianceStatus {
    pub fn from_statistics(stats: &AnalysisStatistics) -> Self {
        if stats.critical > 0 {
            ComplianceStatus::NonCompliant
        } else if stats.warnings > 0 {
            ComplianceStatus::CompliantWithWarnings
        } else {
            ComplianceStatus::Compliant
        }
    }

    /// Verdict over several specialties. Critical findings decide first;
    /// otherwise a failed or empty analysis is never reported as compliant.
    pub fn for_project(stats: &AnalysisStatistics, specialties: &[SpecialtyOutcome]) -> Self {
        if stats.critical > 0 {
            ComplianceStatus::NonCompliant
        } else if specialties
            .iter()
            .any(|o| matches!(o, SpecialtyOutcome::Failed { .. }))
        {
            ComplianceStatus::Incomplete
        } else if specialties.iter().all(|o| o.result().is_none()) {
            ComplianceStatus::NotAnalyzed
        } else {
            Self::from_statistics(stats)
        }
    }

    /// Whether the verdict allows the project to go ahead
    pub fn is_compliant(&self) -> bool {
        matches!(
            self,
            ComplianceStatus::Compliant | ComplianceStatus::CompliantWithWarnings
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            ComplianceStatus::Compliant => "Compliant",
            ComplianceStatus::CompliantWithWarnings => "Compliant with warnings",
            ComplianceStatus::NonCompliant => "Non-compliant",
            ComplianceStatus::Incomplete => "Incomplete",
            ComplianceStatus::NotAnalyzed => "Not analyzed",
        }
    }
}

/// Result of analyzing every specialty of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectAnalysis {
    pub specialties: Vec<SpecialtyOutcome>,
    /// Tally over every finding, failure diagnostics included
    pub statistics: AnalysisStatistics,
    /// Checks-weighted mean of the analyzed specialties' scores
    pub overall_score: f64,
    pub status: ComplianceStatus,
}

impl ProjectAnalysis {
    pub fn from_outcomes(specialties: Vec<SpecialtyOutcome>) -> Self {
        let statistics = specialties
            .iter()
            .map(|o| AnalysisStatistics::from_findings(o.findings()))
            .fold(AnalysisStatistics::default(), AnalysisStatistics::merge);
        let overall_score = aggregate_scores(
            specialties
                .iter()
                .filter_map(SpecialtyOutcome::result)
                .map(|r| (r.overall_score, r.statistics.checks_performed)),
        );
        let status = ComplianceStatus::for_project(&statistics, &specialties);
        Self {
            specialties,
            statistics,
            overall_score,
            status,
        }
    }

    /// All findings, in specialty order
    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.specialties.iter().flat_map(|o| o.findings().iter())
    }

    pub fn get(&self, specialty: Specialty) -> Option<&SpecialtyOutcome> {
        self.specialties.iter().find(|o| o.specialty() == specialty)
    }

    pub fn analyzed(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.specialties.iter().filter_map(SpecialtyOutcome::result)
    }

    /// One patch covering every analyzed specialty
    pub fn enrichment(&self) -> EnrichmentPatch {
        let mut patch = EnrichmentPatch::new();
        for result in self.analyzed() {
            patch.extend(result.enrichment());
        }
        patch
    }

    /// Generate a text report
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        output.push_str("Building Compliance Report\n");
        output.push_str(&"=".repeat(60));
        output.push_str("\n\n");

        output.push_str(&format!("Status: {}\n", self.status.label()));
        output.push_str(&format!("Overall score: {:.1} / 100\n", self.overall_score));
        output.push_str(&format!(
            "Checks: {} passed, {} warnings, {} critical ({} total)\n\n",
            self.statistics.passed,
            self.statistics.warnings,
            self.statistics.critical,
            self.statistics.checks_performed
        ));

        for outcome in &self.specialties {
            let specialty = outcome.specialty();
            match outcome {
                SpecialtyOutcome::Analyzed(result) => {
                    output.push_str(&format!(
                        "{} - score {:.1} ({})\n",
                        specialty.name(),
                        result.overall_score,
                        result.status().label()
                    ));
                    output.push_str(&"-".repeat(40));
                    output.push('\n');
                    for finding in &result.findings {
                        output.push_str(&format!(
                            "[{}] {} ({})\n",
                            finding.severity, finding.rule_id, finding.article
                        ));
                        if finding.severity != Severity::Pass {
                            output.push_str(&format!("    {}\n", finding.description));
                        }
                    }
                    output.push('\n');
                }
                SpecialtyOutcome::InsufficientData { completion, .. } => {
                    output.push_str(&format!(
                        "{} - insufficient data ({}% complete)\n\n",
                        specialty.name(),
                        completion.percentage
                    ));
                }
                SpecialtyOutcome::Failed { reason, .. } => {
                    output.push_str(&format!("{} - failed: {}\n\n", specialty.name(), reason));
                }
            }
        }

        output
    }
}
