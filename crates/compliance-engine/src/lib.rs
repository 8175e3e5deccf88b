//! Declarative building-regulation compliance engine
//!
//! Per specialty the engine runs: readiness gate, computed-value cascade,
//! rule evaluation, statistics and scoring. Results can be written back onto
//! the project through an explicit [`EnrichmentPatch`].
//!
//! ```
//! use compliance_engine::{ComplianceEngine, EngineConfig, Specialty, SpecialtyAnalysis};
//! use shared_types::BuildingProject;
//!
//! let engine = ComplianceEngine::with_builtin_rules(EngineConfig::default()).unwrap();
//! let project = BuildingProject::new()
//!     .with("general", "buildingType", "residential")
//!     .with("general", "grossArea", 150.0)
//!     .with("fireSafety", "fireResistance", 15.0);
//!
//! match engine.analyze_specialty(&project, Specialty::FireSafety).unwrap() {
//!     SpecialtyAnalysis::Analyzed(result) => assert!(result.overall_score < 100.0),
//!     SpecialtyAnalysis::InsufficientData { .. } => unreachable!(),
//! }
//! ```

pub mod cascade;
pub mod config;
pub mod enrichment;
pub mod error;
pub mod evaluator;
pub mod expr;
pub mod readiness;
pub mod report;
pub mod rules;
pub mod specialty;
pub mod stats;

pub use cascade::{ComputedValues, RiskCategory, UsageClass, UsageType};
pub use config::EngineConfig;
pub use enrichment::{EnrichmentPatch, PatchEntry};
pub use error::{EngineError, Result};
pub use expr::ExprError;
pub use readiness::{can_analyze, section_completion, SectionCompletion};
pub use report::{
    AnalysisResult, ComplianceStatus, ProjectAnalysis, SpecialtyAnalysis, SpecialtyOutcome,
};
pub use rules::{Rule, RuleBook, RuleCheck, RuleSource, SeverityTier};
pub use specialty::Specialty;
pub use stats::{AnalysisStatistics, ScoringPolicy};

use evaluator::EvaluationContext;
use shared_types::BuildingProject;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Compliance engine bound to one configuration and one rule source.
///
/// Cheap to clone and safe to share between threads; engines built for
/// different regulation versions can run side by side.
#[derive(Clone)]
pub struct ComplianceEngine {
    config: Arc<EngineConfig>,
    rules: Arc<dyn RuleSource>,
}

impl ComplianceEngine {
    /// # Errors
    ///
    /// [`EngineError::InvalidConfig`] if `config` fails validation.
    pub fn new(config: EngineConfig, rules: impl RuleSource + 'static) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config: Arc::new(config),
            rules: Arc::new(rules),
        })
    }

    /// Engine using the rule book shipped with the crate
    pub fn with_builtin_rules(config: EngineConfig) -> Result<Self> {
        Self::new(config, RuleBook::builtin()?)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &dyn RuleSource {
        self.rules.as_ref()
    }

    /// Analyze one specialty.
    ///
    /// Returns [`SpecialtyAnalysis::InsufficientData`] without computing
    /// anything when the readiness gate refuses the project.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidProjectShape`] when the project passed the gate
    /// but lacks a primitive the cascade cannot do without.
    pub fn analyze_specialty(
        &self,
        project: &BuildingProject,
        specialty: Specialty,
    ) -> Result<SpecialtyAnalysis> {
        if !can_analyze(project, specialty) {
            let completion = section_completion(project, specialty);
            debug!(
                specialty = %specialty,
                completion = completion.percentage,
                "insufficient data; specialty skipped"
            );
            return Ok(SpecialtyAnalysis::InsufficientData {
                specialty,
                completion,
            });
        }

        let computed = cascade::compute(specialty, project, &self.config)?;
        debug!(specialty = %specialty, values = computed.entries().len(), "cascade complete");

        let rules = self.rules.rules(specialty);
        let findings =
            evaluator::evaluate(rules, &EvaluationContext::new(specialty, project, &computed));
        let statistics = AnalysisStatistics::from_findings(&findings);
        let overall_score = self.config.scoring.score(&statistics);

        info!(
            specialty = %specialty,
            checks = statistics.checks_performed,
            passed = statistics.passed,
            warnings = statistics.warnings,
            critical = statistics.critical,
            score = overall_score,
            "specialty analyzed"
        );

        Ok(SpecialtyAnalysis::Analyzed(AnalysisResult {
            specialty,
            findings,
            computed,
            statistics,
            overall_score,
        }))
    }

    /// Analyze every specialty. Never fails: a specialty whose analysis
    /// errors is reported as failed with a diagnostic finding.
    pub fn analyze(&self, project: &BuildingProject) -> ProjectAnalysis {
        let outcomes = Specialty::ALL
            .iter()
            .map(|&specialty| match self.analyze_specialty(project, specialty) {
                Ok(analysis) => analysis.into(),
                Err(err) => {
                    warn!(specialty = %specialty, error = %err, "specialty analysis failed");
                    SpecialtyOutcome::failed(specialty, err.to_string())
                }
            })
            .collect();

        let analysis = ProjectAnalysis::from_outcomes(outcomes);
        info!(
            analyzed = analysis.analyzed().count(),
            checks = analysis.statistics.checks_performed,
            score = analysis.overall_score,
            status = analysis.status.label(),
            "project analyzed"
        );
        analysis
    }

    /// Analyze `project` and write the computed values back onto it
    pub fn enrich(&self, project: &mut BuildingProject) -> ProjectAnalysis {
        let analysis = self.analyze(project);
        analysis.enrichment().apply(project);
        analysis
    }
}

impl std::fmt::Debug for ComplianceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComplianceEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
