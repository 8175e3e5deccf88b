//! End-to-end scenarios over the builtin rule book and reference tables

mod common;

use common::{builtin_engine, load_project};
use compliance_engine::cascade::FireSafetyValues;
use compliance_engine::{
    can_analyze, AnalysisResult, ComplianceEngine, ComplianceStatus, ComputedValues, EngineConfig,
    RiskCategory, RuleBook, Specialty, SpecialtyAnalysis, SpecialtyOutcome,
};
use pretty_assertions::assert_eq;
use shared_types::{BuildingProject, FieldValue, Severity};

fn analyzed(
    engine: &ComplianceEngine,
    project: &BuildingProject,
    specialty: Specialty,
) -> AnalysisResult {
    match engine.analyze_specialty(project, specialty).unwrap() {
        SpecialtyAnalysis::Analyzed(result) => result,
        other => panic!("{} was not analyzed: {:?}", specialty, other),
    }
}

fn fire_values(computed: &ComputedValues) -> &FireSafetyValues {
    match computed {
        ComputedValues::FireSafety(values) => values,
        other => panic!("expected fire-safety values, got {:?}", other),
    }
}

// ============================================================
// Scenario A: small dwelling
// ============================================================

#[test]
fn scenario_a_small_dwelling() {
    let project = BuildingProject::new()
        .with("fireSafety", "usageType", "I")
        .with("general", "grossArea", 150.0);
    let result = analyzed(&builtin_engine(), &project, Specialty::FireSafety);
    let values = fire_values(&result.computed);

    assert_eq!(values.occupant_load, 6);
    assert_eq!(values.risk_category, RiskCategory::One);
    assert_eq!(values.required_resistance, 30);
    assert!(!values.sprinklers_required);
    assert!(!values.detection_required);
}

// ============================================================
// Scenario B: commercial building above the category-1 height cap
// ============================================================

#[test]
fn scenario_b_commercial_building() {
    let project = load_project("commercial_store.json");
    let result = analyzed(&builtin_engine(), &project, Specialty::FireSafety);
    let values = fire_values(&result.computed);

    assert_eq!(values.occupant_load, 100);
    assert!(values.risk_category >= RiskCategory::Two);
    assert!(values.required_resistance >= 60);
    assert!(values.detection_required);

    // only the extinguisher count falls short, as a recommendation
    let failures: Vec<_> = result.failures().collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].rule_id, "SCIE-163");
    assert_eq!(failures[0].severity, Severity::Warning);
    assert_eq!(result.statistics.checks_performed, 8);
    assert_eq!(result.overall_score, 92.8);
}

// ============================================================
// Scenario C: fire resistance shortfall
// ============================================================

#[test]
fn scenario_c_fire_resistance_shortfall() {
    let project = load_project("residential_dwelling.json");
    let result = analyzed(&builtin_engine(), &project, Specialty::FireSafety);

    let finding = result
        .findings
        .iter()
        .find(|f| f.rule_id == "SCIE-15")
        .unwrap();
    assert_eq!(finding.id, "fire_safety.SCIE-15");
    assert_eq!(finding.severity, Severity::Critical);
    assert_eq!(finding.article, "RT-SCIE art. 15.º");
    assert_eq!(finding.actual, Some(FieldValue::Number(15.0)));
    assert_eq!(finding.required.as_deref(), Some("at least 30 min"));
    assert!(finding.description.contains("shortfall"));

    assert_eq!(result.statistics.checks_performed, 6);
    assert_eq!(result.statistics.critical, 1);
    assert_eq!(result.overall_score, 78.3);
}

// ============================================================
// Scenario D: nothing to analyze
// ============================================================

#[test]
fn scenario_d_empty_signals_fail_the_gate() {
    let project = BuildingProject::new()
        .with("general", "buildingType", "")
        .with("general", "grossArea", 0.0)
        .with("general", "height", 0.0)
        .with("general", "numberOfFloors", 0.0);

    assert!(!can_analyze(&project, Specialty::FireSafety));

    let analysis = builtin_engine().analyze(&project);
    assert!(analysis
        .specialties
        .iter()
        .all(|o| matches!(o, SpecialtyOutcome::InsufficientData { .. })));
    assert_eq!(analysis.statistics.checks_performed, 0);
    assert_eq!(analysis.overall_score, 100.0);
    assert_eq!(analysis.status, ComplianceStatus::NotAnalyzed);
    assert_eq!(analysis.enrichment().len(), 0);
}

// ============================================================
// Scenario E: one rule reads an undefined field
// ============================================================

const GOOD_RULES: &str = r#"
    {"id": "EXITS", "article": "RT-SCIE art. 54.º", "regulation": "RT-SCIE",
     "description": "Exits", "check": {"kind": "threshold", "field": "numberOfExits",
     "comparison": "at_least", "target": {"computed": "minExitsRequired"}}},
    {"id": "RESIST", "article": "RT-SCIE art. 15.º", "regulation": "RT-SCIE",
     "description": "Resistance", "check": {"kind": "threshold", "field": "fireResistance",
     "comparison": "at_least", "target": {"computed": "requiredResistance"}}}
"#;

const BROKEN_RULE: &str = r#"
    {"id": "GHOST", "article": "RT-SCIE art. 99.º", "regulation": "RT-SCIE",
     "description": "Reads a field nobody sets", "check": {"kind": "formula",
     "expression": "fireSafety.ghostField > 1"}},
"#;

fn engine_with(rules: &str) -> ComplianceEngine {
    let json = format!(r#"{{"rules": {{"fire_safety": [{}]}}}}"#, rules);
    ComplianceEngine::new(EngineConfig::default(), RuleBook::from_json(&json).unwrap()).unwrap()
}

#[test]
fn scenario_e_undefined_field_yields_one_diagnostic() {
    let project = load_project("residential_dwelling.json");

    let clean = analyzed(&engine_with(GOOD_RULES), &project, Specialty::FireSafety);
    let broken = analyzed(
        &engine_with(&format!("{}{}", BROKEN_RULE, GOOD_RULES)),
        &project,
        Specialty::FireSafety,
    );

    let ghosts: Vec<_> = broken
        .findings
        .iter()
        .filter(|f| f.rule_id == "GHOST")
        .collect();
    assert_eq!(ghosts.len(), 1);
    assert_eq!(ghosts[0].severity, Severity::Informative);
    assert!(ghosts[0].description.contains("fireSafety.ghostField"));

    let others: Vec<_> = broken
        .findings
        .iter()
        .filter(|f| f.rule_id != "GHOST")
        .cloned()
        .collect();
    assert_eq!(others, clean.findings);
    assert_eq!(
        broken.statistics.checks_performed,
        clean.statistics.checks_performed + 1
    );
}

#[test]
fn deeply_nested_expression_yields_one_diagnostic() {
    let project = load_project("residential_dwelling.json");
    let expression = format!("{}1{} > 0", "(".repeat(50_000), ")".repeat(50_000));
    let deep_rule = format!(
        r#"{{"id": "DEEP", "article": "RT-SCIE art. 99.º", "regulation": "RT-SCIE",
            "description": "Nested", "check": {{"kind": "formula", "expression": "{}"}}}},"#,
        expression
    );

    let clean = analyzed(&engine_with(GOOD_RULES), &project, Specialty::FireSafety);
    let deep = analyzed(
        &engine_with(&format!("{}{}", deep_rule, GOOD_RULES)),
        &project,
        Specialty::FireSafety,
    );

    let diagnostics: Vec<_> = deep.findings.iter().filter(|f| f.rule_id == "DEEP").collect();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Informative);
    assert!(diagnostics[0].description.contains("too deeply"));
    assert_eq!(
        deep.statistics.checks_performed,
        clean.statistics.checks_performed + 1
    );
}

// ============================================================
// Whole-project analysis
// ============================================================

#[test]
fn full_dwelling_analysis() {
    let project = load_project("residential_dwelling.json");
    let analysis = builtin_engine().analyze(&project);

    for specialty in [
        Specialty::FireSafety,
        Specialty::Energy,
        Specialty::Electrical,
        Specialty::Water,
    ] {
        assert!(
            matches!(analysis.get(specialty), Some(SpecialtyOutcome::Analyzed(_))),
            "{} not analyzed",
            specialty
        );
    }

    let critical: Vec<&str> = analysis
        .findings()
        .filter(|f| f.severity == Severity::Critical)
        .map(|f| f.id.as_str())
        .collect();
    assert_eq!(
        critical,
        vec![
            "fire_safety.SCIE-15",
            "energy.REH-ROOF",
            "electrical.RTIEBT-311"
        ]
    );
    assert!(analysis.statistics.is_consistent());
    assert_eq!(
        analysis.statistics.checks_performed,
        analysis.findings().count()
    );
    assert!(analysis.overall_score > 0.0 && analysis.overall_score < 100.0);
}

#[test]
fn enrichment_round_trip_through_json() {
    let mut project = load_project("commercial_store.json");
    let analysis = builtin_engine().enrich(&mut project);
    assert!(analysis.analyzed().count() > 0);

    let json = serde_json::to_string(&project).unwrap();
    let reloaded = BuildingProject::from_json(&json).unwrap();
    assert_eq!(reloaded, project);
    assert_eq!(
        reloaded.get("fireSafety", "computedOccupantLoad"),
        Some(&FieldValue::Number(100.0))
    );
    assert_eq!(
        reloaded.get("fireSafety", "riskCategory"),
        Some(&FieldValue::Number(2.0))
    );
}

#[test]
fn injected_tables_change_the_outcome() {
    let project = load_project("commercial_store.json");
    let strict = EngineConfig::from_toml(
        r#"
        [fire_safety]
        detection_category = 1
        sprinkler_category = 2
        "#,
    )
    .unwrap();
    let engine = ComplianceEngine::new(strict, RuleBook::builtin().unwrap()).unwrap();
    let result = analyzed(&engine, &project, Specialty::FireSafety);

    assert!(fire_values(&result.computed).sprinklers_required);
    let sprinklers = result
        .findings
        .iter()
        .find(|f| f.rule_id == "SCIE-173")
        .unwrap();
    assert_eq!(sprinklers.severity, Severity::Critical);

    // the default engine is unaffected
    let default = analyzed(&builtin_engine(), &project, Specialty::FireSafety);
    assert!(!fire_values(&default.computed).sprinklers_required);
}
