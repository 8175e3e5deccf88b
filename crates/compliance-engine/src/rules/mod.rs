//! Declarative compliance rules
//!
//! A rule pairs a legal citation with one validation kind (range, threshold,
//! formula, lookup or conditional). Rules are immutable reference data,
//! grouped per specialty in a [`RuleBook`] and served to the engine through
//! the [`RuleSource`] trait.

use crate::cascade::UsageType;
use crate::error::{EngineError, Result};
use crate::expr::{self, CompareOp};
use crate::specialty::{Specialty, BUILDING_TYPE_FIELD};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use shared_types::{BuildingProject, FieldPath, FieldValue, Severity, GENERAL_SECTION};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const BUILTIN_RULES: &str = include_str!("../../rules/builtin.json");

/// Supplies the immutable rule set of each specialty
pub trait RuleSource: Send + Sync {
    /// Rules of `specialty`, in evaluation order
    fn rules(&self, specialty: Specialty) -> &[Rule];
}

/// How a failing rule weighs on the result
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityTier {
    /// Legal obligation: failing is critical
    #[default]
    Mandatory,
    /// Good practice: failing is a warning, or the rule's declared severity
    Recommended,
    /// Guidance only: never fails
    Informative,
}

/// Polarity of a threshold rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    AtLeast,
    AtMost,
    Equals,
}

impl Comparison {
    pub fn op(&self) -> CompareOp {
        match self {
            Comparison::AtLeast => CompareOp::Ge,
            Comparison::AtMost => CompareOp::Le,
            Comparison::Equals => CompareOp::Eq,
        }
    }

    pub fn phrase(&self) -> &'static str {
        match self {
            Comparison::AtLeast => "at least",
            Comparison::AtMost => "at most",
            Comparison::Equals => "equal to",
        }
    }
}

/// Right-hand side of a threshold rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// A literal value
    Value(FieldValue),
    /// A computed value of the specialty, by name
    Computed(String),
    /// Another project field, by path
    Field(String),
}

/// Validation performed by a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleCheck {
    /// Passes iff `min <= actual <= max`; a missing bound is open
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    Threshold {
        field: String,
        comparison: Comparison,
        target: Operand,
    },
    /// Expression over project fields. A top-level comparison reports its
    /// left side as actual and its right side as required.
    Formula { expression: String },
    /// The value of `field` must be one of the values allowed for the value
    /// of `key_field`
    Lookup {
        field: String,
        key_field: String,
        allowed: BTreeMap<String, Vec<String>>,
    },
    /// `then` is evaluated only when `when` holds; otherwise the rule is skipped
    Conditional { when: String, then: Box<RuleCheck> },
}

impl RuleCheck {
    pub fn kind(&self) -> &'static str {
        match self {
            RuleCheck::Range { .. } => "range",
            RuleCheck::Threshold { .. } => "threshold",
            RuleCheck::Formula { .. } => "formula",
            RuleCheck::Lookup { .. } => "lookup",
            RuleCheck::Conditional { .. } => "conditional",
        }
    }
}

/// Project scope of a rule; empty lists match every project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Applicability {
    /// Fire-safety usage types, as roman or arabic numerals
    pub usage_types: Vec<String>,
    /// Values of `general.buildingType`, compared case-insensitively
    pub building_types: Vec<String>,
}

impl Applicability {
    pub fn is_universal(&self) -> bool {
        self.usage_types.is_empty() && self.building_types.is_empty()
    }

    /// A project whose usage or building type is unknown matches only
    /// unrestricted scopes
    pub fn matches(&self, project: &BuildingProject) -> bool {
        if !self.usage_types.is_empty() {
            let Some(usage) = UsageType::resolve(project) else {
                return false;
            };
            if !self
                .usage_types
                .iter()
                .any(|u| UsageType::parse(u) == Some(usage))
            {
                return false;
            }
        }

        if !self.building_types.is_empty() {
            let Some(building_type) = project.text(GENERAL_SECTION, BUILDING_TYPE_FIELD) else {
                return false;
            };
            if !self
                .building_types
                .iter()
                .any(|b| b.trim().eq_ignore_ascii_case(building_type))
            {
                return false;
            }
        }

        true
    }
}

/// One declarative rule, citing the article it derives from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    /// Article citation, copied verbatim into findings
    pub article: String,
    pub regulation: String,
    #[serde(default)]
    pub category: String,
    pub description: String,
    pub check: RuleCheck,
    #[serde(default)]
    pub applies_to: Applicability,
    #[serde(default)]
    pub tier: SeverityTier,
    /// Severity of a failing recommended rule, when not a plain warning
    #[serde(default)]
    pub severity: Option<Severity>,
    #[serde(default)]
    pub unit: Option<String>,
}

/// A problem found in a rule before any project is evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleIssue {
    pub specialty: Specialty,
    pub rule_id: String,
    pub message: String,
}

#[derive(Deserialize)]
struct RawRuleBook {
    rules: BTreeMap<String, Vec<Rule>>,
}

/// Rules of every specialty
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleBook {
    rules: BTreeMap<Specialty, Vec<Rule>>,
}

impl RuleBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a rule book of the form `{"rules": {"<specialty_id>": [rule, ..]}}`
    ///
    /// # Errors
    ///
    /// [`EngineError::RuleBook`] for malformed JSON, and
    /// [`EngineError::InvalidConfig`] for unknown specialties or rule ids
    /// repeated within a specialty.
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawRuleBook = serde_json::from_str(json)?;
        let mut book = Self::new();
        for (id, rules) in raw.rules {
            let specialty = Specialty::parse(&id).ok_or_else(|| {
                EngineError::InvalidConfig(format!("rule book: unknown specialty '{}'", id))
            })?;
            for rule in rules {
                if book.get(specialty, &rule.id).is_some() {
                    return Err(EngineError::InvalidConfig(format!(
                        "rule book: duplicate rule '{}' in {}",
                        rule.id, specialty
                    )));
                }
                book.insert(specialty, rule);
            }
        }
        Ok(book)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read rule book: {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid rule book: {}", path.display()))
    }

    /// The rule book shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_RULES)
    }

    /// Add a rule, replacing any rule of the same specialty and id in place
    pub fn insert(&mut self, specialty: Specialty, rule: Rule) {
        let rules = self.rules.entry(specialty).or_default();
        match rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
    }

    /// Overlay `other` on top of this book
    pub fn merge(mut self, other: RuleBook) -> Self {
        for (specialty, rules) in other.rules {
            for rule in rules {
                self.insert(specialty, rule);
            }
        }
        self
    }

    pub fn get(&self, specialty: Specialty, rule_id: &str) -> Option<&Rule> {
        self.rules(specialty).iter().find(|r| r.id == rule_id)
    }

    pub fn specialties(&self) -> impl Iterator<Item = Specialty> + '_ {
        self.rules.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check every expression and field path without a project at hand.
    /// Rules listed here still evaluate, as diagnostic findings.
    pub fn lint(&self) -> Vec<RuleIssue> {
        let mut issues = Vec::new();
        for (specialty, rules) in &self.rules {
            for rule in rules {
                let mut report = |message: String| {
                    issues.push(RuleIssue {
                        specialty: *specialty,
                        rule_id: rule.id.clone(),
                        message,
                    })
                };
                lint_check(&rule.check, specialty.section(), &mut report);
                if rule.tier != SeverityTier::Recommended && rule.severity.is_some() {
                    report("declared severity only applies to recommended rules".to_string());
                }
            }
        }
        issues
    }
}

impl RuleSource for RuleBook {
    fn rules(&self, specialty: Specialty) -> &[Rule] {
        self.rules.get(&specialty).map_or(&[], Vec::as_slice)
    }
}

fn lint_check(check: &RuleCheck, section: &str, report: &mut impl FnMut(String)) {
    let mut path = |p: &str| {
        if let Some(name) = p.strip_prefix("computed.") {
            if name.is_empty() {
                report(format!("empty computed reference '{}'", p));
            }
        } else if let Err(e) = FieldPath::parse(p, section) {
            report(e.to_string());
        }
    };

    match check {
        RuleCheck::Range { field, min, max } => {
            path(field);
            match (min, max) {
                (None, None) => report("range has neither min nor max".to_string()),
                (Some(lo), Some(hi)) if lo > hi => report(format!("range min {} > max {}", lo, hi)),
                _ => {}
            }
        }
        RuleCheck::Threshold { field, target, .. } => {
            path(field);
            if let Operand::Field(other) = target {
                path(other);
            }
        }
        RuleCheck::Lookup {
            field, key_field, ..
        } => {
            path(field);
            path(key_field);
        }
        RuleCheck::Formula { expression } => match expr::parse(expression) {
            Ok(parsed) => parsed.fields().into_iter().for_each(&mut path),
            Err(e) => report(e.to_string()),
        },
        RuleCheck::Conditional { when, then } => {
            match expr::parse(when) {
                Ok(parsed) => parsed.fields().into_iter().for_each(&mut path),
                Err(e) => report(e.to_string()),
            }
            lint_check(then, section, report);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_builtin_book_loads_and_lints_clean() {
        let book = RuleBook::builtin().unwrap();
        for specialty in [
            Specialty::FireSafety,
            Specialty::Energy,
            Specialty::Electrical,
            Specialty::Water,
        ] {
            assert!(!book.rules(specialty).is_empty(), "{} has no rules", specialty);
        }
        assert!(book.rules(Specialty::Gas).is_empty());
        assert_eq!(book.lint(), Vec::new());
    }

    #[test]
    fn test_rule_json_shape() {
        let book = RuleBook::from_json(
            r#"{"rules": {"fire_safety": [{
                "id": "SCIE-15",
                "article": "RT-SCIE art. 15.º",
                "regulation": "RT-SCIE",
                "description": "Fire resistance of the structure",
                "check": {
                    "kind": "conditional",
                    "when": "present(fireResistance)",
                    "then": {
                        "kind": "threshold",
                        "field": "fireResistance",
                        "comparison": "at_least",
                        "target": {"computed": "requiredResistance"}
                    }
                },
                "unit": "min"
            }]}}"#,
        )
        .unwrap();

        let rule = book.get(Specialty::FireSafety, "SCIE-15").unwrap();
        assert_eq!(rule.tier, SeverityTier::Mandatory);
        assert!(rule.applies_to.is_universal());
        match &rule.check {
            RuleCheck::Conditional { then, .. } => assert_eq!(
                **then,
                RuleCheck::Threshold {
                    field: "fireResistance".to_string(),
                    comparison: Comparison::AtLeast,
                    target: Operand::Computed("requiredResistance".to_string()),
                }
            ),
            other => panic!("unexpected check {:?}", other),
        }
    }

    #[test]
    fn test_unknown_specialty_and_duplicates_are_rejected() {
        let err = RuleBook::from_json(r#"{"rules": {"plumbing": []}}"#).unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));

        let rule = r#"{"id": "R1", "article": "a", "regulation": "r", "description": "d",
                      "check": {"kind": "formula", "expression": "true"}}"#;
        let json = format!(r#"{{"rules": {{"gas": [{}, {}]}}}}"#, rule, rule);
        assert!(matches!(
            RuleBook::from_json(&json),
            Err(EngineError::InvalidConfig(_))
        ));

        assert!(matches!(
            RuleBook::from_json("{"),
            Err(EngineError::RuleBook(_))
        ));
    }

    #[test]
    fn test_merge_replaces_by_id() {
        let base = RuleBook::builtin().unwrap();
        let before = base.len();
        let mut patch = RuleBook::new();
        let mut rule = base.rules(Specialty::FireSafety)[0].clone();
        rule.description = "overridden".to_string();
        patch.insert(Specialty::FireSafety, rule.clone());

        let merged = base.merge(patch);
        assert_eq!(merged.len(), before);
        assert_eq!(
            merged.get(Specialty::FireSafety, &rule.id).unwrap().description,
            "overridden"
        );
    }

    #[test]
    fn test_lint_reports_bad_expressions() {
        let book = RuleBook::from_json(
            r#"{"rules": {"energy": [
                {"id": "E1", "article": "a", "regulation": "r", "description": "d",
                 "check": {"kind": "formula", "expression": "wallU <"}},
                {"id": "E2", "article": "a", "regulation": "r", "description": "d",
                 "check": {"kind": "range", "field": "a.b.c", "min": 1}}
            ]}}"#,
        )
        .unwrap();
        let issues = book.lint();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].rule_id, "E1");
        assert_eq!(issues[1].rule_id, "E2");
    }

    #[test]
    fn test_applicability() {
        let project = BuildingProject::new()
            .with("general", "buildingType", "Commercial")
            .with("fireSafety", "usageType", "VIII");

        let scoped = |usage: &[&str], building: &[&str]| Applicability {
            usage_types: usage.iter().map(|s| s.to_string()).collect(),
            building_types: building.iter().map(|s| s.to_string()).collect(),
        };

        assert!(scoped(&[], &[]).matches(&project));
        assert!(scoped(&["8"], &[]).matches(&project));
        assert!(scoped(&["VIII", "IX"], &["commercial"]).matches(&project));
        assert!(!scoped(&["V"], &[]).matches(&project));
        assert!(!scoped(&[], &["hospital"]).matches(&project));
        assert!(!scoped(&["I"], &[]).matches(&BuildingProject::new()));
    }

    #[test]
    fn test_from_file_errors_carry_context() {
        let err = RuleBook::from_file("/nonexistent/rules.json").unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to read rule book"));
        assert!(message.contains("/nonexistent/rules.json"));
        assert!(err.downcast_ref::<std::io::Error>().is_some());
    }
}
