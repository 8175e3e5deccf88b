//! Rule evaluation
//!
//! Walks the rules of one specialty in order and emits one [`Finding`] per
//! evaluated rule. Rules outside their applicability scope, and conditional
//! rules whose guard is false, emit nothing. A rule that cannot be evaluated
//! becomes a single informative diagnostic finding and the batch continues.

use crate::cascade::ComputedValues;
use crate::expr::{self, CompareOp, ExprError, Resolver};
use crate::rules::{Comparison, Operand, Rule, RuleCheck, SeverityTier};
use crate::specialty::Specialty;
use shared_types::{BuildingProject, FieldPath, FieldValue, Finding, PathError, Severity};
use thiserror::Error;
use tracing::{debug, warn};

const COMPUTED_PREFIX: &str = "computed.";

/// Why a rule could not be evaluated
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuleError {
    #[error(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("no allowed values listed for {key_field} = '{key}'")]
    MissingLookupKey { key_field: String, key: String },

    #[error("range has neither min nor max")]
    EmptyRange,
}

/// Field values visible to the rules of one specialty
pub struct EvaluationContext<'a> {
    pub specialty: Specialty,
    pub project: &'a BuildingProject,
    pub computed: &'a ComputedValues,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(
        specialty: Specialty,
        project: &'a BuildingProject,
        computed: &'a ComputedValues,
    ) -> Self {
        Self {
            specialty,
            project,
            computed,
        }
    }

    /// `computed.name` reads the computed values, `section.field` the project,
    /// and a bare `field` the specialty's own section
    pub fn lookup(&self, path: &str) -> Result<Option<FieldValue>, PathError> {
        if let Some(name) = path.strip_prefix(COMPUTED_PREFIX) {
            return Ok(self.computed.get(name));
        }
        let path = FieldPath::parse(path, self.specialty.section())?;
        Ok(self.project.get_path(&path).cloned())
    }

    fn require(&self, path: &str) -> Result<FieldValue, RuleError> {
        self.lookup(path)?
            .ok_or_else(|| ExprError::UnknownField(path.to_string()).into())
    }
}

impl Resolver for EvaluationContext<'_> {
    fn resolve(&self, path: &str) -> Option<FieldValue> {
        self.lookup(path).ok().flatten()
    }
}

/// Result of one check before severity is assigned
#[derive(Debug, Clone, PartialEq)]
struct Outcome {
    passed: bool,
    actual: Option<FieldValue>,
    required: Option<String>,
    detail: String,
}

/// Evaluate `rules` in order
pub fn evaluate(rules: &[Rule], ctx: &EvaluationContext<'_>) -> Vec<Finding> {
    let mut findings = Vec::with_capacity(rules.len());

    for rule in rules {
        if !rule.applies_to.matches(ctx.project) {
            debug!(rule = %rule.id, "rule out of scope for this project");
            continue;
        }

        match evaluate_check(&rule.check, rule, ctx) {
            Ok(Some(outcome)) => findings.push(finding(rule, ctx.specialty, outcome)),
            Ok(None) => debug!(rule = %rule.id, "guard is false; rule skipped"),
            Err(err) => {
                warn!(
                    specialty = %ctx.specialty,
                    rule = %rule.id,
                    kind = rule.check.kind(),
                    error = %err,
                    "rule could not be evaluated"
                );
                findings.push(diagnostic(rule, ctx.specialty, &err));
            }
        }
    }

    findings
}

fn evaluate_check(
    check: &RuleCheck,
    rule: &Rule,
    ctx: &EvaluationContext<'_>,
) -> Result<Option<Outcome>, RuleError> {
    let unit = rule.unit.as_deref();
    let outcome = match check {
        RuleCheck::Range { field, min, max } => range(ctx.require(field)?, *min, *max, unit)?,
        RuleCheck::Threshold {
            field,
            comparison,
            target,
        } => {
            let actual = ctx.require(field)?;
            let required = match target {
                Operand::Value(v) => v.clone(),
                Operand::Computed(name) => ctx.require(&format!("{}{}", COMPUTED_PREFIX, name))?,
                Operand::Field(path) => ctx.require(path)?,
            };
            threshold(actual, *comparison, required, unit)?
        }
        RuleCheck::Formula { expression } => formula(expression, ctx)?,
        RuleCheck::Lookup {
            field,
            key_field,
            allowed,
        } => {
            let actual = ctx.require(field)?;
            let key = ctx.require(key_field)?.to_string();
            let values = allowed
                .iter()
                .find(|(k, _)| k.trim().eq_ignore_ascii_case(key.trim()))
                .map(|(_, v)| v)
                .ok_or_else(|| RuleError::MissingLookupKey {
                    key_field: key_field.clone(),
                    key: key.clone(),
                })?;
            let text = actual.to_string();
            let passed = values
                .iter()
                .any(|v| v.trim().eq_ignore_ascii_case(text.trim()));
            let required = format!("one of {}", values.join(", "));
            let detail = if passed {
                format!("'{}' is allowed for {} '{}'", text, key_field, key)
            } else {
                format!(
                    "'{}' is not allowed for {} '{}'; expected {}",
                    text, key_field, key, required
                )
            };
            Outcome {
                passed,
                actual: Some(actual),
                required: Some(required),
                detail,
            }
        }
        RuleCheck::Conditional { when, then } => {
            if !expr::parse(when)?.eval_bool(ctx)? {
                return Ok(None);
            }
            return evaluate_check(then, rule, ctx);
        }
    };
    Ok(Some(outcome))
}

fn range(
    actual: FieldValue,
    min: Option<f64>,
    max: Option<f64>,
    unit: Option<&str>,
) -> Result<Outcome, RuleError> {
    let value = actual.as_number().ok_or_else(|| ExprError::TypeMismatch {
        op: "range",
        expected: "a number",
        found: format!("{} '{}'", actual.type_name(), actual),
    })?;

    let required = match (min, max) {
        (Some(lo), Some(hi)) => format!("between {} and {}", num(lo), with_unit(hi, unit)),
        (Some(lo), None) => format!("at least {}", with_unit(lo, unit)),
        (None, Some(hi)) => format!("at most {}", with_unit(hi, unit)),
        (None, None) => return Err(RuleError::EmptyRange),
    };
    let passed = min.map_or(true, |lo| value >= lo) && max.map_or(true, |hi| value <= hi);

    let detail = if passed {
        format!("{} is within the allowed range ({})", with_unit(value, unit), required)
    } else {
        format!("{} is outside the allowed range ({})", with_unit(value, unit), required)
    };
    Ok(Outcome {
        passed,
        actual: Some(actual),
        required: Some(required),
        detail,
    })
}

fn threshold(
    actual: FieldValue,
    comparison: Comparison,
    required: FieldValue,
    unit: Option<&str>,
) -> Result<Outcome, RuleError> {
    let passed = comparison.op().holds(&actual, &required)?;
    let required_text = format!("{} {}", comparison.phrase(), display(&required, unit));

    let detail = match (passed, comparison, actual.as_number(), required.as_number()) {
        (true, ..) => format!("{} satisfies {}", display(&actual, unit), required_text),
        (false, Comparison::AtLeast, Some(a), Some(r)) => format!(
            "{} is below the required {} (shortfall of {})",
            display(&actual, unit),
            display(&required, unit),
            with_unit(r - a, unit)
        ),
        (false, Comparison::AtMost, Some(a), Some(r)) => format!(
            "{} exceeds the limit of {} by {}",
            display(&actual, unit),
            display(&required, unit),
            with_unit(a - r, unit)
        ),
        (false, ..) => format!(
            "found {}, required {}",
            display(&actual, unit),
            required_text
        ),
    };

    Ok(Outcome {
        passed,
        actual: Some(actual),
        required: Some(required_text),
        detail,
    })
}

fn formula(expression: &str, ctx: &EvaluationContext<'_>) -> Result<Outcome, RuleError> {
    let parsed = expr::parse(expression)?;

    if let Some((op, left, right)) = parsed.as_comparison() {
        let actual = left.eval(ctx)?;
        let required = right.eval(ctx)?;
        let passed = op.holds(&actual, &required)?;
        let required_text = format!("{} {}", op.symbol(), required);
        let detail = match (passed, op, actual.as_number(), required.as_number()) {
            (false, CompareOp::Ge | CompareOp::Gt, Some(a), Some(r)) => format!(
                "{} does not hold: {} against {} (shortfall of {})",
                expression,
                actual,
                required,
                num(r - a)
            ),
            (passed, ..) => format!(
                "{} {}: {} against {}",
                expression,
                if passed { "holds" } else { "does not hold" },
                actual,
                required
            ),
        };
        return Ok(Outcome {
            passed,
            actual: Some(actual),
            required: Some(required_text),
            detail,
        });
    }

    let passed = parsed.eval_bool(ctx)?;
    Ok(Outcome {
        passed,
        actual: Some(FieldValue::Bool(passed)),
        required: None,
        detail: format!(
            "{} {}",
            expression,
            if passed { "holds" } else { "does not hold" }
        ),
    })
}

/// Severity of an evaluated rule.
///
/// A failing mandatory rule is critical. A failing recommended rule is a
/// warning unless it declares a failing severity of its own. Informative
/// rules never fail.
pub fn severity(rule: &Rule, passed: bool) -> Severity {
    if passed {
        return Severity::Pass;
    }
    match rule.tier {
        SeverityTier::Mandatory => Severity::Critical,
        SeverityTier::Recommended => rule
            .severity
            .filter(|s| !s.is_passing())
            .unwrap_or(Severity::Warning),
        SeverityTier::Informative => Severity::Informative,
    }
}

fn finding(rule: &Rule, specialty: Specialty, outcome: Outcome) -> Finding {
    Finding {
        id: finding_id(specialty, &rule.id),
        rule_id: rule.id.clone(),
        specialty: specialty.id().to_string(),
        article: rule.article.clone(),
        regulation: rule.regulation.clone(),
        severity: severity(rule, outcome.passed),
        description: format!("{}: {}", rule.description, outcome.detail),
        actual: outcome.actual,
        required: outcome.required,
    }
}

fn diagnostic(rule: &Rule, specialty: Specialty, err: &RuleError) -> Finding {
    Finding {
        id: finding_id(specialty, &rule.id),
        rule_id: rule.id.clone(),
        specialty: specialty.id().to_string(),
        article: rule.article.clone(),
        regulation: rule.regulation.clone(),
        severity: Severity::Informative,
        description: format!("{}: rule could not be evaluated ({})", rule.description, err),
        actual: None,
        required: None,
    }
}

pub fn finding_id(specialty: Specialty, rule_id: &str) -> String {
    format!("{}.{}", specialty.id(), rule_id)
}

fn display(value: &FieldValue, unit: Option<&str>) -> String {
    match value.as_number() {
        Some(n) if !matches!(value, FieldValue::Text(_)) => with_unit(n, unit),
        _ => value.to_string(),
    }
}

fn with_unit(value: f64, unit: Option<&str>) -> String {
    match unit {
        Some(u) => format!("{} {}", num(value), u),
        None => num(value),
    }
}

/// Numbers rounded to two decimals, integers without a fraction
fn num(value: f64) -> String {
    FieldValue::Number((value * 100.0).round() / 100.0).to_string()
}
