use crate::project::FieldValue;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome severity of one evaluated rule, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Pass,
    Informative,
    Warning,
    Critical,
}

impl Severity {
    /// Pass and informative outcomes do not count against compliance
    pub fn is_passing(&self) -> bool {
        matches!(self, Severity::Pass | Severity::Informative)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Pass => "PASS",
            Severity::Informative => "INFO",
            Severity::Warning => "WARN",
            Severity::Critical => "CRIT",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One evaluated-rule outcome, traceable to its legal article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub id: String, // e.g., "fire_safety.SCIE-15"
    pub rule_id: String,
    pub specialty: String,
    pub article: String, // cited verbatim, e.g., "RT-SCIE art. 15.º"
    pub regulation: String,
    pub severity: Severity,
    pub description: String,
    pub actual: Option<FieldValue>,
    pub required: Option<String>,
}

impl Finding {
    pub fn is_failure(&self) -> bool {
        !self.severity.is_passing()
    }
}
