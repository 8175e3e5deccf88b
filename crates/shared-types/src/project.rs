//! Building project description
//!
//! A project is a set of named sections (one per specialty plus `general`),
//! each a flat mapping of field name to a primitive value. The caller owns the
//! project; the engine only reads it, or writes back through an explicit patch.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Name of the section holding building-wide fields
pub const GENERAL_SECTION: &str = "general";

/// A primitive field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            FieldValue::Text(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Bool(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            FieldValue::Number(n) => Some(*n != 0.0),
            FieldValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "yes" | "sim" => Some(true),
                "false" | "no" | "nao" | "não" => Some(false),
                _ => None,
            },
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Whether the value carries a usable signal (non-zero number, non-empty text)
    pub fn is_filled(&self) -> bool {
        match self {
            FieldValue::Bool(_) => true,
            FieldValue::Number(n) => *n != 0.0 && n.is_finite(),
            FieldValue::Text(s) => !s.trim().is_empty(),
        }
    }

    /// Short lowercase name of the value's type, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Bool(_) => "bool",
            FieldValue::Number(_) => "number",
            FieldValue::Text(_) => "text",
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                write!(f, "{}", *n as i64)
            }
            FieldValue::Number(n) => write!(f, "{}", n),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Number(f64::from(n))
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Bool(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// One section of the project: field name to value
pub type Section = BTreeMap<String, FieldValue>;

/// Errors raised when addressing project fields by path
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("empty field path")]
    Empty,

    #[error("field path '{0}' must have the form section.field")]
    Malformed(String),
}

/// A `section.field` address into a project
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    pub section: String,
    pub field: String,
}

impl FieldPath {
    pub fn new(section: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            section: section.into(),
            field: field.into(),
        }
    }

    /// Parse `section.field`; a bare `field` is placed in `default_section`
    pub fn parse(path: &str, default_section: &str) -> Result<Self, PathError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(PathError::Empty);
        }
        let parts: Vec<&str> = path.split('.').collect();
        match parts.as_slice() {
            [field] => Ok(Self::new(default_section, *field)),
            [section, field] if !section.is_empty() && !field.is_empty() => {
                Ok(Self::new(*section, *field))
            }
            _ => Err(PathError::Malformed(path.to_string())),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.field)
    }
}

/// Root aggregate describing one building project
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingProject {
    sections: BTreeMap<String, Section>,
}

impl BuildingProject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a project from its JSON representation (`{"section": {"field": value}}`).
    ///
    /// `null` values are dropped so that "absent" has a single representation.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, BTreeMap<String, Option<FieldValue>>> =
            serde_json::from_str(json)?;
        let sections = raw
            .into_iter()
            .map(|(name, fields)| {
                let section = fields
                    .into_iter()
                    .filter_map(|(k, v)| v.map(|v| (k, v)))
                    .collect::<Section>();
                (name, section)
            })
            .collect();
        Ok(Self { sections })
    }

    /// Builder-style setter, mostly for tests and fixtures
    pub fn with(mut self, section: &str, field: &str, value: impl Into<FieldValue>) -> Self {
        self.set(section, field, value);
        self
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.get(name)
    }

    pub fn sections(&self) -> impl Iterator<Item = (&String, &Section)> {
        self.sections.iter()
    }

    pub fn get(&self, section: &str, field: &str) -> Option<&FieldValue> {
        self.sections.get(section).and_then(|s| s.get(field))
    }

    pub fn get_path(&self, path: &FieldPath) -> Option<&FieldValue> {
        self.get(&path.section, &path.field)
    }

    /// Value at a dotted `section.field` path
    pub fn resolve(&self, path: &str) -> Option<&FieldValue> {
        let (section, field) = path.split_once('.')?;
        self.get(section, field)
    }

    pub fn number(&self, section: &str, field: &str) -> Option<f64> {
        self.get(section, field).and_then(FieldValue::as_number)
    }

    pub fn text(&self, section: &str, field: &str) -> Option<&str> {
        self.get(section, field)
            .and_then(FieldValue::as_text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn flag(&self, section: &str, field: &str) -> Option<bool> {
        self.get(section, field).and_then(FieldValue::as_bool)
    }

    /// Whether a field exists and carries a usable signal
    pub fn is_filled(&self, section: &str, field: &str) -> bool {
        self.get(section, field).is_some_and(FieldValue::is_filled)
    }

    /// Insert or overwrite a field, creating the section when needed
    pub fn set(&mut self, section: &str, field: &str, value: impl Into<FieldValue>) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(field.to_string(), value.into());
    }

    /// Total number of fields across all sections
    pub fn field_count(&self) -> usize {
        self.sections.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_json_drops_nulls() {
        let project = BuildingProject::from_json(
            r#"{"general": {"grossArea": 150, "height": null, "buildingType": "residential"},
                "fireSafety": {"usageType": "I", "hasSprinklers": false}}"#,
        )
        .unwrap();

        assert_eq!(project.number("general", "grossArea"), Some(150.0));
        assert_eq!(project.get("general", "height"), None);
        assert_eq!(project.text("fireSafety", "usageType"), Some("I"));
        assert_eq!(project.flag("fireSafety", "hasSprinklers"), Some(false));
        assert_eq!(project.field_count(), 4);
    }

    #[test]
    fn test_field_path_parsing() {
        assert_eq!(
            FieldPath::parse("general.grossArea", "fireSafety").unwrap(),
            FieldPath::new("general", "grossArea")
        );
        assert_eq!(
            FieldPath::parse("usageType", "fireSafety").unwrap(),
            FieldPath::new("fireSafety", "usageType")
        );
        assert!(matches!(
            FieldPath::parse("a.b.c", "x"),
            Err(PathError::Malformed(_))
        ));
        assert_eq!(FieldPath::parse("  ", "x"), Err(PathError::Empty));
    }

    #[test]
    fn test_resolve_dotted_path() {
        let project = BuildingProject::new().with("fireSafety", "usageType", "VIII");
        assert_eq!(
            project.resolve("fireSafety.usageType"),
            Some(&FieldValue::Text("VIII".to_string()))
        );
        assert_eq!(project.resolve("usageType"), None);
    }

    #[test]
    fn test_is_filled() {
        let project = BuildingProject::new()
            .with("general", "grossArea", 0.0)
            .with("general", "height", 12.0)
            .with("general", "buildingType", "  ");

        assert!(!project.is_filled("general", "grossArea"));
        assert!(project.is_filled("general", "height"));
        assert!(!project.is_filled("general", "buildingType"));
        assert!(!project.is_filled("general", "numberOfFloors"));
    }

    #[test]
    fn test_text_numbers_coerce() {
        let project = BuildingProject::new().with("general", "grossArea", "250.5");
        assert_eq!(project.number("general", "grossArea"), Some(250.5));
    }

    #[test]
    fn test_display_integers_without_fraction() {
        assert_eq!(FieldValue::Number(30.0).to_string(), "30");
        assert_eq!(FieldValue::Number(1.4).to_string(), "1.4");
        assert_eq!(FieldValue::Bool(true).to_string(), "true");
    }

    #[test]
    fn test_round_trips_through_serde() {
        let project = BuildingProject::new()
            .with("general", "buildingType", "commercial")
            .with("general", "grossArea", 500.0);
        let json = serde_json::to_string(&project).unwrap();
        assert_eq!(BuildingProject::from_json(&json).unwrap(), project);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn json_primitive() -> impl Strategy<Value = serde_json::Value> {
            prop_oneof![
                Just(serde_json::Value::Null),
                any::<bool>().prop_map(serde_json::Value::Bool),
                (-1.0e6f64..1.0e6).prop_map(|n| serde_json::json!(n)),
                "[a-zA-Z0-9 ]{0,10}".prop_map(serde_json::Value::String),
            ]
        }

        proptest! {
            /// Property: only null fields are dropped on load
            #[test]
            fn from_json_keeps_every_non_null_field(
                fields in prop::collection::btree_map("[a-z]{1,8}", json_primitive(), 0..12)
            ) {
                let non_null = fields.values().filter(|v| !v.is_null()).count();
                let json = serde_json::json!({ "general": fields }).to_string();
                let project = BuildingProject::from_json(&json).unwrap();
                prop_assert_eq!(project.field_count(), non_null);
            }

            /// Property: a number is filled iff it is non-zero
            #[test]
            fn numbers_are_filled_iff_non_zero(n in -1.0e6f64..1.0e6) {
                let project = BuildingProject::new().with("general", "grossArea", n);
                prop_assert_eq!(project.is_filled("general", "grossArea"), n != 0.0);
            }
        }
    }
}
