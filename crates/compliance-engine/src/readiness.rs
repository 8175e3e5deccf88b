//! Readiness gate and section completion
//!
//! Both read the same specialty table, so "can analyze" and "percent
//! complete" never disagree about which fields matter.

use crate::specialty::{Specialty, BUILDING_TYPE_FIELD, GENERAL_SIZE_FIELDS};
use serde::{Deserialize, Serialize};
use shared_types::{BuildingProject, GENERAL_SECTION};

/// Whether `project` carries enough data to analyze `specialty`.
///
/// True when the specialty's discriminant is present, or when the general
/// building type is present together with a non-zero area, height or floor
/// count.
pub fn can_analyze(project: &BuildingProject, specialty: Specialty) -> bool {
    let requirements = specialty.requirements();
    if project.is_filled(requirements.section, requirements.discriminant) {
        return true;
    }
    project.is_filled(GENERAL_SECTION, BUILDING_TYPE_FIELD)
        && GENERAL_SIZE_FIELDS
            .iter()
            .any(|field| project.is_filled(GENERAL_SECTION, field))
}

/// Fill level of the fields one specialty tracks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionCompletion {
    pub specialty: Specialty,
    pub section: String,
    pub filled: usize,
    pub total: usize,
    /// 0..=100, rounded
    pub percentage: u8,
    /// Tracked fields still empty, as `section.field`
    pub missing: Vec<String>,
}

impl SectionCompletion {
    pub fn is_complete(&self) -> bool {
        self.filled == self.total
    }
}

pub fn section_completion(project: &BuildingProject, specialty: Specialty) -> SectionCompletion {
    let requirements = specialty.requirements();
    let tracked = requirements.tracked_fields();
    let missing: Vec<String> = tracked
        .iter()
        .filter(|(section, field)| !project.is_filled(section, field))
        .map(|(section, field)| format!("{}.{}", section, field))
        .collect();

    let total = tracked.len();
    let filled = total - missing.len();
    let percentage = if total == 0 {
        100
    } else {
        ((filled as f64 / total as f64) * 100.0).round() as u8
    };

    SectionCompletion {
        specialty,
        section: requirements.section.to_string(),
        filled,
        total,
        percentage,
        missing,
    }
}

/// Completion of every specialty, in table order
pub fn project_completion(project: &BuildingProject) -> Vec<SectionCompletion> {
    Specialty::ALL
        .iter()
        .map(|s| section_completion(project, *s))
        .collect()
}
