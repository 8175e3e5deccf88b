//! Computed-value cascades
//!
//! Each specialty with derived quantities has its own cascade. A cascade is
//! split in two: extracting inputs from the project, which fails with
//! [`EngineError::InvalidProjectShape`] when a structurally required field is
//! absent, and a pure computation over those inputs and the injected tables.

pub mod electrical;
pub mod energy;
pub mod fire_safety;
pub mod water;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::specialty::Specialty;
use serde::{Deserialize, Serialize};
use shared_types::{BuildingProject, FieldValue, GENERAL_SECTION};

pub use electrical::ElectricalValues;
pub use energy::EnergyValues;
pub use fire_safety::{FireSafetyValues, RiskCategory, UsageClass, UsageType};
pub use water::WaterValues;

/// Derived quantities of one specialty, created fresh for each analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "specialty", rename_all = "snake_case")]
pub enum ComputedValues {
    FireSafety(FireSafetyValues),
    Energy(EnergyValues),
    Electrical(ElectricalValues),
    Water(WaterValues),
    /// The specialty derives nothing; its rules read project fields only
    Empty,
}

impl ComputedValues {
    /// Every derived quantity as `(camelCase name, value)`
    pub fn entries(&self) -> Vec<(&'static str, FieldValue)> {
        match self {
            ComputedValues::FireSafety(v) => v.entries(),
            ComputedValues::Energy(v) => v.entries(),
            ComputedValues::Electrical(v) => v.entries(),
            ComputedValues::Water(v) => v.entries(),
            ComputedValues::Empty => Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.entries()
            .into_iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ComputedValues::Empty)
    }
}

/// Run the cascade of `specialty` against `project`
pub fn compute(
    specialty: Specialty,
    project: &BuildingProject,
    config: &EngineConfig,
) -> Result<ComputedValues> {
    let values = match specialty {
        Specialty::FireSafety => {
            let inputs = fire_safety::FireSafetyInputs::from_project(project)?;
            ComputedValues::FireSafety(fire_safety::compute(&inputs, &config.fire_safety))
        }
        Specialty::Energy => {
            let inputs = energy::EnergyInputs::from_project(project);
            ComputedValues::Energy(energy::compute(&inputs, &config.energy))
        }
        Specialty::Electrical => {
            let inputs = electrical::ElectricalInputs::from_project(project)?;
            ComputedValues::Electrical(electrical::compute(&inputs, &config.electrical))
        }
        Specialty::Water => {
            let inputs = water::WaterInputs::from_project(project)?;
            ComputedValues::Water(water::compute(&inputs, &config.water))
        }
        _ => ComputedValues::Empty,
    };
    Ok(values)
}

/// Gross floor area: the specialty section overrides `general`; non-positive
/// values count as absent
pub(crate) fn gross_area(project: &BuildingProject, section: &str) -> Option<f64> {
    positive(project, section, "grossArea")
}

/// Building height in metres, 0 when absent
pub(crate) fn height(project: &BuildingProject, section: &str) -> f64 {
    positive(project, section, "height").unwrap_or(0.0)
}

/// Number of floors, 1 when absent
pub(crate) fn floors(project: &BuildingProject, section: &str) -> u32 {
    positive(project, section, "numberOfFloors")
        .map(|n| n.ceil() as u32)
        .unwrap_or(1)
}

fn positive(project: &BuildingProject, section: &str, field: &str) -> Option<f64> {
    project
        .number(section, field)
        .filter(|n| n.is_finite() && *n > 0.0)
        .or_else(|| {
            project
                .number(GENERAL_SECTION, field)
                .filter(|n| n.is_finite() && *n > 0.0)
        })
}
