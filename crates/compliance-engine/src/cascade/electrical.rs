//! Electrical-installation computed values

use super::fire_safety::{ByUsageClass, UsageClass, UsageType};
use super::gross_area;
use crate::error::{EngineError, Result};
use crate::specialty::Specialty;
use serde::{Deserialize, Serialize};
use shared_types::{BuildingProject, FieldValue};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectricalTables {
    /// VA per m² of floor area
    pub load_density_va_m2: ByUsageClass<f64>,
    /// Minimum contracted load for any installation
    pub min_load_kva: f64,
    /// Floor area served by one circuit
    pub circuit_area_m2: f64,
    pub min_circuits: u32,
    /// Loads above this need a three-phase supply
    pub three_phase_threshold_kva: f64,
    pub max_earth_resistance_ohm: f64,
    pub rcd_sensitivity_ma: f64,
}

impl Default for ElectricalTables {
    fn default() -> Self {
        Self {
            load_density_va_m2: ByUsageClass {
                residential: 50.0,
                standard: 80.0,
                sensitive: 100.0,
                storage: 40.0,
            },
            min_load_kva: 6.9,
            circuit_area_m2: 20.0,
            min_circuits: 3,
            three_phase_threshold_kva: 13.8,
            max_earth_resistance_ohm: 100.0,
            rcd_sensitivity_ma: 30.0,
        }
    }
}

impl ElectricalTables {
    pub fn validate(&self) -> Result<()> {
        let densities = [
            self.load_density_va_m2.residential,
            self.load_density_va_m2.standard,
            self.load_density_va_m2.sensitive,
            self.load_density_va_m2.storage,
        ];
        let all_positive = densities
            .iter()
            .chain([
                &self.min_load_kva,
                &self.circuit_area_m2,
                &self.three_phase_threshold_kva,
                &self.max_earth_resistance_ohm,
                &self.rcd_sensitivity_ma,
            ])
            .all(|v| v.is_finite() && *v > 0.0);
        if !all_positive || self.min_circuits == 0 {
            return Err(EngineError::InvalidConfig(
                "electrical: every table value must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElectricalInputs {
    pub area_m2: f64,
    pub class: UsageClass,
}

impl ElectricalInputs {
    pub fn from_project(project: &BuildingProject) -> Result<Self> {
        let area_m2 = gross_area(project, Specialty::Electrical.section())
            .ok_or_else(|| EngineError::invalid_shape(Specialty::Electrical, "grossArea"))?;
        let class = UsageType::resolve(project).map_or(UsageClass::Standard, |u| u.class());
        Ok(Self { area_m2, class })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricalValues {
    pub estimated_load_kva: f64,
    pub min_circuits: u32,
    pub requires_three_phase: bool,
    pub max_earth_resistance: f64,
    pub required_rcd_sensitivity: f64,
}

impl ElectricalValues {
    pub fn entries(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("estimatedLoadKva", self.estimated_load_kva.into()),
            ("minCircuits", self.min_circuits.into()),
            ("requiresThreePhase", self.requires_three_phase.into()),
            ("maxEarthResistance", self.max_earth_resistance.into()),
            ("requiredRcdSensitivity", self.required_rcd_sensitivity.into()),
        ]
    }
}

pub fn compute(inputs: &ElectricalInputs, tables: &ElectricalTables) -> ElectricalValues {
    let density = *tables.load_density_va_m2.get(inputs.class);
    let load = (inputs.area_m2 * density / 1000.0).max(tables.min_load_kva);
    let estimated_load_kva = (load * 100.0).round() / 100.0;
    let by_area = (inputs.area_m2 / tables.circuit_area_m2).ceil() as u32;

    ElectricalValues {
        estimated_load_kva,
        min_circuits: by_area.max(tables.min_circuits),
        requires_three_phase: estimated_load_kva > tables.three_phase_threshold_kva,
        max_earth_resistance: tables.max_earth_resistance_ohm,
        required_rcd_sensitivity: tables.rcd_sensitivity_ma,
    }
}
