//! Energy-performance computed values
//!
//! Envelope transmittance limits and heating-need ceilings by winter climate
//! zone, relaxed for renovations.

use crate::error::{EngineError, Result};
use crate::specialty::Specialty;
use serde::{Deserialize, Serialize};
use shared_types::{BuildingProject, FieldValue};
use std::collections::BTreeMap;

/// Limits applying in one climate zone. U-values in W/m²·K.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneLimits {
    pub wall_u: f64,
    pub roof_u: f64,
    pub floor_u: f64,
    pub window_u: f64,
    /// kWh/m²·year
    pub heating_need: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnergyTables {
    pub zones: BTreeMap<String, ZoneLimits>,
    pub default_zone: String,
    /// Multiplier on every limit for renovations
    pub renovation_factor: f64,
    pub min_class_new: String,
    pub min_class_renovation: String,
}

impl Default for EnergyTables {
    fn default() -> Self {
        let zone = |wall_u, roof_u, floor_u, window_u, heating_need| ZoneLimits {
            wall_u,
            roof_u,
            floor_u,
            window_u,
            heating_need,
        };
        Self {
            zones: BTreeMap::from([
                ("I1".to_string(), zone(0.50, 0.40, 0.50, 2.80, 70.0)),
                ("I2".to_string(), zone(0.40, 0.35, 0.40, 2.40, 90.0)),
                ("I3".to_string(), zone(0.35, 0.30, 0.35, 2.20, 110.0)),
            ]),
            default_zone: "I1".to_string(),
            renovation_factor: 1.25,
            min_class_new: "B-".to_string(),
            min_class_renovation: "C".to_string(),
        }
    }
}

impl EnergyTables {
    pub fn validate(&self) -> Result<()> {
        if !self.zones.contains_key(&self.default_zone) {
            return Err(EngineError::InvalidConfig(format!(
                "energy: default zone '{}' has no limits",
                self.default_zone
            )));
        }
        let positive = |z: &ZoneLimits| {
            [z.wall_u, z.roof_u, z.floor_u, z.window_u, z.heating_need]
                .iter()
                .all(|v| v.is_finite() && *v > 0.0)
        };
        if let Some((name, _)) = self.zones.iter().find(|(_, z)| !positive(z)) {
            return Err(EngineError::InvalidConfig(format!(
                "energy: limits for zone '{}' must be > 0",
                name
            )));
        }
        if self.renovation_factor < 1.0 {
            return Err(EngineError::InvalidConfig(
                "energy: renovation factor must be >= 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Limits of `zone`; an unknown zone gets the strictest limits known
    fn limits(&self, zone: &str) -> Option<(&str, &ZoneLimits)> {
        self.zones
            .get_key_value(zone)
            .or_else(|| {
                let strictest = self
                    .zones
                    .iter()
                    .min_by(|a, b| a.1.wall_u.total_cmp(&b.1.wall_u));
                if let Some((name, _)) = strictest {
                    tracing::warn!(zone, fallback = %name, "unknown climate zone; applying the strictest limits");
                }
                strictest
            })
            .map(|(name, limits)| (name.as_str(), limits))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intervention {
    New,
    Renovation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnergyInputs {
    /// `None` uses the configured default zone
    pub climate_zone: Option<String>,
    pub intervention: Intervention,
}

impl EnergyInputs {
    pub fn from_project(project: &BuildingProject) -> Self {
        let section = Specialty::Energy.section();
        let intervention = match project
            .text(section, "interventionType")
            .map(str::to_lowercase)
            .as_deref()
        {
            Some("renovation" | "rehabilitation" | "reabilitacao" | "reabilitação") => {
                Intervention::Renovation
            }
            _ => Intervention::New,
        };
        Self {
            climate_zone: project
                .text(section, "climateZone")
                .map(|z| z.to_uppercase()),
            intervention,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyValues {
    pub climate_zone: String,
    pub max_wall_u: f64,
    pub max_roof_u: f64,
    pub max_floor_u: f64,
    pub max_window_u: f64,
    pub max_heating_need: f64,
    pub min_energy_class: String,
}

impl EnergyValues {
    pub fn entries(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("climateZone", self.climate_zone.clone().into()),
            ("maxWallU", self.max_wall_u.into()),
            ("maxRoofU", self.max_roof_u.into()),
            ("maxFloorU", self.max_floor_u.into()),
            ("maxWindowU", self.max_window_u.into()),
            ("maxHeatingNeed", self.max_heating_need.into()),
            ("minEnergyClass", self.min_energy_class.clone().into()),
        ]
    }
}

pub fn compute(inputs: &EnergyInputs, tables: &EnergyTables) -> EnergyValues {
    let requested = inputs.climate_zone.as_deref().unwrap_or(&tables.default_zone);
    let (zone, limits) = match tables.limits(requested) {
        Some((zone, limits)) => (zone.to_string(), limits.clone()),
        // validated tables always carry the default zone
        None => (
            requested.to_string(),
            ZoneLimits {
                wall_u: 0.35,
                roof_u: 0.30,
                floor_u: 0.35,
                window_u: 2.20,
                heating_need: 70.0,
            },
        ),
    };

    let (factor, min_class) = match inputs.intervention {
        Intervention::New => (1.0, &tables.min_class_new),
        Intervention::Renovation => (tables.renovation_factor, &tables.min_class_renovation),
    };

    EnergyValues {
        climate_zone: zone,
        max_wall_u: round2(limits.wall_u * factor),
        max_roof_u: round2(limits.roof_u * factor),
        max_floor_u: round2(limits.floor_u * factor),
        max_window_u: round2(limits.window_u * factor),
        max_heating_need: round2(limits.heating_need * factor),
        min_energy_class: min_class.clone(),
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
