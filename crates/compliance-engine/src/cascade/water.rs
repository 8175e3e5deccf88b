//! Water-supply computed values
//!
//! Demand, design flow with the simultaneity curve, minimum pipe diameter for
//! the velocity limit, and the service pressure window.

use super::{floors, gross_area};
use crate::error::{EngineError, Result};
use crate::specialty::Specialty;
use serde::{Deserialize, Serialize};
use shared_types::{BuildingProject, FieldValue, GENERAL_SECTION};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterTables {
    /// Occupants per m² when the occupant count is not given
    pub occupancy_density: f64,
    pub per_capita_l_day: f64,
    /// Fixtures assumed per dwelling when the fixture count is not given
    pub fixtures_per_dwelling: u32,
    /// L/s per fixture
    pub fixture_flow_l_s: f64,
    pub simultaneity_coefficient: f64,
    pub simultaneity_exponent: f64,
    /// Accumulated flow (L/s) from which the simultaneity curve applies
    pub simultaneity_min_flow_l_s: f64,
    pub max_velocity_m_s: f64,
    /// Ascending commercial inner diameters
    pub commercial_diameters_mm: Vec<f64>,
    pub base_pressure_kpa: f64,
    pub pressure_per_floor_kpa: f64,
    pub max_pressure_kpa: f64,
}

impl Default for WaterTables {
    fn default() -> Self {
        Self {
            occupancy_density: 0.04,
            per_capita_l_day: 150.0,
            fixtures_per_dwelling: 2,
            fixture_flow_l_s: 0.15,
            simultaneity_coefficient: 0.5469,
            simultaneity_exponent: 0.5137,
            simultaneity_min_flow_l_s: 3.5,
            max_velocity_m_s: 2.0,
            commercial_diameters_mm: vec![
                16.0, 20.0, 25.0, 32.0, 40.0, 50.0, 63.0, 75.0, 90.0, 110.0, 125.0, 160.0,
            ],
            base_pressure_kpa: 100.0,
            pressure_per_floor_kpa: 40.0,
            max_pressure_kpa: 600.0,
        }
    }
}

impl WaterTables {
    pub fn validate(&self) -> Result<()> {
        let positive = [
            self.occupancy_density,
            self.per_capita_l_day,
            self.fixture_flow_l_s,
            self.simultaneity_coefficient,
            self.simultaneity_exponent,
            self.simultaneity_min_flow_l_s,
            self.max_velocity_m_s,
            self.base_pressure_kpa,
            self.max_pressure_kpa,
        ]
        .iter()
        .all(|v| v.is_finite() && *v > 0.0);
        if !positive || self.fixtures_per_dwelling == 0 {
            return Err(EngineError::InvalidConfig(
                "water: coefficients must be > 0".to_string(),
            ));
        }
        if self.commercial_diameters_mm.is_empty()
            || self.commercial_diameters_mm.windows(2).any(|w| w[0] >= w[1])
        {
            return Err(EngineError::InvalidConfig(
                "water: commercial diameters must be non-empty and strictly ascending".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WaterInputs {
    pub occupants: Option<u32>,
    pub area_m2: Option<f64>,
    pub fixtures: Option<u32>,
    pub dwellings: u32,
    pub floors: u32,
}

impl WaterInputs {
    /// Either the occupant count or the floor area must be present
    pub fn from_project(project: &BuildingProject) -> Result<Self> {
        let section = Specialty::Water.section();
        let count = |field: &str| {
            project
                .number(section, field)
                .filter(|n| n.is_finite() && *n > 0.0)
                .map(|n| n.ceil() as u32)
        };
        let occupants = count("occupants");
        let area_m2 = gross_area(project, section);
        if occupants.is_none() && area_m2.is_none() {
            return Err(EngineError::invalid_shape(Specialty::Water, "grossArea"));
        }
        let dwellings = project
            .number(GENERAL_SECTION, "numberOfDwellings")
            .filter(|n| n.is_finite() && *n >= 1.0)
            .map_or(1, |n| n.ceil() as u32);

        Ok(Self {
            occupants,
            area_m2,
            fixtures: count("fixtureCount"),
            dwellings,
            floors: floors(project, section),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterValues {
    pub occupants: u32,
    pub daily_demand_liters: f64,
    pub accumulated_flow: f64,
    pub design_flow: f64,
    pub min_pipe_diameter_mm: f64,
    pub min_pressure_kpa: f64,
    pub max_pressure_kpa: f64,
}

impl WaterValues {
    pub fn entries(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("occupants", self.occupants.into()),
            ("dailyDemandLiters", self.daily_demand_liters.into()),
            ("accumulatedFlow", self.accumulated_flow.into()),
            ("designFlow", self.design_flow.into()),
            ("minPipeDiameterMm", self.min_pipe_diameter_mm.into()),
            ("minPressureKpa", self.min_pressure_kpa.into()),
            ("maxPressureKpa", self.max_pressure_kpa.into()),
        ]
    }
}

pub fn compute(inputs: &WaterInputs, tables: &WaterTables) -> WaterValues {
    let occupants = inputs
        .occupants
        .or_else(|| {
            inputs
                .area_m2
                .map(|a| (a * tables.occupancy_density - 1e-9).ceil() as u32)
        })
        .unwrap_or(1)
        .max(1);
    let fixtures = inputs
        .fixtures
        .unwrap_or(inputs.dwellings * tables.fixtures_per_dwelling)
        .max(1);

    let accumulated_flow = f64::from(fixtures) * tables.fixture_flow_l_s;
    let design_flow = design_flow(accumulated_flow, tables);

    WaterValues {
        occupants,
        daily_demand_liters: f64::from(occupants) * tables.per_capita_l_day,
        accumulated_flow: round3(accumulated_flow),
        design_flow: round3(design_flow),
        min_pipe_diameter_mm: min_pipe_diameter(design_flow, tables),
        min_pressure_kpa: tables.base_pressure_kpa
            + tables.pressure_per_floor_kpa * f64::from(inputs.floors),
        max_pressure_kpa: tables.max_pressure_kpa,
    }
}

/// Simultaneous flow: the accumulated flow itself below the curve's
/// threshold, the simultaneity curve from it on
pub fn design_flow(accumulated_l_s: f64, tables: &WaterTables) -> f64 {
    if accumulated_l_s < tables.simultaneity_min_flow_l_s {
        return accumulated_l_s;
    }
    tables.simultaneity_coefficient * accumulated_l_s.powf(tables.simultaneity_exponent)
}

/// Smallest commercial diameter keeping velocity under the limit
pub fn min_pipe_diameter(flow_l_s: f64, tables: &WaterTables) -> f64 {
    let flow_m3_s = flow_l_s / 1000.0;
    let theoretical_mm =
        (4.0 * flow_m3_s / (std::f64::consts::PI * tables.max_velocity_m_s)).sqrt() * 1000.0;
    tables
        .commercial_diameters_mm
        .iter()
        .copied()
        .find(|d| *d >= theoretical_mm)
        .unwrap_or_else(|| theoretical_mm.ceil())
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}
