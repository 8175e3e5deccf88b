//! Fire-safety computed values
//!
//! Derives, in dependency order, the quantities the fire-safety rules are
//! judged against: occupant load, risk category, required fire resistance,
//! compartmentation, evacuation and first-intervention requirements.
//!
//! All coefficients live in [`FireSafetyTables`], injected through the engine
//! configuration, so several regulation versions can coexist.

use super::{floors, gross_area, height};
use crate::error::{EngineError, Result};
use crate::specialty::{Specialty, BUILDING_TYPE_FIELD};
use serde::{Deserialize, Serialize};
use shared_types::{BuildingProject, FieldValue, GENERAL_SECTION};
use std::collections::BTreeMap;

/// Field carrying the usage-type discriminant in the fire-safety section
pub const USAGE_TYPE_FIELD: &str = "usageType";

/// Fire-safety usage type (utilização-tipo), I to XII
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UsageType {
    I,
    II,
    III,
    IV,
    V,
    VI,
    VII,
    VIII,
    IX,
    X,
    XI,
    XII,
}

impl UsageType {
    pub const ALL: [UsageType; 12] = [
        UsageType::I,
        UsageType::II,
        UsageType::III,
        UsageType::IV,
        UsageType::V,
        UsageType::VI,
        UsageType::VII,
        UsageType::VIII,
        UsageType::IX,
        UsageType::X,
        UsageType::XI,
        UsageType::XII,
    ];

    /// Roman-numeral code, also the key used in configuration tables
    pub fn code(&self) -> &'static str {
        match self {
            UsageType::I => "I",
            UsageType::II => "II",
            UsageType::III => "III",
            UsageType::IV => "IV",
            UsageType::V => "V",
            UsageType::VI => "VI",
            UsageType::VII => "VII",
            UsageType::VIII => "VIII",
            UsageType::IX => "IX",
            UsageType::X => "X",
            UsageType::XI => "XI",
            UsageType::XII => "XII",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            UsageType::I => "Residential",
            UsageType::II => "Car parks",
            UsageType::III => "Administrative",
            UsageType::IV => "Schools",
            UsageType::V => "Hospitals and elderly care",
            UsageType::VI => "Performance and public gatherings",
            UsageType::VII => "Hotels and restaurants",
            UsageType::VIII => "Commercial and transport stations",
            UsageType::IX => "Sports and leisure",
            UsageType::X => "Museums and art galleries",
            UsageType::XI => "Libraries and archives",
            UsageType::XII => "Industrial, workshops and warehouses",
        }
    }

    /// Parse a roman (`"VIII"`) or arabic (`"8"`) numeral, case-insensitive
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_uppercase();
        let s = s.strip_prefix("UT").map(str::trim).unwrap_or(&s);
        if let Ok(n) = s.parse::<usize>() {
            return n.checked_sub(1).and_then(|i| Self::ALL.get(i)).copied();
        }
        Self::ALL.into_iter().find(|u| u.code() == s)
    }

    /// Map a general building type to its usual usage type
    pub fn from_building_type(building_type: &str) -> Option<Self> {
        match building_type.trim().to_lowercase().as_str() {
            "residential" | "housing" | "dwelling" | "habitacional" => Some(UsageType::I),
            "parking" | "car_park" | "garage" | "estacionamento" => Some(UsageType::II),
            "office" | "administrative" | "services" | "administrativo" => Some(UsageType::III),
            "school" | "educational" | "escolar" => Some(UsageType::IV),
            "hospital" | "healthcare" | "elderly_care" | "hospitalar" => Some(UsageType::V),
            "assembly" | "theatre" | "cinema" | "entertainment" => Some(UsageType::VI),
            "hotel" | "restaurant" | "hospitality" | "hoteleiro" => Some(UsageType::VII),
            "commercial" | "retail" | "shop" | "station" | "comercial" => Some(UsageType::VIII),
            "sports" | "leisure" | "desportivo" => Some(UsageType::IX),
            "museum" | "gallery" | "museu" => Some(UsageType::X),
            "library" | "archive" | "biblioteca" => Some(UsageType::XI),
            "industrial" | "warehouse" | "workshop" | "industria" => Some(UsageType::XII),
            _ => None,
        }
    }

    /// Usage type declared in the fire-safety section, else derived from the
    /// general building type
    pub fn resolve(project: &BuildingProject) -> Option<Self> {
        let section = Specialty::FireSafety.section();
        project
            .text(section, USAGE_TYPE_FIELD)
            .and_then(Self::parse)
            .or_else(|| {
                project
                    .text(GENERAL_SECTION, BUILDING_TYPE_FIELD)
                    .and_then(Self::from_building_type)
            })
    }

    pub fn class(&self) -> UsageClass {
        match self {
            UsageType::I => UsageClass::Residential,
            UsageType::IV | UsageType::V | UsageType::VI => UsageClass::Sensitive,
            UsageType::II | UsageType::XI | UsageType::XII => UsageClass::Storage,
            _ => UsageClass::Standard,
        }
    }
}

impl std::fmt::Display for UsageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Grouping of usage types sharing resistance and compartment requirements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageClass {
    Residential,
    Standard,
    /// Occupants with reduced mobility or in large numbers
    Sensitive,
    /// High fire load
    Storage,
}

/// Ordered risk category, 1 (lowest) to 4 (highest)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RiskCategory {
    One = 1,
    Two = 2,
    Three = 3,
    Four = 4,
}

impl RiskCategory {
    pub const ALL: [RiskCategory; 4] = [
        RiskCategory::One,
        RiskCategory::Two,
        RiskCategory::Three,
        RiskCategory::Four,
    ];

    /// Zero-based position, used to index per-category tables
    pub fn index(&self) -> usize {
        *self as usize - 1
    }

    pub fn number(&self) -> u8 {
        *self as u8
    }
}

impl TryFrom<u8> for RiskCategory {
    type Error = String;

    fn try_from(n: u8) -> std::result::Result<Self, Self::Error> {
        match n {
            1 => Ok(RiskCategory::One),
            2 => Ok(RiskCategory::Two),
            3 => Ok(RiskCategory::Three),
            4 => Ok(RiskCategory::Four),
            other => Err(format!("risk category must be 1-4, got {}", other)),
        }
    }
}

impl From<RiskCategory> for u8 {
    fn from(c: RiskCategory) -> Self {
        c.number()
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// One value per usage class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ByUsageClass<T> {
    pub residential: T,
    pub standard: T,
    pub sensitive: T,
    pub storage: T,
}

impl<T> ByUsageClass<T> {
    pub fn get(&self, class: UsageClass) -> &T {
        match class {
            UsageClass::Residential => &self.residential,
            UsageClass::Standard => &self.standard,
            UsageClass::Sensitive => &self.sensitive,
            UsageClass::Storage => &self.storage,
        }
    }

    fn iter(&self) -> impl Iterator<Item = &T> {
        [&self.residential, &self.standard, &self.sensitive, &self.storage].into_iter()
    }
}

/// Upper bounds a building must respect to fall in `category`.
/// A missing bound is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryBound {
    pub category: RiskCategory,
    #[serde(default)]
    pub max_height_m: Option<f64>,
    #[serde(default)]
    pub max_area_m2: Option<f64>,
    #[serde(default)]
    pub max_occupancy: Option<u32>,
}

impl CategoryBound {
    fn new(category: RiskCategory, height: f64, area: f64, occupancy: u32) -> Self {
        Self {
            category,
            max_height_m: Some(height),
            max_area_m2: Some(area),
            max_occupancy: Some(occupancy),
        }
    }

    fn unbounded(category: RiskCategory) -> Self {
        Self {
            category,
            max_height_m: None,
            max_area_m2: None,
            max_occupancy: None,
        }
    }

    pub fn fits(&self, height_m: f64, area_m2: f64, occupant_load: u32) -> bool {
        self.max_height_m.map_or(true, |max| height_m <= max)
            && self.max_area_m2.map_or(true, |max| area_m2 <= max)
            && self.max_occupancy.map_or(true, |max| occupant_load <= max)
    }
}

/// Coefficients of the evacuation and first-intervention formulas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvacuationParameters {
    /// Up to this load a single passage unit and a single exit suffice
    pub single_unit_max_occupants: u32,
    pub occupants_per_unit: u32,
    pub single_unit_width_m: f64,
    pub two_unit_width_m: f64,
    pub unit_width_m: f64,
    /// Loads above this use `large_occupants_per_exit`
    pub large_occupancy_threshold: u32,
    pub occupants_per_exit: u32,
    pub large_occupants_per_exit: u32,
    /// Floor area covered by one portable extinguisher
    pub extinguisher_coverage_m2: f64,
    /// Compartment area multiplier when sprinklers are installed
    pub sprinkler_compartment_factor: f64,
}

impl Default for EvacuationParameters {
    fn default() -> Self {
        Self {
            single_unit_max_occupants: 50,
            occupants_per_unit: 100,
            single_unit_width_m: 0.9,
            two_unit_width_m: 1.4,
            unit_width_m: 0.6,
            large_occupancy_threshold: 1500,
            occupants_per_exit: 500,
            large_occupants_per_exit: 1000,
            extinguisher_coverage_m2: 200.0,
            sprinkler_compartment_factor: 2.0,
        }
    }
}

/// Reference tables of the fire-safety cascade
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireSafetyTables {
    /// Persons per m², keyed by usage-type code
    pub occupancy_density: BTreeMap<String, f64>,
    /// Category bounds, keyed by usage-type code
    pub category_bounds: BTreeMap<String, Vec<CategoryBound>>,
    /// Required fire resistance in minutes, per category 1..4
    pub required_resistance_min: ByUsageClass<[u32; 4]>,
    pub max_compartment_area_m2: ByUsageClass<f64>,
    pub max_evacuation_distance_m: [f64; 4],
    pub max_dead_end_distance_m: [f64; 4],
    pub sprinkler_category: RiskCategory,
    pub detection_category: RiskCategory,
    pub evacuation: EvacuationParameters,
}

// (usage type, [(max height m, max area m², max occupancy); categories 1..3])
const DEFAULT_BOUNDS: [(UsageType, [(f64, f64, u32); 3]); 12] = [
    (UsageType::I, [(9.0, 2000.0, 200), (28.0, 10000.0, 1000), (50.0, 50000.0, 5000)]),
    (UsageType::II, [(9.0, 3200.0, 100), (28.0, 9600.0, 500), (28.0, 32000.0, 1500)]),
    (UsageType::III, [(9.0, 1000.0, 100), (28.0, 5000.0, 1000), (50.0, 20000.0, 5000)]),
    (UsageType::IV, [(9.0, 1000.0, 100), (9.0, 3000.0, 500), (28.0, 10000.0, 1500)]),
    (UsageType::V, [(9.0, 500.0, 50), (9.0, 2000.0, 200), (28.0, 8000.0, 800)]),
    (UsageType::VI, [(9.0, 1000.0, 200), (28.0, 3000.0, 1000), (28.0, 10000.0, 5000)]),
    (UsageType::VII, [(9.0, 1000.0, 100), (28.0, 4000.0, 500), (28.0, 12000.0, 1500)]),
    (UsageType::VIII, [(9.0, 1000.0, 100), (28.0, 5000.0, 1000), (28.0, 20000.0, 5000)]),
    (UsageType::IX, [(9.0, 1000.0, 100), (28.0, 5000.0, 1000), (28.0, 15000.0, 5000)]),
    (UsageType::X, [(9.0, 1000.0, 100), (28.0, 3000.0, 500), (28.0, 10000.0, 1500)]),
    (UsageType::XI, [(9.0, 1000.0, 100), (28.0, 3000.0, 500), (28.0, 10000.0, 1500)]),
    (UsageType::XII, [(9.0, 1000.0, 100), (9.0, 5000.0, 500), (28.0, 15000.0, 1500)]),
];

const DEFAULT_DENSITY: [(UsageType, f64); 12] = [
    (UsageType::I, 0.04),
    (UsageType::II, 0.05),
    (UsageType::III, 0.10),
    (UsageType::IV, 0.50),
    (UsageType::V, 0.20),
    (UsageType::VI, 1.00),
    (UsageType::VII, 0.50),
    (UsageType::VIII, 0.20),
    (UsageType::IX, 0.25),
    (UsageType::X, 0.35),
    (UsageType::XI, 0.20),
    (UsageType::XII, 0.05),
];

impl Default for FireSafetyTables {
    fn default() -> Self {
        let occupancy_density = DEFAULT_DENSITY
            .iter()
            .map(|(usage, density)| (usage.code().to_string(), *density))
            .collect();

        let category_bounds = DEFAULT_BOUNDS
            .iter()
            .map(|(usage, bounds)| {
                let mut list: Vec<CategoryBound> = bounds
                    .iter()
                    .zip(RiskCategory::ALL)
                    .map(|(&(h, a, o), category)| CategoryBound::new(category, h, a, o))
                    .collect();
                list.push(CategoryBound::unbounded(RiskCategory::Four));
                (usage.code().to_string(), list)
            })
            .collect();

        Self {
            occupancy_density,
            category_bounds,
            required_resistance_min: ByUsageClass {
                residential: [30, 60, 90, 120],
                standard: [30, 60, 90, 120],
                sensitive: [60, 90, 120, 180],
                storage: [60, 90, 120, 180],
            },
            max_compartment_area_m2: ByUsageClass {
                residential: 1600.0,
                standard: 1600.0,
                sensitive: 800.0,
                storage: 3200.0,
            },
            max_evacuation_distance_m: [30.0, 30.0, 25.0, 20.0],
            max_dead_end_distance_m: [15.0, 15.0, 12.0, 10.0],
            sprinkler_category: RiskCategory::Three,
            detection_category: RiskCategory::Two,
            evacuation: EvacuationParameters::default(),
        }
    }
}

impl FireSafetyTables {
    /// Check the invariants the cascade relies on
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(EngineError::InvalidConfig(format!("fire_safety: {}", msg)));

        if let Some((usage, d)) = self
            .occupancy_density
            .iter()
            .find(|(_, d)| !(d.is_finite() && **d > 0.0))
        {
            return invalid(format!("occupancy density for {} must be > 0, got {}", usage, d));
        }
        for (usage, bounds) in &self.category_bounds {
            if bounds.windows(2).any(|w| w[0].category >= w[1].category) {
                return invalid(format!(
                    "category bounds for {} must be listed in strictly increasing category order",
                    usage
                ));
            }
        }
        for row in self.required_resistance_min.iter() {
            if row.iter().any(|r| *r == 0) || row.windows(2).any(|w| w[0] > w[1]) {
                return invalid(format!(
                    "required resistance {:?} must be positive and non-decreasing by category",
                    row
                ));
            }
        }
        if self.max_compartment_area_m2.iter().any(|a| *a <= 0.0) {
            return invalid("compartment areas must be > 0".to_string());
        }
        let mut distances = self
            .max_evacuation_distance_m
            .iter()
            .chain(self.max_dead_end_distance_m.iter());
        if distances.any(|d| *d <= 0.0) {
            return invalid("evacuation distances must be > 0".to_string());
        }
        if self.detection_category >= self.sprinkler_category {
            return invalid(format!(
                "detection category ({}) must be below sprinkler category ({})",
                self.detection_category, self.sprinkler_category
            ));
        }
        let evac = &self.evacuation;
        if evac.occupants_per_unit == 0
            || evac.occupants_per_exit == 0
            || evac.large_occupants_per_exit == 0
            || evac.extinguisher_coverage_m2 <= 0.0
            || evac.unit_width_m <= 0.0
            || evac.single_unit_width_m <= 0.0
            || evac.two_unit_width_m <= 0.0
            || evac.sprinkler_compartment_factor < 1.0
        {
            return invalid("evacuation parameters must be positive".to_string());
        }
        Ok(())
    }

    pub fn density(&self, usage: UsageType) -> Option<f64> {
        self.occupancy_density.get(usage.code()).copied()
    }
}

/// Primary inputs of the fire-safety cascade
#[derive(Debug, Clone, PartialEq)]
pub struct FireSafetyInputs {
    pub usage_type: UsageType,
    pub area_m2: f64,
    /// Defaults to 0 when absent
    pub height_m: f64,
    /// Defaults to 1 when absent
    pub floors: u32,
}

impl FireSafetyInputs {
    /// Extract inputs, failing when a structurally required primitive is absent
    pub fn from_project(project: &BuildingProject) -> Result<Self> {
        let section = Specialty::FireSafety.section();
        let usage_type = UsageType::resolve(project)
            .ok_or_else(|| EngineError::invalid_shape(Specialty::FireSafety, USAGE_TYPE_FIELD))?;
        let area_m2 = gross_area(project, section)
            .ok_or_else(|| EngineError::invalid_shape(Specialty::FireSafety, "grossArea"))?;

        Ok(Self {
            usage_type,
            area_m2,
            height_m: height(project, section),
            floors: floors(project, section),
        })
    }
}

/// Derived fire-safety quantities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FireSafetyValues {
    pub usage_type: UsageType,
    pub occupant_load: u32,
    pub risk_category: RiskCategory,
    /// Minutes
    pub required_resistance: u32,
    pub max_compartment_area: f64,
    pub required_evacuation_width: f64,
    pub min_exits_required: u32,
    pub required_evacuation_capacity_units: u32,
    pub max_evacuation_distance: f64,
    pub max_dead_end_distance: f64,
    pub required_extinguishers: u32,
    pub sprinklers_required: bool,
    pub detection_required: bool,
}

impl FireSafetyValues {
    pub fn entries(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("usageType", self.usage_type.code().into()),
            ("occupantLoad", self.occupant_load.into()),
            ("riskCategory", u32::from(self.risk_category.number()).into()),
            ("requiredResistance", self.required_resistance.into()),
            ("maxCompartmentArea", self.max_compartment_area.into()),
            ("requiredEvacuationWidth", self.required_evacuation_width.into()),
            ("minExitsRequired", self.min_exits_required.into()),
            (
                "requiredEvacuationCapacityUnits",
                self.required_evacuation_capacity_units.into(),
            ),
            ("maxEvacuationDistance", self.max_evacuation_distance.into()),
            ("maxDeadEndDistance", self.max_dead_end_distance.into()),
            ("requiredExtinguishers", self.required_extinguishers.into()),
            ("sprinklersRequired", self.sprinklers_required.into()),
            ("detectionRequired", self.detection_required.into()),
        ]
    }
}

/// Run the cascade. Each step only reads values produced by earlier steps.
pub fn compute(inputs: &FireSafetyInputs, tables: &FireSafetyTables) -> FireSafetyValues {
    let usage = inputs.usage_type;
    let class = usage.class();

    let occupant_load = occupant_load(inputs.area_m2, usage, tables);
    let risk_category = risk_category(usage, inputs.height_m, inputs.area_m2, occupant_load, tables);
    let required_resistance = required_resistance(risk_category, class, tables);

    let sprinklers_required = risk_category >= tables.sprinkler_category;
    let detection_required = risk_category >= tables.detection_category;

    let evac = &tables.evacuation;
    let units = evacuation_units(occupant_load, evac);

    let compartment_base = *tables.max_compartment_area_m2.get(class);
    let max_compartment_area = if sprinklers_required {
        compartment_base * evac.sprinkler_compartment_factor
    } else {
        compartment_base
    };

    tracing::debug!(
        usage_type = %usage,
        occupant_load,
        risk_category = %risk_category,
        required_resistance,
        "fire safety cascade computed"
    );

    FireSafetyValues {
        usage_type: usage,
        occupant_load,
        risk_category,
        required_resistance,
        max_compartment_area,
        required_evacuation_width: evacuation_width(units, evac),
        min_exits_required: min_exits(occupant_load, evac),
        required_evacuation_capacity_units: units,
        max_evacuation_distance: tables.max_evacuation_distance_m[risk_category.index()],
        max_dead_end_distance: tables.max_dead_end_distance_m[risk_category.index()],
        required_extinguishers: required_extinguishers(inputs.area_m2, inputs.floors, evac),
        sprinklers_required,
        detection_required,
    }
}

/// `ceil(area × density)`, at least one occupant
pub fn occupant_load(area_m2: f64, usage: UsageType, tables: &FireSafetyTables) -> u32 {
    let density = tables.density(usage).unwrap_or_else(|| {
        let fallback = tables
            .occupancy_density
            .values()
            .copied()
            .fold(f64::MIN, f64::max)
            .max(1.0);
        tracing::warn!(usage_type = %usage, fallback, "no occupancy density; using the highest known");
        fallback
    });
    // tolerance absorbs float noise such as 150 × 0.04 = 6.000000000000001
    let raw = (area_m2 * density - 1e-9).ceil();
    (raw.max(1.0).min(f64::from(u32::MAX))) as u32
}

/// Smallest category whose height, area and occupancy bounds all hold;
/// the highest defined category when none does
pub fn risk_category(
    usage: UsageType,
    height_m: f64,
    area_m2: f64,
    occupant_load: u32,
    tables: &FireSafetyTables,
) -> RiskCategory {
    let Some(bounds) = tables
        .category_bounds
        .get(usage.code())
        .filter(|b| !b.is_empty())
    else {
        tracing::warn!(usage_type = %usage, "no category bounds; assigning the highest category");
        return RiskCategory::Four;
    };

    let mut sorted: Vec<&CategoryBound> = bounds.iter().collect();
    sorted.sort_by_key(|b| b.category);

    sorted
        .iter()
        .find(|b| b.fits(height_m, area_m2, occupant_load))
        .map(|b| b.category)
        .unwrap_or_else(|| {
            let highest = sorted.last().map_or(RiskCategory::Four, |b| b.category);
            tracing::warn!(
                usage_type = %usage,
                height_m,
                area_m2,
                occupant_load,
                category = %highest,
                "building exceeds every category bound; assigning the highest defined category"
            );
            highest
        })
}

pub fn required_resistance(
    category: RiskCategory,
    class: UsageClass,
    tables: &FireSafetyTables,
) -> u32 {
    tables.required_resistance_min.get(class)[category.index()]
}

pub fn evacuation_units(occupant_load: u32, evac: &EvacuationParameters) -> u32 {
    if occupant_load <= evac.single_unit_max_occupants {
        1
    } else {
        occupant_load.div_ceil(evac.occupants_per_unit) + 1
    }
}

pub fn evacuation_width(units: u32, evac: &EvacuationParameters) -> f64 {
    match units {
        0 | 1 => evac.single_unit_width_m,
        2 => evac.two_unit_width_m,
        n => f64::from(n) * evac.unit_width_m,
    }
}

pub fn min_exits(occupant_load: u32, evac: &EvacuationParameters) -> u32 {
    if occupant_load <= evac.single_unit_max_occupants {
        1
    } else if occupant_load <= evac.large_occupancy_threshold {
        1 + occupant_load.div_ceil(evac.occupants_per_exit)
    } else {
        2 + occupant_load.div_ceil(evac.large_occupants_per_exit)
    }
}

pub fn required_extinguishers(area_m2: f64, floors: u32, evac: &EvacuationParameters) -> u32 {
    let by_area = (area_m2 / evac.extinguisher_coverage_m2).ceil().max(1.0) as u32;
    by_area.max(floors).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn inputs(usage: UsageType, area: f64, height: f64) -> FireSafetyInputs {
        FireSafetyInputs {
            usage_type: usage,
            area_m2: area,
            height_m: height,
            floors: 1,
        }
    }

    #[test]
    fn test_small_dwelling_is_category_one() {
        let values = compute(&inputs(UsageType::I, 150.0, 0.0), &FireSafetyTables::default());

        assert_eq!(values.occupant_load, 6);
        assert_eq!(values.risk_category, RiskCategory::One);
        assert_eq!(values.required_resistance, 30);
        assert!(!values.sprinklers_required);
        assert!(!values.detection_required);
        assert_eq!(values.min_exits_required, 1);
        assert_eq!(values.required_evacuation_capacity_units, 1);
        assert_eq!(values.required_evacuation_width, 0.9);
        assert_eq!(values.required_extinguishers, 1);
    }

    #[test]
    fn test_commercial_above_nine_metres_is_category_two() {
        let values = compute(
            &inputs(UsageType::VIII, 500.0, 12.0),
            &FireSafetyTables::default(),
        );

        assert_eq!(values.occupant_load, 100);
        assert_eq!(values.risk_category, RiskCategory::Two);
        assert_eq!(values.required_resistance, 60);
        assert!(values.detection_required);
        assert!(!values.sprinklers_required);
        assert_eq!(values.required_evacuation_capacity_units, 2);
        assert_eq!(values.required_evacuation_width, 1.4);
        assert_eq!(values.min_exits_required, 2);
        assert_eq!(values.max_evacuation_distance, 30.0);
        assert_eq!(values.required_extinguishers, 3);
    }

    #[test]
    fn test_large_building_requires_sprinklers_and_doubles_compartment() {
        let values = compute(
            &inputs(UsageType::VIII, 8000.0, 20.0),
            &FireSafetyTables::default(),
        );

        assert_eq!(values.occupant_load, 1600);
        assert_eq!(values.risk_category, RiskCategory::Three);
        assert!(values.sprinklers_required);
        assert_eq!(values.max_compartment_area, 3200.0);
        assert_eq!(values.min_exits_required, 4);
    }

    #[test]
    fn test_category_needs_all_three_bounds() {
        let tables = FireSafetyTables::default();
        // height and area fit category 1, occupancy does not
        assert_eq!(
            risk_category(UsageType::V, 3.0, 400.0, 60, &tables),
            RiskCategory::Two
        );
        assert_eq!(
            risk_category(UsageType::V, 3.0, 400.0, 50, &tables),
            RiskCategory::One
        );
    }

    #[test]
    fn test_fail_safe_assigns_highest_defined_category() {
        let mut tables = FireSafetyTables::default();
        tables.category_bounds.insert(
            "III".to_string(),
            vec![
                CategoryBound::new(RiskCategory::One, 9.0, 100.0, 10),
                CategoryBound::new(RiskCategory::Two, 9.0, 200.0, 20),
            ],
        );

        assert_eq!(
            risk_category(UsageType::III, 30.0, 5000.0, 500, &tables),
            RiskCategory::Two
        );

        tables.category_bounds.remove("III");
        assert_eq!(
            risk_category(UsageType::III, 3.0, 50.0, 5, &tables),
            RiskCategory::Four
        );
    }

    #[test]
    fn test_usage_type_parsing() {
        assert_eq!(UsageType::parse("VIII"), Some(UsageType::VIII));
        assert_eq!(UsageType::parse("viii"), Some(UsageType::VIII));
        assert_eq!(UsageType::parse("8"), Some(UsageType::VIII));
        assert_eq!(UsageType::parse("UT XII"), Some(UsageType::XII));
        assert_eq!(UsageType::parse("0"), None);
        assert_eq!(UsageType::parse("13"), None);
        assert_eq!(UsageType::parse("XIII"), None);
    }

    #[test]
    fn test_usage_type_resolution_prefers_explicit_field() {
        let project = BuildingProject::new()
            .with("general", "buildingType", "commercial")
            .with("fireSafety", "usageType", "III");
        assert_eq!(UsageType::resolve(&project), Some(UsageType::III));

        let project = BuildingProject::new().with("general", "buildingType", "Hotel");
        assert_eq!(UsageType::resolve(&project), Some(UsageType::VII));

        let project = BuildingProject::new().with("general", "buildingType", "spaceport");
        assert_eq!(UsageType::resolve(&project), None);
    }

    #[test]
    fn test_inputs_require_area() {
        let project = BuildingProject::new().with("fireSafety", "usageType", "I");
        let err = FireSafetyInputs::from_project(&project).unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidProjectShape { ref field, .. } if field == "grossArea"
        ));
    }

    #[test]
    fn test_default_tables_are_valid() {
        FireSafetyTables::default().validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_inverted_thresholds() {
        let tables = FireSafetyTables {
            detection_category: RiskCategory::Three,
            ..FireSafetyTables::default()
        };
        assert!(matches!(tables.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_taller_building_tightens_requirements() {
        let tables = FireSafetyTables::default();
        let low = compute(&inputs(UsageType::VIII, 500.0, 5.0), &tables);
        let high = compute(&inputs(UsageType::VIII, 500.0, 40.0), &tables);

        assert_eq!(low.risk_category, RiskCategory::One);
        assert_eq!(high.risk_category, RiskCategory::Four);
        assert!(low.required_resistance < high.required_resistance);
        assert!(!low.sprinklers_required && high.sprinklers_required);
        assert!(!low.detection_required && high.detection_required);
    }

    fn any_usage() -> impl Strategy<Value = UsageType> {
        (0usize..12).prop_map(|i| UsageType::ALL[i])
    }

    proptest! {
        /// Property: every required quantity is strictly positive
        #[test]
        fn required_values_are_positive(
            usage in any_usage(),
            area in 1.0f64..100_000.0,
            height in 0.0f64..120.0,
            floors in 1u32..40,
        ) {
            let values = compute(
                &FireSafetyInputs { usage_type: usage, area_m2: area, height_m: height, floors },
                &FireSafetyTables::default(),
            );
            prop_assert!(values.occupant_load > 0);
            prop_assert!(values.required_resistance > 0);
            prop_assert!(values.max_compartment_area > 0.0);
            prop_assert!(values.required_evacuation_width > 0.0);
            prop_assert!(values.min_exits_required > 0);
            prop_assert!(values.required_evacuation_capacity_units > 0);
            prop_assert!(values.max_evacuation_distance > 0.0);
            prop_assert!(values.max_dead_end_distance > 0.0);
            prop_assert!(values.required_extinguishers > 0);
        }

        /// Property: a higher category never relaxes resistance, sprinklers or detection
        #[test]
        fn category_is_monotonic(
            usage in any_usage(),
            area in 1.0f64..30_000.0,
            h1 in 0.0f64..80.0,
            extra in 0.0f64..60.0,
            thresholds in prop::sample::select(vec![
                (RiskCategory::Two, RiskCategory::Three),
                (RiskCategory::One, RiskCategory::Two),
                (RiskCategory::Three, RiskCategory::Four),
            ]),
        ) {
            let tables = FireSafetyTables {
                detection_category: thresholds.0,
                sprinkler_category: thresholds.1,
                ..FireSafetyTables::default()
            };
            let low = compute(&inputs(usage, area, h1), &tables);
            let high = compute(&inputs(usage, area, h1 + extra), &tables);

            prop_assert!(low.risk_category <= high.risk_category);
            prop_assert!(low.required_resistance <= high.required_resistance);
            prop_assert!(low.sprinklers_required <= high.sprinklers_required);
            prop_assert!(low.detection_required <= high.detection_required);
        }

        /// Property: a taller building never gets a lower category
        #[test]
        fn height_never_lowers_category(
            usage in any_usage(),
            area in 1.0f64..30_000.0,
            h1 in 0.0f64..80.0,
            extra in 0.0f64..40.0,
        ) {
            let tables = FireSafetyTables::default();
            let load = occupant_load(area, usage, &tables);
            prop_assert!(
                risk_category(usage, h1, area, load, &tables)
                    <= risk_category(usage, h1 + extra, area, load, &tables)
            );
        }
    }
}
