//! Regulatory specialties and the section table shared by the readiness gate
//! and the section-completion reporter.
//!
//! Each specialty owns one project section. The table below names, per
//! specialty, the discriminant field that alone is enough to start an
//! analysis, and the fields a complete section is expected to carry.

use serde::{Deserialize, Serialize};

/// Building-type discriminant in the `general` section
pub const BUILDING_TYPE_FIELD: &str = "buildingType";

/// `general` fields of which at least one must be non-zero when only the
/// building type is known
pub const GENERAL_SIZE_FIELDS: [&str; 3] = ["grossArea", "height", "numberOfFloors"];

/// A regulatory domain analysed independently of the others
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Specialty {
    FireSafety,
    Energy,
    Electrical,
    Water,
    Drainage,
    Gas,
    Acoustics,
    Accessibility,
    Structural,
    Telecommunications,
    Hvac,
    Elevators,
}

impl Specialty {
    pub const ALL: [Specialty; 12] = [
        Specialty::FireSafety,
        Specialty::Energy,
        Specialty::Electrical,
        Specialty::Water,
        Specialty::Drainage,
        Specialty::Gas,
        Specialty::Acoustics,
        Specialty::Accessibility,
        Specialty::Structural,
        Specialty::Telecommunications,
        Specialty::Hvac,
        Specialty::Elevators,
    ];

    /// Stable snake_case identifier, used to namespace finding ids
    pub fn id(&self) -> &'static str {
        match self {
            Specialty::FireSafety => "fire_safety",
            Specialty::Energy => "energy",
            Specialty::Electrical => "electrical",
            Specialty::Water => "water",
            Specialty::Drainage => "drainage",
            Specialty::Gas => "gas",
            Specialty::Acoustics => "acoustics",
            Specialty::Accessibility => "accessibility",
            Specialty::Structural => "structural",
            Specialty::Telecommunications => "telecommunications",
            Specialty::Hvac => "hvac",
            Specialty::Elevators => "elevators",
        }
    }

    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Specialty::FireSafety => "Fire Safety",
            Specialty::Energy => "Energy Performance",
            Specialty::Electrical => "Electrical Installations",
            Specialty::Water => "Water Supply",
            Specialty::Drainage => "Wastewater Drainage",
            Specialty::Gas => "Gas Installations",
            Specialty::Acoustics => "Acoustic Comfort",
            Specialty::Accessibility => "Accessibility",
            Specialty::Structural => "Structural Safety",
            Specialty::Telecommunications => "Telecommunications",
            Specialty::Hvac => "Ventilation and HVAC",
            Specialty::Elevators => "Elevators",
        }
    }

    /// Project section holding this specialty's fields
    pub fn section(&self) -> &'static str {
        self.requirements().section
    }

    /// Entry of the shared section table for this specialty
    pub fn requirements(&self) -> &'static SectionRequirements {
        // SECTION_TABLE is declared in `Specialty::ALL` order
        &SECTION_TABLE[*self as usize]
    }

    /// Parse from id, section name or display name (case-insensitive)
    pub fn parse(s: &str) -> Option<Self> {
        let needle = s.trim().to_lowercase().replace(['-', ' '], "_");
        Specialty::ALL.into_iter().find(|sp| {
            sp.id() == needle
                || sp.section().to_lowercase() == needle.replace('_', "")
                || sp.name().to_lowercase().replace(' ', "_") == needle
        })
    }
}

impl std::fmt::Display for Specialty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// What a specialty needs from the project
#[derive(Debug)]
pub struct SectionRequirements {
    pub specialty: Specialty,
    /// Section owned by the specialty
    pub section: &'static str,
    /// Field whose presence alone allows the analysis to run
    pub discriminant: &'static str,
    /// Fields a complete section carries; `general.x` addresses the general section
    pub required_fields: &'static [&'static str],
}

impl SectionRequirements {
    /// Every tracked field as `(section, field)`, discriminant first
    pub fn tracked_fields(&self) -> Vec<(&'static str, &'static str)> {
        std::iter::once(self.discriminant)
            .chain(self.required_fields.iter().copied())
            .map(|path| match path.split_once('.') {
                Some((section, field)) => (section, field),
                None => (self.section, path),
            })
            .collect()
    }
}

static SECTION_TABLE: [SectionRequirements; 12] = [
    SectionRequirements {
        specialty: Specialty::FireSafety,
        section: "fireSafety",
        discriminant: "usageType",
        required_fields: &[
            "general.grossArea",
            "general.height",
            "general.numberOfFloors",
            "fireResistance",
            "numberOfExits",
            "evacuationWidth",
            "evacuationDistance",
            "hasFireDetection",
            "hasSprinklers",
        ],
    },
    SectionRequirements {
        specialty: Specialty::Energy,
        section: "energy",
        discriminant: "climateZone",
        required_fields: &[
            "general.grossArea",
            "interventionType",
            "wallU",
            "roofU",
            "windowU",
            "energyClass",
        ],
    },
    SectionRequirements {
        specialty: Specialty::Electrical,
        section: "electrical",
        discriminant: "supplyType",
        required_fields: &[
            "general.grossArea",
            "contractedPowerKva",
            "numberOfCircuits",
            "earthResistance",
            "rcdSensitivity",
        ],
    },
    SectionRequirements {
        specialty: Specialty::Water,
        section: "water",
        discriminant: "supplySource",
        required_fields: &[
            "general.grossArea",
            "general.numberOfFloors",
            "occupants",
            "fixtureCount",
            "pipeDiameterMm",
            "supplyPressureKpa",
        ],
    },
    SectionRequirements {
        specialty: Specialty::Drainage,
        section: "drainage",
        discriminant: "systemType",
        required_fields: &["separateSystems", "pipeDiameterMm", "ventilated"],
    },
    SectionRequirements {
        specialty: Specialty::Gas,
        section: "gas",
        discriminant: "gasType",
        required_fields: &["installationLocation", "ventilationArea", "hasShutoffValve"],
    },
    SectionRequirements {
        specialty: Specialty::Acoustics,
        section: "acoustics",
        discriminant: "acousticZone",
        required_fields: &[
            "airborneInsulation",
            "impactInsulation",
            "facadeInsulation",
        ],
    },
    SectionRequirements {
        specialty: Specialty::Accessibility,
        section: "accessibility",
        discriminant: "accessibleEntrance",
        required_fields: &["doorWidth", "corridorWidth", "rampSlope", "hasAccessibleWc"],
    },
    SectionRequirements {
        specialty: Specialty::Structural,
        section: "structural",
        discriminant: "structuralSystem",
        required_fields: &["seismicZone", "soilType", "importanceClass"],
    },
    SectionRequirements {
        specialty: Specialty::Telecommunications,
        section: "telecommunications",
        discriminant: "infrastructureType",
        required_fields: &["numberOfOutlets", "hasAti"],
    },
    SectionRequirements {
        specialty: Specialty::Hvac,
        section: "hvac",
        discriminant: "ventilationType",
        required_fields: &["airChangesPerHour", "hasHeatRecovery"],
    },
    SectionRequirements {
        specialty: Specialty::Elevators,
        section: "elevators",
        discriminant: "liftType",
        required_fields: &["numberOfLifts", "cabinWidth", "cabinDepth"],
    },
];
