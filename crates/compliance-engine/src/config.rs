//! Engine configuration
//!
//! Every reference table the cascades and the scorer read is injected through
//! [`EngineConfig`] instead of being embedded in code, so engines built for
//! different regulation versions can run side by side. Configurations are
//! written in TOML; any omitted table keeps its reference default.

use crate::cascade::electrical::ElectricalTables;
use crate::cascade::energy::EnergyTables;
use crate::cascade::fire_safety::FireSafetyTables;
use crate::cascade::water::WaterTables;
use crate::error::Result;
use crate::stats::ScoringPolicy;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Reference tables and scoring policy for one regulation version
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fire_safety: FireSafetyTables,
    pub energy: EnergyTables,
    pub electrical: ElectricalTables,
    pub water: WaterTables,
    pub scoring: ScoringPolicy,
}

impl EngineConfig {
    /// Load and validate a configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML is malformed
    /// - A table breaks one of the invariants checked by [`EngineConfig::validate`]
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("Invalid engine config: {}", path.display()))
    }

    /// Parse and validate a configuration from a TOML string
    ///
    /// # Example
    ///
    /// ```
    /// use compliance_engine::EngineConfig;
    ///
    /// let config = EngineConfig::from_toml(r#"
    ///     [fire_safety]
    ///     sprinkler_category = 4
    ///
    ///     [scoring]
    ///     critical_penalty = 10.0
    /// "#).unwrap();
    /// assert_eq!(config.scoring.critical_penalty, 10.0);
    /// ```
    pub fn from_toml(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.fire_safety.validate()?;
        self.energy.validate()?;
        self.electrical.validate()?;
        self.water.validate()?;
        self.scoring.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::RiskCategory;
    use crate::error::EngineError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_toml_yields_defaults() {
        assert_eq!(EngineConfig::from_toml("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_partial_override_keeps_other_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            [fire_safety]
            max_evacuation_distance_m = [35.0, 30.0, 25.0, 20.0]

            [fire_safety.occupancy_density]
            I = 0.05

            [[fire_safety.category_bounds.VIII]]
            category = 1
            max_height_m = 12.0
            max_area_m2 = 1000.0
            max_occupancy = 100

            [[fire_safety.category_bounds.VIII]]
            category = 4
            "#,
        )
        .unwrap();

        let fire = &config.fire_safety;
        assert_eq!(fire.max_evacuation_distance_m[0], 35.0);
        assert_eq!(fire.occupancy_density.get("I"), Some(&0.05));
        // the table given for I replaces the whole density map
        assert_eq!(fire.occupancy_density.get("VIII"), None);
        let bounds = &fire.category_bounds["VIII"];
        assert_eq!(bounds.len(), 2);
        assert_eq!(bounds[1].category, RiskCategory::Four);
        assert_eq!(bounds[1].max_height_m, None);
        assert_eq!(fire.sprinkler_category, RiskCategory::Three);
        assert_eq!(config.energy, EnergyTables::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = EngineConfig::from_toml(
            r#"
            [fire_safety]
            detection_category = 3
            sprinkler_category = 2
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvalidConfig(_)));

        let err = EngineConfig::from_toml("[fire_safety]\nsprinkler_category = 7").unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = EngineConfig::from_file("/nonexistent/engine.toml").unwrap_err();
        assert!(format!("{:#}", err).contains("/nonexistent/engine.toml"));
    }
}
