//! Enrichment of projects with computed values
//!
//! Results are turned into an explicit [`EnrichmentPatch`]; the caller decides
//! whether to apply it in place or to derive a new enriched project. A patch
//! only adds or overwrites keys, never removes one, and applying it twice
//! leaves the same state as applying it once.

use crate::cascade::ComputedValues;
use crate::specialty::Specialty;
use serde::{Deserialize, Serialize};
use shared_types::{BuildingProject, FieldValue, GENERAL_SECTION};

/// Prefix of every key written for a computed value
pub const COMPUTED_KEY_PREFIX: &str = "computed";

/// Computed values that are also written under their plain name
const FIRE_SAFETY_ALIASES: [&str; 3] = ["riskCategory", "occupantLoad", "usageType"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchEntry {
    pub section: String,
    pub key: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentPatch {
    entries: Vec<PatchEntry>,
}

impl EnrichmentPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Patch writing `computed<Field>` for every value of one specialty, plus
    /// the canonical aliases
    pub fn from_computed(specialty: Specialty, computed: &ComputedValues) -> Self {
        let section = specialty.section();
        let mut patch = Self::new();

        let aliased = matches!(computed, ComputedValues::FireSafety(_));
        for (name, value) in computed.entries() {
            patch.push(section, &computed_key(name), value.clone());
            if aliased && FIRE_SAFETY_ALIASES.contains(&name) {
                patch.push(section, name, value.clone());
                if name == "usageType" {
                    patch.push(GENERAL_SECTION, name, value);
                }
            }
        }

        patch
    }

    /// Add an entry; a later entry for the same key wins
    pub fn push(&mut self, section: &str, key: &str, value: FieldValue) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.section == section && e.key == key)
        {
            Some(entry) => entry.value = value,
            None => self.entries.push(PatchEntry {
                section: section.to_string(),
                key: key.to_string(),
                value,
            }),
        }
    }

    pub fn extend(&mut self, other: EnrichmentPatch) {
        for entry in other.entries {
            self.push(&entry.section, &entry.key, entry.value);
        }
    }

    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every entry into `project`
    pub fn apply(&self, project: &mut BuildingProject) {
        for entry in &self.entries {
            project.set(&entry.section, &entry.key, entry.value.clone());
        }
    }

    /// A copy of `project` with the patch applied
    pub fn enriched(&self, project: &BuildingProject) -> BuildingProject {
        let mut copy = project.clone();
        self.apply(&mut copy);
        copy
    }
}

/// `occupantLoad` -> `computedOccupantLoad`
pub fn computed_key(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => format!(
            "{}{}{}",
            COMPUTED_KEY_PREFIX,
            first.to_ascii_uppercase(),
            chars.as_str()
        ),
        None => COMPUTED_KEY_PREFIX.to_string(),
    }
}
