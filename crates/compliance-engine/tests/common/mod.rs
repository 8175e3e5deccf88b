//! Fixture helpers shared by the integration tests

#![allow(dead_code)]

use compliance_engine::{ComplianceEngine, EngineConfig};
use shared_types::BuildingProject;
use std::path::PathBuf;

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn load_project(name: &str) -> BuildingProject {
    let path = fixture_path(name);
    let json = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e));
    BuildingProject::from_json(&json).unwrap()
}

pub fn builtin_engine() -> ComplianceEngine {
    ComplianceEngine::with_builtin_rules(EngineConfig::default()).unwrap()
}
