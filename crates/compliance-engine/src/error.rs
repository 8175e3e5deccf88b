use crate::specialty::Specialty;
use thiserror::Error;

/// Errors that stop the analysis of one specialty, or the loading of
/// configuration and rule books
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{specialty}: required field '{field}' is absent or not usable")]
    InvalidProjectShape {
        specialty: Specialty,
        field: String,
    },

    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    #[error("rule book could not be parsed: {0}")]
    RuleBook(#[from] serde_json::Error),

    #[error("engine configuration could not be parsed: {0}")]
    Config(#[from] toml::de::Error),
}

impl EngineError {
    pub fn invalid_shape(specialty: Specialty, field: &str) -> Self {
        EngineError::InvalidProjectShape {
            specialty,
            field: field.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
