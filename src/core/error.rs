use thiserror::Error;

use super::registry::ScenarioHandle;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProjectionError {
    #[error("projection horizon of {years} years exceeds the limit of {limit} years")]
    HorizonTooLong { years: u64, limit: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("unknown scenario {0}")]
    UnknownScenario(ScenarioHandle),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}
