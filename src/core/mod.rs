mod engine;
mod error;
mod registry;
mod types;

pub use engine::{DEFAULT_MAX_PROJECTION_YEARS, project, project_bounded};
pub use error::{ProjectionError, RegistryError};
pub use registry::{RegistryConfig, Scenario, ScenarioHandle, ScenarioRegistry, SeriesObserver};
pub use types::{ScenarioParameters, ScenarioSeries, YearSnapshot};
