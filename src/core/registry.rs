use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use super::engine::{DEFAULT_MAX_PROJECTION_YEARS, project_bounded};
use super::error::{ProjectionError, RegistryError};
use super::types::{ScenarioParameters, ScenarioSeries};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize)]
#[serde(transparent)]
pub struct ScenarioHandle(u64);

impl ScenarioHandle {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ScenarioHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    handle: ScenarioHandle,
    params: ScenarioParameters,
    series: ScenarioSeries,
}

impl Scenario {
    pub fn handle(&self) -> ScenarioHandle {
        self.handle
    }

    pub fn parameters(&self) -> &ScenarioParameters {
        &self.params
    }

    pub fn series(&self) -> &ScenarioSeries {
        &self.series
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    pub max_projection_years: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            max_projection_years: DEFAULT_MAX_PROJECTION_YEARS,
        }
    }
}

pub type SeriesObserver = Box<dyn FnMut(ScenarioHandle, &ScenarioSeries) + Send>;

/// Scenarios in insertion order, each owning its parameters and cached series.
///
/// A series is only ever replaced whole: a rejected update keeps the previous
/// parameters and series untouched.
pub struct ScenarioRegistry {
    config: RegistryConfig,
    scenarios: BTreeMap<ScenarioHandle, Scenario>,
    next_id: u64,
    observers: Vec<SeriesObserver>,
}

impl Default for ScenarioRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl fmt::Debug for ScenarioRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioRegistry")
            .field("config", &self.config)
            .field("scenarios", &self.scenarios)
            .field("next_id", &self.next_id)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl ScenarioRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            scenarios: BTreeMap::new(),
            next_id: 0,
            observers: Vec::new(),
        }
    }

    pub fn config(&self) -> RegistryConfig {
        self.config
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: FnMut(ScenarioHandle, &ScenarioSeries) + Send + 'static,
    {
        self.observers.push(Box::new(observer));
    }

    pub fn add_scenario(
        &mut self,
        params: ScenarioParameters,
    ) -> Result<ScenarioHandle, ProjectionError> {
        let series = project_bounded(&params, self.config.max_projection_years)?;
        let handle = ScenarioHandle(self.next_id);
        self.next_id += 1;

        tracing::debug!(
            scenario = %handle,
            name = %params.name,
            points = series.points.len(),
            "added scenario"
        );
        self.scenarios.insert(
            handle,
            Scenario {
                handle,
                params,
                series,
            },
        );
        self.publish(handle);
        Ok(handle)
    }

    /// Replaces a scenario's parameters and recomputes its series.
    ///
    /// Returns `Ok(false)` without recomputing when `params` equals the
    /// current record.
    pub fn update_parameters(
        &mut self,
        handle: ScenarioHandle,
        params: ScenarioParameters,
    ) -> Result<bool, RegistryError> {
        let limit = self.config.max_projection_years;
        let scenario = self
            .scenarios
            .get_mut(&handle)
            .ok_or(RegistryError::UnknownScenario(handle))?;
        if scenario.params == params {
            return Ok(false);
        }

        let series = project_bounded(&params, limit).inspect_err(|err| {
            tracing::warn!(scenario = %handle, error = %err, "rejected parameter update");
        })?;
        tracing::debug!(
            scenario = %handle,
            points = series.points.len(),
            insolvent = series.is_insolvent(),
            "recomputed scenario"
        );
        scenario.params = params;
        scenario.series = series;
        self.publish(handle);
        Ok(true)
    }

    pub fn remove(&mut self, handle: ScenarioHandle) -> Result<Scenario, RegistryError> {
        let removed = self
            .scenarios
            .remove(&handle)
            .ok_or(RegistryError::UnknownScenario(handle))?;
        tracing::debug!(scenario = %handle, "removed scenario");
        Ok(removed)
    }

    pub fn get(&self, handle: ScenarioHandle) -> Option<&Scenario> {
        self.scenarios.get(&handle)
    }

    pub fn series(&self, handle: ScenarioHandle) -> Option<&ScenarioSeries> {
        self.scenarios.get(&handle).map(|scenario| &scenario.series)
    }

    pub fn parameters(&self, handle: ScenarioHandle) -> Option<&ScenarioParameters> {
        self.scenarios.get(&handle).map(|scenario| &scenario.params)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.values()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    fn publish(&mut self, handle: ScenarioHandle) {
        let Some(scenario) = self.scenarios.get(&handle) else {
            return;
        };
        for observer in &mut self.observers {
            observer(handle, &scenario.series);
        }
    }
}
