use serde::{Deserialize, Serialize};

/// Input record for one scenario. Every edit produces a new value and the
/// series is recomputed from scratch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioParameters {
    pub name: String,
    pub starting_age: i32,
    pub starting_balance: f64,
    pub interest_rate_percent: f64,
    pub retirement_age: i32,
    pub max_age: i32,
    pub starting_investment_per_month: f64,
    pub investment_increasing_rate_percent: f64,
    pub spending_per_year: f64,
}

impl Default for ScenarioParameters {
    fn default() -> Self {
        Self {
            name: "Albert".to_string(),
            starting_age: 20,
            starting_balance: 0.0,
            interest_rate_percent: 10.0,
            retirement_age: 50,
            max_age: 120,
            starting_investment_per_month: 500.0,
            investment_increasing_rate_percent: 1.0,
            spending_per_year: 100_000.0,
        }
    }
}

impl ScenarioParameters {
    /// Number of years the engine would iterate, ignoring an insolvency break.
    pub fn horizon_years(&self) -> u64 {
        let span = i64::from(self.max_age) - i64::from(self.starting_age);
        span.max(0) as u64
    }
}

/// State at the start of one age-year, before that year's activity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearSnapshot {
    pub year: i32,
    pub value: f64,
    pub principal: f64,
    pub total_interest: f64,
    pub spending: f64,
    /// Interest credited in the last month of the previous year.
    pub interest_per_year: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioSeries {
    pub name: String,
    pub points: Vec<YearSnapshot>,
}

impl ScenarioSeries {
    pub fn final_point(&self) -> Option<&YearSnapshot> {
        self.points.last()
    }

    /// True when the series stopped on a negative start-of-year balance.
    pub fn is_insolvent(&self) -> bool {
        self.points.last().is_some_and(|point| point.value < 0.0)
    }

    pub fn retirement_point(&self, retirement_age: i32) -> Option<&YearSnapshot> {
        self.points.iter().find(|point| point.year == retirement_age)
    }
}
