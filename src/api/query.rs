//! Field bindings between scenario parameters and `"<index>.<Label>"` query
//! parameters.
//!
//! A field reads its value from its query key when present and falls back to
//! its default otherwise. Recording a change removes the key when the new
//! value equals the default, so the query only carries edited fields.

use std::collections::BTreeMap;
use std::str::FromStr;

use thiserror::Error;

use crate::core::ScenarioParameters;

pub type QueryState = BTreeMap<String, String>;

/// Highest number of scenarios a query may describe.
pub const MAX_QUERY_SCENARIOS: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("query parameter '{key}' is not a valid number: '{value}'")]
    InvalidNumber { key: String, value: String },
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("query describes {count} scenarios, at most {limit} are supported")]
    TooManyScenarios { count: usize, limit: usize },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Field {
    Name,
    StartingAge,
    StartingBalance,
    InterestRate,
    RetirementAge,
    MaxAge,
    StartingInvestmentPerMonth,
    InvestmentIncreasingRate,
    SpendingPerYear,
}

impl FromStr for Field {
    type Err = QueryError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        Field::from_label(label).ok_or_else(|| QueryError::UnknownField(label.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq)]
enum FieldValue {
    Text(String),
    Age(i32),
    Amount(f64),
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Name,
        Field::StartingAge,
        Field::StartingBalance,
        Field::InterestRate,
        Field::RetirementAge,
        Field::MaxAge,
        Field::StartingInvestmentPerMonth,
        Field::InvestmentIncreasingRate,
        Field::SpendingPerYear,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::StartingAge => "Starting age",
            Field::StartingBalance => "Starting Balance",
            Field::InterestRate => "Interest Rate (%)",
            Field::RetirementAge => "Retirement Age",
            Field::MaxAge => "Max Age",
            Field::StartingInvestmentPerMonth => "Starting Investment Per Month",
            Field::InvestmentIncreasingRate => "Investment Increasing Rate (%)",
            Field::SpendingPerYear => "Spending Per Year Input",
        }
    }

    pub fn from_label(label: &str) -> Option<Field> {
        Field::ALL.into_iter().find(|field| field.label() == label)
    }

    pub fn query_key(self, index: usize) -> String {
        format!("{index}.{}", self.label())
    }

    fn get(self, params: &ScenarioParameters) -> FieldValue {
        match self {
            Field::Name => FieldValue::Text(params.name.clone()),
            Field::StartingAge => FieldValue::Age(params.starting_age),
            Field::StartingBalance => FieldValue::Amount(params.starting_balance),
            Field::InterestRate => FieldValue::Amount(params.interest_rate_percent),
            Field::RetirementAge => FieldValue::Age(params.retirement_age),
            Field::MaxAge => FieldValue::Age(params.max_age),
            Field::StartingInvestmentPerMonth => {
                FieldValue::Amount(params.starting_investment_per_month)
            }
            Field::InvestmentIncreasingRate => {
                FieldValue::Amount(params.investment_increasing_rate_percent)
            }
            Field::SpendingPerYear => FieldValue::Amount(params.spending_per_year),
        }
    }

    /// Parses `raw` for this field and writes it into `params`. Surrounding
    /// whitespace is dropped for every field, the name included.
    fn apply(
        self,
        params: &mut ScenarioParameters,
        key: &str,
        raw: &str,
    ) -> Result<(), QueryError> {
        let trimmed = raw.trim();
        let invalid = || QueryError::InvalidNumber {
            key: key.to_string(),
            value: raw.to_string(),
        };
        let age = || trimmed.parse::<i32>().map_err(|_| invalid());
        let amount = || match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(invalid()),
        };
        match self {
            Field::Name => params.name = trimmed.to_string(),
            Field::StartingAge => params.starting_age = age()?,
            Field::RetirementAge => params.retirement_age = age()?,
            Field::MaxAge => params.max_age = age()?,
            Field::StartingBalance => params.starting_balance = amount()?,
            Field::InterestRate => params.interest_rate_percent = amount()?,
            Field::StartingInvestmentPerMonth => {
                params.starting_investment_per_month = amount()?
            }
            Field::InvestmentIncreasingRate => {
                params.investment_increasing_rate_percent = amount()?
            }
            Field::SpendingPerYear => params.spending_per_year = amount()?,
        }
        Ok(())
    }

    fn render(value: &FieldValue) -> String {
        match value {
            FieldValue::Text(v) => v.clone(),
            FieldValue::Age(v) => v.to_string(),
            FieldValue::Amount(v) => v.to_string(),
        }
    }
}

/// Builds scenario `index` from the query, field by field.
pub fn params_from_query(
    index: usize,
    query: &QueryState,
    defaults: &ScenarioParameters,
) -> Result<ScenarioParameters, QueryError> {
    let mut params = defaults.clone();
    for field in Field::ALL {
        let key = field.query_key(index);
        if let Some(raw) = query.get(&key) {
            field.apply(&mut params, &key, raw)?;
        }
    }
    Ok(params)
}

/// Bootstraps every scenario referenced by the query. Scenario 0 always
/// exists; gaps between indices are filled with defaults.
pub fn scenarios_from_query(
    query: &QueryState,
    defaults: &ScenarioParameters,
) -> Result<Vec<ScenarioParameters>, QueryError> {
    let count = query
        .keys()
        .filter_map(|key| scenario_index(key))
        .max()
        .map_or(1, |max| max.saturating_add(1));
    if count > MAX_QUERY_SCENARIOS {
        return Err(QueryError::TooManyScenarios {
            count,
            limit: MAX_QUERY_SCENARIOS,
        });
    }
    (0..count)
        .map(|index| params_from_query(index, query, defaults))
        .collect()
}

fn scenario_index(key: &str) -> Option<usize> {
    let (index, label) = key.split_once('.')?;
    Field::from_label(label)?;
    index.parse().ok()
}

/// Applies one field edit to the query: the key is dropped when the new value
/// equals the field's default and set otherwise.
pub fn record_field_change(
    query: &mut QueryState,
    index: usize,
    field: Field,
    raw: &str,
    defaults: &ScenarioParameters,
) -> Result<(), QueryError> {
    let key = field.query_key(index);
    let mut edited = defaults.clone();
    field.apply(&mut edited, &key, raw)?;
    let value = field.get(&edited);
    if value == field.get(defaults) {
        query.remove(&key);
    } else {
        query.insert(key, Field::render(&value));
    }
    Ok(())
}

/// Query entries for every field of `params` that differs from `defaults`.
pub fn query_from_params(
    index: usize,
    params: &ScenarioParameters,
    defaults: &ScenarioParameters,
) -> QueryState {
    Field::ALL
        .into_iter()
        .filter_map(|field| {
            let value = field.get(params);
            (value != field.get(defaults)).then(|| (field.query_key(index), Field::render(&value)))
        })
        .collect()
}
