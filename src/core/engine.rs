use super::error::ProjectionError;
use super::types::{ScenarioParameters, ScenarioSeries, YearSnapshot};

const MONTHS_PER_YEAR: u32 = 12;

/// Upper bound on `max_age - starting_age` accepted by [`project_bounded`].
pub const DEFAULT_MAX_PROJECTION_YEARS: u64 = 1_000;

#[derive(Debug, Clone, Copy)]
struct Ledger {
    age: i32,
    balance: f64,
    monthly_contribution: f64,
    principal: f64,
    total_interest: f64,
    spending: f64,
    interest_per_year: f64,
}

impl Ledger {
    fn open(params: &ScenarioParameters) -> Self {
        Self {
            age: params.starting_age,
            balance: params.starting_balance,
            monthly_contribution: params.starting_investment_per_month,
            principal: params.starting_balance,
            total_interest: 0.0,
            spending: 0.0,
            interest_per_year: 0.0,
        }
    }

    fn snapshot(&self) -> YearSnapshot {
        YearSnapshot {
            year: self.age,
            value: self.balance,
            principal: self.principal,
            total_interest: self.total_interest,
            spending: self.spending,
            interest_per_year: self.interest_per_year,
        }
    }

    fn run_year(&mut self, rates: &MonthlyRates, retirement_age: i32) {
        // Phase is fixed for the whole age-year.
        let accumulating = self.age < retirement_age;
        for _ in 0..MONTHS_PER_YEAR {
            if accumulating {
                self.principal += self.monthly_contribution;
                self.balance += self.monthly_contribution;
            } else {
                self.spending += rates.spending;
                self.balance -= rates.spending;
            }
            // Overwritten every month: the reported figure is the last month's interest.
            self.interest_per_year = self.balance * rates.interest;
            self.total_interest += self.interest_per_year;
            self.balance *= 1.0 + rates.interest;
        }
        self.monthly_contribution *= 1.0 + rates.contribution_growth;
        self.age += 1;
    }
}

#[derive(Debug, Clone, Copy)]
struct MonthlyRates {
    interest: f64,
    spending: f64,
    contribution_growth: f64,
}

impl MonthlyRates {
    fn from_params(params: &ScenarioParameters) -> Self {
        Self {
            interest: params.interest_rate_percent / 100.0 / f64::from(MONTHS_PER_YEAR),
            spending: params.spending_per_year / f64::from(MONTHS_PER_YEAR),
            contribution_growth: params.investment_increasing_rate_percent / 100.0,
        }
    }
}

/// Projects one scenario year by year until `max_age` or the first negative
/// start-of-year balance, whichever comes first.
///
/// Total over its inputs: degenerate parameters give an empty or immediately
/// insolvent series rather than an error. Callers handling untrusted input
/// should go through [`project_bounded`].
pub fn project(params: &ScenarioParameters) -> ScenarioSeries {
    let rates = MonthlyRates::from_params(params);
    let mut ledger = Ledger::open(params);
    let capacity = params.horizon_years().min(DEFAULT_MAX_PROJECTION_YEARS) as usize;
    let mut points = Vec::with_capacity(capacity);

    while ledger.age < params.max_age {
        points.push(ledger.snapshot());
        if ledger.balance < 0.0 {
            break;
        }
        ledger.run_year(&rates, params.retirement_age);
    }

    ScenarioSeries {
        name: params.name.clone(),
        points,
    }
}

/// [`project`] with the horizon checked against `max_years` before any work.
pub fn project_bounded(
    params: &ScenarioParameters,
    max_years: u64,
) -> Result<ScenarioSeries, ProjectionError> {
    let years = params.horizon_years();
    if years > max_years {
        return Err(ProjectionError::HorizonTooLong {
            years,
            limit: max_years,
        });
    }
    Ok(project(params))
}
