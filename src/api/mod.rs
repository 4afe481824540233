pub mod chart;
pub mod query;

use axum::{
    Router,
    extract::{Json, Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::net::TcpListener;

use crate::core::{
    DEFAULT_MAX_PROJECTION_YEARS, ProjectionError, RegistryConfig, RegistryError, Scenario,
    ScenarioHandle, ScenarioParameters, ScenarioRegistry, ScenarioSeries, project_bounded,
};
use chart::{ChartData, chart_data};
use query::{
    Field, QueryError, QueryState, params_from_query, query_from_params, record_field_change,
    scenarios_from_query,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    #[arg(long, default_value = "Albert")]
    pub name: String,
    #[arg(long, default_value_t = 20, allow_negative_numbers = true)]
    pub starting_age: i32,
    #[arg(
        long,
        default_value_t = 0.0,
        allow_negative_numbers = true,
        help = "Balance at the starting age; negative values represent debt"
    )]
    pub starting_balance: f64,
    #[arg(
        long,
        default_value_t = 10.0,
        allow_negative_numbers = true,
        help = "Annual interest rate in percent, compounded monthly"
    )]
    pub interest_rate: f64,
    #[arg(
        long,
        default_value_t = 50,
        allow_negative_numbers = true,
        help = "First age at which contributions stop and withdrawals start"
    )]
    pub retirement_age: i32,
    #[arg(
        long,
        default_value_t = 120,
        allow_negative_numbers = true,
        help = "Age to project up to (exclusive)"
    )]
    pub max_age: i32,
    #[arg(long, default_value_t = 500.0, allow_negative_numbers = true)]
    pub starting_investment_per_month: f64,
    #[arg(
        long,
        default_value_t = 1.0,
        allow_negative_numbers = true,
        help = "Yearly growth of the monthly contribution in percent"
    )]
    pub investment_increasing_rate: f64,
    #[arg(
        long,
        default_value_t = 100_000.0,
        allow_negative_numbers = true,
        help = "Annual withdrawal in retirement, taken in 12 equal monthly amounts"
    )]
    pub spending_per_year: f64,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_PROJECTION_YEARS,
        help = "Reject projections spanning more years than this"
    )]
    pub max_years: u64,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct ServeArgs {
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    #[arg(
        long,
        default_value_t = DEFAULT_MAX_PROJECTION_YEARS,
        help = "Reject scenarios spanning more years than this"
    )]
    pub max_years: u64,
}

/// Partial parameter record: absent fields keep the base value.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ParametersPayload {
    name: Option<String>,
    starting_age: Option<i32>,
    starting_balance: Option<f64>,
    #[serde(alias = "interestRate")]
    interest_rate_percent: Option<f64>,
    retirement_age: Option<i32>,
    max_age: Option<i32>,
    starting_investment_per_month: Option<f64>,
    #[serde(alias = "investmentIncreasingRate")]
    investment_increasing_rate_percent: Option<f64>,
    spending_per_year: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FieldEditPayload {
    #[serde(default)]
    query: QueryState,
    #[serde(default)]
    index: usize,
    field: String,
    value: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesSummary {
    points: usize,
    first_year: Option<i32>,
    final_year: Option<i32>,
    final_value: Option<f64>,
    value_at_retirement: Option<f64>,
    total_contributed: Option<f64>,
    total_spent: Option<f64>,
    insolvent: bool,
}

#[derive(Debug, Serialize)]
struct ProjectResponse {
    parameters: ScenarioParameters,
    series: ScenarioSeries,
    summary: SeriesSummary,
}

#[derive(Debug, Serialize)]
struct ScenarioResponse {
    id: ScenarioHandle,
    parameters: ScenarioParameters,
    series: ScenarioSeries,
    summary: SeriesSummary,
}

#[derive(Debug, Serialize)]
struct UpdateResponse {
    #[serde(flatten)]
    scenario: ScenarioResponse,
    recomputed: bool,
}

#[derive(Debug, Serialize)]
struct ScenarioListResponse {
    scenarios: Vec<ScenarioResponse>,
    chart: ChartData,
}

#[derive(Debug, Serialize)]
struct BootstrapResponse {
    scenarios: Vec<ProjectResponse>,
    chart: ChartData,
    query: QueryState,
}

#[derive(Debug, Serialize)]
struct FieldEditResponse {
    query: QueryState,
    scenario: ProjectResponse,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Error)]
enum ApiError {
    #[error("{0}")]
    InvalidInput(String),
    #[error(transparent)]
    Query(#[from] QueryError),
    #[error(transparent)]
    Projection(#[from] ProjectionError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error("scenario registry is unavailable")]
    RegistryUnavailable,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidInput(_) | ApiError::Query(_) | ApiError::Projection(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Registry(RegistryError::UnknownScenario(_)) => StatusCode::NOT_FOUND,
            ApiError::Registry(RegistryError::Projection(_)) => StatusCode::BAD_REQUEST,
            ApiError::RegistryUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Clone)]
struct AppState {
    registry: Arc<Mutex<ScenarioRegistry>>,
}

impl AppState {
    fn new(max_projection_years: u64) -> Self {
        let mut registry = ScenarioRegistry::new(RegistryConfig {
            max_projection_years,
        });
        registry.subscribe(|handle, series| {
            tracing::info!(
                scenario = %handle,
                name = %series.name,
                points = series.points.len(),
                insolvent = series.is_insolvent(),
                "scenario series published"
            );
        });
        Self {
            registry: Arc::new(Mutex::new(registry)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ScenarioRegistry>, ApiError> {
        self.registry
            .lock()
            .map_err(|_| ApiError::RegistryUnavailable)
    }

    fn max_projection_years(&self) -> Result<u64, ApiError> {
        Ok(self.lock()?.config().max_projection_years)
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum ParamField {
    Name,
    StartingBalance,
    InterestRate,
    StartingInvestmentPerMonth,
    InvestmentIncreasingRate,
    SpendingPerYear,
}

impl ParamField {
    fn api_key(self) -> &'static str {
        match self {
            ParamField::Name => "name",
            ParamField::StartingBalance => "startingBalance",
            ParamField::InterestRate => "interestRatePercent",
            ParamField::StartingInvestmentPerMonth => "startingInvestmentPerMonth",
            ParamField::InvestmentIncreasingRate => "investmentIncreasingRatePercent",
            ParamField::SpendingPerYear => "spendingPerYear",
        }
    }

    fn cli_flag(self) -> &'static str {
        match self {
            ParamField::Name => "--name",
            ParamField::StartingBalance => "--starting-balance",
            ParamField::InterestRate => "--interest-rate",
            ParamField::StartingInvestmentPerMonth => "--starting-investment-per-month",
            ParamField::InvestmentIncreasingRate => "--investment-increasing-rate",
            ParamField::SpendingPerYear => "--spending-per-year",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct InvalidParam {
    field: ParamField,
    problem: &'static str,
}

impl InvalidParam {
    fn api_message(self) -> String {
        format!("{} {}", self.field.api_key(), self.problem)
    }

    fn cli_message(self) -> String {
        format!("{} {}", self.field.cli_flag(), self.problem)
    }
}

fn validate_params(params: &ScenarioParameters) -> Result<(), InvalidParam> {
    if params.name.trim().is_empty() {
        return Err(InvalidParam {
            field: ParamField::Name,
            problem: "must not be empty",
        });
    }

    for (field, value) in [
        (ParamField::StartingBalance, params.starting_balance),
        (ParamField::InterestRate, params.interest_rate_percent),
        (
            ParamField::StartingInvestmentPerMonth,
            params.starting_investment_per_month,
        ),
        (
            ParamField::InvestmentIncreasingRate,
            params.investment_increasing_rate_percent,
        ),
        (ParamField::SpendingPerYear, params.spending_per_year),
    ] {
        if !value.is_finite() {
            return Err(InvalidParam {
                field,
                problem: "must be a finite number",
            });
        }
    }

    Ok(())
}

fn build_params(args: &ProjectArgs) -> Result<ScenarioParameters, String> {
    let params = ScenarioParameters {
        name: args.name.clone(),
        starting_age: args.starting_age,
        starting_balance: args.starting_balance,
        interest_rate_percent: args.interest_rate,
        retirement_age: args.retirement_age,
        max_age: args.max_age,
        starting_investment_per_month: args.starting_investment_per_month,
        investment_increasing_rate_percent: args.investment_increasing_rate,
        spending_per_year: args.spending_per_year,
    };
    validate_params(&params).map_err(InvalidParam::cli_message)?;
    Ok(params)
}

fn apply_payload(
    base: &ScenarioParameters,
    payload: ParametersPayload,
) -> Result<ScenarioParameters, ApiError> {
    let mut params = base.clone();

    if let Some(v) = payload.name {
        params.name = v;
    }
    if let Some(v) = payload.starting_age {
        params.starting_age = v;
    }
    if let Some(v) = payload.starting_balance {
        params.starting_balance = v;
    }
    if let Some(v) = payload.interest_rate_percent {
        params.interest_rate_percent = v;
    }
    if let Some(v) = payload.retirement_age {
        params.retirement_age = v;
    }
    if let Some(v) = payload.max_age {
        params.max_age = v;
    }
    if let Some(v) = payload.starting_investment_per_month {
        params.starting_investment_per_month = v;
    }
    if let Some(v) = payload.investment_increasing_rate_percent {
        params.investment_increasing_rate_percent = v;
    }
    if let Some(v) = payload.spending_per_year {
        params.spending_per_year = v;
    }

    validate_params(&params).map_err(|e| ApiError::InvalidInput(e.api_message()))?;
    Ok(params)
}

fn summarize(params: &ScenarioParameters, series: &ScenarioSeries) -> SeriesSummary {
    let last = series.final_point();
    SeriesSummary {
        points: series.points.len(),
        first_year: series.points.first().map(|point| point.year),
        final_year: last.map(|point| point.year),
        final_value: last.map(|point| point.value),
        value_at_retirement: series
            .retirement_point(params.retirement_age)
            .map(|point| point.value),
        total_contributed: last.map(|point| point.principal),
        total_spent: last.map(|point| point.spending),
        insolvent: series.is_insolvent(),
    }
}

fn project_response(params: ScenarioParameters, series: ScenarioSeries) -> ProjectResponse {
    let summary = summarize(&params, &series);
    ProjectResponse {
        parameters: params,
        series,
        summary,
    }
}

fn scenario_response(scenario: &Scenario) -> ScenarioResponse {
    ScenarioResponse {
        id: scenario.handle(),
        parameters: scenario.parameters().clone(),
        series: scenario.series().clone(),
        summary: summarize(scenario.parameters(), scenario.series()),
    }
}

fn project_request(
    payload: ParametersPayload,
    max_years: u64,
) -> Result<ProjectResponse, ApiError> {
    let params = apply_payload(&ScenarioParameters::default(), payload)?;
    let series = project_bounded(&params, max_years)?;
    Ok(project_response(params, series))
}

fn list_scenarios(state: &AppState) -> Result<ScenarioListResponse, ApiError> {
    let registry = state.lock()?;
    Ok(ScenarioListResponse {
        scenarios: registry.iter().map(scenario_response).collect(),
        chart: chart_data(registry.iter().map(Scenario::series)),
    })
}

fn add_scenario(
    state: &AppState,
    payload: ParametersPayload,
) -> Result<ScenarioResponse, ApiError> {
    let params = apply_payload(&ScenarioParameters::default(), payload)?;
    let mut registry = state.lock()?;
    let handle = registry.add_scenario(params)?;
    let scenario = registry
        .get(handle)
        .ok_or(RegistryError::UnknownScenario(handle))?;
    Ok(scenario_response(scenario))
}

fn get_scenario(state: &AppState, id: u64) -> Result<ScenarioResponse, ApiError> {
    let handle = ScenarioHandle::new(id);
    let registry = state.lock()?;
    let scenario = registry
        .get(handle)
        .ok_or(RegistryError::UnknownScenario(handle))?;
    Ok(scenario_response(scenario))
}

fn update_scenario(
    state: &AppState,
    id: u64,
    payload: ParametersPayload,
) -> Result<UpdateResponse, ApiError> {
    let handle = ScenarioHandle::new(id);
    let mut registry = state.lock()?;
    let current = registry
        .parameters(handle)
        .ok_or(RegistryError::UnknownScenario(handle))?;
    let params = apply_payload(current, payload)?;
    let recomputed = registry.update_parameters(handle, params)?;
    let scenario = registry
        .get(handle)
        .ok_or(RegistryError::UnknownScenario(handle))?;
    Ok(UpdateResponse {
        scenario: scenario_response(scenario),
        recomputed,
    })
}

fn remove_scenario(state: &AppState, id: u64) -> Result<ScenarioResponse, ApiError> {
    let removed = state.lock()?.remove(ScenarioHandle::new(id))?;
    Ok(scenario_response(&removed))
}

fn registry_chart(state: &AppState) -> Result<ChartData, ApiError> {
    let registry = state.lock()?;
    Ok(chart_data(registry.iter().map(Scenario::series)))
}

fn bootstrap_from_query(query: &QueryState, max_years: u64) -> Result<BootstrapResponse, ApiError> {
    let defaults = ScenarioParameters::default();
    let mut scenarios = Vec::new();
    let mut canonical = QueryState::new();
    for (index, params) in scenarios_from_query(query, &defaults)?
        .into_iter()
        .enumerate()
    {
        canonical.extend(query_from_params(index, &params, &defaults));
        let series = project_bounded(&params, max_years)?;
        scenarios.push(project_response(params, series));
    }
    let chart = chart_data(scenarios.iter().map(|scenario| &scenario.series));
    Ok(BootstrapResponse {
        scenarios,
        chart,
        query: canonical,
    })
}

fn edit_field(payload: FieldEditPayload, max_years: u64) -> Result<FieldEditResponse, ApiError> {
    let defaults = ScenarioParameters::default();
    let field: Field = payload.field.parse()?;
    let mut query = payload.query;
    record_field_change(&mut query, payload.index, field, &payload.value, &defaults)?;

    let params = params_from_query(payload.index, &query, &defaults)?;
    validate_params(&params).map_err(|e| ApiError::InvalidInput(e.api_message()))?;
    let series = project_bounded(&params, max_years)?;
    Ok(FieldEditResponse {
        query,
        scenario: project_response(params, series),
    })
}

/// Projects one scenario for the CLI and renders it in the requested format.
pub fn run_project(args: &ProjectArgs) -> Result<String, String> {
    let params = build_params(args)?;
    let series = project_bounded(&params, args.max_years).map_err(|e| e.to_string())?;
    match args.format {
        OutputFormat::Json => {
            let response = project_response(params, series);
            serde_json::to_string_pretty(&response)
                .map_err(|e| format!("failed to serialize projection: {e}"))
        }
        OutputFormat::Table => Ok(render_table(&params, &series)),
    }
}

fn render_table(params: &ScenarioParameters, series: &ScenarioSeries) -> String {
    let summary = summarize(params, series);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} ({} points, retirement at {})",
        series.name, summary.points, params.retirement_age
    );
    let _ = writeln!(
        out,
        "{:>5} {:>16} {:>16} {:>16} {:>16} {:>14}",
        "age", "balance", "principal", "interest", "spending", "last interest"
    );
    for point in &series.points {
        let _ = writeln!(
            out,
            "{:>5} {:>16.2} {:>16.2} {:>16.2} {:>16.2} {:>14.2}",
            point.year,
            point.value,
            point.principal,
            point.total_interest,
            point.spending,
            point.interest_per_year
        );
    }
    if summary.insolvent {
        let _ = writeln!(
            out,
            "insolvent at age {}",
            summary.final_year.unwrap_or(params.starting_age)
        );
    }
    out
}

pub async fn run_http_server(args: ServeArgs) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let app = router(AppState::new(args.max_years));

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, max_years = args.max_years, "retirement projection API listening");

    axum::serve(listener, app).await
}

fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .route(
            "/api/scenarios",
            get(list_scenarios_handler).post(add_scenario_handler),
        )
        .route(
            "/api/scenarios/:id",
            get(get_scenario_handler)
                .put(update_scenario_handler)
                .delete(remove_scenario_handler),
        )
        .route("/api/chart", get(chart_handler))
        .route("/api/bootstrap", get(bootstrap_handler))
        .route("/api/query/edit", post(edit_field_handler))
        .fallback(not_found_handler)
        .with_state(state)
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    State(state): State<AppState>,
    Query(payload): Query<ParametersPayload>,
) -> Response {
    respond(
        StatusCode::OK,
        state
            .max_projection_years()
            .and_then(|max_years| project_request(payload, max_years)),
    )
}

async fn project_post_handler(
    State(state): State<AppState>,
    Json(payload): Json<ParametersPayload>,
) -> Response {
    respond(
        StatusCode::OK,
        state
            .max_projection_years()
            .and_then(|max_years| project_request(payload, max_years)),
    )
}

async fn list_scenarios_handler(State(state): State<AppState>) -> Response {
    respond(StatusCode::OK, list_scenarios(&state))
}

async fn add_scenario_handler(
    State(state): State<AppState>,
    Json(payload): Json<ParametersPayload>,
) -> Response {
    respond(StatusCode::CREATED, add_scenario(&state, payload))
}

async fn get_scenario_handler(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    respond(StatusCode::OK, get_scenario(&state, id))
}

async fn update_scenario_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(payload): Json<ParametersPayload>,
) -> Response {
    respond(StatusCode::OK, update_scenario(&state, id, payload))
}

async fn remove_scenario_handler(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Response {
    respond(StatusCode::OK, remove_scenario(&state, id))
}

async fn chart_handler(State(state): State<AppState>) -> Response {
    respond(StatusCode::OK, registry_chart(&state))
}

async fn bootstrap_handler(
    State(state): State<AppState>,
    Query(query): Query<QueryState>,
) -> Response {
    respond(
        StatusCode::OK,
        state
            .max_projection_years()
            .and_then(|max_years| bootstrap_from_query(&query, max_years)),
    )
}

async fn edit_field_handler(
    State(state): State<AppState>,
    Json(payload): Json<FieldEditPayload>,
) -> Response {
    respond(
        StatusCode::OK,
        state
            .max_projection_years()
            .and_then(|max_years| edit_field(payload, max_years)),
    )
}

fn respond<T: Serialize>(status: StatusCode, result: Result<T, ApiError>) -> Response {
    match result {
        Ok(body) => json_response(status, body),
        Err(err) => {
            let status = err.status();
            if status.is_server_error() {
                tracing::error!(error = %err, "request failed");
            } else {
                tracing::debug!(%status, error = %err, "request rejected");
            }
            error_response(status, &err.to_string())
        }
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    let mut response = (status, Json(body)).into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        "no-store".parse().expect("valid header"),
    );
    response
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn payload_from_json(json: &str) -> ParametersPayload {
        serde_json::from_str(json).expect("payload should parse")
    }

    fn sample_args() -> ProjectArgs {
        ProjectArgs {
            name: "Albert".to_string(),
            starting_age: 20,
            starting_balance: 0.0,
            interest_rate: 10.0,
            retirement_age: 50,
            max_age: 120,
            starting_investment_per_month: 500.0,
            investment_increasing_rate: 1.0,
            spending_per_year: 100_000.0,
            format: OutputFormat::Table,
            max_years: DEFAULT_MAX_PROJECTION_YEARS,
        }
    }

    #[test]
    fn build_params_matches_default_scenario() {
        let params = build_params(&sample_args()).expect("valid args");
        assert_eq!(params, ScenarioParameters::default());
    }

    #[test]
    fn build_params_rejects_non_finite_rates() {
        let mut args = sample_args();
        args.interest_rate = f64::NAN;
        let err = build_params(&args).expect_err("must reject NaN");
        assert_eq!(err, "--interest-rate must be a finite number");

        let mut args = sample_args();
        args.starting_investment_per_month = f64::INFINITY;
        let err = run_project(&args).expect_err("must reject infinite contribution");
        assert!(err.starts_with("--starting-investment-per-month "));

        let mut args = sample_args();
        args.name = "  ".to_string();
        let err = build_params(&args).expect_err("must reject blank name");
        assert_eq!(err, "--name must not be empty");
    }

    #[test]
    fn apply_payload_names_json_keys_in_errors() {
        let payload = ParametersPayload {
            interest_rate_percent: Some(f64::INFINITY),
            ..ParametersPayload::default()
        };
        let err = apply_payload(&ScenarioParameters::default(), payload)
            .expect_err("must reject infinite rate");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "interestRatePercent must be a finite number");

        let payload = ParametersPayload {
            spending_per_year: Some(f64::NEG_INFINITY),
            ..ParametersPayload::default()
        };
        let err = apply_payload(&ScenarioParameters::default(), payload)
            .expect_err("must reject infinite spending");
        assert_eq!(err.to_string(), "spendingPerYear must be a finite number");
    }

    #[test]
    fn payload_parses_web_keys_and_keeps_defaults() {
        let payload = payload_from_json(
            r#"{
              "name": "Bea",
              "startingAge": 35,
              "startingBalance": -2500.5,
              "interestRate": 6,
              "retirementAge": 60,
              "investmentIncreasingRatePercent": 2.5
            }"#,
        );
        let params =
            apply_payload(&ScenarioParameters::default(), payload).expect("valid payload");

        assert_eq!(params.name, "Bea");
        assert_eq!(params.starting_age, 35);
        assert_approx(params.starting_balance, -2_500.5);
        assert_approx(params.interest_rate_percent, 6.0);
        assert_eq!(params.retirement_age, 60);
        assert_approx(params.investment_increasing_rate_percent, 2.5);
        assert_eq!(params.max_age, 120);
        assert_approx(params.spending_per_year, 100_000.0);
    }

    #[test]
    fn project_request_reports_insolvency_summary() {
        let payload = payload_from_json(
            r#"{
              "startingAge": 60,
              "startingBalance": 1000,
              "interestRatePercent": 0,
              "retirementAge": 50,
              "startingInvestmentPerMonth": 0,
              "investmentIncreasingRatePercent": 0,
              "spendingPerYear": 12000
            }"#,
        );
        let response =
            project_request(payload, DEFAULT_MAX_PROJECTION_YEARS).expect("valid request");

        assert_eq!(response.series.points.len(), 2);
        assert!(response.summary.insolvent);
        assert_eq!(response.summary.first_year, Some(60));
        assert_eq!(response.summary.final_year, Some(61));
        assert_approx(response.summary.final_value.expect("final value"), -11_000.0);
        assert_approx(response.summary.total_spent.expect("spent"), 12_000.0);
        assert!(response.summary.value_at_retirement.is_none());
    }

    #[test]
    fn project_request_rejects_long_horizon_as_bad_request() {
        let payload = payload_from_json(r#"{ "startingAge": 0, "maxAge": 2000000000 }"#);
        let err = project_request(payload, DEFAULT_MAX_PROJECTION_YEARS)
            .expect_err("must reject long horizon");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.to_string().contains("exceeds the limit"));
    }

    #[test]
    fn project_response_serialization_contains_expected_fields() {
        let response = project_request(ParametersPayload::default(), 200).expect("defaults");
        let json = serde_json::to_string(&response).expect("response should serialize");
        for key in [
            "\"parameters\"",
            "\"startingInvestmentPerMonth\"",
            "\"series\"",
            "\"points\"",
            "\"totalInterest\"",
            "\"interestPerYear\"",
            "\"summary\"",
            "\"valueAtRetirement\"",
            "\"insolvent\"",
        ] {
            assert!(json.contains(key), "missing {key} in {json}");
        }
    }

    #[test]
    fn registry_endpoints_add_update_and_remove() {
        let state = AppState::new(DEFAULT_MAX_PROJECTION_YEARS);
        let added = add_scenario(&state, payload_from_json(r#"{ "name": "Cleo" }"#))
            .expect("add scenario");
        let id = added.id.id();
        assert_eq!(added.series.points[0].year, 20);

        let updated = update_scenario(&state, id, payload_from_json(r#"{ "retirementAge": 45 }"#))
            .expect("update scenario");
        assert!(updated.recomputed);
        assert_eq!(updated.scenario.parameters.name, "Cleo");
        assert_eq!(updated.scenario.parameters.retirement_age, 45);

        let repeated = update_scenario(&state, id, payload_from_json(r#"{ "retirementAge": 45 }"#))
            .expect("repeat update");
        assert!(!repeated.recomputed);
        assert_eq!(repeated.scenario.series, updated.scenario.series);

        let fetched = get_scenario(&state, id).expect("get scenario");
        assert_eq!(fetched.series, updated.scenario.series);

        remove_scenario(&state, id).expect("remove scenario");
        let err = get_scenario(&state, id).expect_err("removed");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn rejected_update_returns_bad_request_and_keeps_series() {
        let state = AppState::new(150);
        let added = add_scenario(&state, ParametersPayload::default()).expect("add");
        let id = added.id.id();

        let err = update_scenario(&state, id, payload_from_json(r#"{ "maxAge": 500 }"#))
            .expect_err("must reject");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            get_scenario(&state, id).expect("still there").series,
            added.series
        );
    }

    #[test]
    fn list_and_chart_include_every_scenario_in_order() {
        let state = AppState::new(DEFAULT_MAX_PROJECTION_YEARS);
        add_scenario(&state, payload_from_json(r#"{ "name": "a", "maxAge": 30 }"#)).expect("a");
        add_scenario(&state, payload_from_json(r#"{ "name": "b", "maxAge": 25 }"#)).expect("b");

        let listed = list_scenarios(&state).expect("list");
        assert_eq!(listed.scenarios.len(), 2);
        let labels: Vec<&str> = listed
            .chart
            .datasets
            .iter()
            .map(|d| d.label.as_str())
            .collect();
        assert_eq!(labels, vec!["a", "b"]);

        let chart = registry_chart(&state).expect("chart");
        assert_eq!(chart.datasets[0].data.len(), 10);
        assert_eq!(chart.datasets[1].data.len(), 5);
    }

    #[test]
    fn bootstrap_builds_scenarios_and_canonical_query() {
        let query: QueryState = [
            ("0.Max Age", "120"),
            ("0.Retirement Age", "55"),
            ("1.Name", "Dora"),
            ("1.Max Age", "40"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let response =
            bootstrap_from_query(&query, DEFAULT_MAX_PROJECTION_YEARS).expect("bootstrap");
        assert_eq!(response.scenarios.len(), 2);
        assert_eq!(response.scenarios[0].parameters.retirement_age, 55);
        assert_eq!(response.scenarios[1].series.points.len(), 20);
        assert_eq!(response.chart.datasets[1].label, "Dora");
        assert!(!response.query.contains_key("0.Max Age"));
        assert_eq!(
            response.query.get("1.Max Age").map(String::as_str),
            Some("40")
        );
    }

    #[test]
    fn bootstrap_rejects_bad_numbers() {
        let query: QueryState = [("0.Starting age".to_string(), "old".to_string())]
            .into_iter()
            .collect();
        let err = bootstrap_from_query(&query, DEFAULT_MAX_PROJECTION_YEARS)
            .expect_err("must reject");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn edit_field_sets_and_clears_query_keys() {
        let payload: FieldEditPayload = serde_json::from_str(
            r#"{ "index": 0, "field": "Spending Per Year Input", "value": "60000" }"#,
        )
        .expect("payload");
        let edited = edit_field(payload, DEFAULT_MAX_PROJECTION_YEARS).expect("edit");
        assert_eq!(
            edited.query.get("0.Spending Per Year Input").map(String::as_str),
            Some("60000")
        );
        assert_approx(edited.scenario.parameters.spending_per_year, 60_000.0);

        let payload = FieldEditPayload {
            query: edited.query,
            index: 0,
            field: "Spending Per Year Input".to_string(),
            value: "100000".to_string(),
        };
        let reverted = edit_field(payload, DEFAULT_MAX_PROJECTION_YEARS).expect("edit");
        assert!(reverted.query.is_empty());

        let payload = FieldEditPayload {
            query: QueryState::new(),
            index: 0,
            field: "Shoe Size".to_string(),
            value: "9".to_string(),
        };
        let err = edit_field(payload, DEFAULT_MAX_PROJECTION_YEARS).expect_err("unknown field");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn edit_field_trims_names_and_reports_blank_ones_by_key() {
        let payload = FieldEditPayload {
            query: [("0.Name".to_string(), "Bea".to_string())].into_iter().collect(),
            index: 0,
            field: "Name".to_string(),
            value: "Albert ".to_string(),
        };
        let edited = edit_field(payload, DEFAULT_MAX_PROJECTION_YEARS).expect("edit");
        assert!(edited.query.is_empty());
        assert_eq!(edited.scenario.parameters.name, "Albert");

        let payload = FieldEditPayload {
            query: QueryState::new(),
            index: 0,
            field: "Name".to_string(),
            value: "   ".to_string(),
        };
        let err = edit_field(payload, DEFAULT_MAX_PROJECTION_YEARS).expect_err("blank name");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "name must not be empty");
    }

    #[test]
    fn run_project_renders_table_and_json() {
        let mut args = sample_args();
        args.max_age = 23;
        let table = run_project(&args).expect("table");
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].starts_with("Albert (3 points"));
        assert!(lines[2].trim_start().starts_with("20"));

        args.format = OutputFormat::Json;
        let json = run_project(&args).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        assert_eq!(value["series"]["points"].as_array().map(Vec::len), Some(3));
        assert_eq!(value["summary"]["insolvent"], serde_json::Value::Bool(false));
    }

    #[test]
    fn run_project_table_marks_insolvency() {
        let mut args = sample_args();
        args.starting_age = 60;
        args.starting_balance = 1_000.0;
        args.interest_rate = 0.0;
        args.starting_investment_per_month = 0.0;
        args.spending_per_year = 12_000.0;

        let table = run_project(&args).expect("table");
        assert!(table.ends_with("insolvent at age 61\n"));
    }
}
