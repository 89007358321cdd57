use napi::Result as NapiResult;
use napi_derive::napi;

use paydown_core::{assumptions, comparison, covenants, engine, sensitivity, stress};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

#[napi]
pub fn project_model(input_json: String) -> NapiResult<String> {
    let input: assumptions::Assumptions =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = engine::project(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn covenant_compliance(input_json: String) -> NapiResult<String> {
    let input: covenants::CovenantTestInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = covenants::test_covenants(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Analyses
// ---------------------------------------------------------------------------

#[napi]
pub fn sensitivity_analysis(input_json: String) -> NapiResult<String> {
    let input: sensitivity::SensitivityInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = sensitivity::run_sensitivity(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn stress_test_suite(input_json: String) -> NapiResult<String> {
    let input: stress::StressSuiteInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = stress::run_stress_suite(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Run one built-in scenario by name; `scenarios` in the input is ignored.
#[napi]
pub fn stress_scenario(input_json: String, scenario_name: String) -> NapiResult<String> {
    let input: stress::StressSuiteInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let scenario = stress::find_scenario(&scenario_name).map_err(to_napi_error)?;
    let output = stress::stress_test(&input.assumptions, &scenario, &input.thresholds)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn stress_catalog() -> NapiResult<String> {
    serde_json::to_string(&stress::standard_scenarios()).map_err(to_napi_error)
}

#[napi]
pub fn compare_scenarios(input_json: String) -> NapiResult<String> {
    let input: comparison::ComparisonInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = comparison::compare_scenarios(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
