use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Serialize;

use fundedness_core::monte_carlo::SimulationInput;
use fundedness_core::FundednessResult;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Parse JSON input, run `f`, and serialise its output envelope.
fn call_json<I, O>(input_json: &str, f: impl FnOnce(&I) -> FundednessResult<O>) -> NapiResult<String>
where
    I: DeserializeOwned,
    O: Serialize,
{
    let input: I = serde_json::from_str(input_json).map_err(to_napi_error)?;
    let output = f(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Funded ratio
// ---------------------------------------------------------------------------

#[napi]
pub fn compute_cefr(input_json: String) -> NapiResult<String> {
    call_json(&input_json, fundedness_core::cefr::engine::compute_cefr)
}

#[napi]
pub fn liability_schedule(input_json: String) -> NapiResult<String> {
    call_json(&input_json, fundedness_core::cefr::liabilities::liability_schedule)
}

// ---------------------------------------------------------------------------
// Simulation
// ---------------------------------------------------------------------------

#[napi]
pub fn run_simulation(input_json: String) -> NapiResult<String> {
    call_json(&input_json, fundedness_core::monte_carlo::simulation::run_simulation)
}

/// Same as `run_simulation` without the per-path matrices.
#[napi]
pub fn run_simulation_summary(input_json: String) -> NapiResult<String> {
    call_json(&input_json, |input: &SimulationInput| {
        let mut output = fundedness_core::monte_carlo::simulation::run_simulation(input)?;
        output.result = output.result.summarize();
        Ok(output)
    })
}

#[napi]
pub fn compare_strategies(input_json: String) -> NapiResult<String> {
    call_json(&input_json, fundedness_core::withdrawals::comparison::compare_strategies)
}
