use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// All monetary values on the funded-ratio side. Wraps Decimal to prevent
/// accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = Decimal;

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Numeric representation a computation was carried out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Decimal128,
    Float64,
}

impl Precision {
    fn label(self) -> &'static str {
        match self {
            Precision::Decimal128 => "rust_decimal_128bit",
            Precision::Float64 => "ieee754_f64",
        }
    }
}

/// Helper to wrap Decimal computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    wrap_output(
        methodology,
        assumptions,
        warnings,
        elapsed_us,
        Precision::Decimal128,
        result,
    )
}

/// Same as [`with_metadata`] for the f64 simulation engine.
pub fn with_metadata_f64<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    wrap_output(
        methodology,
        assumptions,
        warnings,
        elapsed_us,
        Precision::Float64,
        result,
    )
}

fn wrap_output<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    precision: Precision,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: precision.label().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_labels() {
        let out = with_metadata("m", &serde_json::json!({}), vec![], 1, 1u32);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
        let out = with_metadata_f64("m", &serde_json::json!({}), vec![], 1, 1u32);
        assert_eq!(out.metadata.precision, "ieee754_f64");
        assert_eq!(out.methodology, "m");
    }
}
