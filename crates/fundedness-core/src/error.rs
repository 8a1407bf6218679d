use thiserror::Error;

#[derive(Debug, Error)]
pub enum FundednessError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Unknown policy: {0}")]
    UnknownPolicy(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for FundednessError {
    fn from(e: serde_json::Error) -> Self {
        FundednessError::SerializationError(e.to_string())
    }
}

impl FundednessError {
    /// Shorthand for the most common validation failure.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        FundednessError::InvalidInput {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
