use thiserror::Error;

/// Errors produced by the compliance assistant pipeline
#[derive(Error, Debug)]
pub enum ComplianceError {
    #[error("{field} {message}")]
    Validation { field: String, message: String },

    #[error("invalid range: minRiskScore ({min}) cannot be greater than maxRiskScore ({max})")]
    InvalidRange { min: f64, max: f64 },

    #[error("completion service error: {0}")]
    Upstream(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("supplier data error: {0}")]
    Data(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ComplianceError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// True for errors caused by the caller's input rather than the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::InvalidRange { .. })
    }
}

pub type Result<T> = std::result::Result<T, ComplianceError>;
