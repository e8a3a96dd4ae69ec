use crate::error::{ComplianceError, Result};
use crate::models::SearchParams;
use crate::store::{MAX_RISK_SCORE, MIN_RISK_SCORE};

/// Checks explicit tool parameters before any interpretation or search runs
#[derive(Debug, Default, Clone)]
pub struct InputValidator;

impl InputValidator {
    pub fn new() -> Self {
        Self
    }

    pub fn validate_risk_score(&self, field: &str, value: f64) -> Result<()> {
        if !value.is_finite() || !(MIN_RISK_SCORE..=MAX_RISK_SCORE).contains(&value) {
            return Err(ComplianceError::validation(
                field,
                format!("must be between {MIN_RISK_SCORE} and {MAX_RISK_SCORE} (got {value})"),
            ));
        }
        Ok(())
    }

    pub fn validate_range(&self, min: Option<f64>, max: Option<f64>) -> Result<()> {
        if let Some(min) = min {
            self.validate_risk_score("minRiskScore", min)?;
        }
        if let Some(max) = max {
            self.validate_risk_score("maxRiskScore", max)?;
        }
        if let (Some(min), Some(max)) = (min, max) {
            if min > max {
                return Err(ComplianceError::InvalidRange { min, max });
            }
        }
        Ok(())
    }

    pub fn validate_limit(&self, limit: Option<u32>) -> Result<()> {
        if limit == Some(0) {
            return Err(ComplianceError::validation("limit", "must be a positive integer"));
        }
        Ok(())
    }

    /// Validate the explicitly supplied structured parameters.
    pub fn validate_search_params(&self, params: &SearchParams) -> Result<()> {
        self.validate_range(params.min_risk_score, params.max_risk_score)?;
        self.validate_limit(params.limit)
    }
}
