use std::fmt;

use crate::api::Endpoint;
use crate::model::Panel;

/// Required form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    BusinessType,
    Location,
    InvestmentBudget,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::BusinessType => "business type",
            Field::Location => "location",
            Field::InvestmentBudget => "investment budget",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(Field),
    #[error("investment budget must be a positive number, got {0:?}")]
    InvalidBudget(String),
}

/// Failure of a single backend call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("{endpoint} timed out")]
    Timeout { endpoint: Endpoint },
    #[error("{endpoint} unreachable: {message}")]
    Transport { endpoint: Endpoint, message: String },
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: Endpoint, status: u16 },
    #[error("{endpoint} returned a malformed body: {message}")]
    Decode { endpoint: Endpoint, message: String },
}

impl BackendError {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            BackendError::Timeout { endpoint }
            | BackendError::Transport { endpoint, .. }
            | BackendError::Status { endpoint, .. }
            | BackendError::Decode { endpoint, .. } => *endpoint,
        }
    }
}

/// Everything that can go wrong between form and dashboard.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to load initial data: {0}")]
    ReferenceLoad(BackendError),
    #[error("failed to analyze business viability: {0}")]
    PrimaryAnalysis(BackendError),
    #[error("{panel} panel unavailable: {source}")]
    SecondaryAnalysis { panel: Panel, source: BackendError },
}

impl AnalysisError {
    /// Text for the transient notification shown to the user. Secondary
    /// failures are never shown, the panel is simply omitted.
    pub fn user_message(&self) -> Option<String> {
        match self {
            AnalysisError::Validation(ValidationError::MissingField(_)) => {
                Some("Please fill in all required fields".to_string())
            }
            AnalysisError::Validation(ValidationError::InvalidBudget(_)) => {
                Some("Please enter a valid investment budget".to_string())
            }
            AnalysisError::ReferenceLoad(_) => Some("Failed to load initial data".to_string()),
            AnalysisError::PrimaryAnalysis(_) => Some("Failed to analyze business viability".to_string()),
            AnalysisError::SecondaryAnalysis { .. } => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid API base url {value:?}: {source}")]
    InvalidBaseUrl { value: String, source: url::ParseError },
    #[error("API base url {0:?} cannot carry a path")]
    NotABase(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secondary_errors_have_no_user_message() {
        let err = AnalysisError::SecondaryAnalysis {
            panel: Panel::Competition,
            source: BackendError::Status { endpoint: Endpoint::CompetitionAnalysis, status: 500 },
        };
        assert_eq!(err.user_message(), None);
        assert_eq!(err.to_string(), "competition panel unavailable: /competition_analysis returned HTTP 500");
    }

    #[test]
    fn test_reference_load_message() {
        let err = AnalysisError::ReferenceLoad(BackendError::Timeout { endpoint: Endpoint::Locations });
        assert_eq!(err.user_message().as_deref(), Some("Failed to load initial data"));
        assert!(err.to_string().starts_with("failed to load initial data"));
    }

    #[test]
    fn test_backend_error_endpoint() {
        let err = BackendError::Decode { endpoint: Endpoint::AreaHeatmap, message: "eof".to_string() };
        assert_eq!(err.endpoint(), Endpoint::AreaHeatmap);
    }
}
