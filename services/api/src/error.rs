//! services/api/src/error.rs
//!
//! Defines the primary error type for the entire API service and how it is
//! rendered to clients.

use crate::config::ConfigError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use study_market_core::{error::ActionError, ports::PortError};
use tracing::error;
use utoipa::ToSchema;

/// The primary error type for the `api` service.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// A marketplace action was refused or failed.
    #[error("{0}")]
    Action(#[from] ActionError),

    /// Represents an error from the underlying database library.
    #[error("Database Error: {0}")]
    Database(#[from] sqlx::Error),

    /// Represents a standard Input/Output error (e.g., binding to a network socket).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// The notification-shaped body every error response carries.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub title: String,
    pub description: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Action(ActionError::Validation(message.into()))
    }

    pub fn auth_required(action: &str) -> Self {
        ApiError::Action(ActionError::auth_required(action))
    }

    /// Folds every error into one of the three user-facing tiers.
    fn to_action(&self) -> ActionError {
        match self {
            ApiError::Action(action) => action.clone(),
            ApiError::Port(PortError::Unauthorized) => {
                ActionError::AuthRequired("Please log in to continue".to_string())
            }
            ApiError::Port(PortError::NotFound(what)) => ActionError::Validation(what.clone()),
            ApiError::Port(PortError::Conflict(what)) => ActionError::Validation(what.clone()),
            _ => ActionError::Failed("Something went wrong. Please try again.".to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let action = self.to_action();
        let status = match action {
            ActionError::AuthRequired(_) => StatusCode::UNAUTHORIZED,
            ActionError::Validation(_) => StatusCode::BAD_REQUEST,
            ActionError::Failed(_) => {
                error!("Request failed: {}", self);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            title: action.title().to_string(),
            description: action.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiers_map_to_status_codes() {
        let cases = [
            (ApiError::auth_required("purchase notes"), StatusCode::UNAUTHORIZED),
            (ApiError::validation("Title is required"), StatusCode::BAD_REQUEST),
            (
                ApiError::Port(PortError::NotFound("Note 1 not found".into())),
                StatusCode::BAD_REQUEST,
            ),
            (ApiError::Port(PortError::Unauthorized), StatusCode::UNAUTHORIZED),
            (ApiError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                ApiError::Database(sqlx::Error::PoolTimedOut),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn internal_details_stay_out_of_the_message() {
        let action = ApiError::Internal("disk quota".into()).to_action();
        assert!(!action.to_string().contains("disk"));
        assert_eq!(action.title(), "Error");
    }
}
