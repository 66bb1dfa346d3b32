//! crates/study_market_core/src/error.rs
//!
//! The user-facing outcome of a failed marketplace action.
//!
//! There are exactly three tiers: the caller must sign in, the input was
//! rejected, or the call failed. Nothing is retried.

use crate::ports::PortError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("{0}")]
    AuthRequired(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Failed(String),
}

impl ActionError {
    /// Short headline for a notification.
    pub fn title(&self) -> &'static str {
        match self {
            ActionError::AuthRequired(_) => "Authentication Required",
            ActionError::Validation(_) => "Invalid Request",
            ActionError::Failed(_) => "Error",
        }
    }

    pub fn auth_required(action: &str) -> Self {
        ActionError::AuthRequired(format!("Please log in to {}", action))
    }
}

impl From<PortError> for ActionError {
    fn from(err: PortError) -> Self {
        match err {
            PortError::Unauthorized => ActionError::AuthRequired("Please log in to continue".to_string()),
            PortError::NotFound(what) => ActionError::Validation(what),
            PortError::Conflict(what) => ActionError::Validation(what),
            PortError::Unexpected(_) => {
                ActionError::Failed("Something went wrong. Please try again.".to_string())
            }
        }
    }
}

pub type ActionResult<T> = Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_errors_fold_into_three_tiers() {
        assert!(matches!(
            ActionError::from(PortError::Unauthorized),
            ActionError::AuthRequired(_)
        ));
        assert!(matches!(
            ActionError::from(PortError::NotFound("Note x not found".into())),
            ActionError::Validation(_)
        ));
        assert!(matches!(
            ActionError::from(PortError::Conflict("dup".into())),
            ActionError::Validation(_)
        ));
        let failed = ActionError::from(PortError::Unexpected("pool timed out".into()));
        assert_eq!(failed.title(), "Error");
        // Internal details never reach the message.
        assert!(!failed.to_string().contains("pool"));
    }

    #[test]
    fn auth_required_message() {
        let err = ActionError::auth_required("purchase notes");
        assert_eq!(err.to_string(), "Please log in to purchase notes");
        assert_eq!(err.title(), "Authentication Required");
    }
}
