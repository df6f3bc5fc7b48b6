use std::borrow::Cow;

use thiserror::Error;

/// Convenient result alias for the workflow engine.
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// The one error type that crosses the engine boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorkflowError {
    /// The `(state, event)` pair has no entry in the machine's table.
    #[error("{machine}: event {event} is not permitted from state {state}")]
    InvalidTransition {
        machine: &'static str,
        state: String,
        event: String,
    },

    /// The pair is defined but its guard did not hold. Displays as the
    /// operator-facing reason only.
    #[error("{reason}")]
    GuardRejected {
        machine: &'static str,
        state: String,
        event: String,
        reason: Cow<'static, str>,
    },

    #[error("{machine}: unknown state {value:?}")]
    UnknownState { machine: &'static str, value: String },

    #[error("{machine}: unknown event {value:?}")]
    UnknownEvent { machine: &'static str, value: String },
}

/// How a caller is expected to treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureClass {
    /// Out-of-order action or corrupt persisted value; log and alert.
    Defect,
    /// A guard said no; render the reason inline to the operator.
    Expected,
}

impl std::fmt::Display for FailureClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureClass::Defect => write!(f, "defect"),
            FailureClass::Expected => write!(f, "expected"),
        }
    }
}

impl WorkflowError {
    pub fn class(&self) -> FailureClass {
        match self {
            WorkflowError::GuardRejected { .. } => FailureClass::Expected,
            WorkflowError::InvalidTransition { .. }
            | WorkflowError::UnknownState { .. }
            | WorkflowError::UnknownEvent { .. } => FailureClass::Defect,
        }
    }

    /// The guard's reason, when this is a guard rejection.
    pub fn reason(&self) -> Option<&str> {
        match self {
            WorkflowError::GuardRejected { reason, .. } => Some(&**reason),
            _ => None,
        }
    }

    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, WorkflowError::InvalidTransition { .. })
    }

    pub fn is_guard_rejected(&self) -> bool {
        matches!(self, WorkflowError::GuardRejected { .. })
    }
}

/// Errors from loading and running replay scripts.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
