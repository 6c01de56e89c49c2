//! Error taxonomy shared by every console operation.
//!
//! - `NotFound`   : legitimate "no data yet"; callers normally fold it into `None`
//! - `Remote`     : non-2xx or transport failure; prior state is kept
//! - `Validation` : local pre-flight failure; never reaches the network
//! - `Timeout`    : a bounded poller gave up; the backend may still be working
//! - `Stale`      : response for a previous selection; dropped silently

use chrono::NaiveDate;
use thiserror::Error;

use crate::operation::OperationId;
use crate::ports::GatewayError;
use crate::provisioning::ProvisioningValidationError;
use crate::rules::RulesValidationError;

/// Local, pre-flight validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("select a client first")]
    NoClientSelected,

    #[error("select a client and a project first")]
    NoProjectSelected,

    #[error("flight window end {end} must be after start {start}")]
    InvalidFlightWindow { start: NaiveDate, end: NaiveDate },

    #[error("unknown region code: {0}")]
    UnknownRegion(String),

    #[error(transparent)]
    Rules(#[from] RulesValidationError),

    #[error(transparent)]
    Provisioning(#[from] ProvisioningValidationError),

    #[error("only .zip archives can be uploaded (got {file_name})")]
    InvalidArchiveExtension { file_name: String },

    #[error("an upload is already in progress")]
    UploadInProgress,

    #[error("winner selection is not available until processing completes with eligible contestants")]
    WinnerGateClosed,

    #[error("number of winners must be greater than zero")]
    InvalidWinnerCount,

    #[error("contest rules are not being edited")]
    NotEditing,

    #[error("save contest rules before setting a receipt keyword")]
    KeywordRequiresRules,

    #[error("receipt keyword must not be empty")]
    EmptyKeyword,

    #[error("a provisioning request is already running")]
    ProvisioningBusy,
}

/// Error returned by console operations.
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("requested data does not exist yet")]
    NotFound,

    #[error("remote request failed: {0}")]
    Remote(#[from] GatewayError),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),

    #[error("{operation} timed out after {attempts} attempts; the backend may still be processing")]
    Timeout {
        operation: OperationId,
        attempts: u32,
    },

    #[error("response for a previous selection was discarded")]
    Stale,

    #[error("operation cancelled by a selection change")]
    Cancelled,
}

impl ConsoleError {
    /// Whether this error should be shown to the user.
    pub fn is_user_visible(&self) -> bool {
        !matches!(self, ConsoleError::Stale | ConsoleError::NotFound)
    }
}

impl From<RulesValidationError> for ConsoleError {
    fn from(err: RulesValidationError) -> Self {
        ConsoleError::Validation(err.into())
    }
}

impl From<ProvisioningValidationError> for ConsoleError {
    fn from(err: ProvisioningValidationError) -> Self {
        ConsoleError::Validation(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_differs_from_remote_failure() {
        let timeout = ConsoleError::Timeout {
            operation: OperationId::UploadReceipts,
            attempts: 60,
        };
        let remote = ConsoleError::Remote(GatewayError::Status {
            status: 500,
            message: "boom".into(),
        });
        assert!(timeout.to_string().contains("timed out"));
        assert!(!remote.to_string().contains("timed out"));
    }

    #[test]
    fn stale_and_not_found_are_not_user_visible() {
        assert!(!ConsoleError::Stale.is_user_visible());
        assert!(!ConsoleError::NotFound.is_user_visible());
        assert!(ConsoleError::Validation(ValidationFailure::NoClientSelected).is_user_visible());
    }
}
