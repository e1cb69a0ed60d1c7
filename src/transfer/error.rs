//! Error types for the transfer workflow.

use thiserror::Error;

use super::Stage;
use super::draft::FieldError;

/// Errors returned by [`TransferWorkflow`](super::TransferWorkflow)
/// operations. None of these are fatal: every variant leaves the workflow in
/// an interactive state.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// The requested operation is not available in the current stage.
    #[error("operation not allowed in the {0:?} stage")]
    InvalidStage(Stage),

    /// Local validation failed; no verification call was made.
    #[error("draft validation failed on {} field(s)", .0.len())]
    Validation(Vec<FieldError>),

    /// Progression requires a verified or uncertain outcome.
    #[error("account has not been verified")]
    NotVerified,

    /// The authorization acknowledgment is required before submission.
    #[error("transfer has not been authorized")]
    NotAuthorized,
}
