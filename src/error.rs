use crate::intake::validator::Violation;
use thiserror::Error;

/// Failures raised while talking to the backend command.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("failed to start backend command: {0}")]
    Spawn(String),
    #[error("backend command exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("backend returned an unreadable envelope: {0}")]
    Envelope(String),
    #[error("backend rejected the submission: {0}")]
    Rejected(String),
}

/// Reasons the submission gate stops before (or while) handing the payload off.
///
/// Apart from `Completed`, every variant leaves the gate idle and the user
/// may try again.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("{}", .0.message)]
    Validation(Violation),
    #[error("Please wait, files are still being processed!")]
    EncodingNotReady { pending: usize },
    #[error("The file \"{filename}\" exceeds the maximum allowed size of {limit_kb} KB.")]
    SizeLimit { filename: String, limit_kb: f64 },
    #[error("a submission is already in progress")]
    InFlight,
    #[error("This application has already been submitted.")]
    Completed,
    #[error("An error occurred during submission.")]
    Backend(#[from] BackendError),
}

impl GateError {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, GateError::Completed)
    }

    /// Only backend failures cross the component boundary.
    pub fn crossed_boundary(&self) -> bool {
        matches!(self, GateError::Backend(_))
    }
}
