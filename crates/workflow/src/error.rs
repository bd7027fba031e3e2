use hrms_client::ApiError;
use hrms_core::error::CoreError;

/// Errors from driving an import session.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// Rejected locally before any request was made.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The request failed; the workflow state is unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The progress poller ended without observing a terminal status.
    #[error("Progress polling stopped before the job finished")]
    PollerStopped,
}

impl WorkflowError {
    /// Text suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Core(e) => e.user_message(),
            Self::Api(e) => e.user_message(),
            Self::PollerStopped => self.to_string(),
        }
    }

    /// Whether the error was raised without contacting the server.
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::Api(_))
    }
}
