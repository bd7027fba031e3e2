#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cannot {action} while in the {from} step")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },
}

impl CoreError {
    /// The human-readable message without the category prefix, suitable for
    /// inline display next to the control that caused it.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) | Self::Conflict(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
