use thiserror::Error;

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A numeric option is outside of its accepted range.
    #[error("Invalid value for `{field}`: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    /// A required string option is empty.
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
}
