use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field was left empty.
    #[error("`{0}` must not be empty")]
    EmptyField(&'static str),
    /// A field holds a value outside its allowed range or shape.
    #[error("Invalid value for `{field}`: {constraint}")]
    InvalidFieldValue {
        field: &'static str,
        constraint: String,
    },
    /// Invalid retry configuration.
    #[error("Invalid retry config: {0}")]
    RetryConfig(String),
}
