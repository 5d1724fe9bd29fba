use thiserror::Error;

/// A configuration value rejected before it reaches the tag hardware.
///
/// `field` is the wire path of the offending value, for example
/// `measurementConfig.runningTime`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {field}: {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Prefixes the field path with the enclosing object name.
    pub(crate) fn within(mut self, parent: &str) -> Self {
        self.field = format!("{}.{}", parent, self.field);
        self
    }
}

pub type Result<T> = std::result::Result<T, ValidationError>;
