/// Convenience result type used across the shimmer core.
pub type ShimmerResult<T> = Result<T, ShimmerError>;

/// Top-level error taxonomy used by public APIs.
///
/// Allocation failures never surface here: they are absorbed by the buffer cache and turned into
/// low-memory recovery.
#[derive(thiserror::Error, Debug)]
pub enum ShimmerError {
    /// Invalid user-provided configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// Degenerate band geometry (empty surface, band fraction out of range).
    #[error("geometry error: {0}")]
    Geometry(String),

    /// Errors when serializing or deserializing configuration.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ShimmerError {
    /// Build a [`ShimmerError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`ShimmerError::Geometry`] value.
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Build a [`ShimmerError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
