use thiserror::Error;

/// Core error type for proxylink resource handling.
///
/// A malformed parent reference is the only failure the domain types can
/// produce; everything else is typed at the store or engine layer.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid parent reference: {0}")]
    InvalidParentRef(String),
}

impl CoreError {
    /// Create a new InvalidParentRef error.
    pub fn invalid_parent_ref(value: impl Into<String>) -> Self {
        Self::InvalidParentRef(value.into())
    }
}

/// Convenience result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
