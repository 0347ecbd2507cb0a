use thiserror::Error;

/// Failures while loading or building a [`crate::page_index::PageIndex`].
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("malformed page index: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Two keys collapse onto the same normalized token.
    #[error("page index keys {first:?} and {second:?} both normalize to {normalized:?}")]
    Collision {
        normalized: String,
        first: String,
        second: String,
    },
}

/// Failure raised by a page behavior. Aborts that handler only.
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("required element not found: {0}")]
    MissingElement(String),
}
