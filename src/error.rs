//! Error types for loadphase

use thiserror::Error;

/// Main error type for loading operations
///
/// Load failures are deliberately non-fatal: the loader logs them and marks
/// the asset loaded anyway, so a broken asset can never stall phase progress
/// or block world entry. This type exists so those log lines carry the asset
/// identity alongside the underlying cause.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("load operation for asset `{id}` failed: {reason:#}")]
    Operation { id: String, reason: anyhow::Error },
}

/// Result type alias for loading operations
pub type Result<T> = std::result::Result<T, LoadError>;
