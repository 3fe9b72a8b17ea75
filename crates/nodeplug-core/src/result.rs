//! Convenience result type alias for NodePlug.

use crate::error::AppError;

/// A specialized `Result` type for NodePlug operations.
pub type AppResult<T> = Result<T, AppError>;
