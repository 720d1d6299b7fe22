//! Error types for the model crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid extras merge policy {0:?}: expected 3 characters from [kn][cn][lud]")]
    InvalidMergePolicy(String),

    #[error("invalid comment merge mode {0:?}: expected leave, newest, or overwrite")]
    InvalidCommentMode(String),

    #[error("invalid extras mode for new entities {0:?}: expected import or none")]
    InvalidExtrasMode(String),
}
