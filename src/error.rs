use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LambdaError {
    #[error("{0}")]
    Configuration(String),

    #[error("{}: {message}", path.display())]
    InputFile { path: PathBuf, message: String },

    #[error("{}: no field named '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: String },

    #[error("no usable statistics (empty input after removing missing values and filtering)")]
    EmptyInput,

    #[error("invalid p-value {value} at position {index}: p-values must lie in (0, 1)")]
    InvalidPValue { index: usize, value: f64 },
}

pub type Result<T> = std::result::Result<T, LambdaError>;
