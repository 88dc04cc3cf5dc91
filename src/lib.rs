//! Genomic inflation factor (lambda) from GWAS summary statistics.
//!
//! Results files are read column-wise, missing values dropped, markers
//! optionally restricted to an extraction list, and the statistics brought
//! onto the chi-squared(1) scale before taking the ratio of their median to
//! the null median.

pub mod error;
pub mod logging;
pub mod types;

pub mod df_utils;
pub mod io;
pub mod parallel;
pub mod qc;

pub mod inflation;
pub mod lambda;

pub use error::LambdaError;
pub use inflation::{EXPECTED_MEDIAN, compute_inflation};
pub use lambda::{LambdaConfig, run};
pub use types::{Delimiter, InputMode, Sidedness};
