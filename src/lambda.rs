use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::df_utils::{
    column_values, ensure_f64_strict, ensure_utf8, filter_markers, filter_missing,
};
use crate::error::LambdaError;
use crate::inflation::inflation_summary;
use crate::io::{read_marker_set, read_table, write_summaries};
use crate::logging::{error_line, log_line, warn_line};
use crate::parallel::{map_ordered, resolve_threads, run_in_pool};
use crate::qc::check_file_exists;
use crate::types::{Delimiter, InputMode, LambdaSummary};

#[derive(Debug, Clone)]
pub struct LambdaConfig {
    pub inputs: Vec<PathBuf>,
    pub delimiter: Delimiter,
    pub field: String,
    pub snp_field: String,
    pub mode: InputMode,
    pub extract: Option<PathBuf>,
    pub cores: Option<usize>,
    pub log_name: Option<String>,
    pub output: Option<PathBuf>,
}

impl LambdaConfig {
    pub fn new(inputs: Vec<PathBuf>, field: impl Into<String>, mode: InputMode) -> Self {
        Self {
            inputs,
            delimiter: Delimiter::default(),
            field: field.into(),
            snp_field: "snp".to_string(),
            mode,
            extract: None,
            cores: None,
            log_name: None,
            output: None,
        }
    }

    /// Checks that need no file access. Failing here aborts the whole run.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.inputs.is_empty() {
            return Err(LambdaError::Configuration(
                "At least one input file is required.".into(),
            ));
        }
        if self.field.trim().is_empty() {
            return Err(LambdaError::Configuration(
                "The statistic field name can't be empty.".into(),
            ));
        }
        if self.extract.is_some() && self.snp_field.trim().is_empty() {
            return Err(LambdaError::Configuration(
                "The --snp-field name can't be empty when extracting markers.".into(),
            ));
        }
        if self.extract.is_some() && self.snp_field == self.field {
            return Err(LambdaError::Configuration(format!(
                "The --snp-field and --field options can't both name '{}' when extracting markers.",
                self.field
            )));
        }
        if self.cores == Some(0) {
            return Err(LambdaError::Configuration(
                "The number of cores must be at least 1.".into(),
            ));
        }
        Ok(())
    }
}

/// Result of one input file. A failed file does not stop the others.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<LambdaSummary>,
    /// Log lines emitted while processing this file.
    pub log: String,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Computes lambda for every input file.
///
/// Returns `Err` only for problems that concern the whole run (invalid
/// configuration, unreadable extract file, log or output file creation);
/// per-file problems are reported in the corresponding [`FileOutcome`].
pub fn run(config: &LambdaConfig) -> Result<Vec<FileOutcome>> {
    config.validate()?;

    let markers = match &config.extract {
        Some(path) => {
            check_file_exists(path)?;
            let markers = read_marker_set(path)?;
            info!(
                "{} markers to extract read from '{}'",
                markers.len(),
                path.display()
            );
            Some(markers)
        }
        None => None,
    };

    let threads = resolve_threads(config.cores, config.inputs.len());
    let outcomes = run_in_pool(threads, "build lambda thread pool", || {
        map_ordered(&config.inputs, threads.is_some(), |path| {
            let mut log = Vec::new();
            let result = process_file(config, markers.as_ref(), path, &mut log);
            if let Err(err) = &result {
                let _ = error_line(&mut log, &format!("{err:#}"));
            }
            FileOutcome {
                path: path.clone(),
                result,
                log: String::from_utf8_lossy(&log).into_owned(),
            }
        })
    })?;

    if let Some(name) = &config.log_name {
        write_log(name, config, &outcomes)?;
    }
    if let Some(output) = &config.output {
        let summaries: Vec<LambdaSummary> = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok().cloned())
            .collect();
        write_summaries(&summaries, output)?;
        info!("Results written to '{}'", output.display());
    }

    Ok(outcomes)
}

/// Reads one results file and computes its inflation factor, appending the
/// log lines to `log`.
pub fn process_file<W: Write>(
    config: &LambdaConfig,
    markers: Option<&HashSet<String>>,
    path: &Path,
    log: &mut W,
) -> Result<LambdaSummary> {
    log_line(log, &format!("Reading '{}'", path.display()), true)?;
    check_file_exists(path)?;

    let field = config.field.as_str();
    let mut columns = vec![field];
    if markers.is_some() {
        columns.push(config.snp_field.as_str());
    }

    let df = read_table(path, config.delimiter, &columns)?;
    let df = ensure_f64_strict(df, field, path)?;
    let (df, na_removed) = filter_missing(df, &columns)?;
    log_line(log, &format!("  - {na_removed} NA values removed"), true)?;

    let (df, extracted) = match markers {
        Some(markers) => {
            let df = ensure_utf8(df, &[config.snp_field.as_str()])?;
            let (df, kept) = filter_markers(df, &config.snp_field, markers)?;
            log_line(log, &format!("  - {kept} markers extracted"), true)?;
            if kept == 0 {
                warn_line(
                    log,
                    &format!("  - none of the markers to extract are in '{}'", path.display()),
                )?;
            }
            (df, Some(kept))
        }
        None => (df, None),
    };

    let values = column_values(&df, field)?;
    log_line(log, &format!("  - {}", config.mode.describe()), true)?;
    log_line(log, "  - computing inflation factor", true)?;
    let inflation = inflation_summary(&values, config.mode)
        .with_context(|| path.display().to_string())?;
    log_line(log, &format!("  - lambda = {:.6}", inflation.lambda), true)?;

    Ok(LambdaSummary {
        file: path.display().to_string(),
        na_removed,
        extracted,
        n_used: values.len(),
        median_chi2: inflation.median_chi2,
        lambda: inflation.lambda,
    })
}

fn write_log(name: &str, config: &LambdaConfig, outcomes: &[FileOutcome]) -> Result<()> {
    let path = format!("{name}_lambda.log");
    let mut file = File::create(&path).with_context(|| format!("create {path}"))?;
    writeln!(
        file,
        "Computing the inflation factor of {} file(s) ({})",
        config.inputs.len(),
        config.mode.describe()
    )?;
    if let Some(extract) = &config.extract {
        writeln!(file, "Markers extracted from '{}'", extract.display())?;
    }
    for outcome in outcomes {
        file.write_all(outcome.log.as_bytes())?;
    }
    Ok(())
}
