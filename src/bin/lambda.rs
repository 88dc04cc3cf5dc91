use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use gwaslambda::lambda::{LambdaConfig, run};
use gwaslambda::logging::init_tracing;
use gwaslambda::qc::parse_delimiter;
use gwaslambda::types::InputMode;

#[derive(Parser)]
#[command(name = "lambda", version)]
#[command(about = "Compute inflation factor (lambda) in GWAS results.", long_about = None)]
struct Cli {
    /// The list of files containing GWAS results.
    #[arg(short = 'i', long = "input", required = true, num_args = 1.., value_name = "FILE", help_heading = "INPUT FILES")]
    inputs: Vec<PathBuf>,

    /// The field delimiter (default is a tabulation).
    #[arg(short, long, default_value = "\t", value_name = "DELIM", help_heading = "INPUT FILES")]
    delim: String,

    /// The file is delimited by white spaces (e.g. Plink results).
    #[arg(short, long, help_heading = "INPUT FILES")]
    whitespace: bool,

    /// The name of the field containing the statistics.
    #[arg(short, long, value_name = "NAME", help_heading = "INPUT FILES")]
    field: String,

    /// The name of the field containing the SNP name.
    #[arg(long, default_value = "snp", value_name = "NAME", help_heading = "INPUT FILES")]
    snp_field: String,

    /// Statistics were computed using a chi-squared distribution.
    #[arg(long, help_heading = "GENERAL OPTIONS")]
    chi2: bool,

    /// Use the p-value instead of the statistic. This assumes a standard
    /// normal distribution for the test statistic.
    #[arg(short, long, help_heading = "GENERAL OPTIONS")]
    p_value: bool,

    /// One-sided tests (when using p-values to compute the inflation factor).
    #[arg(long, help_heading = "GENERAL OPTIONS")]
    one_sided: bool,

    /// Number of files processed concurrently.
    #[arg(long, help_heading = "GENERAL OPTIONS")]
    cores: Option<usize>,

    /// Also write the log to NAME_lambda.log.
    #[arg(long, value_name = "NAME", help_heading = "GENERAL OPTIONS")]
    log_name: Option<String>,

    /// Write a tab-separated table of the results.
    #[arg(short, long, value_name = "FILE", help_heading = "GENERAL OPTIONS")]
    output: Option<PathBuf>,

    /// A file containing markers to extract for the analysis (only one
    /// marker per line).
    #[arg(short, long, value_name = "FILE", help_heading = "SUBSET OPTIONS")]
    extract: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match try_main(cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every input file was processed.
fn try_main(cli: Cli) -> anyhow::Result<bool> {
    let mode = InputMode::from_flags(cli.chi2, cli.p_value, cli.one_sided)?;
    let delimiter = parse_delimiter(&cli.delim, cli.whitespace)?;

    let config = LambdaConfig {
        inputs: cli.inputs,
        delimiter,
        field: cli.field,
        snp_field: cli.snp_field,
        mode,
        extract: cli.extract,
        cores: cli.cores,
        log_name: cli.log_name,
        output: cli.output,
    };

    let outcomes = run(&config)?;
    let mut failed = 0usize;
    for outcome in &outcomes {
        match &outcome.result {
            Ok(summary) => println!("{}\t{:.6}", summary.file, summary.lambda),
            Err(_) => failed += 1,
        }
    }
    if failed > 0 {
        error!("{failed} of {} file(s) could not be processed", outcomes.len());
    }
    Ok(failed == 0)
}
