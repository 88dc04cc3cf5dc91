use std::io::Write;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Emits `message` as an info event (when `print` is set) and appends it to
/// the transcript.
pub fn log_line<W: Write>(log: &mut W, message: &str, print: bool) -> Result<()> {
    if print {
        info!("{message}");
    }
    writeln!(log, "{message}")?;
    Ok(())
}

pub fn warn_line<W: Write>(log: &mut W, message: &str) -> Result<()> {
    warn!("{message}");
    writeln!(log, "{message}")?;
    Ok(())
}

pub fn error_line<W: Write>(log: &mut W, message: &str) -> Result<()> {
    error!("{message}");
    writeln!(log, "{message}")?;
    Ok(())
}
