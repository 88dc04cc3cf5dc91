use std::path::Path;

use crate::error::{LambdaError, Result};
use crate::types::Delimiter;

pub fn check_file_exists(path: &Path) -> Result<()> {
    if !path.is_file() {
        return Err(LambdaError::InputFile {
            path: path.to_path_buf(),
            message: "no such file".into(),
        });
    }
    Ok(())
}

pub fn check_columns(path: &Path, header: &[String], columns: &[&str]) -> Result<()> {
    for column in columns {
        if !header.iter().any(|h| h == column) {
            return Err(LambdaError::MissingColumn {
                path: path.to_path_buf(),
                column: (*column).to_string(),
            });
        }
    }
    Ok(())
}

/// Resolves the `--delim`/`--whitespace` pair; whitespace wins.
pub fn parse_delimiter(raw: &str, whitespace: bool) -> Result<Delimiter> {
    if whitespace {
        return Ok(Delimiter::Whitespace);
    }
    let byte = match raw {
        "\\t" | "tab" | "\t" => b'\t',
        "space" => b' ',
        "comma" => b',',
        _ => match raw.as_bytes() {
            [b] if b.is_ascii() && *b != b'\n' && *b != b'\r' && *b != b'"' => *b,
            _ => {
                return Err(LambdaError::Configuration(format!(
                    "Invalid delimiter {raw:?}: expected a single ASCII character"
                )));
            }
        },
    };
    Ok(Delimiter::Char(byte))
}
