use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use polars::prelude::*;
use tempfile::NamedTempFile;

use crate::qc::check_columns;
use crate::types::{Delimiter, LambdaSummary};

const NULL_TOKENS: [&str; 4] = ["", "NA", "NaN", "."];

/// Reads the requested `columns` of a delimited results file.
///
/// Every column comes back as strings; missing tokens are null. Fails with
/// [`crate::error::LambdaError::MissingColumn`] when a column is absent from
/// the header.
pub fn read_table(path: &Path, delimiter: Delimiter, columns: &[&str]) -> Result<DataFrame> {
    let header = read_header(path, delimiter)?;
    check_columns(path, &header, columns)?;

    match compression(path) {
        Some(ext) => {
            let tmp = decompress_to_temp(path, ext)?;
            read_table_plain(tmp.path(), delimiter, columns)
                .with_context(|| format!("read {}", path.display()))
        }
        None => read_table_plain(path, delimiter, columns),
    }
}

fn read_table_plain(path: &Path, delimiter: Delimiter, columns: &[&str]) -> Result<DataFrame> {
    let separator = match delimiter {
        Delimiter::Whitespace => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            return read_table_whitespace(BufReader::new(file), columns);
        }
        Delimiter::Char(b) => b,
    };

    let projection: Arc<[PlSmallStr]> = columns.iter().map(|c| PlSmallStr::from(*c)).collect();
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .with_columns(Some(projection))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_null_values(Some(NullValues::AllColumns(
                    NULL_TOKENS.iter().map(|t| (*t).into()).collect(),
                )))
                .with_missing_is_null(true),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
        .with_context(|| format!("read {}", path.display()))?;
    Ok(df)
}

fn read_table_whitespace<R: Read>(reader: R, columns: &[&str]) -> Result<DataFrame> {
    let mut reader = BufReader::new(reader);
    let mut header_line = String::new();
    reader.read_line(&mut header_line)?;
    if header_line.trim().is_empty() {
        return Err(anyhow::anyhow!("empty file"));
    }
    let headers = split_quoted_whitespace(&header_line);
    let indices = columns
        .iter()
        .map(|c| {
            headers
                .iter()
                .position(|h| h == c)
                .ok_or_else(|| anyhow::anyhow!("no field named '{c}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); columns.len()];

    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let parts = split_quoted_whitespace(&line);
        for (col, idx) in values.iter_mut().zip(&indices) {
            col.push(parts.get(*idx).and_then(|v| normalize_missing_token(v)));
        }
    }

    let cols: Vec<Column> = columns
        .iter()
        .zip(values)
        .map(|(name, values)| Series::new((*name).into(), values).into())
        .collect();
    Ok(DataFrame::new(cols)?)
}

/// Header row of `path`, split the same way the body will be.
pub fn read_header(path: &Path, delimiter: Delimiter) -> Result<Vec<String>> {
    let mut reader = open_text(path)?;
    let mut first = String::new();
    reader
        .read_line(&mut first)
        .with_context(|| format!("read header of {}", path.display()))?;
    let first = first.trim_end_matches(['\r', '\n']);
    Ok(match delimiter {
        Delimiter::Whitespace => split_quoted_whitespace(first),
        Delimiter::Char(b) => first
            .split(char::from(b))
            .map(|s| s.trim_matches('"').to_string())
            .collect(),
    })
}

/// Marker identifiers to keep, one per line.
pub fn read_marker_set(path: &Path) -> Result<HashSet<String>> {
    let reader = open_text(path)?;
    let mut markers = HashSet::new();
    for line in reader.lines() {
        let line = line.with_context(|| format!("read {}", path.display()))?;
        let marker = line.trim();
        if !marker.is_empty() {
            markers.insert(marker.to_string());
        }
    }
    Ok(markers)
}

pub fn write_summaries(summaries: &[LambdaSummary], path: &Path) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut df = summaries_frame(summaries)?;
    CsvWriter::new(&mut file)
        .with_separator(b'\t')
        .finish(&mut df)
        .with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn summaries_frame(summaries: &[LambdaSummary]) -> Result<DataFrame> {
    let file: Vec<&str> = summaries.iter().map(|s| s.file.as_str()).collect();
    let na_removed: Vec<u64> = summaries.iter().map(|s| s.na_removed as u64).collect();
    let extracted: Vec<Option<u64>> = summaries
        .iter()
        .map(|s| s.extracted.map(|n| n as u64))
        .collect();
    let n_used: Vec<u64> = summaries.iter().map(|s| s.n_used as u64).collect();
    let median: Vec<f64> = summaries.iter().map(|s| s.median_chi2).collect();
    let lambda: Vec<f64> = summaries.iter().map(|s| s.lambda).collect();
    let cols: Vec<Column> = vec![
        Series::new("file".into(), file).into(),
        Series::new("na_removed".into(), na_removed).into(),
        Series::new("extracted".into(), extracted).into(),
        Series::new("n".into(), n_used).into(),
        Series::new("median_chi2".into(), median).into(),
        Series::new("lambda".into(), lambda).into(),
    ];
    Ok(DataFrame::new(cols)?)
}

fn compression(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "gz" => Some("gz"),
        "bz2" => Some("bz2"),
        _ => None,
    }
}

fn open_text(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let reader: Box<dyn Read> = match compression(path) {
        Some("gz") => Box::new(GzDecoder::new(file)),
        Some("bz2") => Box::new(BzDecoder::new(file)),
        _ => Box::new(file),
    };
    Ok(Box::new(BufReader::new(reader)))
}

fn decompress_to_temp(path: &Path, ext: &str) -> Result<NamedTempFile> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut decoder: Box<dyn Read> = match ext {
        "gz" => Box::new(GzDecoder::new(file)),
        "bz2" => Box::new(BzDecoder::new(file)),
        _ => Box::new(file),
    };
    let mut tmp = NamedTempFile::new()?;
    std::io::copy(&mut decoder, &mut tmp)
        .with_context(|| format!("decompress {}", path.display()))?;
    Ok(tmp)
}

fn split_quoted_whitespace(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut in_quote = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            in_quote = !in_quote;
            continue;
        }
        if c == '\\'
            && let Some('"') = chars.peek().copied()
        {
            chars.next();
            current.push('"');
            continue;
        }
        if c.is_whitespace() && !in_quote {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn normalize_missing_token(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if NULL_TOKENS.contains(&trimmed) || trimmed.eq_ignore_ascii_case("nan") {
        None
    } else {
        Some(trimmed.to_string())
    }
}
