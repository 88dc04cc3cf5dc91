use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::write::GzEncoder;
use gwaslambda::LambdaError;
use gwaslambda::inflation::EXPECTED_MEDIAN;
use gwaslambda::io::{read_header, read_marker_set, read_table};
use gwaslambda::lambda::{LambdaConfig, process_file, run};
use gwaslambda::types::{Delimiter, InputMode, Sidedness};
use tempfile::{TempDir, tempdir};

const RESULTS: &str = "snp\tchr\tz\tp\n\
rs1\t1\t2.0\t0.0455\n\
rs2\t1\t-2.0\tNA\n\
rs3\t2\tNA\t0.5\n\
rs4\t2\t.\t0.2\n";

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).expect("write fixture");
    path
}

fn lambda_error(err: &anyhow::Error) -> &LambdaError {
    err.downcast_ref::<LambdaError>().expect("typed error")
}

#[test]
fn tab_delimited_z_statistics() {
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "assoc.tsv", RESULTS);
    let config = LambdaConfig::new(vec![path], "z", InputMode::RawZOrT);

    let outcomes = run(&config).expect("run");
    assert_eq!(outcomes.len(), 1);
    let summary = outcomes[0].result.as_ref().expect("summary");
    assert_eq!(summary.na_removed, 2);
    assert_eq!(summary.n_used, 2);
    assert_eq!(summary.extracted, None);
    assert!((summary.median_chi2 - 4.0).abs() < 1e-12);
    assert!((summary.lambda - 4.0 / EXPECTED_MEDIAN).abs() < 1e-12);
    assert!(outcomes[0].log.contains("2 NA values removed"));
    assert!(outcomes[0].log.contains("lambda = 8.79"));
}

#[test]
fn missing_values_only_count_in_requested_columns() {
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "assoc.tsv", RESULTS);
    let config = LambdaConfig::new(vec![path.clone()], "p", InputMode::PValue(Sidedness::TwoSided));

    let mut log = Vec::new();
    let summary = process_file(&config, None, &path, &mut log).expect("summary");
    assert_eq!(summary.na_removed, 1);
    assert_eq!(summary.n_used, 3);
    let log = String::from_utf8(log).expect("utf8");
    assert!(log.contains("computing two-sided statistics from p-values"));
}

#[test]
fn marker_extraction() {
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "assoc.tsv", RESULTS);
    let extract = write(&dir, "keep.txt", "rs1\n\nrs3  \nrs99\n");
    let mut config = LambdaConfig::new(vec![path], "z", InputMode::RawZOrT);
    config.extract = Some(extract.clone());

    let markers = read_marker_set(&extract).expect("markers");
    assert_eq!(markers.len(), 3);
    assert!(markers.contains("rs3"));

    let outcomes = run(&config).expect("run");
    let summary = outcomes[0].result.as_ref().expect("summary");
    assert_eq!(summary.na_removed, 2);
    assert_eq!(summary.extracted, Some(1));
    assert_eq!(summary.n_used, 1);
    assert!((summary.lambda - 4.0 / EXPECTED_MEDIAN).abs() < 1e-12);
}

#[test]
fn no_extracted_marker_is_an_empty_input() {
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "assoc.tsv", RESULTS);
    let extract = write(&dir, "keep.txt", "rs42\n");
    let mut config = LambdaConfig::new(vec![path], "z", InputMode::RawZOrT);
    config.extract = Some(extract);

    let outcomes = run(&config).expect("run");
    let err = outcomes[0].result.as_ref().expect_err("empty");
    assert!(matches!(lambda_error(err), LambdaError::EmptyInput));
    assert!(format!("{err:#}").contains("assoc.tsv"));
}

#[test]
fn missing_extract_file_aborts_the_run() {
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "assoc.tsv", RESULTS);
    let mut config = LambdaConfig::new(vec![path], "z", InputMode::RawZOrT);
    config.extract = Some(dir.path().join("absent.txt"));

    let err = run(&config).expect_err("missing extract file");
    assert!(matches!(lambda_error(&err), LambdaError::InputFile { .. }));
}

#[test]
fn missing_column_is_reported() {
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "assoc.tsv", RESULTS);
    let config = LambdaConfig::new(vec![path.clone()], "beta", InputMode::RawZOrT);

    let outcomes = run(&config).expect("run");
    let err = outcomes[0].result.as_ref().expect_err("missing column");
    match lambda_error(err) {
        LambdaError::MissingColumn { path: p, column } => {
            assert_eq!(p, &path);
            assert_eq!(column, "beta");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(outcomes[0].log.contains("no field named 'beta'"));
}

#[test]
fn missing_snp_column_is_reported_when_extracting() {
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "assoc.tsv", RESULTS);
    let extract = write(&dir, "keep.txt", "rs1\n");
    let mut config = LambdaConfig::new(vec![path], "z", InputMode::RawZOrT);
    config.extract = Some(extract);
    config.snp_field = "SNP".into();

    let outcomes = run(&config).expect("run");
    let err = outcomes[0].result.as_ref().expect_err("missing snp column");
    assert!(matches!(
        lambda_error(err),
        LambdaError::MissingColumn { column, .. } if column == "SNP"
    ));
}

#[test]
fn failed_file_does_not_stop_the_others() {
    let dir = tempdir().expect("tempdir");
    let good = write(&dir, "assoc.tsv", RESULTS);
    let missing = dir.path().join("absent.tsv");
    let config = LambdaConfig::new(vec![missing, good], "z", InputMode::RawZOrT);

    let outcomes = run(&config).expect("run");
    assert_eq!(outcomes.len(), 2);
    let err = outcomes[0].result.as_ref().expect_err("missing file");
    assert!(matches!(lambda_error(err), LambdaError::InputFile { .. }));
    assert!(err.to_string().contains("no such file"));
    assert!(outcomes[1].is_ok());
}

#[test]
fn invalid_p_value_fails_the_file() {
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "assoc.tsv", "snp\tp\nrs1\t0.3\nrs2\t0\n");
    let config = LambdaConfig::new(vec![path], "p", InputMode::PValue(Sidedness::OneSided));

    let outcomes = run(&config).expect("run");
    let err = outcomes[0].result.as_ref().expect_err("invalid p");
    assert!(matches!(
        lambda_error(err),
        LambdaError::InvalidPValue { index: 1, .. }
    ));
}

#[test]
fn malformed_statistic_fails_the_file() {
    let dir = tempdir().expect("tempdir");
    let corrupt = write(&dir, "corrupt.tsv", "snp\tz\nrs1\t2.0\nrs2\tabc\nrs3\t-2.0\n");
    let good = write(&dir, "assoc.tsv", RESULTS);
    let config = LambdaConfig::new(vec![corrupt.clone(), good], "z", InputMode::RawZOrT);

    let outcomes = run(&config).expect("run");
    let err = outcomes[0].result.as_ref().expect_err("malformed value");
    match lambda_error(err) {
        LambdaError::InputFile { path, message } => {
            assert_eq!(path, &corrupt);
            assert!(message.contains("'abc'"), "{message}");
            assert!(message.contains("data row 2"), "{message}");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert!(outcomes[0].log.contains("non-numeric value 'abc'"));
    assert!(outcomes[1].is_ok());
}

#[test]
fn malformed_statistic_in_whitespace_file() {
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "plink.assoc", " SNP  P\n rs1  0.5\n rs2  P\n rs3  NA\n");
    let mut config = LambdaConfig::new(vec![path], "P", InputMode::PValue(Sidedness::TwoSided));
    config.delimiter = Delimiter::Whitespace;

    let outcomes = run(&config).expect("run");
    let err = outcomes[0].result.as_ref().expect_err("stray header value");
    assert!(matches!(lambda_error(err), LambdaError::InputFile { .. }));
}

#[test]
fn custom_delimiter() {
    let dir = tempdir().expect("tempdir");
    let path = write(&dir, "assoc.csv", "snp,chisq\nrs1,1\nrs2,1\nrs3,1\nrs4,1\n");
    let mut config = LambdaConfig::new(vec![path.clone()], "chisq", InputMode::RawChiSquared);
    config.delimiter = Delimiter::Char(b',');

    let header = read_header(&path, config.delimiter).expect("header");
    assert_eq!(header, vec!["snp", "chisq"]);

    let outcomes = run(&config).expect("run");
    let summary = outcomes[0].result.as_ref().expect("summary");
    assert!((summary.lambda - 1.0 / EXPECTED_MEDIAN).abs() < 1e-12);
}

#[test]
fn whitespace_delimited_plink_style() {
    let dir = tempdir().expect("tempdir");
    let contents = " CHR   SNP    BP   P\n   1   rs1  1000   0.5\n   1   rs2  2000    NA\n   2   rs3  3000   0.5\n";
    let path = write(&dir, "plink.assoc", contents);
    let mut config = LambdaConfig::new(vec![path.clone()], "P", InputMode::PValue(Sidedness::TwoSided));
    config.delimiter = Delimiter::Whitespace;
    config.snp_field = "SNP".into();
    config.extract = Some(write(&dir, "keep.txt", "rs1\nrs2\n"));

    let df = read_table(&path, Delimiter::Whitespace, &["P", "SNP"]).expect("table");
    assert_eq!(df.height(), 3);

    let outcomes = run(&config).expect("run");
    let summary = outcomes[0].result.as_ref().expect("summary");
    assert_eq!(summary.na_removed, 1);
    assert_eq!(summary.extracted, Some(1));
    assert!((summary.lambda - 1.0).abs() < 1e-9);
}

#[test]
fn gzip_input() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("assoc.tsv.gz");
    let mut encoder = GzEncoder::new(fs::File::create(&path).expect("create"), Compression::default());
    encoder.write_all(RESULTS.as_bytes()).expect("compress");
    encoder.finish().expect("finish");

    let config = LambdaConfig::new(vec![path], "z", InputMode::RawZOrT);
    let outcomes = run(&config).expect("run");
    let summary = outcomes[0].result.as_ref().expect("summary");
    assert_eq!(summary.n_used, 2);
    assert!((summary.lambda - 4.0 / EXPECTED_MEDIAN).abs() < 1e-12);
}

fn lambdas(config: &LambdaConfig) -> Vec<f64> {
    run(config)
        .expect("run")
        .into_iter()
        .map(|o| o.result.expect("summary").lambda)
        .collect()
}

#[test]
fn parallel_matches_sequential() {
    let dir = tempdir().expect("tempdir");
    let inputs: Vec<PathBuf> = (1..=4)
        .map(|i| {
            let mut contents = String::from("snp\tz\n");
            for j in 0..25 {
                contents.push_str(&format!("rs{j}\t{}\n", (j as f64 - 12.0) * 0.1 * i as f64));
            }
            write(&dir, &format!("trait{i}.tsv"), &contents)
        })
        .collect();

    let sequential = LambdaConfig::new(inputs, "z", InputMode::RawZOrT);
    let mut parallel = sequential.clone();
    parallel.cores = Some(3);

    let expected = lambdas(&sequential);
    assert_eq!(expected.len(), 4);
    assert_eq!(lambdas(&parallel), expected);
    assert!(expected.windows(2).all(|w| w[0] <= w[1]));
}

fn line_count(path: &Path) -> usize {
    fs::read_to_string(path).expect("read").lines().count()
}

#[test]
fn result_table_and_log_file() {
    let dir = tempdir().expect("tempdir");
    let good = write(&dir, "assoc.tsv", RESULTS);
    let missing = dir.path().join("absent.tsv");
    let output = dir.path().join("lambda.tsv");
    let log_name = dir.path().join("run").display().to_string();

    let mut config = LambdaConfig::new(vec![good, missing], "z", InputMode::RawZOrT);
    config.output = Some(output.clone());
    config.log_name = Some(log_name.clone());
    run(&config).expect("run");

    let table = fs::read_to_string(&output).expect("table");
    assert_eq!(
        table.lines().next(),
        Some("file\tna_removed\textracted\tn\tmedian_chi2\tlambda")
    );
    assert_eq!(line_count(&output), 2);

    let log = fs::read_to_string(format!("{log_name}_lambda.log")).expect("log");
    assert!(log.contains("Reading"));
    assert!(log.contains("lambda = 8.79"));
    assert!(log.contains("no such file"));
}
