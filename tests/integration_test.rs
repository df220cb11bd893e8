//! Integration tests for the payment-streams CLI.
//!
//! These tests run the actual binary and verify output against expected CSV files.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write;

/// Get path to test data file
fn test_data_path(filename: &str) -> String {
    format!("tests/data/{}", filename)
}

/// Run the binary with the given arguments and return stdout
fn run_cli(args: &[&str]) -> String {
    let mut cmd = Command::cargo_bin("payment-streams").unwrap();
    let assert = cmd.args(args).assert().success();
    String::from_utf8(assert.get_output().stdout.clone()).unwrap()
}

/// Normalize CSV for comparison (sort lines, trim whitespace)
fn normalize_csv(csv: &str) -> Vec<String> {
    let mut lines: Vec<String> = csv
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    // Keep header first, sort the rest
    if lines.len() > 1 {
        let header = lines.remove(0);
        lines.sort();
        lines.insert(0, header);
    }

    lines
}

fn assert_output_matches(args: &[&str], expected_file: &str) {
    let output = run_cli(args);
    let expected = fs::read_to_string(test_data_path(expected_file)).unwrap();
    assert_eq!(normalize_csv(&output), normalize_csv(&expected));
}

#[test]
fn test_sample_a_full_lifecycle() {
    assert_output_matches(&[test_data_path("sample_a_lifecycle.csv").as_str()], "expected_a.csv");
}

#[test]
fn test_sample_b_rejected_operations() {
    assert_output_matches(&[test_data_path("sample_b_rejections.csv").as_str()], "expected_b.csv");
}

#[test]
fn test_sample_b_streams_report() {
    assert_output_matches(
        &[test_data_path("sample_b_rejections.csv").as_str(), "--streams"],
        "expected_b_streams.csv",
    );
}

#[test]
fn test_sample_c_whitespace_handling() {
    assert_output_matches(&[test_data_path("sample_c_whitespace.csv").as_str()], "expected_c.csv");
}

#[test]
fn test_sample_d_many_streams() {
    assert_output_matches(&[test_data_path("sample_d_many_streams.csv").as_str()], "expected_d.csv");
}

#[test]
fn test_sample_d_streams_report_flag_first() {
    assert_output_matches(
        &["--streams", test_data_path("sample_d_many_streams.csv").as_str()],
        "expected_d_streams.csv",
    );
}

#[test]
fn test_journal_from_temp_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "type,time,caller,sender,receiver,amount,duration").unwrap();
    writeln!(file, "fund,0,7,,,12.5,").unwrap();
    writeln!(file, "create,0,7,7,8,12.5,5").unwrap();
    writeln!(file, "cancel,3,8,7,8,,").unwrap();
    file.flush().unwrap();

    let output = run_cli(&[file.path().to_str().unwrap()]);
    assert_eq!(output, "party,balance\n7,12.5000\n");
}

#[test]
fn test_missing_file_error() {
    let mut cmd = Command::cargo_bin("payment-streams").unwrap();
    cmd.arg("nonexistent.csv")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn test_missing_argument_error() {
    let mut cmd = Command::cargo_bin("payment-streams").unwrap();
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Missing input file"));
}

#[test]
fn test_output_has_correct_header() {
    let output = run_cli(&[test_data_path("sample_a_lifecycle.csv").as_str()]);
    assert!(output.starts_with("party,balance"));

    let output = run_cli(&[test_data_path("sample_a_lifecycle.csv").as_str(), "--streams"]);
    assert!(output.starts_with("sender,receiver,status,start_time,duration,escrowed"));
}

#[test]
fn test_decimal_precision_four_places() {
    let output = run_cli(&[test_data_path("sample_c_whitespace.csv").as_str()]);

    for line in output.lines().skip(1) {
        let balance = line.split(',').nth(1).unwrap();
        let dot_pos = balance.find('.').unwrap();
        assert_eq!(
            balance.len() - dot_pos - 1,
            4,
            "Expected 4 decimal places in: {}",
            balance
        );
    }
}
