// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collecting failing test cases from per-module report files.
//!
//! Each module's test run leaves a plain-text report file behind; lines
//! starting with `Testcase:` name the failing test cases. The collected list
//! is what gets diffed against the previous run and persisted for the next
//! one, so its order has to be stable: files are read in filename order and
//! ids keep their within-file order.

use crate::{diff::TestCaseId, errors::ReportScanError};
use camino::Utf8Path;
use std::fs;
use tracing::debug;

/// Marker prefix for failing-test lines inside a report file.
const TESTCASE_MARKER: &str = "Testcase:";

/// Scans a directory of test report files for failing test cases.
///
/// Files with a `.txt` extension are read in lexicographic filename order.
/// Duplicates are preserved: a test case listed twice failed twice.
pub fn collect_failing_tests(reports_dir: &Utf8Path) -> Result<Vec<TestCaseId>, ReportScanError> {
    let read_dir_error = |error| ReportScanError::ReadDir {
        dir: reports_dir.to_owned(),
        error,
    };

    let mut report_files = Vec::new();
    for entry in reports_dir.read_dir_utf8().map_err(read_dir_error)? {
        let entry = entry.map_err(read_dir_error)?;
        let path = entry.into_path();
        if path.extension() == Some("txt") {
            report_files.push(path);
        }
    }
    report_files.sort_unstable();

    let mut failing = Vec::new();
    for path in &report_files {
        let contents = fs::read_to_string(path).map_err(|error| ReportScanError::ReadFile {
            path: path.clone(),
            error,
        })?;
        let ids = scan_report(&contents);
        debug!("{path}: {} failing test case(s)", ids.len());
        failing.extend(ids);
    }
    Ok(failing)
}

/// Extracts failing test case ids from a single report file's contents.
///
/// Each line starting with `Testcase:` contributes one id: the text after
/// the marker, truncated at the ` took ` timing suffix or at a `:` status
/// separator (whichever comes first), then trimmed. Truncation keeps ids
/// stable across runs whose timings differ.
pub fn scan_report(contents: &str) -> Vec<TestCaseId> {
    contents.lines().filter_map(testcase_id).collect()
}

fn testcase_id(line: &str) -> Option<TestCaseId> {
    let rest = line.strip_prefix(TESTCASE_MARKER)?;
    let rest = rest.find(" took ").map_or(rest, |index| &rest[..index]);
    let rest = rest.find(':').map_or(rest, |index| &rest[..index]);
    let id = rest.trim();
    (!id.is_empty()).then(|| TestCaseId::new(id))
}
