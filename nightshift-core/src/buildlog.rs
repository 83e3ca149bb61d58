// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing nightly build logs.
//!
//! A build log interleaves output from many tools; the parts nightshift cares
//! about are the per-module test blocks, an overall job success marker, and
//! (for checkout/update logs) the source revision. Parsing is line-oriented
//! and never fails hard: a module block without a usable summary line becomes
//! a crashed row rather than an error.

use crate::summary::{ModuleCounts, ModuleOutcome, ModuleResult};
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use tracing::warn;

static TEST_SUMMARY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Tests run:\s*(\d+),\s*Failures:\s*(\d+),\s*Errors:\s*(\d+)").unwrap()
});

static REVISION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:At|Updated to) revision (\w+)").unwrap());

/// Log line markers that delimit interesting parts of a build log.
///
/// These come from configuration; see
/// [`NightshiftConfig::markers`](crate::config::NightshiftConfig::markers).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogMarkers {
    /// A line starting with this marker opens a new module block.
    pub module_marker: String,
    /// Presence of this string anywhere in the log means the build job
    /// itself completed.
    pub success_marker: String,
}

impl Default for LogMarkers {
    fn default() -> Self {
        Self {
            module_marker: "test-module".to_owned(),
            success_marker: "BUILD SUCCESSFUL".to_owned(),
        }
    }
}

/// Whether the build job itself completed.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    /// The log contains the success marker.
    Succeeded,
    /// The log does not contain the success marker; the build died partway.
    Failed,
}

/// Parses per-module test results out of a nightly build log.
///
/// A line starting with the module marker opens a module block that runs to
/// the next marker or the end of the log. The module's name is the final
/// whitespace-separated token of the first non-blank line in the block, with
/// a trailing `:` stripped. The first line in the block matching
/// `Tests run: N, Failures: N, Errors: N` provides the counts; a block
/// without such a line is reported as crashed.
///
/// Results come back in log order, one entry per module block. Blocks with
/// no name line at all, and blocks whose summary counts do not fit in a
/// `u64`, are skipped with a warning.
pub fn parse_test_log(log: &str, markers: &LogMarkers) -> Vec<ModuleResult> {
    let lines: Vec<&str> = log.lines().collect();
    let block_starts: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.starts_with(markers.module_marker.as_str()))
        .map(|(index, _)| index)
        .collect();

    let mut results = Vec::with_capacity(block_starts.len());
    for (block_index, &start) in block_starts.iter().enumerate() {
        let end = block_starts
            .get(block_index + 1)
            .copied()
            .unwrap_or(lines.len());
        let block = &lines[start + 1..end];

        let Some(name) = module_name(block) else {
            warn!(
                "ignoring module block at line {}: no module name found",
                start + 1
            );
            continue;
        };
        let Some(outcome) = block_outcome(&name, block) else {
            continue;
        };
        results.push(ModuleResult { name, outcome });
    }
    results
}

fn module_name(block: &[&str]) -> Option<String> {
    let line = block.iter().find(|line| !line.trim().is_empty())?;
    let token = line.split_whitespace().next_back()?;
    Some(token.trim_end_matches(':').to_owned())
}

fn block_outcome(name: &str, block: &[&str]) -> Option<ModuleOutcome> {
    for line in block {
        let Some(captures) = TEST_SUMMARY_REGEX.captures(line) else {
            continue;
        };
        // The regex only matches digits, so parse failures mean overflow.
        let counts = (
            captures[1].parse::<u64>(),
            captures[2].parse::<u64>(),
            captures[3].parse::<u64>(),
        );
        return match counts {
            (Ok(tests_run), Ok(failures), Ok(errors)) => {
                Some(ModuleOutcome::Completed(ModuleCounts {
                    tests_run,
                    failures,
                    errors,
                }))
            }
            _ => {
                warn!("ignoring module {name}: summary line has out-of-range counts");
                None
            }
        };
    }
    Some(ModuleOutcome::Crashed)
}

/// Returns whether the build job completed, based on the success marker.
pub fn job_status(log: &str, markers: &LogMarkers) -> JobStatus {
    if log.contains(markers.success_marker.as_str()) {
        JobStatus::Succeeded
    } else {
        JobStatus::Failed
    }
}

/// Extracts the source revision from a checkout/update log.
///
/// Recognizes `At revision N.` and `Updated to revision N.` lines; the first
/// match wins. Returns `None` if no such line exists.
pub fn revision_in_update_log(log: &str) -> Option<String> {
    log.lines()
        .find_map(|line| REVISION_REGEX.captures(line))
        .map(|captures| captures[1].to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_completed_and_crashed_modules() {
        let log = indoc! {r"
            Buildfile: build.xml

            test-module:
                 [echo] Performing tests for module: core
                [junit] Running org.openscience.test.CoreTests
                [junit] Tests run: 100, Failures: 5, Errors: 2, Time elapsed: 4.8 sec
            test-module:
                 [echo] Performing tests for module: iochem
                [junit] Running org.openscience.test.IochemTests
            test-module:
                 [echo] Performing tests for module: data
                [junit] Tests run: 40, Failures: 0, Errors: 0, Time elapsed: 1.2 sec

            BUILD SUCCESSFUL
        "};

        let results = parse_test_log(log, &LogMarkers::default());
        assert_eq!(
            results,
            vec![
                ModuleResult::completed("core", 100, 5, 2),
                ModuleResult::crashed("iochem"),
                ModuleResult::completed("data", 40, 0, 0),
            ]
        );
    }

    #[test]
    fn module_name_skips_blank_lines_and_strips_colon() {
        let log = indoc! {r"
            test-module:

                 [echo] module under test: render:
                [junit] Tests run: 1, Failures: 0, Errors: 0, Time elapsed: 0.1 sec
        "};

        let results = parse_test_log(log, &LogMarkers::default());
        assert_eq!(results, vec![ModuleResult::completed("render", 1, 0, 0)]);
    }

    #[test]
    fn trailing_block_without_summary_is_crashed() {
        let log = indoc! {r"
            test-module:
                 [echo] Performing tests for module: qsar
                [junit] Running org.openscience.test.QsarTests
        "};

        let results = parse_test_log(log, &LogMarkers::default());
        assert_eq!(results, vec![ModuleResult::crashed("qsar")]);
    }

    #[test]
    fn block_with_no_name_line_is_skipped() {
        let log = indoc! {r"
            test-module:


            test-module:
                 [echo] tests for: core
                [junit] Tests run: 2, Failures: 1, Errors: 0,
        "};

        let results = parse_test_log(log, &LogMarkers::default());
        assert_eq!(results, vec![ModuleResult::completed("core", 2, 1, 0)]);
    }

    #[test]
    fn block_with_overflowing_counts_is_skipped() {
        let log = indoc! {r"
            test-module:
                 [echo] Performing tests for module: bigdata
                [junit] Tests run: 99999999999999999999, Failures: 0, Errors: 0,
        "};
        assert_eq!(parse_test_log(log, &LogMarkers::default()), vec![]);

        // A rejected block does not stop the walk.
        let log = indoc! {r"
            test-module:
                 [echo] Performing tests for module: bigdata
                [junit] Tests run: 18446744073709551616, Failures: 0, Errors: 0,
            test-module:
                 [echo] Performing tests for module: core
                [junit] Tests run: 2, Failures: 1, Errors: 0,
        "};
        assert_eq!(
            parse_test_log(log, &LogMarkers::default()),
            vec![ModuleResult::completed("core", 2, 1, 0)]
        );
    }

    #[test]
    fn empty_log_has_no_modules() {
        assert_eq!(parse_test_log("", &LogMarkers::default()), vec![]);
    }

    #[test]
    fn custom_module_marker_is_honored() {
        let markers = LogMarkers {
            module_marker: "suite>".to_owned(),
            ..LogMarkers::default()
        };
        let log = indoc! {r"
            suite> begin
                module: alpha
                Tests run: 3, Failures: 0, Errors: 1, Time elapsed: 0.2 sec
        "};

        let results = parse_test_log(log, &markers);
        assert_eq!(results, vec![ModuleResult::completed("alpha", 3, 0, 1)]);
    }

    #[test]
    fn job_status_depends_on_success_marker() {
        let markers = LogMarkers::default();
        assert_eq!(
            job_status("compile:\n\nBUILD SUCCESSFUL\nTotal time: 10 minutes\n", &markers),
            JobStatus::Succeeded
        );
        assert_eq!(
            job_status("compile:\n\nBUILD FAILED\n", &markers),
            JobStatus::Failed
        );
    }

    #[test]
    fn revision_comes_from_the_first_matching_line() {
        let log = indoc! {r"
            Updating '.':
            At revision 6828.
            At revision 6900.
        "};
        assert_eq!(revision_in_update_log(log), Some("6828".to_owned()));

        let log = indoc! {r"
            U    src/org/openscience/core/Ring.java
            Updated to revision 6901.
        "};
        assert_eq!(revision_in_update_log(log), Some("6901".to_owned()));

        assert_eq!(revision_in_update_log("nothing to update\n"), None);
    }
}
