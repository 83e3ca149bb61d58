// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregating per-module test statistics into a run summary.
//!
//! A nightly run produces one [`ModuleResult`] per module. [`RunSummary`]
//! filters those down to one partition (stable or experimental), keeps a row
//! per module in input order, and accumulates totals over the modules that
//! actually reported counts.

use crate::errors::InvalidModulePartition;
use serde::Serialize;
use std::{collections::BTreeSet, fmt, str::FromStr};
use tracing::warn;

/// Counts reported by one module's test summary line.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleCounts {
    /// Total number of test cases run.
    pub tests_run: u64,
    /// Number of assertion failures.
    pub failures: u64,
    /// Number of hard errors.
    pub errors: u64,
}

impl ModuleCounts {
    /// Returns the number of passed tests.
    ///
    /// Saturates at zero: a module that somehow reports more failures than
    /// tests run passes zero tests, it does not underflow.
    pub fn passed(self) -> u64 {
        self.tests_run
            .saturating_sub(self.failures)
            .saturating_sub(self.errors)
    }

    /// Returns the success rate for these counts.
    pub fn success_rate(self) -> SuccessRate {
        if self.tests_run == 0 {
            SuccessRate::NotAvailable
        } else {
            SuccessRate::Rate(100.0 * self.passed() as f64 / self.tests_run as f64)
        }
    }

    fn is_consistent(self) -> bool {
        self.failures
            .checked_add(self.errors)
            .is_some_and(|unsuccessful| unsuccessful <= self.tests_run)
    }
}

/// How a module's test run ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModuleOutcome {
    /// The module ran to completion and printed a test summary.
    Completed(ModuleCounts),
    /// The module's test process died before printing a summary, so no
    /// counts exist for it.
    Crashed,
}

impl ModuleOutcome {
    /// Returns the counts if the module completed.
    pub fn counts(self) -> Option<ModuleCounts> {
        match self {
            Self::Completed(counts) => Some(counts),
            Self::Crashed => None,
        }
    }

    /// Returns true if the module crashed before reporting.
    pub fn is_crashed(self) -> bool {
        matches!(self, Self::Crashed)
    }
}

/// A single module's result within a nightly run.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ModuleResult {
    /// The module name, e.g. `"standard"`.
    pub name: String,
    /// How the module's test run ended.
    pub outcome: ModuleOutcome,
}

impl ModuleResult {
    /// Creates a result for a module that completed with the given counts.
    pub fn completed(name: impl Into<String>, tests_run: u64, failures: u64, errors: u64) -> Self {
        Self {
            name: name.into(),
            outcome: ModuleOutcome::Completed(ModuleCounts {
                tests_run,
                failures,
                errors,
            }),
        }
    }

    /// Creates a result for a module that crashed before reporting.
    pub fn crashed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            outcome: ModuleOutcome::Crashed,
        }
    }
}

/// Which slice of the module list a summary covers.
///
/// The two partitions of the same input are disjoint, and together they cover
/// every module.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModulePartition {
    /// Every module not named in the experimental set.
    #[default]
    Stable,
    /// Only the modules named in the experimental set.
    Experimental,
}

impl ModulePartition {
    fn admits(self, name: &str, experimental: &BTreeSet<String>) -> bool {
        match self {
            Self::Stable => !experimental.contains(name),
            Self::Experimental => experimental.contains(name),
        }
    }
}

impl fmt::Display for ModulePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => f.write_str("stable"),
            Self::Experimental => f.write_str("experimental"),
        }
    }
}

impl FromStr for ModulePartition {
    type Err = InvalidModulePartition;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input {
            "stable" => Ok(Self::Stable),
            "experimental" => Ok(Self::Experimental),
            _ => Err(InvalidModulePartition::new(input)),
        }
    }
}

/// A percentage of tests passed, or `NA` when no tests ran.
///
/// Displays as a number with two decimal places, e.g. `93.00`. A run of zero
/// tests has no meaningful rate and displays as `NA` rather than dividing by
/// zero.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuccessRate {
    /// The percentage of tests that passed, in `[0, 100]`.
    Rate(f64),
    /// No tests ran, so no rate exists.
    NotAvailable,
}

impl fmt::Display for SuccessRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate(rate) => write!(f, "{rate:.2}"),
            Self::NotAvailable => f.write_str("NA"),
        }
    }
}

/// Totals accumulated over the rows of a [`RunSummary`].
///
/// Crashed modules are counted in `crashed` but contribute nothing to the
/// test counts.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct SummaryTotals {
    /// Total tests run across completed modules.
    pub tests_run: u64,
    /// Total assertion failures across completed modules.
    pub failures: u64,
    /// Total hard errors across completed modules.
    pub errors: u64,
    /// Number of modules that crashed before reporting.
    pub crashed: usize,
}

impl SummaryTotals {
    /// Returns the overall success rate for these totals.
    pub fn success_rate(&self) -> SuccessRate {
        ModuleCounts {
            tests_run: self.tests_run,
            failures: self.failures,
            errors: self.errors,
        }
        .success_rate()
    }
}

/// Aggregated statistics for one partition of a nightly run.
///
/// Built with [`RunSummary::compute`]. Rows keep the input order; crashed
/// modules keep their row but are excluded from the totals.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSummary {
    /// The partition this summary covers.
    pub partition: ModulePartition,
    /// Per-module rows, in input order.
    pub rows: Vec<ModuleResult>,
    /// Totals over the completed rows.
    pub totals: SummaryTotals,
}

impl RunSummary {
    /// Computes the summary for one partition of a run.
    ///
    /// `experimental` is the configured set of experimental module names;
    /// [`ModulePartition::Stable`] excludes them and
    /// [`ModulePartition::Experimental`] admits only them.
    pub fn compute(
        results: impl IntoIterator<Item = ModuleResult>,
        partition: ModulePartition,
        experimental: &BTreeSet<String>,
    ) -> Self {
        let mut summary = Self {
            partition,
            rows: Vec::new(),
            totals: SummaryTotals::default(),
        };
        for result in results {
            if partition.admits(&result.name, experimental) {
                summary.add_row(result);
            }
        }
        summary
    }

    fn add_row(&mut self, result: ModuleResult) {
        match result.outcome {
            ModuleOutcome::Completed(counts) => {
                if !counts.is_consistent() {
                    warn!(
                        "module {} reports more failures than tests run \
                         (tests run {}, failures {}, errors {})",
                        result.name, counts.tests_run, counts.failures, counts.errors,
                    );
                }
                self.totals.tests_run += counts.tests_run;
                self.totals.failures += counts.failures;
                self.totals.errors += counts.errors;
            }
            ModuleOutcome::Crashed => {
                self.totals.crashed += 1;
            }
        }
        self.rows.push(result);
    }

    /// Returns the overall success rate across completed rows.
    pub fn success_rate(&self) -> SuccessRate {
        self.totals.success_rate()
    }

    /// Returns true if no modules matched the partition.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use maplit::btreeset;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    #[test_case(100, 5, 2, "93.00"; "mixed failures and errors")]
    #[test_case(40, 0, 0, "100.00"; "all passing")]
    #[test_case(4, 2, 2, "0.00"; "all failing")]
    #[test_case(3, 1, 0, "66.67"; "rounded to two places")]
    #[test_case(0, 0, 0, "NA"; "no tests ran")]
    #[test_case(3, 4, 2, "0.00"; "over-reported failures saturate")]
    fn success_rate_display(tests_run: u64, failures: u64, errors: u64, expected: &str) {
        let counts = ModuleCounts {
            tests_run,
            failures,
            errors,
        };
        assert_eq!(counts.success_rate().to_string(), expected);
    }

    #[test]
    fn empty_input_produces_empty_summary() {
        let summary = RunSummary::compute([], ModulePartition::Stable, &BTreeSet::new());
        assert!(summary.is_empty());
        assert_eq!(summary.totals, SummaryTotals::default());
        assert_eq!(summary.success_rate(), SuccessRate::NotAvailable);
    }

    #[test]
    fn totals_accumulate_over_completed_rows() {
        let results = vec![
            ModuleResult::completed("core", 100, 5, 2),
            ModuleResult::completed("data", 40, 0, 0),
        ];

        let summary = RunSummary::compute(results, ModulePartition::Stable, &BTreeSet::new());
        assert_eq!(summary.totals.tests_run, 140);
        assert_eq!(summary.totals.failures, 5);
        assert_eq!(summary.totals.errors, 2);
        assert_eq!(summary.totals.crashed, 0);
        assert_eq!(summary.success_rate().to_string(), "95.00");

        let core_counts = summary.rows[0].outcome.counts().expect("core completed");
        assert_eq!(core_counts.passed(), 93);
    }

    #[test]
    fn crashed_rows_render_but_do_not_count() {
        let results = vec![
            ModuleResult::completed("core", 100, 5, 2),
            ModuleResult::crashed("iochem"),
        ];

        let summary = RunSummary::compute(results, ModulePartition::Stable, &BTreeSet::new());
        assert_eq!(summary.rows.len(), 2);
        assert_eq!(summary.rows[1], ModuleResult::crashed("iochem"));
        assert!(summary.rows[1].outcome.is_crashed());
        assert_eq!(summary.totals.tests_run, 100);
        assert_eq!(summary.totals.crashed, 1);
        assert_eq!(summary.success_rate().to_string(), "93.00");
    }

    #[test]
    fn stable_partition_excludes_experimental_modules() {
        let experimental = btreeset! { "expA".to_owned() };
        let results = vec![
            ModuleResult::completed("core", 10, 0, 0),
            ModuleResult::crashed("expA"),
        ];

        let summary = RunSummary::compute(results, ModulePartition::Stable, &experimental);
        assert_eq!(summary.rows.len(), 1);
        assert_eq!(summary.rows[0].name, "core");
        assert_eq!(summary.totals.crashed, 0);
    }

    #[test]
    fn experimental_partition_admits_only_experimental_modules() {
        let experimental = btreeset! { "expA".to_owned() };
        let results = vec![
            ModuleResult::completed("core", 10, 0, 0),
            ModuleResult::completed("expA", 7, 1, 0),
        ];

        let summary = RunSummary::compute(results, ModulePartition::Experimental, &experimental);
        assert_eq!(summary.rows.len(), 1);
        assert_eq!(summary.rows[0].name, "expA");
        assert_eq!(summary.totals.tests_run, 7);
    }

    #[test]
    fn partitions_are_complementary() {
        let experimental = btreeset! { "expA".to_owned(), "expB".to_owned() };
        let results = vec![
            ModuleResult::completed("core", 10, 0, 0),
            ModuleResult::completed("expA", 7, 1, 0),
            ModuleResult::crashed("data"),
            ModuleResult::crashed("expB"),
        ];

        let stable = RunSummary::compute(results.clone(), ModulePartition::Stable, &experimental);
        let experimental_summary =
            RunSummary::compute(results.clone(), ModulePartition::Experimental, &experimental);

        assert_eq!(stable.rows.len() + experimental_summary.rows.len(), results.len());
        for result in &results {
            let in_stable = stable.rows.contains(result);
            let in_experimental = experimental_summary.rows.contains(result);
            assert!(
                in_stable ^ in_experimental,
                "{} must appear in exactly one partition",
                result.name
            );
        }
    }

    #[test]
    fn rows_preserve_input_order() {
        let results = vec![
            ModuleResult::completed("zeta", 1, 0, 0),
            ModuleResult::crashed("alpha"),
            ModuleResult::completed("mid", 2, 0, 0),
        ];

        let summary = RunSummary::compute(results, ModulePartition::Stable, &BTreeSet::new());
        let names: Vec<_> = summary.rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn partition_round_trips_through_from_str() {
        for partition in [ModulePartition::Stable, ModulePartition::Experimental] {
            let parsed: ModulePartition = partition
                .to_string()
                .parse()
                .unwrap_or_else(|error| panic!("{partition} must parse: {error}"));
            assert_eq!(parsed, partition);
        }

        "staple"
            .parse::<ModulePartition>()
            .expect_err("unknown partition name is rejected");
    }
}
