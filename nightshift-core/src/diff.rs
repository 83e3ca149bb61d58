// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Comparing a run's failing tests against the previous run.
//!
//! Runs are compared as multisets of [`TestCaseId`]s: an identifier that
//! fails twice in one run and once in the next counts as one fixed failure.
//! Reordering the inputs never produces a spurious diff.

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::{collections::HashMap, fmt};

/// Identifier for a single test case, e.g. `"TestRingSearch.testBenzene"`.
///
/// Identifiers are opaque: two runs report the same test case exactly when
/// the strings are equal. A run may contain the same identifier more than
/// once (parameterized suites report each instantiation under one name), so
/// comparisons treat runs as multisets rather than sets.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct TestCaseId(SmolStr);

impl TestCaseId {
    /// Creates a new test case identifier.
    pub fn new(id: impl Into<SmolStr>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestCaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for TestCaseId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for TestCaseId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

/// The outcome of comparing a run's failing tests against the previous run.
///
/// Produced by [`FailureDiff::compute`]. The two lists are disjoint in the
/// multiset sense: an occurrence consumed on one side can never reappear on
/// the other. Counts are always the lengths of the lists they describe.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct FailureDiff {
    /// Test cases that failed in the previous run but no longer fail.
    pub fixed: Vec<TestCaseId>,
    /// Test cases that fail in this run but did not fail previously.
    pub new_failures: Vec<TestCaseId>,
    /// True if no usable baseline existed, in which case every current
    /// failure is listed as new and nothing is listed as fixed.
    pub cold_start: bool,
}

impl FailureDiff {
    /// Compares the current run's failing tests against the previous run's.
    ///
    /// `previous` is `None` on a cold start, i.e. when no usable snapshot of
    /// the previous run exists. An empty `Some` baseline is different: it is
    /// a real previous run in which nothing failed.
    ///
    /// Both lists keep their input order in the output.
    pub fn compute(previous: Option<&[TestCaseId]>, current: &[TestCaseId]) -> Self {
        let Some(previous) = previous else {
            return Self {
                fixed: Vec::new(),
                new_failures: current.to_vec(),
                cold_start: true,
            };
        };

        Self {
            fixed: multiset_difference(previous, current),
            new_failures: multiset_difference(current, previous),
            cold_start: false,
        }
    }

    /// Returns the number of test cases fixed since the previous run.
    pub fn fixed_count(&self) -> usize {
        self.fixed.len()
    }

    /// Returns the number of test cases newly failing in this run.
    pub fn new_failure_count(&self) -> usize {
        self.new_failures.len()
    }

    /// Returns true if nothing changed in either direction.
    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty() && self.new_failures.is_empty()
    }
}

/// Returns the elements of `keep` left over after consuming, one occurrence
/// at a time, every match found in `remove`. Order and duplicates in `keep`
/// are preserved.
fn multiset_difference(keep: &[TestCaseId], remove: &[TestCaseId]) -> Vec<TestCaseId> {
    let mut pending: HashMap<&TestCaseId, usize> = remove.iter().counts();
    keep.iter()
        .filter(|id| match pending.get_mut(id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            _ => true,
        })
        .cloned()
        .collect()
}
