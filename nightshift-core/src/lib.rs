// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for [nightshift](https://crates.io/crates/nightshift),
//! a nightly build report and test regression tracker.
//!
//! Given a nightly build log and a directory of per-module test reports, this
//! crate parses per-module statistics, aggregates them into stable and
//! experimental summaries, and diffs the failing tests against the snapshot
//! persisted by the previous run. The `nightshift` binary drives it.

pub mod buildlog;
pub mod config;
pub mod diff;
pub mod errors;
pub mod exit_codes;
pub mod failures;
pub mod report;
pub mod snapshot;
pub mod summary;
