// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Documented exit codes for the `nightshift` binary.
//!
//! Nightly automation branches on these, so they form a stable interface:
//! new codes may be added, but existing codes won't change meaning.

/// Exit codes returned by the `nightshift` binary.
pub enum NightshiftExitCode {}

impl NightshiftExitCode {
    /// The command ran successfully and no new failures were found.
    pub const OK: i32 = 0;

    /// Invalid command-line arguments were passed in.
    pub const INVALID_ARGUMENTS: i32 = 2;

    /// The build log contained no module blocks at all, which usually means
    /// the wrong file was passed in.
    pub const NO_MODULES_PARSED: i32 = 4;

    /// A setup error occurred: configuration, the build log, or report files
    /// could not be read.
    pub const SETUP_ERROR: i32 = 96;

    /// The report ran to completion and new test failures were detected
    /// against the baseline.
    pub const NEW_FAILURES: i32 = 100;

    /// The baseline snapshot could not be written or cleared.
    pub const SNAPSHOT_WRITE_FAILED: i32 = 103;

    /// An error occurred while writing report output.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
