// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::StderrStyles;
use camino::Utf8PathBuf;
use nightshift_core::{
    errors::{
        ConfigParseError, ReportScanError, SnapshotClearError, SnapshotSaveError, WriteReportError,
    },
    exit_codes::NightshiftExitCode,
};
use owo_colors::OwoColorize;
use std::error::Error;
use thiserror::Error;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error expected during normal operation of nightshift.
///
/// Every variant maps to a documented exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ConfigParse {
        #[from]
        error: ConfigParseError,
    },
    #[error("failed to read build log")]
    LogRead {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("failed to read update log")]
    UpdateLogRead {
        path: Utf8PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("failed to scan reports directory")]
    ReportScan {
        #[from]
        error: ReportScanError,
    },
    #[error("failed to write snapshot")]
    SnapshotWrite {
        #[from]
        error: SnapshotSaveError,
    },
    #[error("failed to clear snapshot")]
    SnapshotClear {
        #[from]
        error: SnapshotClearError,
    },
    #[error("failed to write output")]
    WriteOutput {
        #[from]
        error: WriteReportError,
    },
    #[error("new test failures detected")]
    NewFailuresDetected { count: usize },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigParse { .. }
            | Self::LogRead { .. }
            | Self::UpdateLogRead { .. }
            | Self::ReportScan { .. } => NightshiftExitCode::SETUP_ERROR,
            Self::SnapshotWrite { .. } | Self::SnapshotClear { .. } => {
                NightshiftExitCode::SNAPSHOT_WRITE_FAILED
            }
            Self::WriteOutput { .. } => NightshiftExitCode::WRITE_OUTPUT_ERROR,
            Self::NewFailuresDetected { .. } => NightshiftExitCode::NEW_FAILURES,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::ConfigParse { error } => {
                error!(
                    "failed to read nightshift config at `{}`",
                    error.config_file().style(styles.bold)
                );
                error.source()
            }
            Self::LogRead { path, error } => {
                error!("failed to read build log `{}`", path.style(styles.bold));
                Some(error as &dyn Error)
            }
            Self::UpdateLogRead { path, error } => {
                error!("failed to read update log `{}`", path.style(styles.bold));
                Some(error as &dyn Error)
            }
            Self::ReportScan { error } => {
                error!("{error}");
                error.source()
            }
            Self::SnapshotWrite { error } => {
                error!("{error}");
                error.source()
            }
            Self::SnapshotClear { error } => {
                error!(
                    "failed to remove snapshot file `{}`",
                    error.path().style(styles.bold)
                );
                error.source()
            }
            Self::WriteOutput { error } => {
                error!("{error}");
                error.source()
            }
            Self::NewFailuresDetected { count } => {
                error!(
                    "{} new failing {}",
                    count.style(styles.bold),
                    if *count == 1 { "test case" } else { "test cases" },
                );
                None
            }
        };

        while let Some(err) = next_error {
            error!(target: "nightshift::no_heading", "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
