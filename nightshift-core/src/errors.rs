// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by nightshift-core.

use camino::Utf8PathBuf;
use std::io;
use thiserror::Error;

/// An error that occurred while reading nightshift configuration.
#[derive(Debug, Error)]
#[error("failed to read nightshift config at {config_file}")]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    error: config::ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Utf8PathBuf, error: config::ConfigError) -> Self {
        Self { config_file, error }
    }

    /// Returns the path of the config file that failed to parse.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }
}

/// An invalid string was passed to [`ModulePartition`](crate::summary::ModulePartition)'s
/// `from_str`.
#[derive(Clone, Debug, Error)]
#[error("unrecognized partition `{input}` (expected \"stable\" or \"experimental\")")]
pub struct InvalidModulePartition {
    input: String,
}

impl InvalidModulePartition {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// An error that occurred while scanning a directory of test reports.
#[derive(Debug, Error)]
pub enum ReportScanError {
    /// The report directory could not be read.
    #[error("failed to read report directory {dir}")]
    ReadDir {
        /// The directory being scanned.
        dir: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// A report file could not be read.
    #[error("failed to read report file {path}")]
    ReadFile {
        /// The file being read.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },
}

/// An error that occurred while saving a run snapshot.
///
/// Unlike loading, which degrades to a cold start, failing to save is a hard
/// error: silently losing the baseline would corrupt the next run's diff.
#[derive(Debug, Error)]
pub enum SnapshotSaveError {
    /// The snapshot directory could not be created.
    #[error("failed to create snapshot directory {store_dir}")]
    CreateStoreDir {
        /// The directory being created.
        store_dir: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: io::Error,
    },

    /// The snapshot could not be serialized.
    #[error("failed to serialize snapshot for {path}")]
    Serialize {
        /// The file being written.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: serde_json::Error,
    },

    /// The snapshot file could not be written.
    #[error("failed to write snapshot to {path}")]
    Write {
        /// The file being written.
        path: Utf8PathBuf,
        /// The underlying error.
        #[source]
        error: atomicwrites::Error<io::Error>,
    },
}

/// An error that occurred while removing the stored snapshot.
#[derive(Debug, Error)]
#[error("failed to remove snapshot file {path}")]
pub struct SnapshotClearError {
    pub(crate) path: Utf8PathBuf,
    #[source]
    pub(crate) error: io::Error,
}

impl SnapshotClearError {
    /// Returns the path of the snapshot file that could not be removed.
    pub fn path(&self) -> &Utf8PathBuf {
        &self.path
    }
}

/// An error that occurred while writing a rendered report.
#[derive(Debug, Error)]
pub enum WriteReportError {
    /// An I/O error occurred while writing the report.
    #[error("error writing report")]
    Io(#[source] io::Error),

    /// The report could not be serialized to JSON.
    #[error("error serializing report to JSON")]
    Json(#[source] serde_json::Error),
}
