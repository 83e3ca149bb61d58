// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence for the previous run's failing tests.
//!
//! The differ needs yesterday's failing tests to say what's new today.
//! [`SnapshotStore`] keeps them in a versioned JSON file keyed by source
//! revision. Loading never fails: any unusable snapshot (missing, unreadable,
//! corrupt, or from an incompatible version) degrades to a cold start so the
//! nightly report still runs.

use crate::{
    diff::TestCaseId,
    errors::{SnapshotClearError, SnapshotSaveError},
};
use atomicwrites::{AllowOverwrite, AtomicFile};
use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, fs, io, io::Write};
use tracing::{debug, warn};

/// Name of the snapshot file within the store directory.
const SNAPSHOT_FILE_NAME: &str = "last-run.json";

/// Snapshot of the failing tests observed at a particular revision.
///
/// This is what [`SnapshotStore`] persists between nightly runs.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunSnapshot {
    /// Snapshot format version, to detect files written by incompatible
    /// versions of nightshift.
    pub version: u32,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
    /// The source revision the run was built from.
    pub revision: String,
    /// Failing test cases, in report order. Duplicates are preserved.
    pub failing_tests: Vec<TestCaseId>,
}

impl RunSnapshot {
    /// Creates a snapshot at the current version, timestamped now.
    pub fn new(revision: impl Into<String>, failing_tests: Vec<TestCaseId>) -> Self {
        Self {
            version: SnapshotStore::CURRENT_VERSION,
            created_at: Utc::now(),
            revision: revision.into(),
            failing_tests,
        }
    }
}

/// The result of loading the stored snapshot.
///
/// Loading never fails hard; see [`SnapshotStore::load`].
#[derive(Debug)]
pub enum SnapshotLoad {
    /// A usable snapshot was found.
    Snapshot(RunSnapshot),
    /// No usable snapshot; the diff runs without a baseline.
    ColdStart(ColdStartReason),
}

impl SnapshotLoad {
    /// Returns the snapshot, if a usable one was loaded.
    pub fn snapshot(&self) -> Option<&RunSnapshot> {
        match self {
            Self::Snapshot(snapshot) => Some(snapshot),
            Self::ColdStart(_) => None,
        }
    }

    /// Returns the previous run's failing tests, if a usable snapshot was
    /// loaded.
    pub fn failing_tests(&self) -> Option<&[TestCaseId]> {
        self.snapshot().map(|snapshot| &*snapshot.failing_tests)
    }
}

/// Why no usable baseline snapshot was available.
#[derive(Debug)]
pub enum ColdStartReason {
    /// The snapshot file does not exist yet. This is the normal first run.
    NoSnapshot,
    /// The snapshot file exists but could not be read.
    ReadFailed(io::Error),
    /// The snapshot file did not parse as a snapshot.
    Corrupt(serde_json::Error),
    /// The snapshot was written by an incompatible version of nightshift.
    VersionMismatch {
        /// The version found in the file.
        found: u32,
    },
}

impl fmt::Display for ColdStartReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoSnapshot => f.write_str("no snapshot file exists"),
            Self::ReadFailed(error) => write!(f, "snapshot file could not be read: {error}"),
            Self::Corrupt(error) => write!(f, "snapshot file is corrupt: {error}"),
            Self::VersionMismatch { found } => write!(
                f,
                "snapshot version {found} does not match current version {}",
                SnapshotStore::CURRENT_VERSION,
            ),
        }
    }
}

/// Whether [`SnapshotStore::record`] moved the baseline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RecordOutcome {
    /// The revision moved, or there was no usable baseline; the snapshot was
    /// written out.
    Written,
    /// The stored snapshot is for the same revision and was left untouched.
    RevisionUnchanged,
}

/// Storage for the previous run's snapshot.
#[derive(Clone, Debug)]
pub struct SnapshotStore {
    path: Utf8PathBuf,
}

impl SnapshotStore {
    /// The current snapshot format version.
    pub const CURRENT_VERSION: u32 = 1;

    /// Creates a store rooted at the given directory.
    pub fn new(store_dir: &Utf8Path) -> Self {
        Self {
            path: store_dir.join(SNAPSHOT_FILE_NAME),
        }
    }

    /// Returns the path of the snapshot file.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Loads the previous run's snapshot.
    ///
    /// Never fails: a missing, unreadable, corrupt or version-incompatible
    /// snapshot produces a [`SnapshotLoad::ColdStart`], logged here. A
    /// missing file is the normal first run and only logs at debug level.
    pub fn load(&self) -> SnapshotLoad {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                debug!("no snapshot at {}, starting cold", self.path);
                return SnapshotLoad::ColdStart(ColdStartReason::NoSnapshot);
            }
            Err(error) => {
                warn!(
                    "failed to read snapshot at {}, starting cold: {error}",
                    self.path
                );
                return SnapshotLoad::ColdStart(ColdStartReason::ReadFailed(error));
            }
        };

        let snapshot: RunSnapshot = match serde_json::from_str(&contents) {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(
                    "snapshot at {} is corrupt, starting cold: {error}",
                    self.path
                );
                return SnapshotLoad::ColdStart(ColdStartReason::Corrupt(error));
            }
        };

        if snapshot.version != Self::CURRENT_VERSION {
            warn!(
                "snapshot at {} has version {}, expected {}, starting cold",
                self.path,
                snapshot.version,
                Self::CURRENT_VERSION,
            );
            return SnapshotLoad::ColdStart(ColdStartReason::VersionMismatch {
                found: snapshot.version,
            });
        }

        SnapshotLoad::Snapshot(snapshot)
    }

    /// Saves a snapshot, replacing any existing one.
    ///
    /// The write is atomic: a run that dies partway through never leaves a
    /// truncated snapshot behind.
    pub fn save(&self, snapshot: &RunSnapshot) -> Result<(), SnapshotSaveError> {
        if let Some(store_dir) = self.path.parent() {
            fs::create_dir_all(store_dir).map_err(|error| SnapshotSaveError::CreateStoreDir {
                store_dir: store_dir.to_owned(),
                error,
            })?;
        }

        let json = serde_json::to_string_pretty(snapshot).map_err(|error| {
            SnapshotSaveError::Serialize {
                path: self.path.clone(),
                error,
            }
        })?;

        AtomicFile::new(&self.path, AllowOverwrite)
            .write(|file| file.write_all(json.as_bytes()))
            .map_err(|error| SnapshotSaveError::Write {
                path: self.path.clone(),
                error,
            })?;

        Ok(())
    }

    /// Records the current run, moving the baseline only when the revision
    /// changed.
    ///
    /// `previous` is the result of [`load`](Self::load) for this run. If it
    /// holds a snapshot for the same revision as `snapshot`, the nightly ran
    /// twice against the same sources and the stored baseline stays put.
    pub fn record(
        &self,
        previous: &SnapshotLoad,
        snapshot: RunSnapshot,
    ) -> Result<RecordOutcome, SnapshotSaveError> {
        if let SnapshotLoad::Snapshot(stored) = previous {
            if stored.revision == snapshot.revision {
                debug!(
                    "revision {} unchanged, keeping stored snapshot",
                    stored.revision
                );
                return Ok(RecordOutcome::RevisionUnchanged);
            }
        }
        self.save(&snapshot)?;
        Ok(RecordOutcome::Written)
    }

    /// Removes the stored snapshot. Removing a snapshot that doesn't exist
    /// is fine.
    pub fn clear(&self) -> Result<(), SnapshotClearError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(error) => Err(SnapshotClearError {
                path: self.path.clone(),
                error,
            }),
        }
    }
}
