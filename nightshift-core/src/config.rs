// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for nightshift.
//!
//! Configuration is layered: the defaults embedded in the binary, then the
//! repository's `.config/nightshift.toml` if it exists. Configuration is
//! plain data handed explicitly to the functions that need it; there is no
//! global config object.

use crate::{buildlog::LogMarkers, errors::ConfigParseError};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracing::warn;

/// Repository-relative location of the config file.
pub const CONFIG_PATH: &str = ".config/nightshift.toml";

/// The default config, included with all binaries.
const DEFAULT_CONFIG: &str = include_str!("../default-config.toml");

/// Nightly report configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NightshiftConfig {
    store_dir: Utf8PathBuf,
    experimental_modules: BTreeSet<String>,
    markers: LogMarkers,
}

impl NightshiftConfig {
    /// Reads configuration for the given workspace root.
    ///
    /// `config_file` overrides the default `.config/nightshift.toml`
    /// location; an explicitly given file must exist, while the default one
    /// may be absent.
    pub fn from_sources(
        workspace_root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, required) = match config_file {
            Some(path) => (path.to_owned(), true),
            None => (workspace_root.join(CONFIG_PATH), false),
        };

        let config = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::new(config_file.as_str(), FileFormat::Toml).required(required))
            .build()
            .map_err(|error| ConfigParseError::new(config_file.clone(), error))?;

        let mut ignored = BTreeSet::new();
        let deserialized: ConfigImpl =
            serde_ignored::deserialize(config, |path: serde_ignored::Path<'_>| {
                ignored.insert(path.to_string());
            })
            .map_err(|error| ConfigParseError::new(config_file.clone(), error))?;

        if !ignored.is_empty() {
            let keys = ignored.into_iter().collect::<Vec<_>>().join(", ");
            warn!("ignoring unknown configuration keys in {config_file}: {keys}");
        }

        Ok(Self {
            store_dir: workspace_root.join(&deserialized.store_dir),
            experimental_modules: deserialized.experimental_modules,
            markers: LogMarkers {
                module_marker: deserialized.module_marker,
                success_marker: deserialized.success_marker,
            },
        })
    }

    /// Returns the directory the run snapshot is stored in.
    pub fn store_dir(&self) -> &Utf8Path {
        &self.store_dir
    }

    /// Replaces the snapshot store directory, e.g. from a command-line
    /// override.
    pub fn set_store_dir(&mut self, store_dir: Utf8PathBuf) {
        self.store_dir = store_dir;
    }

    /// Returns the names of modules summarized on the experimental page.
    pub fn experimental_modules(&self) -> &BTreeSet<String> {
        &self.experimental_modules
    }

    /// Returns the log markers used while parsing build logs.
    pub fn markers(&self) -> &LogMarkers {
        &self.markers
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigImpl {
    store_dir: Utf8PathBuf,
    experimental_modules: BTreeSet<String>,
    module_marker: String,
    success_marker: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::Utf8TempDir;
    use indoc::indoc;
    use maplit::btreeset;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn default_config_is_valid() {
        let temp_dir = Utf8TempDir::new().unwrap();

        let config = NightshiftConfig::from_sources(temp_dir.path(), None)
            .expect("default config is always valid");
        assert_eq!(config.store_dir(), temp_dir.path().join(".nightshift"));
        assert!(config.experimental_modules().is_empty());
        assert_eq!(config.markers(), &LogMarkers::default());
    }

    #[test]
    fn repository_config_overrides_defaults() {
        let temp_dir = Utf8TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(".config")).unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_PATH),
            indoc! {r#"
                store-dir = "build/nightly-state"
                experimental-modules = ["expA", "builder3d"]
            "#},
        )
        .unwrap();

        let config = NightshiftConfig::from_sources(temp_dir.path(), None)
            .expect("repository config parses");
        assert_eq!(
            config.store_dir(),
            temp_dir.path().join("build/nightly-state")
        );
        assert_eq!(
            config.experimental_modules(),
            &btreeset! { "expA".to_owned(), "builder3d".to_owned() }
        );
        // Keys not set in the repository config keep their defaults.
        assert_eq!(config.markers(), &LogMarkers::default());
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let temp_dir = Utf8TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");

        let error = NightshiftConfig::from_sources(temp_dir.path(), Some(&missing))
            .expect_err("missing explicit config file is an error");
        assert_eq!(error.config_file(), &missing);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let temp_dir = Utf8TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(".config")).unwrap();
        fs::write(
            temp_dir.path().join(CONFIG_PATH),
            indoc! {r#"
                store-dir = "state"
                experimental-module = ["typo"]
            "#},
        )
        .unwrap();

        // The typoed key is dropped with a warning rather than failing.
        let config = NightshiftConfig::from_sources(temp_dir.path(), None)
            .expect("unknown keys don't fail the parse");
        assert_eq!(config.store_dir(), temp_dir.path().join("state"));
        assert!(config.experimental_modules().is_empty());
    }

    #[test]
    fn malformed_config_is_an_error() {
        let temp_dir = Utf8TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join(".config")).unwrap();
        fs::write(temp_dir.path().join(CONFIG_PATH), "store-dir = [not toml").unwrap();

        NightshiftConfig::from_sources(temp_dir.path(), None)
            .expect_err("malformed config file is an error");
    }
}
