// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, Result},
    output::{OutputContext, OutputOpts, OutputWriter},
};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use nightshift_core::{
    buildlog,
    config::NightshiftConfig,
    diff::FailureDiff,
    errors::WriteReportError,
    exit_codes::NightshiftExitCode,
    failures,
    report::{OutputFormat, RunReport, SerializableFormat, Styles},
    snapshot::{RecordOutcome, RunSnapshot, SnapshotLoad, SnapshotStore},
    summary::{ModulePartition, RunSummary},
};
use owo_colors::OwoColorize;
use std::{
    fs,
    io::{self, Write},
};
use tracing::{info, warn};

/// Nightly build reporter.
///
/// Parses an Ant-style nightly build log into a per-module test summary and
/// diffs failing test cases against the previous run's snapshot.
#[derive(Debug, Parser)]
#[clap(
    version,
    styles = crate::output::clap_styles::style(),
    max_term_width = 100,
)]
pub struct NightshiftApp {
    #[clap(flatten)]
    common: CommonOpts,

    #[clap(subcommand)]
    command: Command,
}

impl NightshiftApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.common.output.init()
    }

    /// Executes the app.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let mut config = NightshiftConfig::from_sources(
            &self.common.workspace_root,
            self.common.config_file.as_deref(),
        )?;
        if let Some(store_dir) = self.common.store_dir {
            config.set_store_dir(store_dir);
        }
        if output.verbose {
            info!("using store directory `{}`", config.store_dir());
        }

        match self.command {
            Command::Report(opts) => opts.exec(&config, output, output_writer),
            Command::Snapshot { command } => command.exec(&config, output_writer),
        }
    }
}

#[derive(Debug, Args)]
struct CommonOpts {
    /// Config file [default: <workspace-root>/.config/nightshift.toml]
    #[arg(long, global = true, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Root of the nightly build workspace
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    workspace_root: Utf8PathBuf,

    /// Directory to store run snapshots in [default: from config]
    #[arg(long, global = true, value_name = "DIR")]
    store_dir: Option<Utf8PathBuf>,

    #[clap(flatten)]
    output: OutputOpts,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Report test results from a nightly build log
    Report(Box<ReportOpts>),
    /// Manage the stored run snapshot
    Snapshot {
        #[clap(subcommand)]
        command: SnapshotCommand,
    },
}

#[derive(Debug, Args)]
struct ReportOpts {
    /// Path to the nightly build log
    #[arg(long, value_name = "PATH")]
    log: Utf8PathBuf,

    /// Directory of test report files to scan for failing test cases
    #[arg(long, value_name = "DIR")]
    reports_dir: Option<Utf8PathBuf>,

    /// Source revision the nightly was built from
    #[arg(long, value_name = "REVISION", conflicts_with = "update_log")]
    revision: Option<String>,

    /// Read the revision from this source update log instead
    #[arg(long, value_name = "PATH")]
    update_log: Option<Utf8PathBuf>,

    /// Module partition to report on: stable or experimental
    #[arg(long, default_value_t, value_name = "PARTITION")]
    partition: ModulePartition,

    /// Compute and print the report without writing a snapshot
    #[arg(long)]
    dry_run: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
    message_format: MessageFormatOpts,
}

impl ReportOpts {
    fn exec(
        self,
        config: &NightshiftConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let stderr_styles = output.stderr_styles();

        let log = fs::read_to_string(&self.log).map_err(|error| ExpectedError::LogRead {
            path: self.log.clone(),
            error,
        })?;

        let results = buildlog::parse_test_log(&log, config.markers());
        let no_modules = results.is_empty();
        if no_modules {
            warn!("no test modules found in `{}`", self.log);
        }
        let job = buildlog::job_status(&log, config.markers());

        let revision = match (self.revision, &self.update_log) {
            (Some(revision), _) => Some(revision),
            (None, Some(path)) => {
                let contents =
                    fs::read_to_string(path).map_err(|error| ExpectedError::UpdateLogRead {
                        path: path.clone(),
                        error,
                    })?;
                let revision = buildlog::revision_in_update_log(&contents);
                if revision.is_none() {
                    warn!("no revision found in `{path}`");
                }
                revision
            }
            (None, None) => None,
        };

        let summary = RunSummary::compute(results, self.partition, config.experimental_modules());

        let store = SnapshotStore::new(config.store_dir());
        let scanned = match &self.reports_dir {
            Some(reports_dir) => {
                let failing = failures::collect_failing_tests(reports_dir)?;
                Some((store.load(), failing))
            }
            None => None,
        };
        let diff = scanned
            .as_ref()
            .map(|(baseline, failing)| FailureDiff::compute(baseline.failing_tests(), failing));

        let report = RunReport::new(revision.clone(), Some(job), summary, diff.clone());
        let mut styles = Styles::default();
        if output.color.should_colorize(supports_color::Stream::Stdout) {
            styles.colorize();
        }
        let mut writer = output_writer.stdout_writer();
        report.write(self.message_format.to_output_format(styles), &mut writer)?;
        writer.flush().map_err(|error| ExpectedError::WriteOutput {
            error: WriteReportError::Io(error),
        })?;

        // The snapshot is recorded even when new failures make this run exit
        // nonzero: tomorrow's diff runs against tonight's failures.
        if let Some((baseline, failing)) = scanned {
            if self.dry_run {
                info!("dry run, not writing a snapshot");
            } else {
                match &revision {
                    Some(revision) => {
                        let snapshot = RunSnapshot::new(revision.clone(), failing);
                        match store.record(&baseline, snapshot)? {
                            RecordOutcome::Written => {
                                info!("snapshot written to `{}`", store.path());
                            }
                            RecordOutcome::RevisionUnchanged => {
                                info!("revision {revision} unchanged, keeping previous snapshot");
                            }
                        }
                    }
                    None => {
                        warn!(
                            "{}",
                            "no revision available, not writing a snapshot"
                                .style(stderr_styles.warning_text)
                        );
                    }
                }
            }
        }

        if let Some(diff) = &diff {
            if !diff.cold_start && !diff.new_failures.is_empty() {
                return Err(ExpectedError::NewFailuresDetected {
                    count: diff.new_failure_count(),
                });
            }
        }
        if no_modules {
            return Ok(NightshiftExitCode::NO_MODULES_PARSED);
        }
        Ok(NightshiftExitCode::OK)
    }
}

#[derive(Debug, Subcommand)]
enum SnapshotCommand {
    /// Show the stored run snapshot
    Show {
        /// Output format
        #[arg(long, value_enum, default_value_t, value_name = "FORMAT")]
        message_format: MessageFormatOpts,
    },
    /// Delete the stored run snapshot
    Clear,
}

impl SnapshotCommand {
    fn exec(self, config: &NightshiftConfig, output_writer: &mut OutputWriter) -> Result<i32> {
        let store = SnapshotStore::new(config.store_dir());
        match self {
            Self::Show { message_format } => {
                let loaded = store.load();
                let mut writer = output_writer.stdout_writer();
                match message_format {
                    MessageFormatOpts::Human => write_snapshot_human(&store, &loaded, &mut writer)
                        .map_err(|error| ExpectedError::WriteOutput {
                            error: WriteReportError::Io(error),
                        })?,
                    MessageFormatOpts::Json | MessageFormatOpts::JsonPretty => {
                        let json = match message_format {
                            MessageFormatOpts::JsonPretty => {
                                serde_json::to_string_pretty(&loaded.snapshot())
                            }
                            _ => serde_json::to_string(&loaded.snapshot()),
                        }
                        .map_err(|error| ExpectedError::WriteOutput {
                            error: WriteReportError::Json(error),
                        })?;
                        writeln!(writer, "{json}").map_err(|error| ExpectedError::WriteOutput {
                            error: WriteReportError::Io(error),
                        })?;
                    }
                }
            }
            Self::Clear => {
                store.clear()?;
                info!("snapshot cleared from `{}`", store.path());
            }
        }
        Ok(NightshiftExitCode::OK)
    }
}

fn write_snapshot_human(
    store: &SnapshotStore,
    loaded: &SnapshotLoad,
    writer: &mut dyn Write,
) -> io::Result<()> {
    let snapshot = match loaded {
        SnapshotLoad::Snapshot(snapshot) => snapshot,
        SnapshotLoad::ColdStart(reason) => {
            writeln!(writer, "no usable snapshot at `{}` ({reason})", store.path())?;
            return Ok(());
        }
    };

    writeln!(writer, "snapshot at `{}`:", store.path())?;
    writeln!(writer, "  created at: {}", snapshot.created_at)?;
    writeln!(writer, "  revision:   {}", snapshot.revision)?;
    let count = snapshot.failing_tests.len();
    if count == 0 {
        writeln!(writer, "  no failing test cases")?;
    } else {
        writeln!(
            writer,
            "  {count} failing {}:",
            if count == 1 { "test case" } else { "test cases" },
        )?;
        for id in &snapshot.failing_tests {
            writeln!(writer, "    {id}")?;
        }
    }
    Ok(())
}

#[derive(Clone, Copy, Debug, Default, ValueEnum)]
enum MessageFormatOpts {
    #[default]
    Human,
    Json,
    JsonPretty,
}

impl MessageFormatOpts {
    fn to_output_format(self, styles: Styles) -> OutputFormat {
        match self {
            Self::Human => OutputFormat::Human { styles },
            Self::Json => OutputFormat::Serializable(SerializableFormat::Json),
            Self::JsonPretty => OutputFormat::Serializable(SerializableFormat::JsonPretty),
        }
    }
}
