// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Rendering a run's summary and diff as a report.
//!
//! [`RunReport`] bundles everything one nightly run produced. It renders
//! either as human-readable text (a fixed-width table plus diff sections) or
//! as JSON for downstream tooling. Summaries always render: crashed modules
//! get a `CRASHED` row, zero-test modules get an `NA` rate, and a cold-start
//! diff renders with an explicit first-run note.

use crate::{
    buildlog::JobStatus,
    diff::FailureDiff,
    errors::WriteReportError,
    summary::{ModuleOutcome, RunSummary},
};
use chrono::{DateTime, Utc};
use owo_colors::{OwoColorize, Style};
use serde::Serialize;
use std::io::{self, Write};

/// Output format for a rendered report.
#[derive(Clone, Copy, Debug)]
pub enum OutputFormat {
    /// A human-readable output format.
    Human {
        /// Styles to render with.
        styles: Styles,
    },
    /// A machine-readable output format.
    Serializable(SerializableFormat),
}

/// A machine-readable output format.
#[derive(Clone, Copy, Debug)]
pub enum SerializableFormat {
    /// JSON with no whitespace.
    Json,
    /// JSON, prettified.
    JsonPretty,
}

/// Styles for rendered reports.
///
/// The default is unstyled; call [`colorize`](Self::colorize) to enable
/// colors.
#[derive(Clone, Copy, Debug, Default)]
pub struct Styles {
    module: Style,
    count: Style,
    passing: Style,
    failing: Style,
    crashed: Style,
    heading: Style,
}

impl Styles {
    /// Enables colorized output.
    pub fn colorize(&mut self) {
        self.module = Style::new().bold();
        self.count = Style::new().bold();
        self.passing = Style::new().green();
        self.failing = Style::new().red();
        self.crashed = Style::new().red().bold();
        self.heading = Style::new().underline();
    }
}

/// Everything one nightly run produced: the module summary and, when a
/// reports directory was scanned, the failure diff.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunReport {
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// The source revision the run was built from, if known.
    pub revision: Option<String>,
    /// Whether the build job completed, if a build log was checked.
    pub job: Option<JobStatus>,
    /// The module summary.
    pub summary: RunSummary,
    /// The failure diff. Absent when no reports directory was scanned.
    pub diff: Option<FailureDiff>,
}

impl RunReport {
    /// Creates a report timestamped now.
    pub fn new(
        revision: Option<String>,
        job: Option<JobStatus>,
        summary: RunSummary,
        diff: Option<FailureDiff>,
    ) -> Self {
        Self {
            generated_at: Utc::now(),
            revision,
            job,
            summary,
            diff,
        }
    }

    /// Writes the report in the given format.
    pub fn write(
        &self,
        format: OutputFormat,
        writer: &mut dyn Write,
    ) -> Result<(), WriteReportError> {
        match format {
            OutputFormat::Human { styles } => {
                self.write_human(&styles, writer).map_err(WriteReportError::Io)
            }
            OutputFormat::Serializable(format) => self.write_serializable(format, writer),
        }
    }

    fn write_serializable(
        &self,
        format: SerializableFormat,
        writer: &mut dyn Write,
    ) -> Result<(), WriteReportError> {
        let json = match format {
            SerializableFormat::Json => serde_json::to_string(self),
            SerializableFormat::JsonPretty => serde_json::to_string_pretty(self),
        }
        .map_err(WriteReportError::Json)?;
        writeln!(writer, "{json}").map_err(WriteReportError::Io)
    }

    fn write_human(&self, styles: &Styles, writer: &mut dyn Write) -> io::Result<()> {
        match &self.revision {
            Some(revision) => writeln!(
                writer,
                "{} modules at revision {}",
                self.summary.partition,
                revision.style(styles.count),
            )?,
            None => writeln!(writer, "{} modules", self.summary.partition)?,
        }
        if self.job == Some(JobStatus::Failed) {
            let note = "build job did not complete; results below may be partial";
            writeln!(writer, "{}", note.style(styles.failing))?;
        }
        writeln!(writer)?;

        self.write_summary_table(styles, writer)?;

        if let Some(diff) = &self.diff {
            writeln!(writer)?;
            write_diff(diff, styles, writer)?;
        }
        Ok(())
    }

    fn write_summary_table(&self, styles: &Styles, writer: &mut dyn Write) -> io::Result<()> {
        if self.summary.is_empty() {
            writeln!(writer, "no modules matched this partition")?;
            return Ok(());
        }

        let header = format!(
            "{:<20} {:>8} {:>10} {:>8} {:>10}",
            "module", "tests", "failures", "errors", "rate"
        );
        writeln!(writer, "{}", header.style(styles.heading))?;

        for row in &self.summary.rows {
            let name = format!("{:<20}", row.name);
            write!(writer, "{}", name.style(styles.module))?;
            match row.outcome {
                ModuleOutcome::Completed(counts) => {
                    let rate = format!("{:>10}", counts.success_rate().to_string());
                    let rate_style = if counts.failures == 0 && counts.errors == 0 {
                        styles.passing
                    } else {
                        styles.failing
                    };
                    writeln!(
                        writer,
                        " {:>8} {:>10} {:>8} {}",
                        counts.tests_run,
                        counts.failures,
                        counts.errors,
                        rate.style(rate_style),
                    )?;
                }
                ModuleOutcome::Crashed => {
                    let status = format!("{:>10}", "CRASHED");
                    writeln!(
                        writer,
                        " {:>8} {:>10} {:>8} {}",
                        "-",
                        "-",
                        "-",
                        status.style(styles.crashed),
                    )?;
                }
            }
        }

        let totals = &self.summary.totals;
        let label = format!("{:<20}", "total");
        let rate = format!("{:>10}", self.summary.success_rate().to_string());
        writeln!(
            writer,
            "{} {:>8} {:>10} {:>8} {}",
            label.style(styles.count),
            totals.tests_run,
            totals.failures,
            totals.errors,
            rate.style(styles.count),
        )?;

        if totals.crashed > 0 {
            writeln!(writer)?;
            let note = format!(
                "{} {} crashed before reporting results",
                totals.crashed,
                modules_str(totals.crashed),
            );
            writeln!(writer, "{}", note.style(styles.crashed))?;
        }
        Ok(())
    }
}

fn write_diff(diff: &FailureDiff, styles: &Styles, writer: &mut dyn Write) -> io::Result<()> {
    if diff.cold_start {
        writeln!(writer, "first run: no baseline snapshot to compare against")?;
        if diff.new_failures.is_empty() {
            writeln!(writer, "no test cases currently failing")?;
        } else {
            let count = diff.new_failure_count();
            writeln!(writer, "{count} {} currently failing:", test_cases_str(count))?;
            for id in &diff.new_failures {
                let status = format!("{:>12}", "FAIL");
                writeln!(writer, "{} {}", status.style(styles.failing), id)?;
            }
        }
        return Ok(());
    }

    if diff.is_empty() {
        writeln!(writer, "no changes in failing tests since the previous run")?;
        return Ok(());
    }

    if !diff.fixed.is_empty() {
        let count = diff.fixed_count();
        writeln!(
            writer,
            "{count} {} fixed since the previous run:",
            test_cases_str(count),
        )?;
        for id in &diff.fixed {
            let status = format!("{:>12}", "FIXED");
            writeln!(writer, "{} {}", status.style(styles.passing), id)?;
        }
    }
    if !diff.new_failures.is_empty() {
        if !diff.fixed.is_empty() {
            writeln!(writer)?;
        }
        let count = diff.new_failure_count();
        writeln!(
            writer,
            "{count} new failing {} since the previous run:",
            test_cases_str(count),
        )?;
        for id in &diff.new_failures {
            let status = format!("{:>12}", "FAIL");
            writeln!(writer, "{} {}", status.style(styles.failing), id)?;
        }
    }
    Ok(())
}

fn test_cases_str(count: usize) -> &'static str {
    if count == 1 { "test case" } else { "test cases" }
}

fn modules_str(count: usize) -> &'static str {
    if count == 1 { "module" } else { "modules" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        diff::TestCaseId,
        summary::{ModulePartition, ModuleResult},
    };
    use std::collections::BTreeSet;

    fn ids(ids: &[&str]) -> Vec<TestCaseId> {
        ids.iter().copied().map(TestCaseId::from).collect()
    }

    fn fixed_timestamp() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-03-14T03:30:00Z")
            .expect("timestamp is valid")
            .with_timezone(&Utc)
    }

    fn sample_report() -> RunReport {
        let results = vec![
            ModuleResult::completed("core", 100, 5, 2),
            ModuleResult::completed("data", 40, 0, 0),
            ModuleResult::crashed("iochem"),
        ];
        let summary = RunSummary::compute(results, ModulePartition::Stable, &BTreeSet::new());
        let diff = FailureDiff::compute(
            Some(&ids(&["TestRing.testBenzene", "TestAtom.testH"])),
            &ids(&["TestAtom.testH", "TestIso.testRing"]),
        );
        RunReport {
            generated_at: fixed_timestamp(),
            revision: Some("6828".to_owned()),
            job: Some(JobStatus::Succeeded),
            summary,
            diff: Some(diff),
        }
    }

    fn render_human(report: &RunReport) -> String {
        let mut out = Vec::new();
        report
            .write(
                OutputFormat::Human {
                    styles: Styles::default(),
                },
                &mut out,
            )
            .expect("writing to a vec succeeds");
        String::from_utf8(out).expect("human output is utf-8")
    }

    #[test]
    fn human_report_with_diff() {
        let output = render_human(&sample_report());
        insta::assert_snapshot!(output, @r"
        stable modules at revision 6828

        module                  tests   failures   errors       rate
        core                      100          5        2      93.00
        data                       40          0        0     100.00
        iochem                      -          -        -    CRASHED
        total                     140          5        2      95.00

        1 module crashed before reporting results

        1 test case fixed since the previous run:
               FIXED TestRing.testBenzene

        1 new failing test case since the previous run:
                FAIL TestIso.testRing
        ");
    }

    #[test]
    fn human_report_on_a_cold_start() {
        let summary = RunSummary::compute(
            vec![ModuleResult::completed("core", 10, 1, 0)],
            ModulePartition::Stable,
            &BTreeSet::new(),
        );
        let diff = FailureDiff::compute(None, &ids(&["TestRing.testBenzene"]));
        let report = RunReport {
            generated_at: fixed_timestamp(),
            revision: None,
            job: Some(JobStatus::Succeeded),
            summary,
            diff: Some(diff),
        };

        let output = render_human(&report);
        insta::assert_snapshot!(output, @r"
        stable modules

        module                  tests   failures   errors       rate
        core                       10          1        0      90.00
        total                      10          1        0      90.00

        first run: no baseline snapshot to compare against
        1 test case currently failing:
                FAIL TestRing.testBenzene
        ");
    }

    #[test]
    fn human_report_without_changes() {
        let summary = RunSummary::compute(
            vec![ModuleResult::completed("core", 10, 0, 0)],
            ModulePartition::Stable,
            &BTreeSet::new(),
        );
        let diff = FailureDiff::compute(Some(&ids(&["T1"])), &ids(&["T1"]));
        let report = RunReport {
            generated_at: fixed_timestamp(),
            revision: Some("6828".to_owned()),
            job: Some(JobStatus::Succeeded),
            summary,
            diff: Some(diff),
        };

        let output = render_human(&report);
        assert!(
            output.contains("no changes in failing tests since the previous run"),
            "unexpected output: {output}"
        );
    }

    #[test]
    fn human_report_notes_a_failed_job() {
        let summary = RunSummary::compute([], ModulePartition::Experimental, &BTreeSet::new());
        let report = RunReport {
            generated_at: fixed_timestamp(),
            revision: None,
            job: Some(JobStatus::Failed),
            summary,
            diff: None,
        };

        let output = render_human(&report);
        insta::assert_snapshot!(output, @r"
        experimental modules
        build job did not complete; results below may be partial

        no modules matched this partition
        ");
    }

    #[test]
    fn json_report_structure() {
        let report = sample_report();
        let mut out = Vec::new();
        report
            .write(
                OutputFormat::Serializable(SerializableFormat::Json),
                &mut out,
            )
            .expect("serializing to a vec succeeds");

        let value: serde_json::Value =
            serde_json::from_slice(&out).expect("output is valid JSON");
        assert_eq!(value["revision"], "6828");
        assert_eq!(value["job"], "succeeded");
        assert_eq!(value["summary"]["partition"], "stable");
        assert_eq!(value["summary"]["rows"][0]["name"], "core");
        assert_eq!(
            value["summary"]["rows"][0]["outcome"]["completed"]["tests-run"],
            100
        );
        assert_eq!(value["summary"]["rows"][2]["outcome"], "crashed");
        assert_eq!(value["summary"]["totals"]["tests-run"], 140);
        assert_eq!(value["summary"]["totals"]["crashed"], 1);
        assert_eq!(value["diff"]["fixed"][0], "TestRing.testBenzene");
        assert_eq!(value["diff"]["new-failures"][0], "TestIso.testRing");
        assert_eq!(value["diff"]["cold-start"], false);
    }
}
