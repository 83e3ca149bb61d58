// Copyright (c) The nightshift Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Nightly build reporter for Ant-driven test suites.
//!
//! This crate is the command-line interface. It parses nightly build logs
//! into per-module test summaries and diffs failing test cases against the
//! previous run's snapshot. The reusable logic lives in `nightshift-core`.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
