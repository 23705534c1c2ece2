//! Conformance harness for posix-uefi.
//!
//! This crate provides:
//! - Fixtures: JSON case files for the formatter and for stream scripts
//! - Runner: executes cases against the in-memory firmware
//! - Verification and reports: pass/fail summaries in markdown and JSON
//! - Structured logs: one JSONL record per verified case

#![forbid(unsafe_code)]

pub mod diff;
pub mod error;
pub mod fixtures;
pub mod report;
pub mod runner;
pub mod structured_log;
pub mod verify;

pub use error::HarnessError;
pub use fixtures::{FixtureCase, FixtureSet};
pub use report::ConformanceReport;
pub use runner::TestRunner;
pub use verify::VerificationResult;
