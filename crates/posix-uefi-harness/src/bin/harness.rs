//! CLI entrypoint for the posix-uefi conformance harness.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use posix_uefi_harness::fixtures::ArgSpec;
use posix_uefi_harness::runner::render_text;
use posix_uefi_harness::structured_log::LogEmitter;
use posix_uefi_harness::verify::VerificationSummary;
use posix_uefi_harness::{ConformanceReport, FixtureSet, TestRunner};

/// Conformance tooling for posix-uefi.
#[derive(Debug, Parser)]
#[command(name = "posix-uefi-harness")]
#[command(about = "Fixture-driven conformance harness for posix-uefi")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Verify the formatter and stream layer against fixture files.
    Verify {
        /// Directory containing fixture JSON files.
        #[arg(long)]
        fixture: PathBuf,
        /// Output report path (markdown; a JSON twin is written alongside).
        #[arg(long)]
        report: Option<PathBuf>,
        /// Structured JSONL log path.
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Render one format string and print the result.
    Render {
        /// Format string, e.g. `%05d|%s`.
        #[arg(long)]
        format: String,
        /// Argument as `kind:value` (int, uint, ptr, char, wide, utf8,
        /// null_wide, null_utf8, memory). Repeatable.
        #[arg(long = "arg")]
        args: Vec<String>,
        /// Output capacity in UTF-16 units, terminator included.
        #[arg(long)]
        max_len: Option<usize>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Verify {
            fixture,
            report,
            log,
        } => {
            eprintln!("Verifying against fixtures in {}", fixture.display());
            let fixture_sets = FixtureSet::load_dir(&fixture)?;

            let runner = TestRunner::new("fixture-verify");
            let results: Vec<_> = fixture_sets.iter().flat_map(|set| runner.run(set)).collect();

            if let Some(log_path) = log {
                let mut emitter = LogEmitter::to_file(&log_path, "fixture-verify")?;
                emitter.emit_results(&results)?;
                eprintln!("Wrote structured log to {}", log_path.display());
            }

            let summary = VerificationSummary::from_results(results);
            let timestamp = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs().to_string())
                .unwrap_or_default();
            let report_doc = ConformanceReport {
                title: String::from("posix-uefi Conformance Report"),
                timestamp,
                summary,
            };

            eprintln!(
                "Verification complete: total={}, passed={}, failed={}",
                report_doc.summary.total, report_doc.summary.passed, report_doc.summary.failed
            );
            for failure in report_doc.summary.failures() {
                eprintln!("FAIL {}/{}", failure.family, failure.case_name);
                if let Some(diff) = &failure.diff {
                    eprintln!("{diff}");
                }
            }

            if let Some(report_path) = report {
                eprintln!("Writing report to {}", report_path.display());
                std::fs::write(&report_path, report_doc.to_markdown())?;
                let json_path = report_path.with_extension("json");
                std::fs::write(&json_path, report_doc.to_json())?;
            }

            if !report_doc.summary.all_passed() {
                return Err("Conformance verification failed".into());
            }
        }
        Command::Render {
            format,
            args,
            max_len,
        } => {
            let specs = args
                .iter()
                .map(|arg| ArgSpec::parse(arg))
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", render_text(&format, &specs, max_len));
        }
    }

    Ok(())
}
