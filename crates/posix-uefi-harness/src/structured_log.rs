//! Structured JSONL records for verification runs.
//!
//! - [`LogEntry`]: one record per verified case or run event.
//! - [`LogEmitter`]: writes JSONL lines to a file or an in-memory buffer.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::verify::VerificationResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Pass,
    Fail,
}

/// Canonical structured log entry.
///
/// Required fields: `timestamp`, `trace_id`, `level`, `event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: String,
    pub trace_id: String,
    pub level: LogLevel,
    pub event: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errno: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl LogEntry {
    /// Create a new log entry with required fields only.
    #[must_use]
    pub fn new(trace_id: impl Into<String>, level: LogLevel, event: impl Into<String>) -> Self {
        Self {
            timestamp: now_utc(),
            trace_id: trace_id.into(),
            level,
            event: event.into(),
            family: None,
            case: None,
            outcome: None,
            errno: None,
            details: None,
        }
    }

    /// Entry describing one verified case.
    #[must_use]
    pub fn for_result(trace_id: impl Into<String>, result: &VerificationResult) -> Self {
        let (level, outcome) = if result.passed {
            (LogLevel::Info, Outcome::Pass)
        } else {
            (LogLevel::Error, Outcome::Fail)
        };
        let mut entry = Self::new(trace_id, level, "case_verified")
            .with_case(&result.family, &result.case_name)
            .with_outcome(outcome)
            .with_errno(result.errno);
        if let Some(diff) = &result.diff {
            entry = entry.with_details(serde_json::json!({ "diff": diff }));
        }
        entry
    }

    #[must_use]
    pub fn with_case(mut self, family: impl Into<String>, case: impl Into<String>) -> Self {
        self.family = Some(family.into());
        self.case = Some(case.into());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: Outcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    #[must_use]
    pub fn with_errno(mut self, errno: i32) -> Self {
        self.errno = Some(errno);
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Serialize to a single JSONL line (no trailing newline).
    pub fn to_jsonl(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// JSONL writer. Each emitted line carries the run's trace id.
pub struct LogEmitter {
    writer: Box<dyn Write>,
    run_id: String,
    seq: u64,
}

impl LogEmitter {
    /// Create an emitter that writes to a file.
    pub fn to_file(path: &Path, run_id: &str) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self {
            writer: Box::new(std::io::BufWriter::new(file)),
            run_id: run_id.to_string(),
            seq: 0,
        })
    }

    /// Create an emitter over any writer.
    #[must_use]
    pub fn to_writer(writer: Box<dyn Write>, run_id: &str) -> Self {
        Self {
            writer,
            run_id: run_id.to_string(),
            seq: 0,
        }
    }

    /// Trace id for the next entry: `<run_id>::<seq>`.
    pub fn next_trace_id(&mut self) -> String {
        self.seq += 1;
        format!("{}::{:04}", self.run_id, self.seq)
    }

    /// Write one entry as a JSONL line.
    pub fn emit(&mut self, entry: &LogEntry) -> std::io::Result<()> {
        let line = entry.to_jsonl().map_err(std::io::Error::other)?;
        writeln!(self.writer, "{line}")
    }

    /// Emit one entry per verification result.
    pub fn emit_results(&mut self, results: &[VerificationResult]) -> std::io::Result<()> {
        for result in results {
            let trace_id = self.next_trace_id();
            self.emit(&LogEntry::for_result(trace_id, result))?;
        }
        self.flush()
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

/// Seconds since the Unix epoch, with millisecond precision.
fn now_utc() -> String {
    let duration = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default();
    format!("{}.{:03}", duration.as_secs(), duration.subsec_millis())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    #[derive(Clone, Default)]
    struct Shared(Rc<RefCell<Vec<u8>>>);

    impl Write for Shared {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn result(passed: bool) -> VerificationResult {
        VerificationResult {
            case_name: "pad".into(),
            family: "printf".into(),
            section: "render".into(),
            passed,
            expected: "1".into(),
            actual: if passed { "1".into() } else { "2".into() },
            expected_errno: 0,
            errno: 0,
            diff: (!passed).then(|| "-1\n+2".to_string()),
        }
    }

    #[test]
    fn log_entry_serializes_required_fields() {
        let line = LogEntry::new("run::0001", LogLevel::Info, "start")
            .to_jsonl()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["trace_id"], "run::0001");
        assert_eq!(value["level"], "info");
        assert!(value.get("outcome").is_none());
    }

    #[test]
    fn emitter_writes_one_line_per_result() {
        let sink = Shared::default();
        let mut emitter = LogEmitter::to_writer(Box::new(sink.clone()), "run");
        emitter
            .emit_results(&[result(true), result(false)])
            .unwrap();
        let text = String::from_utf8(sink.0.borrow().clone()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["trace_id"], "run::0001");
        assert_eq!(lines[0]["outcome"], "pass");
        assert_eq!(lines[1]["outcome"], "fail");
        assert_eq!(lines[1]["level"], "error");
        assert_eq!(lines[1]["details"]["diff"], "-1\n+2");
    }
}
