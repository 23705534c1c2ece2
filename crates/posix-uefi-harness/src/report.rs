//! Report generation for conformance results.

use serde::{Deserialize, Serialize};

use crate::runner::errno_name;
use crate::verify::VerificationSummary;

/// A conformance report over one verification run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    pub title: String,
    /// Seconds since the Unix epoch when the run finished.
    pub timestamp: String,
    pub summary: VerificationSummary,
}

impl ConformanceReport {
    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Total: {}\n", self.summary.total));
        out.push_str(&format!("- Passed: {}\n", self.summary.passed));
        out.push_str(&format!("- Failed: {}\n\n", self.summary.failed));

        out.push_str("| Family | Case | Section | Errno | Status |\n");
        out.push_str("|--------|------|---------|-------|--------|\n");
        for r in &self.summary.results {
            let status = if r.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| {} | {} | {} | {} | {} |\n",
                r.family,
                r.case_name,
                r.section,
                errno_name(r.errno),
                status
            ));
        }

        for r in self.summary.failures() {
            if let Some(diff) = &r.diff {
                out.push_str(&format!("\n## {}\n\n```\n{diff}\n```\n", r.case_name));
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::VerificationResult;

    #[test]
    fn markdown_lists_cases_and_failure_diffs() {
        let failed = VerificationResult {
            case_name: "erofs".into(),
            family: "stream".into(),
            section: "errors".into(),
            passed: false,
            expected: "write:EROFS".into(),
            actual: "write:EIO".into(),
            expected_errno: 30,
            errno: 5,
            diff: Some("-write:EROFS\n+write:EIO".into()),
        };
        let report = ConformanceReport {
            title: "posix-uefi conformance".into(),
            timestamp: "0".into(),
            summary: VerificationSummary::from_results(vec![failed]),
        };
        let md = report.to_markdown();
        assert!(md.contains("| stream | erofs | errors | EIO | FAIL |"));
        assert!(md.contains("## erofs"));
        assert!(report.to_json().contains("\"failed\": 1"));
    }
}
