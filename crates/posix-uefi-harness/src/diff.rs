//! Diff rendering for fixture comparison.

/// Render a line diff between expected and actual output.
///
/// Transcripts are `;`-separated, so each step gets its own line.
#[must_use]
pub fn render_diff(expected: &str, actual: &str) -> String {
    if expected == actual {
        return String::from("[identical]");
    }

    let expected: Vec<&str> = expected.split(';').collect();
    let actual: Vec<&str> = actual.split(';').collect();
    let mut out = String::new();
    out.push_str("--- expected\n");
    out.push_str("+++ actual\n");
    for i in 0..expected.len().max(actual.len()) {
        let e = expected.get(i).copied();
        let a = actual.get(i).copied();
        if e != a {
            out.push_str(&format!("@@ step {} @@\n", i + 1));
            if let Some(e) = e {
                out.push_str(&format!("-{e}\n"));
            }
            if let Some(a) = a {
                out.push_str(&format!("+{a}\n"));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs() {
        assert_eq!(render_diff("a;b", "a;b"), "[identical]");
    }

    #[test]
    fn reports_changed_and_missing_steps() {
        let diff = render_diff("open:ok;read:hi", "open:ok;read:ho;close:ok");
        assert!(diff.contains("@@ step 2 @@\n-read:hi\n+read:ho\n"));
        assert!(diff.contains("@@ step 3 @@\n+close:ok\n"));
        assert!(!diff.contains("step 1"));
    }
}
