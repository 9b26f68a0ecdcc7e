//! Line-based unified diff.
//!
//! Small LCS differ for snapshot-sized texts. Emits classic unified-diff
//! hunks (`---`/`+++` labels, `@@` headers, three lines of context) and
//! returns an empty string when the inputs split into identical line
//! sequences, so callers can substitute a no-change marker.

use std::fmt::Write as _;

/// Context lines kept on either side of a change.
const CONTEXT: usize = 3;

#[derive(Debug, Clone, Copy)]
struct Opcode {
    equal: bool,
    a1: usize,
    a2: usize,
    b1: usize,
    b2: usize,
}

/// Unified diff of `a` -> `b`, labeled `from_label`/`to_label`.
///
/// Empty result means the inputs are line-identical.
#[must_use]
pub fn unified_diff(a: &str, b: &str, from_label: &str, to_label: &str) -> String {
    let a_lines: Vec<&str> = a.lines().collect();
    let b_lines: Vec<&str> = b.lines().collect();

    let codes = opcodes(&a_lines, &b_lines);
    if codes.iter().all(|op| op.equal) {
        return String::new();
    }

    let mut out = String::new();
    let _ = writeln!(out, "--- {from_label}");
    let _ = writeln!(out, "+++ {to_label}");

    for group in grouped(codes) {
        let first = group[0];
        let last = group[group.len() - 1];
        let _ = writeln!(
            out,
            "@@ -{} +{} @@",
            format_range(first.a1, last.a2),
            format_range(first.b1, last.b2),
        );
        for op in &group {
            if op.equal {
                for line in &a_lines[op.a1..op.a2] {
                    let _ = writeln!(out, " {line}");
                }
            } else {
                for line in &a_lines[op.a1..op.a2] {
                    let _ = writeln!(out, "-{line}");
                }
                for line in &b_lines[op.b1..op.b2] {
                    let _ = writeln!(out, "+{line}");
                }
            }
        }
    }
    out
}

/// Merge per-line LCS steps into equal/changed ranges.
fn opcodes(a: &[&str], b: &[&str]) -> Vec<Opcode> {
    let n = a.len();
    let m = b.len();

    // dp[i][j] = LCS length of a[i..] and b[j..].
    let mut dp = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if a[i] == b[j] {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }

    let mut codes: Vec<Opcode> = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && a[i] == b[j] {
            let (a1, b1) = (i, j);
            while i < n && j < m && a[i] == b[j] {
                i += 1;
                j += 1;
            }
            codes.push(Opcode { equal: true, a1, a2: i, b1, b2: j });
        } else {
            let (a1, b1) = (i, j);
            while i < n || j < m {
                if i < n && j < m && a[i] == b[j] {
                    break;
                }
                if j >= m || (i < n && dp[i + 1][j] >= dp[i][j + 1]) {
                    i += 1;
                } else {
                    j += 1;
                }
            }
            codes.push(Opcode { equal: false, a1, a2: i, b1, b2: j });
        }
    }
    codes
}

/// Group opcodes into hunks, trimming equal runs to [`CONTEXT`] lines.
fn grouped(mut codes: Vec<Opcode>) -> Vec<Vec<Opcode>> {
    if codes.is_empty() {
        return Vec::new();
    }

    // Clamp leading and trailing context.
    if let Some(first) = codes.first_mut() {
        if first.equal {
            first.a1 = first.a1.max(first.a2.saturating_sub(CONTEXT));
            first.b1 = first.b1.max(first.b2.saturating_sub(CONTEXT));
        }
    }
    if let Some(last) = codes.last_mut() {
        if last.equal {
            last.a2 = last.a2.min(last.a1 + CONTEXT);
            last.b2 = last.b2.min(last.b1 + CONTEXT);
        }
    }

    let mut groups: Vec<Vec<Opcode>> = Vec::new();
    let mut group: Vec<Opcode> = Vec::new();
    for mut code in codes {
        // A long equal run ends the current hunk and starts the next.
        if code.equal && code.a2 - code.a1 > 2 * CONTEXT {
            group.push(Opcode {
                equal: true,
                a1: code.a1,
                a2: (code.a1 + CONTEXT).min(code.a2),
                b1: code.b1,
                b2: (code.b1 + CONTEXT).min(code.b2),
            });
            groups.push(std::mem::take(&mut group));
            code.a1 = code.a1.max(code.a2.saturating_sub(CONTEXT));
            code.b1 = code.b1.max(code.b2.saturating_sub(CONTEXT));
        }
        group.push(code);
    }
    if !(group.is_empty() || (group.len() == 1 && group[0].equal)) {
        groups.push(group);
    }
    groups
}

/// Render one side of a hunk header: `start,length` with the single-line
/// and empty-range special cases.
fn format_range(start: usize, stop: usize) -> String {
    let length = stop - start;
    if length == 1 {
        return (start + 1).to_string();
    }
    let beginning = if length == 0 { start } else { start + 1 };
    format!("{beginning},{length}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_inputs_yield_empty_diff() {
        let text = "a\nb\nc\n";
        assert_eq!(unified_diff(text, text, "then", "now"), "");
    }

    #[test]
    fn test_both_empty_yield_empty_diff() {
        assert_eq!(unified_diff("", "", "then", "now"), "");
    }

    #[test]
    fn test_single_line_replace() {
        let got = unified_diff("a\nb\nc\n", "a\nx\nc\n", "then", "now");
        let want = "--- then\n\
                    +++ now\n\
                    @@ -1,3 +1,3 @@\n \
                    a\n\
                    -b\n\
                    +x\n \
                    c\n";
        assert_eq!(got, want);
    }

    #[test]
    fn test_append_line() {
        let got = unified_diff("1\n2\n", "1\n2\n3\n", "then", "now");
        let want = "--- then\n\
                    +++ now\n\
                    @@ -1,2 +1,3 @@\n \
                    1\n \
                    2\n\
                    +3\n";
        assert_eq!(got, want);
    }

    #[test]
    fn test_delete_line() {
        let got = unified_diff("1\n2\n3\n", "1\n3\n", "then", "now");
        assert!(got.contains("-2\n"));
        assert!(!got.contains("+2\n"));
    }

    #[test]
    fn test_distant_changes_split_into_two_hunks() {
        let a: Vec<String> = (1..=20).map(|i| format!("line {i}")).collect();
        let mut b = a.clone();
        b[0] = "changed first".into();
        b[19] = "changed last".into();
        let a = a.join("\n");
        let b = b.join("\n");

        let got = unified_diff(&a, &b, "then", "now");
        assert!(got.contains("@@ -1,4 +1,4 @@"), "unexpected diff:\n{got}");
        assert!(got.contains("@@ -17,4 +17,4 @@"), "unexpected diff:\n{got}");
        assert!(got.contains("-line 1\n"));
        assert!(got.contains("+changed first\n"));
        assert!(got.contains("-line 20\n"));
        assert!(got.contains("+changed last\n"));
    }

    #[test]
    fn test_labels_appear_in_headers() {
        let got = unified_diff("a\n", "b\n", "before", "after");
        assert!(got.starts_with("--- before\n+++ after\n"));
    }

    #[test]
    fn test_insert_into_empty() {
        let got = unified_diff("", "only\n", "then", "now");
        assert!(got.contains("@@ -0,0 +1 @@"), "unexpected diff:\n{got}");
        assert!(got.contains("+only\n"));
    }
}
