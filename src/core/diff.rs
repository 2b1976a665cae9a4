//! LCS diff renderer (C5): hunked, context-bounded line diffs.

const DEFAULT_CONTEXT_LINES: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Op {
    Equal(usize, usize),
    Delete(usize),
    Insert(usize),
}

/// Suffix LCS table: `dp[i][j]` is the LCS length of `old[i..]` and `new[j..]`.
fn lcs_table(old: &[&str], new: &[&str]) -> Vec<Vec<u32>> {
    let (n, m) = (old.len(), new.len());
    let mut dp = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            dp[i][j] = if old[i] == new[j] {
                dp[i + 1][j + 1] + 1
            } else {
                dp[i + 1][j].max(dp[i][j + 1])
            };
        }
    }
    dp
}

/// Backtrack the LCS table into an ordered sequence of equal/delete/insert
/// operations, preferring `same` moves and, on ties, the branch with the
/// larger remaining LCS value (here: prefer deleting before inserting).
fn backtrack(old: &[&str], new: &[&str]) -> Vec<Op> {
    let dp = lcs_table(old, new);
    let (n, m) = (old.len(), new.len());
    let mut ops = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n || j < m {
        if i < n && j < m && old[i] == new[j] {
            ops.push(Op::Equal(i, j));
            i += 1;
            j += 1;
        } else if j >= m || (i < n && dp[i + 1][j] >= dp[i][j + 1]) {
            ops.push(Op::Delete(i));
            i += 1;
        } else {
            ops.push(Op::Insert(j));
            j += 1;
        }
    }
    ops
}

/// Generate a hunked, context-bounded diff between `old` and `new`.
/// Lines are tagged with their 1-based line number on the *source side*
/// for that operation (old-side for ` `/`-`, new-side for `+`).
pub fn generate_diff(old: &str, new: &str, context_lines: usize) -> String {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    let ops = backtrack(&old_lines, &new_lines);

    let change_indices: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Equal(..)))
        .map(|(idx, _)| idx)
        .collect();

    if change_indices.is_empty() {
        return "(no changes)".to_string();
    }

    let ranges = context_ranges(&change_indices, ops.len(), context_lines);

    let mut out = String::new();
    for (hunk_idx, (start, end)) in ranges.iter().enumerate() {
        if hunk_idx > 0 {
            out.push_str("\n...\n");
        }
        for op in &ops[*start..*end] {
            let (sign, line_no, text) = match op {
                Op::Equal(i, _) => (' ', i + 1, old_lines[*i]),
                Op::Delete(i) => ('-', i + 1, old_lines[*i]),
                Op::Insert(j) => ('+', j + 1, new_lines[*j]),
            };
            out.push_str(&format!("{}{}\t{}\n", sign, line_no, text));
        }
    }
    // Drop the final trailing newline so hunks are joined cleanly by "\n...\n".
    if out.ends_with('\n') {
        out.pop();
    }
    out
}

/// Union change indices with `±context_lines` neighbors, then merge into
/// contiguous `[start, end)` ranges over the op list.
fn context_ranges(
    change_indices: &[usize],
    op_count: usize,
    context_lines: usize,
) -> Vec<(usize, usize)> {
    let mut ranges: Vec<(usize, usize)> = change_indices
        .iter()
        .map(|&c| {
            let start = c.saturating_sub(context_lines);
            let end = (c + context_lines + 1).min(op_count);
            (start, end)
        })
        .collect();

    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::new();
    for (start, end) in ranges.drain(..) {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

/// The first 1-based line number where `old` and `new` differ when zipped
/// line-by-line; if one is a strict prefix of the other, ties break to
/// `min(len, len) + 1`.
pub fn first_changed_line(old: &str, new: &str) -> usize {
    let old_lines: Vec<&str> = old.split('\n').collect();
    let new_lines: Vec<&str> = new.split('\n').collect();
    for (i, (a, b)) in old_lines.iter().zip(new_lines.iter()).enumerate() {
        if a != b {
            return i + 1;
        }
    }
    old_lines.len().min(new_lines.len()) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_changes_literal() {
        assert_eq!(generate_diff("a\nb\nc", "a\nb\nc", 4), "(no changes)");
    }

    #[test]
    fn single_line_replace() {
        let diff = generate_diff("a\nb\nc", "a\nB\nc", 4);
        assert!(diff.contains("-2\tb"));
        assert!(diff.contains("+2\tB"));
    }

    #[test]
    fn two_hunks_separated_by_ellipsis() {
        let old_lines: Vec<String> = (1..=20).map(|n| format!("line{n}")).collect();
        let mut new_lines = old_lines.clone();
        new_lines[2] = "CHANGED3".to_string();
        new_lines[16] = "CHANGED17".to_string();
        let old = old_lines.join("\n");
        let new = new_lines.join("\n");

        let diff = generate_diff(&old, &new, 2);
        assert_eq!(diff.matches("\n...\n").count(), 1);
    }

    #[test]
    fn first_changed_line_basic() {
        assert_eq!(first_changed_line("a\nb\nc", "a\nB\nc"), 2);
    }

    #[test]
    fn first_changed_line_length_mismatch() {
        assert_eq!(first_changed_line("a\nb", "a\nb\nc"), 3);
    }

    #[test]
    fn diff_inverse_marks_exact_positions() {
        let old = "a\nb\nc\nd";
        let new = "a\nB\nc\nD";
        let diff = generate_diff(old, new, 4);
        assert!(diff.contains("-2\tb"));
        assert!(diff.contains("+2\tB"));
        assert!(diff.contains("-4\td"));
        assert!(diff.contains("+4\tD"));
        assert!(!diff.contains("-1\t"));
        assert!(!diff.contains("-3\t"));
    }
}
