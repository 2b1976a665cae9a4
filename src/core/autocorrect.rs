//! Autocorrect heuristics (C4): repair common LLM edit artifacts in
//! replacement content before it is spliced into the file. Every heuristic
//! reduces, never grows, the set of mutated lines, and none of them touch
//! anchor targets — only replacement content.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// Slack, in characters, allowed when a merged line absorbs a neighbor
/// (spec.md §4.4 heuristic 1, §9 "open question — merge-detection
/// thresholds"). Kept as a named, testable constant rather than inlined.
pub const MERGE_SLACK: usize = 32;

/// Minimum canonical (whitespace-stripped) length for a wrapped-line
/// candidate run to be considered (spec.md §4.4 heuristic 3).
pub const MIN_WRAP_CANON_LEN: usize = 6;

fn strip_all_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn leading_whitespace(s: &str) -> &str {
    let end = s.len() - s.trim_start().len();
    &s[..end]
}

fn equals_ignoring_whitespace(a: &str, b: &str) -> bool {
    a == b || strip_all_whitespace(a) == strip_all_whitespace(b)
}

static TRAILING_CONTINUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:&&|\|\||\?\?|\?|:|=|,|\+|-|\*|/|\.|\()\s*$").unwrap());

fn strip_trailing_continuation_tokens(s: &str) -> String {
    TRAILING_CONTINUATION_RE.replace(s, "").to_string()
}

fn strip_merge_operator_chars(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '|' | '&' | '?')).collect()
}

/// Heuristic 1: merge detection for a single-line `Set` replacement.
/// Returns `Some((start_line, span, content))` if the replacement should be
/// widened into a two-line splice.
pub fn maybe_expand_single_line_merge(
    line: usize,
    new_line: &str,
    file_lines: &[&str],
    touched_lines: &HashSet<usize>,
) -> Option<(usize, usize, Vec<String>)> {
    if line < 1 || line > file_lines.len() {
        return None;
    }

    let new_canon = strip_all_whitespace(new_line);
    if new_canon.is_empty() {
        return None;
    }
    let new_canon_for_ops = strip_merge_operator_chars(&new_canon);

    let orig = file_lines[line - 1];
    let orig_canon = strip_all_whitespace(orig);
    if orig_canon.is_empty() {
        return None;
    }
    let orig_canon_for_match = strip_trailing_continuation_tokens(&orig_canon);
    let orig_canon_for_ops = strip_merge_operator_chars(&orig_canon);
    let orig_is_continuation = orig_canon_for_match.len() < orig_canon.len();

    // Case A: absorbed the next line.
    if orig_is_continuation && line < file_lines.len() && !touched_lines.contains(&(line + 1)) {
        let next_canon = strip_all_whitespace(file_lines[line]);
        if let (Some(a), Some(b)) = (
            new_canon.find(orig_canon_for_match.as_str()),
            new_canon.find(next_canon.as_str()),
        ) {
            if a < b && new_canon.len() <= orig_canon.len() + next_canon.len() + MERGE_SLACK {
                return Some((line, 2, vec![new_line.to_string()]));
            }
        }
    }

    // Case B: absorbed the previous line.
    if line >= 2 && !touched_lines.contains(&(line - 1)) {
        let prev = file_lines[line - 2];
        let prev_canon = strip_all_whitespace(prev);
        let prev_canon_for_match = strip_trailing_continuation_tokens(&prev_canon);
        let prev_is_continuation = prev_canon_for_match.len() < prev_canon.len();
        if prev_is_continuation {
            let a = new_canon_for_ops.find(strip_merge_operator_chars(&prev_canon_for_match).as_str());
            let b = new_canon_for_ops.find(orig_canon_for_ops.as_str());
            if let (Some(a), Some(b)) = (a, b) {
                if a < b && new_canon.len() <= prev_canon.len() + orig_canon.len() + MERGE_SLACK {
                    return Some((line - 1, 2, vec![new_line.to_string()]));
                }
            }
        }
    }

    None
}

/// Heuristic 2: range-boundary echo stripping for `Replace`.
pub fn strip_range_boundary_echo(
    file_lines: &[&str],
    start_line: usize,
    end_line: usize,
    dst_lines: &[String],
) -> Vec<String> {
    let count = end_line - start_line + 1;
    if dst_lines.len() <= 1 || dst_lines.len() <= count {
        return dst_lines.to_vec();
    }

    let mut out = dst_lines.to_vec();
    if start_line >= 2 {
        let before_idx = start_line - 2;
        if equals_ignoring_whitespace(&out[0], file_lines[before_idx]) {
            out.remove(0);
        }
    }
    let after_idx = end_line;
    if after_idx < file_lines.len()
        && !out.is_empty()
        && equals_ignoring_whitespace(out.last().unwrap(), file_lines[after_idx])
    {
        out.pop();
    }
    out
}

/// Heuristic 3: wrapped-line restoration. Scans back-to-front for runs of
/// 2–10 lines whose concatenated canonical form uniquely matches exactly one
/// originally present line, and collapses the run back to that line.
pub fn restore_old_wrapped_lines(old_lines: &[&str], new_lines: &[String]) -> Vec<String> {
    if old_lines.is_empty() || new_lines.len() < 2 {
        return new_lines.to_vec();
    }

    let mut canon_to_old: HashMap<String, (String, usize)> = HashMap::new();
    for line in old_lines {
        let canon = strip_all_whitespace(line);
        let entry = canon_to_old.entry(canon).or_insert_with(|| (line.to_string(), 0));
        entry.1 += 1;
    }

    struct Candidate {
        start: usize,
        len: usize,
        replacement: String,
        canon: String,
    }

    let mut candidates = Vec::new();
    for start in 0..new_lines.len() {
        for len in 2..=10.min(new_lines.len() - start) {
            let joined: String = new_lines[start..start + len].concat();
            let canon_span = strip_all_whitespace(&joined);
            if let Some((old_line, count)) = canon_to_old.get(&canon_span) {
                if *count == 1 && canon_span.len() >= MIN_WRAP_CANON_LEN {
                    candidates.push(Candidate {
                        start,
                        len,
                        replacement: old_line.clone(),
                        canon: canon_span,
                    });
                }
            }
        }
    }
    if candidates.is_empty() {
        return new_lines.to_vec();
    }

    let mut canon_counts: HashMap<String, usize> = HashMap::new();
    for c in &candidates {
        *canon_counts.entry(c.canon.clone()).or_insert(0) += 1;
    }
    let mut unique: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| canon_counts.get(&c.canon).copied().unwrap_or(0) == 1)
        .collect();
    if unique.is_empty() {
        return new_lines.to_vec();
    }
    unique.sort_by(|a, b| b.start.cmp(&a.start));

    let mut out: Vec<String> = new_lines.to_vec();
    for c in unique {
        out.splice(c.start..c.start + c.len, std::iter::once(c.replacement.clone()));
    }
    out
}

/// Heuristic 4: indent restoration for a paired (same line-count)
/// replacement.
pub fn restore_indent_for_paired_replacement(old_lines: &[&str], new_lines: &[String]) -> Vec<String> {
    if old_lines.len() != new_lines.len() {
        return new_lines.to_vec();
    }
    let mut changed = false;
    let mut out = Vec::with_capacity(new_lines.len());
    for (old, new) in old_lines.iter().zip(new_lines.iter()) {
        let restored = restore_leading_indent(old, new);
        if &restored != new {
            changed = true;
        }
        out.push(restored);
    }
    if changed {
        out
    } else {
        new_lines.to_vec()
    }
}

fn restore_leading_indent(template_line: &str, line: &str) -> String {
    if line.is_empty() {
        return line.to_string();
    }
    let template_indent = leading_whitespace(template_line);
    if template_indent.is_empty() {
        return line.to_string();
    }
    if !leading_whitespace(line).is_empty() {
        return line.to_string();
    }
    format!("{}{}", template_indent, line)
}

/// Heuristic 5: anchor-echo stripping for `Append`/`Prepend`/`Insert`. Drops
/// the first/last line of `dst_lines` if it echoes the given anchor line,
/// whitespace-insensitively.
pub fn strip_insert_anchor_echo(anchor_line: Option<&str>, dst_lines: &[String], strip_last: bool) -> Vec<String> {
    if dst_lines.len() <= 1 {
        return dst_lines.to_vec();
    }
    let mut out = dst_lines.to_vec();
    if let Some(anchor) = anchor_line {
        if !strip_last && equals_ignoring_whitespace(&out[0], anchor) {
            out.remove(0);
        } else if strip_last && equals_ignoring_whitespace(out.last().unwrap(), anchor) {
            out.pop();
        }
    }
    out
}
