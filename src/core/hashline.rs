//! Hashline engine (C3): validate, deduplicate, order, and apply a batch of
//! line-addressed edits in one shot — no partial application, no disk I/O.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::core::autocorrect;
use crate::core::tag::compute_tag;
use crate::error::HashlineError;

/// A `(line, tag)` anchor reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRef {
    pub line: usize,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOperation {
    Set {
        target: LineRef,
        content: Vec<String>,
    },
    Replace {
        first: LineRef,
        last: LineRef,
        content: Vec<String>,
    },
    Append {
        after: Option<LineRef>,
        content: Vec<String>,
    },
    Prepend {
        before: Option<LineRef>,
        content: Vec<String>,
    },
    Insert {
        after: LineRef,
        before: LineRef,
        content: Vec<String>,
    },
    ReplaceText {
        old_text: String,
        new_text: String,
        #[serde(default)]
        all: bool,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplyResult {
    pub content: String,
    pub first_changed_line: Option<usize>,
    pub noop_edits: Vec<usize>,
    pub deduplicated_edits: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MismatchEntry {
    pub line: usize,
    pub expected_tag: String,
    pub actual_tag: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MismatchReport {
    pub mismatches: Vec<MismatchEntry>,
    /// `expected_ref → actual_ref`, so the caller can update all references
    /// atomically in a single retry.
    pub remapping: HashMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    Structural(HashlineError),
    Mismatch(MismatchReport),
}

impl From<HashlineError> for EditError {
    fn from(e: HashlineError) -> Self {
        EditError::Structural(e)
    }
}

fn content_hash(content: &[String]) -> String {
    let mut hasher = Sha256::new();
    for line in content {
        hasher.update(line.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

/// Precedence used for the bottom-up apply ordering: lower sorts first
/// among edits sharing the same effective line (spec.md §4.3 step 4).
fn precedence(op: &EditOperation) -> u8 {
    match op {
        EditOperation::Set { .. } | EditOperation::Replace { .. } => 0,
        EditOperation::Append { .. } => 1,
        EditOperation::Prepend { .. } => 2,
        EditOperation::Insert { .. } => 3,
        EditOperation::ReplaceText { .. } => 4,
    }
}

/// The line this edit is anchored at, for sort/dedup purposes. `EOF`/`BOF`
/// resolve against `line_count`.
fn effective_line(op: &EditOperation, line_count: usize) -> usize {
    match op {
        EditOperation::Set { target, .. } => target.line,
        EditOperation::Replace { first, .. } => first.line,
        EditOperation::Append { after: Some(r), .. } => r.line,
        EditOperation::Append { after: None, .. } => line_count + 1,
        EditOperation::Prepend { before: Some(r), .. } => r.line,
        EditOperation::Prepend { before: None, .. } => 0,
        EditOperation::Insert { before, .. } => before.line,
        EditOperation::ReplaceText { .. } => 0,
    }
}

/// A key identifying the line range an edit targets, for dedup purposes.
fn range_key(op: &EditOperation) -> (usize, usize) {
    match op {
        EditOperation::Set { target, .. } => (target.line, target.line),
        EditOperation::Replace { first, last, .. } => (first.line, last.line),
        EditOperation::Append { after: Some(r), .. } => (r.line, r.line),
        EditOperation::Append { after: None, .. } => (usize::MAX, usize::MAX),
        EditOperation::Prepend { before: Some(r), .. } => (r.line, r.line),
        EditOperation::Prepend { before: None, .. } => (0, 0),
        EditOperation::Insert { after, before, .. } => (after.line, before.line),
        EditOperation::ReplaceText { .. } => (0, 0),
    }
}

fn op_kind(op: &EditOperation) -> u8 {
    match op {
        EditOperation::Set { .. } => 0,
        EditOperation::Replace { .. } => 1,
        EditOperation::Append { .. } => 2,
        EditOperation::Prepend { .. } => 3,
        EditOperation::Insert { .. } => 4,
        EditOperation::ReplaceText { .. } => 5,
    }
}

fn content_of(op: &EditOperation) -> Option<&[String]> {
    match op {
        EditOperation::Set { content, .. }
        | EditOperation::Replace { content, .. }
        | EditOperation::Append { content, .. }
        | EditOperation::Prepend { content, .. }
        | EditOperation::Insert { content, .. } => Some(content),
        EditOperation::ReplaceText { .. } => None,
    }
}

fn check_anchor(
    lines: &[&str],
    anchor: &LineRef,
    mismatches: &mut Vec<MismatchEntry>,
    remapping: &mut HashMap<String, String>,
) -> Result<(), HashlineError> {
    if anchor.line < 1 || anchor.line > lines.len() {
        return Err(HashlineError::OutOfRange {
            line: anchor.line,
            line_count: lines.len(),
        });
    }
    let actual = compute_tag(lines[anchor.line - 1]);
    if actual != anchor.tag {
        let expected_ref = format!("{}#{}", anchor.line, anchor.tag);
        let actual_ref = format!("{}#{}", anchor.line, actual);
        remapping.insert(expected_ref, actual_ref);
        mismatches.push(MismatchEntry {
            line: anchor.line,
            expected_tag: anchor.tag.clone(),
            actual_tag: actual,
        });
    }
    Ok(())
}

/// Validate structural shape and anchors for a single edit. Structural
/// violations are immediate hard errors; tag mismatches are accumulated.
fn validate_one(
    op: &EditOperation,
    lines: &[&str],
    mismatches: &mut Vec<MismatchEntry>,
    remapping: &mut HashMap<String, String>,
) -> Result<(), HashlineError> {
    match op {
        EditOperation::Set { target, .. } => check_anchor(lines, target, mismatches, remapping),
        EditOperation::Replace { first, last, content } => {
            if first.line > last.line {
                return Err(HashlineError::InvalidRange {
                    first: first.line,
                    last: last.line,
                });
            }
            if content.is_empty() {
                return Err(HashlineError::EmptyContent { operator: "Replace" });
            }
            check_anchor(lines, first, mismatches, remapping)?;
            check_anchor(lines, last, mismatches, remapping)
        }
        EditOperation::Append { after, content } => {
            if content.is_empty() {
                return Err(HashlineError::EmptyContent { operator: "Append" });
            }
            if let Some(r) = after {
                check_anchor(lines, r, mismatches, remapping)?;
            }
            Ok(())
        }
        EditOperation::Prepend { before, content } => {
            if content.is_empty() {
                return Err(HashlineError::EmptyContent { operator: "Prepend" });
            }
            if let Some(r) = before {
                check_anchor(lines, r, mismatches, remapping)?;
            }
            Ok(())
        }
        EditOperation::Insert { after, before, content } => {
            if before.line <= after.line {
                return Err(HashlineError::InvalidInsertBounds {
                    after: after.line,
                    before: before.line,
                });
            }
            if content.is_empty() {
                return Err(HashlineError::EmptyContent { operator: "Insert" });
            }
            check_anchor(lines, after, mismatches, remapping)?;
            check_anchor(lines, before, mismatches, remapping)
        }
        EditOperation::ReplaceText { old_text, .. } => {
            if old_text.is_empty() {
                return Err(HashlineError::MissingOldText);
            }
            Ok(())
        }
    }
}

/// Apply a batch of edits to `content` in one shot.
pub fn apply_edits(content: &str, edits: Vec<EditOperation>) -> Result<ApplyResult, EditError> {
    if edits.is_empty() {
        return Ok(ApplyResult {
            content: content.to_string(),
            first_changed_line: None,
            noop_edits: Vec::new(),
            deduplicated_edits: Vec::new(),
        });
    }

    let original_lines: Vec<&str> = content.split('\n').collect();

    // Step 2: validate, accumulating mismatches, failing fast on structural errors.
    let mut mismatches = Vec::new();
    let mut remapping = HashMap::new();
    for op in &edits {
        validate_one(op, &original_lines, &mut mismatches, &mut remapping)?;
    }
    if !mismatches.is_empty() {
        return Err(EditError::Mismatch(MismatchReport { mismatches, remapping }));
    }

    // Step 3: deduplicate.
    let mut seen: HashMap<(u8, usize, usize, String), usize> = HashMap::new();
    let mut deduplicated_edits = Vec::new();
    let mut kept: Vec<(usize, EditOperation)> = Vec::new();
    for (idx, op) in edits.into_iter().enumerate() {
        let hash = content_of(&op).map(content_hash).unwrap_or_default();
        let key = (op_kind(&op), range_key(&op).0, range_key(&op).1, hash);
        if let Some(_first_idx) = seen.get(&key) {
            deduplicated_edits.push(idx);
            continue;
        }
        seen.insert(key, idx);
        kept.push((idx, op));
    }

    // Step 4: sort descending by effective line, precedence, then original index.
    let line_count = original_lines.len();
    kept.sort_by(|(ia, a), (ib, b)| {
        effective_line(b, line_count)
            .cmp(&effective_line(a, line_count))
            .then(precedence(a).cmp(&precedence(b)))
            .then(ia.cmp(ib))
    });

    // Step 5: touched-line set for merge detection.
    let touched_lines: HashSet<usize> = kept
        .iter()
        .map(|(_, op)| effective_line(op, line_count))
        .filter(|l| *l >= 1 && *l <= line_count)
        .collect();

    // Step 6/7: apply each edit bottom-up.
    let mut lines: Vec<String> = original_lines.iter().map(|s| s.to_string()).collect();
    let mut first_changed_line: Option<usize> = None;
    let mut noop_edits = Vec::new();

    let record_change = |first_changed_line: &mut Option<usize>, line: usize| {
        *first_changed_line = Some(first_changed_line.map_or(line, |cur| cur.min(line)));
    };

    let mut replace_text_ops: Vec<(usize, String, String, bool)> = Vec::new();

    for (idx, op) in &kept {
        match op {
            EditOperation::Set { target, content } => {
                let orig = &original_lines[target.line - 1];
                if content.len() == 1 && *orig == content[0] {
                    noop_edits.push(*idx);
                    continue;
                }
                if content.len() == 1 {
                    if let Some((start, span, replacement)) =
                        autocorrect::maybe_expand_single_line_merge(
                            target.line,
                            &content[0],
                            &original_lines,
                            &touched_lines,
                        )
                    {
                        lines.splice(start - 1..start - 1 + span, replacement);
                        record_change(&mut first_changed_line, start);
                        continue;
                    }
                }
                lines.splice(target.line - 1..target.line, content.clone());
                record_change(&mut first_changed_line, target.line);
            }
            EditOperation::Replace { first, last, content } => {
                let orig_range: Vec<String> =
                    original_lines[first.line - 1..last.line].iter().map(|s| s.to_string()).collect();
                if orig_range == *content {
                    noop_edits.push(*idx);
                    continue;
                }
                let restored = autocorrect::strip_range_boundary_echo(
                    &original_lines,
                    first.line,
                    last.line,
                    content,
                );
                let restored = autocorrect::restore_old_wrapped_lines(&original_lines, &restored);
                let restored = autocorrect::restore_indent_for_paired_replacement(
                    &original_lines[first.line - 1..last.line],
                    &restored,
                );
                lines.splice(first.line - 1..last.line, restored);
                record_change(&mut first_changed_line, first.line);
            }
            EditOperation::Append { after, content } => {
                let anchor_line = match after {
                    Some(r) => {
                        let stripped = autocorrect::strip_insert_anchor_echo(
                            Some(&original_lines[r.line - 1]),
                            content,
                            false,
                        );
                        lines.splice(r.line..r.line, stripped);
                        r.line + 1
                    }
                    None => {
                        if lines.len() == 1 && lines[0].is_empty() {
                            lines.clear();
                        }
                        let at = lines.len();
                        lines.splice(at..at, content.clone());
                        at + 1
                    }
                };
                record_change(&mut first_changed_line, anchor_line);
            }
            EditOperation::Prepend { before, content } => {
                let anchor_line = match before {
                    Some(r) => {
                        let stripped = autocorrect::strip_insert_anchor_echo(
                            Some(&original_lines[r.line - 1]),
                            content,
                            true,
                        );
                        lines.splice(r.line - 1..r.line - 1, stripped);
                        r.line
                    }
                    None => {
                        lines.splice(0..0, content.clone());
                        1
                    }
                };
                record_change(&mut first_changed_line, anchor_line);
            }
            EditOperation::Insert { after, before, content } => {
                let mut stripped = autocorrect::strip_insert_anchor_echo(
                    Some(&original_lines[after.line - 1]),
                    content,
                    false,
                );
                stripped = autocorrect::strip_insert_anchor_echo(
                    Some(&original_lines[before.line - 1]),
                    &stripped,
                    true,
                );
                lines.splice(before.line - 1..before.line - 1, stripped);
                record_change(&mut first_changed_line, before.line);
            }
            EditOperation::ReplaceText { old_text, new_text, all } => {
                replace_text_ops.push((*idx, old_text.clone(), new_text.clone(), *all));
            }
        }
    }

    let mut result_content = lines.join("\n");

    // ReplaceText runs last, against the fully spliced content, in original
    // submission order.
    replace_text_ops.sort_by_key(|(idx, ..)| *idx);
    for (idx, old_text, new_text, all) in replace_text_ops {
        let before = result_content.clone();
        result_content = if all {
            result_content.replace(&old_text, &new_text)
        } else {
            result_content.replacen(&old_text, &new_text, 1)
        };
        if result_content == before {
            noop_edits.push(idx);
        } else {
            let line = crate::core::diff::first_changed_line(&before, &result_content);
            record_change(&mut first_changed_line, line);
        }
    }

    Ok(ApplyResult {
        content: result_content,
        first_changed_line,
        noop_edits,
        deduplicated_edits,
    })
}

/// External interface #2/#3 building block: format lines as `N#TT:LINE`.
pub fn format_hashlines(content: &str, start_line: usize) -> String {
    content
        .split('\n')
        .enumerate()
        .map(|(i, line)| crate::core::tag::format_display(start_line + i, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// External interface #10: user-facing mismatch report.
pub fn format_mismatch_message(report: &MismatchReport, file_lines: &[&str]) -> String {
    let mut sorted = report.mismatches.clone();
    sorted.sort_by_key(|m| m.line);

    let mut out = String::new();
    let mut prev_end: Option<usize> = None;
    for m in &sorted {
        let start = m.line.saturating_sub(3).max(1);
        let end = (m.line + 2).min(file_lines.len());
        if let Some(prev) = prev_end {
            if start > prev + 1 {
                out.push_str("    ...\n");
            }
        }
        for ln in start..=end {
            let marker = if ln == m.line { ">>> " } else { "    " };
            let text = file_lines.get(ln - 1).copied().unwrap_or("");
            if ln == m.line {
                out.push_str(&format!(
                    "{}{}#{}:{} (correct)\n",
                    marker,
                    ln,
                    compute_tag(text),
                    text
                ));
            } else {
                out.push_str(&format!("{}{}#{}:{}\n", marker, ln, compute_tag(text), text));
            }
        }
        prev_end = Some(end);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tag::compute_tag;

    fn tag_for(content: &str, line: usize) -> String {
        compute_tag(content.split('\n').nth(line - 1).unwrap())
    }

    #[test]
    fn empty_edits_is_identity() {
        let content = "a\nb\nc";
        let result = apply_edits(content, vec![]).unwrap();
        assert_eq!(result.content, content);
        assert_eq!(result.first_changed_line, None);
        assert!(result.noop_edits.is_empty());
        assert!(result.deduplicated_edits.is_empty());
    }

    #[test]
    fn set_replaces_single_line() {
        let content = "a\nb\nc";
        let edits = vec![EditOperation::Set {
            target: LineRef { line: 2, tag: tag_for(content, 2) },
            content: vec!["B".to_string()],
        }];
        let result = apply_edits(content, edits).unwrap();
        assert_eq!(result.content, "a\nB\nc");
        assert_eq!(result.first_changed_line, Some(2));
    }

    #[test]
    fn tag_mismatch_rejects_whole_batch() {
        let content = "alpha\nbeta\ngamma";
        let edits = vec![
            EditOperation::Set {
                target: LineRef { line: 1, tag: tag_for(content, 1) },
                content: vec!["ALPHA".to_string()],
            },
            EditOperation::Set {
                target: LineRef { line: 2, tag: "ZZ".to_string() },
                content: vec!["BETA".to_string()],
            },
        ];
        match apply_edits(content, edits) {
            Err(EditError::Mismatch(report)) => {
                assert_eq!(report.mismatches.len(), 1);
                assert_eq!(report.mismatches[0].line, 2);
            }
            other => panic!("expected mismatch, got {:?}", other),
        }
    }

    #[test]
    fn bottom_up_ordering_keeps_references_valid() {
        let content: String = (1..=10).map(|n| format!("line{n}")).collect::<Vec<_>>().join("\n");
        let edits = vec![
            EditOperation::Set {
                target: LineRef { line: 8, tag: tag_for(&content, 8) },
                content: vec!["CHANGED8".to_string()],
            },
            EditOperation::Append {
                after: Some(LineRef { line: 3, tag: tag_for(&content, 3) }),
                content: vec!["new".to_string()],
            },
        ];
        let result = apply_edits(&content, edits).unwrap();
        let lines: Vec<&str> = result.content.split('\n').collect();
        assert_eq!(lines.len(), 11);
        assert!(lines.contains(&"CHANGED8"));
        assert_eq!(lines[3], "new");
    }

    #[test]
    fn noop_set_is_reported_not_errored() {
        let content = "a\nb\nc";
        let edits = vec![EditOperation::Set {
            target: LineRef { line: 2, tag: tag_for(content, 2) },
            content: vec!["b".to_string()],
        }];
        let result = apply_edits(content, edits).unwrap();
        assert_eq!(result.content, content);
        assert_eq!(result.noop_edits, vec![0]);
    }

    #[test]
    fn deduplicates_identical_edits() {
        let content = "a\nb\nc";
        let edits = vec![
            EditOperation::Set {
                target: LineRef { line: 2, tag: tag_for(content, 2) },
                content: vec!["B".to_string()],
            },
            EditOperation::Set {
                target: LineRef { line: 2, tag: tag_for(content, 2) },
                content: vec!["B".to_string()],
            },
        ];
        let result = apply_edits(content, edits).unwrap();
        assert_eq!(result.content, "a\nB\nc");
        assert_eq!(result.deduplicated_edits, vec![1]);
    }

    #[test]
    fn append_at_eof_on_empty_file() {
        let content = "";
        let edits = vec![EditOperation::Append { after: None, content: vec!["first".to_string()] }];
        let result = apply_edits(content, edits).unwrap();
        assert_eq!(result.content, "first");
    }

    #[test]
    fn merge_detection_collapses_two_lines() {
        let content = "let x =\n  getValue()\nreturn x";
        let edits = vec![EditOperation::Set {
            target: LineRef { line: 2, tag: tag_for(content, 2) },
            content: vec!["let x = getValue()".to_string()],
        }];
        let result = apply_edits(content, edits).unwrap();
        assert_eq!(result.content, "let x = getValue()\nreturn x");
    }

    #[test]
    fn replace_text_first_occurrence_only() {
        let content = "foo bar foo";
        let edits = vec![EditOperation::ReplaceText {
            old_text: "foo".to_string(),
            new_text: "baz".to_string(),
            all: false,
        }];
        let result = apply_edits(content, edits).unwrap();
        assert_eq!(result.content, "baz bar foo");
    }

    #[test]
    fn out_of_range_is_structural_error() {
        let content = "a\nb";
        let edits = vec![EditOperation::Set {
            target: LineRef { line: 5, tag: "ZZ".to_string() },
            content: vec!["x".to_string()],
        }];
        assert!(matches!(
            apply_edits(content, edits),
            Err(EditError::Structural(HashlineError::OutOfRange { line: 5, line_count: 2 }))
        ));
    }
}
