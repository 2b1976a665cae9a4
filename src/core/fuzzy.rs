//! Fuzzy text locator (C2): progressive-tolerance search over file content.

use unicode_normalization::UnicodeNormalization;

/// Default confidence bar above which a fuzzy match is trusted without
/// disambiguation.
pub const DEFAULT_THRESHOLD: f64 = 0.95;

/// Minimum normalized length and substring/line-length ratio for the
/// substring-after-normalize pass in [`seek_line_sequence`].
const MIN_SUBSTRING_LEN: usize = 6;
const MIN_SUBSTRING_RATIO: f64 = 0.3;

#[derive(Debug, Clone, Copy)]
pub struct FuzzyOptions {
    pub threshold: f64,
    /// Search from the end of the file backward, so appended content wins.
    pub eof: bool,
}

impl Default for FuzzyOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            eof: false,
        }
    }
}

/// A concrete region of the original content chosen as the best match.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub actual_text: String,
    pub start_byte: usize,
    pub start_line: usize,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Unique(FuzzyMatch),
    Closest(FuzzyMatch, usize),
    MultipleOccurrences {
        count: usize,
        line_numbers: Vec<usize>,
        previews: Vec<String>,
    },
    Dominant(FuzzyMatch, usize),
    NoMatch,
}

// ─── Normalization ──────────────────────────────────────────────────────────

/// unicode-fold (smart quotes/dashes → ASCII) → lowercase → NFD → drop
/// non-ASCII → collapse whitespace runs → trim.
pub fn normalize_for_fuzzy(text: &str) -> String {
    let folded = normalize_unicode(text);
    let lowered = folded.to_lowercase();
    let decomposed: String = lowered.nfd().collect();
    let ascii_only: String = decomposed.chars().filter(|c| c.is_ascii()).collect();
    let mut out = String::with_capacity(ascii_only.len());
    let mut last_was_space = false;
    for c in ascii_only.chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(c);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

/// Substitute smart quotes and unicode dashes with their ASCII equivalents,
/// preserving case (unlike [`normalize_for_fuzzy`]).
pub fn normalize_unicode(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' | '\u{2036}' => '"',
            '\u{2013}' | '\u{2014}' | '\u{2015}' | '\u{2212}' => '-',
            other => other,
        })
        .collect()
}

// ─── Levenshtein ────────────────────────────────────────────────────────────

fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0usize; b.len() + 1];
    for i in 0..a.len() {
        curr[0] = i + 1;
        for j in 0..b.len() {
            let cost = if a[i] == b[j] { 0 } else { 1 };
            curr[j + 1] = (prev[j] + cost).min(curr[j] + 1).min(prev[j + 1] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// `1 − dist / max(|a|, |b|)`, clamped to `[0, 1]`; `similarity("", "") = 1`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(a, b) as f64 / max_len as f64
}

// ─── Indent depth prefix ────────────────────────────────────────────────────

fn leading_indent_width(line: &str) -> usize {
    line.chars().take_while(|c| *c == ' ' || *c == '\t').count()
}

/// Prefix each normalized line with its indent depth relative to the
/// window's minimum indent, in units of the window's smallest positive
/// indent step, so structurally indented code aligns even under block
/// shifts (spec.md §4.2).
fn depth_prefixed(window: &[&str]) -> Vec<String> {
    let indents: Vec<usize> = window.iter().map(|l| leading_indent_width(l)).collect();
    let min_indent = indents.iter().copied().min().unwrap_or(0);
    let step = indents
        .iter()
        .map(|i| i.saturating_sub(min_indent))
        .filter(|d| *d > 0)
        .min()
        .unwrap_or(1)
        .max(1);

    window
        .iter()
        .zip(indents.iter())
        .map(|(line, indent)| {
            let depth = indent.saturating_sub(min_indent) / step;
            format!("D{} {}", depth, normalize_for_fuzzy(line))
        })
        .collect()
}

// ─── Byte offset / line-number helpers ──────────────────────────────────────

fn line_byte_offsets(content: &str) -> Vec<usize> {
    let mut offsets = vec![0];
    for (i, b) in content.bytes().enumerate() {
        if b == b'\n' {
            offsets.push(i + 1);
        }
    }
    offsets
}

fn start_line_for_byte(content: &str, byte: usize) -> usize {
    content[..byte.min(content.len())]
        .bytes()
        .filter(|b| *b == b'\n')
        .count()
        + 1
}

// ─── Level 1: exact ─────────────────────────────────────────────────────────

fn preview_around(lines: &[&str], center: usize, radius: usize) -> String {
    let start = center.saturating_sub(radius);
    let end = (center + radius + 1).min(lines.len());
    let mut preview = lines[start..end].join("\n");
    if preview.chars().count() > 80 {
        preview = preview.chars().take(80).collect::<String>() + "...";
    }
    preview
}

/// Find `target` in `content`, trying exact match first and falling back to
/// the character-level fuzzy window scan (spec.md §4.2 levels 1–2).
pub fn find_match(content: &str, target: &str, options: FuzzyOptions) -> MatchOutcome {
    let exact_positions: Vec<usize> = content
        .match_indices(target)
        .map(|(idx, _)| idx)
        .collect();

    if exact_positions.len() == 1 {
        let start_byte = exact_positions[0];
        return MatchOutcome::Unique(FuzzyMatch {
            actual_text: target.to_string(),
            start_byte,
            start_line: start_line_for_byte(content, start_byte),
            confidence: 1.0,
        });
    }
    if exact_positions.len() > 1 {
        let lines: Vec<&str> = content.lines().collect();
        let line_numbers: Vec<usize> = exact_positions
            .iter()
            .map(|&b| start_line_for_byte(content, b))
            .collect();
        let previews: Vec<String> = line_numbers
            .iter()
            .map(|&ln| preview_around(&lines, ln.saturating_sub(1), 5))
            .collect();
        return MatchOutcome::MultipleOccurrences {
            count: exact_positions.len(),
            line_numbers,
            previews,
        };
    }

    character_fuzzy_match(content, target, options)
}

fn character_fuzzy_match(content: &str, target: &str, options: FuzzyOptions) -> MatchOutcome {
    let content_lines: Vec<&str> = content.split('\n').collect();
    let target_lines: Vec<&str> = target.split('\n').collect();
    let t = target_lines.len();
    let c = content_lines.len();
    if t == 0 || c < t {
        return MatchOutcome::NoMatch;
    }

    let (scores_depth, _) = score_all_windows(&content_lines, &target_lines, true);
    let (best_idx, best, second, count) = best_second_count(&scores_depth, options.threshold);

    let (final_idx, final_best, final_second, final_count) =
        if (0.8..options.threshold).contains(&best) {
            let (scores_plain, _) = score_all_windows(&content_lines, &target_lines, false);
            let (idx2, best2, second2, count2) = best_second_count(&scores_plain, options.threshold);
            if best2 > best {
                (idx2, best2, second2, count2)
            } else {
                (best_idx, best, second, count)
            }
        } else {
            (best_idx, best, second, count)
        };

    decide(
        &content_lines,
        content,
        final_idx,
        t,
        final_best,
        final_second,
        final_count,
        options.threshold,
    )
}

fn score_all_windows(
    content_lines: &[&str],
    target_lines: &[&str],
    with_depth: bool,
) -> (Vec<f64>, usize) {
    let t = target_lines.len();
    let c = content_lines.len();
    let window_count = c - t + 1;
    let target_norm: Vec<String> = if with_depth {
        depth_prefixed(target_lines)
    } else {
        target_lines.iter().map(|l| normalize_for_fuzzy(l)).collect()
    };

    let mut scores = Vec::with_capacity(window_count);
    for start in 0..window_count {
        let window = &content_lines[start..start + t];
        let window_norm: Vec<String> = if with_depth {
            depth_prefixed(window)
        } else {
            window.iter().map(|l| normalize_for_fuzzy(l)).collect()
        };
        let total: f64 = target_norm
            .iter()
            .zip(window_norm.iter())
            .map(|(a, b)| similarity(a, b))
            .sum();
        scores.push(total / t as f64);
    }
    (scores, window_count)
}

fn best_second_count(scores: &[f64], threshold: f64) -> (usize, f64, f64, usize) {
    let mut best_idx = 0;
    let mut best = -1.0f64;
    let mut second = -1.0f64;
    let mut count = 0;
    for (idx, &score) in scores.iter().enumerate() {
        if score >= threshold {
            count += 1;
        }
        if score > best {
            second = best;
            best = score;
            best_idx = idx;
        } else if score > second {
            second = score;
        }
    }
    if second < 0.0 {
        second = 0.0;
    }
    (best_idx, best.max(0.0), second, count)
}

#[allow(clippy::too_many_arguments)]
fn decide(
    content_lines: &[&str],
    content: &str,
    start_idx: usize,
    window_len: usize,
    best: f64,
    second: f64,
    count_above: usize,
    threshold: f64,
) -> MatchOutcome {
    let offsets = line_byte_offsets(content);
    let start_byte = offsets.get(start_idx).copied().unwrap_or(0);
    let actual_text = content_lines[start_idx..start_idx + window_len].join("\n");
    let m = FuzzyMatch {
        actual_text,
        start_byte,
        start_line: start_idx + 1,
        confidence: best,
    };

    if best < threshold {
        return MatchOutcome::Closest(m, 0);
    }
    if count_above <= 1 {
        return MatchOutcome::Unique(m);
    }
    if best >= 0.97 && best - second >= 0.08 {
        return MatchOutcome::Dominant(m, count_above);
    }
    MatchOutcome::Closest(m, count_above)
}

// ─── Level 3: line-sequence fuzzy match ─────────────────────────────────────

fn strip_comment_prefix(line: &str) -> &str {
    let trimmed = line.trim_start();
    for prefix in ["//", "/*", "*/", "#", ";", "* ", "/ "] {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return rest.trim_start();
        }
    }
    trimmed
}

/// Sequential passes over the window start position, each producing a fixed
/// confidence so a later equal-quality match never outranks an earlier one
/// (spec.md §4.2 level 3).
pub fn seek_line_sequence(
    content_lines: &[&str],
    target_lines: &[&str],
    options: FuzzyOptions,
) -> MatchOutcome {
    let t = target_lines.len();
    let c = content_lines.len();
    if t == 0 || c < t {
        return MatchOutcome::NoMatch;
    }

    let window_count = c - t + 1;
    let order: Vec<usize> = if options.eof {
        (0..window_count).rev().collect()
    } else {
        (0..window_count).collect()
    };

    type Pass<'a> = (f64, Box<dyn Fn(&str, &str) -> bool + 'a>);
    let passes: Vec<Pass> = vec![
        (1.0, Box::new(|a: &str, b: &str| a == b)),
        (0.99, Box::new(|a: &str, b: &str| a.trim_end() == b.trim_end())),
        (0.98, Box::new(|a: &str, b: &str| a.trim() == b.trim())),
        (
            0.975,
            Box::new(|a: &str, b: &str| strip_comment_prefix(a) == strip_comment_prefix(b)),
        ),
        (
            0.97,
            Box::new(|a: &str, b: &str| normalize_unicode(a.trim()) == normalize_unicode(b.trim())),
        ),
    ];

    for (confidence, eq) in &passes {
        for &start in &order {
            let window = &content_lines[start..start + t];
            if window.iter().zip(target_lines.iter()).all(|(a, b)| eq(a, b)) {
                return unique_line_match(content_lines, start, t, *confidence);
            }
        }
    }

    // prefix-after-normalize (0.965)
    for &start in &order {
        let window = &content_lines[start..start + t];
        if window.iter().zip(target_lines.iter()).all(|(a, b)| {
            let (na, nb) = (normalize_for_fuzzy(a), normalize_for_fuzzy(b));
            na.starts_with(&nb) || nb.starts_with(&na)
        }) {
            return unique_line_match(content_lines, start, t, 0.965);
        }
    }

    // substring-after-normalize (0.94), minimum length 6, ratio >= 0.3
    for &start in &order {
        let window = &content_lines[start..start + t];
        let all_ok = window.iter().zip(target_lines.iter()).all(|(a, b)| {
            let (na, nb) = (normalize_for_fuzzy(a), normalize_for_fuzzy(b));
            if na.len() < MIN_SUBSTRING_LEN || nb.len() < MIN_SUBSTRING_LEN {
                return na == nb;
            }
            let (shorter, longer) = if na.len() <= nb.len() { (&na, &nb) } else { (&nb, &na) };
            longer.contains(shorter.as_str())
                && shorter.len() as f64 / longer.len() as f64 >= MIN_SUBSTRING_RATIO
        });
        if all_ok {
            return unique_line_match(content_lines, start, t, 0.94);
        }
    }

    // per-line mean similarity >= 0.92
    let mut best_idx = None;
    let mut best_score = 0.0f64;
    for &start in &order {
        let window = &content_lines[start..start + t];
        let total: f64 = window
            .iter()
            .zip(target_lines.iter())
            .map(|(a, b)| similarity(&normalize_for_fuzzy(a), &normalize_for_fuzzy(b)))
            .sum();
        let avg = total / t as f64;
        if avg > best_score {
            best_score = avg;
            best_idx = Some(start);
        }
    }
    if let Some(idx) = best_idx {
        if best_score >= 0.92 {
            return unique_line_match(content_lines, idx, t, best_score);
        }
    }

    // char-level fuzzy fallback via the level-2 path.
    let content = content_lines.join("\n");
    let target = target_lines.join("\n");
    character_fuzzy_match(&content, &target, options)
}

fn unique_line_match(content_lines: &[&str], start: usize, len: usize, confidence: f64) -> MatchOutcome {
    let content = content_lines.join("\n");
    let offsets = line_byte_offsets(&content);
    let start_byte = offsets.get(start).copied().unwrap_or(0);
    MatchOutcome::Unique(FuzzyMatch {
        actual_text: content_lines[start..start + len].join("\n"),
        start_byte,
        start_line: start + 1,
        confidence,
    })
}

/// External interface #7: fuzzy sequence search over a line array.
pub fn seek_sequence(
    lines: &[String],
    pattern: &[String],
    start: usize,
    options: FuzzyOptions,
) -> Option<usize> {
    if pattern.is_empty() {
        return Some(start);
    }
    if pattern.len() > lines.len() {
        return None;
    }
    let line_refs: Vec<&str> = lines.iter().map(|s| s.as_str()).collect();
    let pattern_refs: Vec<&str> = pattern.iter().map(|s| s.as_str()).collect();
    match seek_line_sequence(&line_refs[start.min(lines.len())..], &pattern_refs, options) {
        MatchOutcome::Unique(m) => Some(start + m.start_line - 1),
        MatchOutcome::Dominant(m, _) => Some(start + m.start_line - 1),
        _ => None,
    }
}

/// External interface #8: single-line context search (substring containment
/// after fuzzy normalization), with a `()`-suffix retry heuristic — both
/// retries run fuzzy-disabled (plain `contains`) to avoid recursing back
/// into this same heuristic.
pub fn find_context_line(
    lines: &[String],
    context: &str,
    start_from: usize,
    options: FuzzyOptions,
) -> Option<usize> {
    let order: Box<dyn Iterator<Item = usize>> = if options.eof {
        Box::new((start_from..lines.len()).rev())
    } else {
        Box::new(start_from..lines.len())
    };
    let needle = normalize_for_fuzzy(context);
    let mut fallback_idx = None;
    for idx in order {
        if normalize_for_fuzzy(&lines[idx]).contains(&needle) {
            fallback_idx = Some(idx);
            break;
        }
    }
    if fallback_idx.is_some() {
        return fallback_idx;
    }

    if let Some(base) = context.strip_suffix("()") {
        let with_paren = format!("{}(", base);
        for idx in start_from..lines.len() {
            if lines[idx].contains(&with_paren) {
                return Some(idx);
            }
        }
        for idx in start_from..lines.len() {
            if lines[idx].contains(base) {
                return Some(idx);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn similarity_bounds() {
        assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
        assert!((similarity("abc", "abc") - 1.0).abs() < f64::EPSILON);
        let s = similarity("kitten", "sitting");
        assert!((0.0..=1.0).contains(&s));
    }

    #[test]
    fn exact_unique() {
        let outcome = find_match("a\nb\nc", "b", FuzzyOptions::default());
        assert!(matches!(outcome, MatchOutcome::Unique(m) if m.confidence == 1.0));
    }

    #[test]
    fn exact_multiple_occurrences() {
        let outcome = find_match("x\nx\n", "x", FuzzyOptions::default());
        match outcome {
            MatchOutcome::MultipleOccurrences { count, line_numbers, .. } => {
                assert_eq!(count, 2);
                assert_eq!(line_numbers, vec![1, 2]);
            }
            other => panic!("expected MultipleOccurrences, got {:?}", other),
        }
    }

    #[test]
    fn unicode_smart_quote_recovery() {
        let content = "say \u{201C}hello\u{201D} now";
        let outcome = find_match(content, "say \"hello\" now", FuzzyOptions::default());
        match outcome {
            MatchOutcome::Unique(m) => assert!(m.confidence >= 0.97),
            other => panic!("expected Unique, got {:?}", other),
        }
    }

    #[test]
    fn seek_sequence_exact() {
        let lines = vec!["foo".to_string(), "bar".to_string(), "baz".to_string()];
        let pattern = vec!["bar".to_string(), "baz".to_string()];
        assert_eq!(seek_sequence(&lines, &pattern, 0, FuzzyOptions::default()), Some(1));
    }

    #[test]
    fn seek_sequence_empty_pattern() {
        let lines = vec!["foo".to_string()];
        assert_eq!(seek_sequence(&lines, &[], 2, FuzzyOptions::default()), Some(2));
    }

    #[test]
    fn seek_sequence_pattern_too_long() {
        let lines = vec!["one".to_string()];
        let pattern = vec!["a".to_string(), "b".to_string()];
        assert_eq!(seek_sequence(&lines, &pattern, 0, FuzzyOptions::default()), None);
    }

    #[test]
    fn find_context_line_paren_retry() {
        let lines = vec!["fn main( ) {".to_string()];
        let found = find_context_line(&lines, "main()", 0, FuzzyOptions::default());
        assert_eq!(found, Some(0));
    }
}
