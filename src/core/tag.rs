//! Line tag codec (C1): compute and format per-line content tags, and parse
//! tag references back out of the `N#TT` display syntax.

use once_cell::sync::Lazy;
use regex::Regex;

/// 16-symbol alphabet. High nibble of the line hash selects the first
/// character, low nibble the second.
const ALPHABET: &str = "ZPMQVRWSNKTXJBYH";

/// Strip all whitespace and CR from a line before hashing. Spaces, tabs,
/// carriage returns, and any interior break are removed; trailing newlines
/// are never present since callers split on `\n` before calling this.
fn strip_whitespace(line: &str) -> String {
    line.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Deterministic 8-bit hash (FNV-1a, folded to one byte) over the
/// whitespace-stripped line. Any stable non-cryptographic hash giving a
/// uniform byte distribution satisfies the contract; FNV-1a is chosen
/// because it needs no extra dependency and is trivially portable across
/// implementations that must agree bit-for-bit (spec.md §4.1).
fn hash_byte(stripped: &str) -> u8 {
    let mut hash: u32 = 0x811c9dc5;
    for b in stripped.bytes() {
        hash ^= b as u32;
        hash = hash.wrapping_mul(0x01000193);
    }
    // Fold the 32-bit hash down to 8 bits rather than truncating, so all
    // four input bytes influence the result.
    ((hash ^ (hash >> 8) ^ (hash >> 16) ^ (hash >> 24)) & 0xFF) as u8
}

/// Compute the 2-character tag for a line's content.
pub fn compute_tag(line: &str) -> String {
    let stripped = strip_whitespace(line);
    let byte = hash_byte(&stripped);
    let high = (byte >> 4) as usize;
    let low = (byte & 0x0F) as usize;
    let chars: Vec<char> = ALPHABET.chars().collect();
    let mut out = String::with_capacity(2);
    out.push(chars[high]);
    out.push(chars[low]);
    out
}

/// Format a line as `N#TT:LINE` (1-based line numbering).
pub fn format_display(line_no: usize, line: &str) -> String {
    format!("{}#{}:{}", line_no, compute_tag(line), line)
}

static REF_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[>+-]*\s*(\d+)\s*#\s*([ZPMQVRWSNKTXJBYH]{2})\s*$").unwrap());

/// Parse a `N#TT` reference, tolerating a leading diff glyph (`>`, `+`, `-`)
/// and surrounding whitespace. Returns `None` on any shape mismatch — the
/// caller treats that as an input-shape error, distinct from a tag
/// mismatch (spec.md §4.1).
pub fn parse_ref(reference: &str) -> Option<(usize, String)> {
    let caps = REF_RE.captures(reference)?;
    let line_no: usize = caps.get(1)?.as_str().parse().ok()?;
    let tag = caps.get(2)?.as_str().to_string();
    Some((line_no, tag))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_is_two_chars_from_alphabet() {
        let tag = compute_tag("fn main() {}");
        assert_eq!(tag.chars().count(), 2);
        assert!(tag.chars().all(|c| ALPHABET.contains(c)));
    }

    #[test]
    fn tag_ignores_whitespace_differences() {
        assert_eq!(compute_tag("  let x = 1;"), compute_tag("let x=1;"));
        assert_eq!(compute_tag("a\tb"), compute_tag("ab"));
        assert_eq!(compute_tag("a\rb"), compute_tag("ab"));
    }

    #[test]
    fn tag_is_deterministic() {
        assert_eq!(compute_tag("hello world"), compute_tag("hello world"));
    }

    #[test]
    fn tag_differs_for_different_content() {
        assert_ne!(compute_tag("foo"), compute_tag("bar"));
    }

    #[test]
    fn format_display_shape() {
        let tag = compute_tag("return x");
        assert_eq!(
            format_display(7, "return x"),
            format!("7#{}:{}", tag, "return x")
        );
    }

    #[test]
    fn round_trip_parse_format() {
        let tag = compute_tag("some line");
        let display = format!("42#{}", tag);
        assert_eq!(parse_ref(&display), Some((42, tag)));
    }

    #[test]
    fn parse_ref_permissive_glyphs() {
        let tag = compute_tag("x");
        let r = format!(">  3 # {}", tag);
        assert_eq!(parse_ref(&r), Some((3, tag)));
    }

    #[test]
    fn parse_ref_rejects_malformed() {
        assert_eq!(parse_ref("not a ref"), None);
    }

    #[test]
    fn parse_ref_rejects_bad_alphabet() {
        assert_eq!(parse_ref("3#AA"), None);
    }
}
