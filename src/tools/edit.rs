//! Edit tool — exact-text replacement with a fuzzy-location fallback.
//!
//! This is the replace-exact-text path (as opposed to
//! [`crate::tools::hashline_edit`]'s line-addressed batch path): `old` is
//! free-form text, located via [`crate::core::fuzzy::find_match`] rather
//! than `old`'s literal byte offsets, then spliced and diffed.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use crate::core::diff::generate_diff;
use crate::core::fuzzy::{find_match, FuzzyOptions, MatchOutcome};
use crate::tool::{Tool, ToolDefinition, ToolOutput, ToolResult};

use super::resolve_path;

pub struct EditTool {
    cwd: String,
}

impl EditTool {
    pub fn new(cwd: impl Into<String>) -> Self {
        Self { cwd: cwd.into() }
    }
}

const BOM: &str = "\u{FEFF}";

/// Strip a leading UTF-8 BOM, returning whether one was present.
fn strip_bom(content: &str) -> (bool, &str) {
    match content.strip_prefix(BOM) {
        Some(rest) => (true, rest),
        None => (false, content),
    }
}

/// Convert CRLF to LF for matching/diffing, remembering the original style.
fn to_lf(content: &str) -> (bool, String) {
    if content.contains("\r\n") {
        (true, content.replace("\r\n", "\n"))
    } else {
        (false, content.to_string())
    }
}

fn restore_line_endings(content: &str, had_crlf: bool) -> String {
    if had_crlf {
        content.replace('\n', "\r\n")
    } else {
        content.to_string()
    }
}

#[async_trait]
impl Tool for EditTool {
    fn name(&self) -> &str {
        "edit"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "edit".into(),
            description: "Perform a text replacement in a file. The old text must be uniquely locatable; falls back to fuzzy matching (whitespace, unicode quote/dash normalization) when an exact match fails.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path to edit"
                    },
                    "old": {
                        "type": "string",
                        "description": "Text to find and replace"
                    },
                    "new": {
                        "type": "string",
                        "description": "Replacement text"
                    }
                },
                "required": ["path", "old", "new"]
            }),
        }
    }

    async fn execute(
        &self,
        _call_id: &str,
        arguments: serde_json::Value,
        _partial_tx: Option<mpsc::UnboundedSender<String>>,
    ) -> ToolResult<ToolOutput> {
        let path = arguments.get("path").and_then(|v| v.as_str()).unwrap_or("");
        let old_text = arguments.get("old").and_then(|v| v.as_str()).unwrap_or("");
        let new_text = arguments.get("new").and_then(|v| v.as_str()).unwrap_or("");

        if path.is_empty() {
            return Ok(ToolOutput::error("Missing required parameter: path"));
        }
        if old_text.is_empty() {
            return Ok(ToolOutput::error("Missing required parameter: old"));
        }
        if old_text == new_text {
            return Ok(ToolOutput::error("old and new text are identical — no change would occur"));
        }

        let resolved = resolve_path(&self.cwd, path);

        let raw = match tokio::fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ToolOutput::error(format!("File not found: {}", path)));
            }
            Err(e) => return Ok(ToolOutput::error(format!("Failed to read {}: {}", path, e))),
        };

        let (had_bom, without_bom) = strip_bom(&raw);
        let (had_crlf, working) = to_lf(without_bom);

        let outcome = find_match(&working, old_text, FuzzyOptions::default());

        let (replaced, method) = match outcome {
            MatchOutcome::Unique(m) => {
                let method = if m.actual_text == old_text { "exact" } else { "fuzzy" };
                (splice(&working, &m, new_text), method)
            }
            MatchOutcome::Dominant(m, _) => (splice(&working, &m, new_text), "fuzzy"),
            MatchOutcome::Closest(_, count) if count == 0 => {
                return Ok(ToolOutput::error(
                    "Text not found in file (tried exact and fuzzy matching). Verify the old text matches the file content.",
                ));
            }
            MatchOutcome::Closest(m, _) => (splice(&working, &m, new_text), "fuzzy"),
            MatchOutcome::MultipleOccurrences { count, line_numbers, .. } => {
                return Ok(ToolOutput::error(format!(
                    "Found {} occurrences at lines {:?} — must be unique. Provide more context to disambiguate.",
                    count, line_numbers
                )));
            }
            MatchOutcome::NoMatch => {
                return Ok(ToolOutput::error(
                    "Text not found in file (tried exact and fuzzy matching). Verify the old text matches the file content.",
                ));
            }
        };

        let diff = generate_diff(&working, &replaced, 4);
        let first_changed_line = crate::core::diff::first_changed_line(&working, &replaced);

        let final_without_bom = restore_line_endings(&replaced, had_crlf);
        let final_content = if had_bom { format!("{}{}", BOM, final_without_bom) } else { final_without_bom };

        match tokio::fs::write(&resolved, &final_content).await {
            Ok(()) => Ok(ToolOutput::success(format!("Applied edit to {} ({})\n\n{}", path, method, diff))
                .with_metadata(json!({
                    "method": method,
                    "first_changed_line": first_changed_line,
                    "path": path,
                }))),
            Err(e) => Ok(ToolOutput::error(format!("Failed to write {}: {}", path, e))),
        }
    }
}

fn splice(content: &str, m: &crate::core::fuzzy::FuzzyMatch, new_text: &str) -> String {
    let end = m.start_byte + m.actual_text.len();
    format!("{}{}{}", &content[..m.start_byte], new_text, &content[end..])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup() -> (tempfile::TempDir, EditTool) {
        let dir = tempdir().unwrap();
        let tool = EditTool::new(dir.path().to_str().unwrap());
        (dir, tool)
    }

    #[tokio::test]
    async fn exact_replacement() {
        let (dir, tool) = setup().await;
        tokio::fs::write(dir.path().join("code.rs"), "fn main() {\n    println!(\"hello\");\n}").await.unwrap();

        let result = tool
            .execute(
                "c1",
                json!({"path": "code.rs", "old": "println!(\"hello\")", "new": "println!(\"world\")"}),
                None,
            )
            .await
            .unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("exact"));
        let content = tokio::fs::read_to_string(dir.path().join("code.rs")).await.unwrap();
        assert!(content.contains("world"));
        assert!(!content.contains("hello"));
    }

    #[tokio::test]
    async fn fuzzy_smart_quotes() {
        let (dir, tool) = setup().await;
        tokio::fs::write(dir.path().join("quotes.txt"), "It\u{2019}s a test").await.unwrap();

        let result = tool
            .execute("c2", json!({"path": "quotes.txt", "old": "It's a test", "new": "It is a test"}), None)
            .await
            .unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("fuzzy"));
    }

    #[tokio::test]
    async fn multiple_matches_error() {
        let (dir, tool) = setup().await;
        tokio::fs::write(dir.path().join("dup.txt"), "hello hello hello").await.unwrap();

        let result = tool.execute("c3", json!({"path": "dup.txt", "old": "hello", "new": "world"}), None).await.unwrap();

        assert!(result.is_error);
        assert!(result.content.contains("occurrences"));
    }

    #[tokio::test]
    async fn text_not_found() {
        let (dir, tool) = setup().await;
        tokio::fs::write(dir.path().join("missing.txt"), "something else").await.unwrap();

        let result = tool
            .execute("c4", json!({"path": "missing.txt", "old": "nothere", "new": "replacement"}), None)
            .await
            .unwrap();

        assert!(result.is_error);
        assert!(result.content.contains("not found"));
    }

    #[tokio::test]
    async fn identical_old_new() {
        let (dir, tool) = setup().await;
        tokio::fs::write(dir.path().join("same.txt"), "content").await.unwrap();

        let result = tool.execute("c5", json!({"path": "same.txt", "old": "content", "new": "content"}), None).await.unwrap();

        assert!(result.is_error);
        assert!(result.content.contains("identical"));
    }

    #[tokio::test]
    async fn file_not_found() {
        let (_dir, tool) = setup().await;
        let result = tool.execute("c6", json!({"path": "nope.txt", "old": "a", "new": "b"}), None).await.unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn diff_output() {
        let (dir, tool) = setup().await;
        tokio::fs::write(dir.path().join("diff.txt"), "line1\nline2\nline3").await.unwrap();

        let result = tool.execute("c7", json!({"path": "diff.txt", "old": "line2", "new": "modified"}), None).await.unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("-2\tline2"));
        assert!(result.content.contains("+2\tmodified"));
    }

    #[tokio::test]
    async fn preserves_crlf_line_endings() {
        let (dir, tool) = setup().await;
        tokio::fs::write(dir.path().join("crlf.txt"), "line1\r\nline2\r\nline3").await.unwrap();

        let result = tool.execute("c8", json!({"path": "crlf.txt", "old": "line2", "new": "changed"}), None).await.unwrap();
        assert!(!result.is_error);

        let content = tokio::fs::read_to_string(dir.path().join("crlf.txt")).await.unwrap();
        assert!(content.contains("line1\r\nchanged\r\nline3"));
    }

    #[tokio::test]
    async fn preserves_bom() {
        let (dir, tool) = setup().await;
        let with_bom = format!("{}hello world", BOM);
        tokio::fs::write(dir.path().join("bom.txt"), &with_bom).await.unwrap();

        let result = tool.execute("c9", json!({"path": "bom.txt", "old": "hello", "new": "goodbye"}), None).await.unwrap();
        assert!(!result.is_error);

        let content = tokio::fs::read_to_string(dir.path().join("bom.txt")).await.unwrap();
        assert!(content.starts_with(BOM));
        assert!(content.contains("goodbye world"));
    }

    #[tokio::test]
    async fn tool_name_and_definition() {
        let (_dir, tool) = setup().await;
        assert_eq!(tool.name(), "edit");
        let def = tool.definition();
        assert_eq!(def.name, "edit");
    }
}
