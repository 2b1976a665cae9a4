//! Hashline edit tool — the line-addressed batch path. A caller reads a
//! file with `read`'s `hashline` view, then submits a batch of `N#TT`
//! anchored edits here; the whole batch applies or none of it does.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use crate::core::hashline::{apply_edits, format_mismatch_message, EditError, EditOperation};
use crate::tool::{Tool, ToolDefinition, ToolOutput, ToolResult};

use super::resolve_path;

pub struct HashlineEditTool {
    cwd: String,
}

impl HashlineEditTool {
    pub fn new(cwd: impl Into<String>) -> Self {
        Self { cwd: cwd.into() }
    }
}

#[async_trait]
impl Tool for HashlineEditTool {
    fn name(&self) -> &str {
        "hashline_edit"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "hashline_edit".into(),
            description: "Apply a batch of line-addressed edits to a file. Each edit anchors to a line via its current N#TT tag (from `read`'s hashline view); the whole batch is validated and applied atomically, or rejected with a remapping of any stale tags.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path to edit"
                    },
                    "edits": {
                        "type": "array",
                        "description": "Batch of edit operations (set, replace, append, prepend, insert, replace_text)",
                        "items": { "type": "object" }
                    }
                },
                "required": ["path", "edits"]
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
        if path.is_empty() {
            return Ok(ToolOutput::error("Missing required parameter: path"));
        }

        let edits_value = match arguments.get("edits") {
            Some(v) => v.clone(),
            None => return Ok(ToolOutput::error("Missing required parameter: edits")),
        };

        let edits: Vec<EditOperation> = match serde_json::from_value(edits_value) {
            Ok(e) => e,
            Err(e) => return Ok(ToolOutput::error(format!("Malformed edits array: {}", e))),
        };

        if edits.is_empty() {
            return Ok(ToolOutput::error("edits must contain at least one operation"));
        }

        let resolved = resolve_path(&self.cwd, path);

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ToolOutput::error(format!("File not found: {}", path)));
            }
            Err(e) => return Ok(ToolOutput::error(format!("Failed to read {}: {}", path, e))),
        };

        match apply_edits(&content, edits) {
            Ok(result) => {
                if let Err(e) = tokio::fs::write(&resolved, &result.content).await {
                    return Ok(ToolOutput::error(format!("Failed to write {}: {}", path, e)));
                }

                let mut summary = format!("Applied edits to {}", path);
                if let Some(line) = result.first_changed_line {
                    summary.push_str(&format!(" (first change at line {})", line));
                }
                if !result.noop_edits.is_empty() {
                    summary.push_str(&format!("\n{} edit(s) were no-ops: {:?}", result.noop_edits.len(), result.noop_edits));
                }
                if !result.deduplicated_edits.is_empty() {
                    summary.push_str(&format!(
                        "\n{} edit(s) were duplicates and skipped: {:?}",
                        result.deduplicated_edits.len(),
                        result.deduplicated_edits
                    ));
                }

                Ok(ToolOutput::success(summary).with_metadata(json!({
                    "first_changed_line": result.first_changed_line,
                    "noop_edits": result.noop_edits,
                    "deduplicated_edits": result.deduplicated_edits,
                })))
            }
            Err(EditError::Mismatch(report)) => {
                let file_lines: Vec<&str> = content.split('\n').collect();
                let message = format_mismatch_message(&report, &file_lines);
                Ok(ToolOutput::error(format!(
                    "{} line(s) had stale tags — re-read the file and retry with updated references:\n{}",
                    report.mismatches.len(),
                    message
                ))
                .with_metadata(json!({"mismatches": report.mismatches.len()})))
            }
            Err(EditError::Structural(e)) => Ok(ToolOutput::error(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tag::compute_tag;
    use tempfile::tempdir;

    async fn setup() -> (tempfile::TempDir, HashlineEditTool) {
        let dir = tempdir().unwrap();
        let tool = HashlineEditTool::new(dir.path().to_str().unwrap());
        (dir, tool)
    }

    #[tokio::test]
    async fn applies_a_set_edit() {
        let (dir, tool) = setup().await;
        tokio::fs::write(dir.path().join("f.txt"), "a\nb\nc").await.unwrap();
        let tag = compute_tag("b");

        let result = tool
            .execute(
                "c1",
                json!({
                    "path": "f.txt",
                    "edits": [{"op": "set", "target": {"line": 2, "tag": tag}, "content": ["B"]}]
                }),
                None,
            )
            .await
            .unwrap();

        assert!(!result.is_error);
        let content = tokio::fs::read_to_string(dir.path().join("f.txt")).await.unwrap();
        assert_eq!(content, "a\nB\nc");
    }

    #[tokio::test]
    async fn reports_mismatch_without_mutating_file() {
        let (dir, tool) = setup().await;
        tokio::fs::write(dir.path().join("f.txt"), "a\nb\nc").await.unwrap();

        let result = tool
            .execute(
                "c2",
                json!({
                    "path": "f.txt",
                    "edits": [{"op": "set", "target": {"line": 2, "tag": "ZZ"}, "content": ["B"]}]
                }),
                None,
            )
            .await
            .unwrap();

        assert!(result.is_error);
        assert!(result.content.contains("stale tags"));
        let content = tokio::fs::read_to_string(dir.path().join("f.txt")).await.unwrap();
        assert_eq!(content, "a\nb\nc");
    }

    #[tokio::test]
    async fn missing_edits_param_errors() {
        let (_dir, tool) = setup().await;
        let result = tool.execute("c3", json!({"path": "f.txt"}), None).await.unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn file_not_found() {
        let (_dir, tool) = setup().await;
        let result = tool
            .execute("c4", json!({"path": "nope.txt", "edits": [{"op": "replace_text", "old_text": "a", "new_text": "b"}]}), None)
            .await
            .unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn tool_name_and_definition() {
        let (_dir, tool) = setup().await;
        assert_eq!(tool.name(), "hashline_edit");
        assert_eq!(tool.definition().name, "hashline_edit");
    }
}
