//! Read tool — read file contents with line numbers, offset, and
//! truncation, or as a tagged hashline view for building an edit batch.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use crate::core::hashline::format_hashlines;
use crate::tool::{Tool, ToolDefinition, ToolOutput, ToolResult};
use crate::truncate::{add_line_numbers, truncate_head, MAX_BYTES, MAX_LINES};

use super::resolve_path;

pub struct ReadTool {
    cwd: String,
}

impl ReadTool {
    pub fn new(cwd: impl Into<String>) -> Self {
        Self { cwd: cwd.into() }
    }
}

#[async_trait]
impl Tool for ReadTool {
    fn name(&self) -> &str {
        "read"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "read".into(),
            description: "Read the contents of a file. Returns line-numbered output by default, or a hashline view (N#TT:LINE) suitable for building an edit batch. Use offset and limit for large files.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "File path to read (relative to working directory or absolute)"
                    },
                    "offset": {
                        "type": "integer",
                        "description": "1-indexed line number to start reading from"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Number of lines to read"
                    },
                    "hashline": {
                        "type": "boolean",
                        "description": "If true, annotate each line with its N#TT tag instead of a plain line number"
                    }
                },
                "required": ["path"]
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

        let resolved = resolve_path(&self.cwd, path);

        let content = match tokio::fs::read_to_string(&resolved).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ToolOutput::error(format!("File not found: {}", path)));
            }
            Err(e) => return Ok(ToolOutput::error(format!("Failed to read {}: {}", path, e))),
        };

        let hashline = arguments.get("hashline").and_then(|v| v.as_bool()).unwrap_or(false);

        let offset = arguments.get("offset").and_then(|v| v.as_u64()).map(|v| v as usize).unwrap_or(1);

        let limit = arguments.get("limit").and_then(|v| v.as_u64()).map(|v| v as usize);

        let total_lines = content.lines().count();

        if offset < 1 {
            return Ok(ToolOutput::error("offset must be >= 1"));
        }

        let lines: Vec<&str> = content.lines().collect();
        let start_idx = (offset - 1).min(lines.len());
        let end_idx = match limit {
            Some(l) => (start_idx + l).min(lines.len()),
            None => lines.len(),
        };

        if start_idx >= lines.len() {
            return Ok(ToolOutput::error(format!(
                "offset {} exceeds file length ({} lines)",
                offset, total_lines
            )));
        }

        let selected: String = lines[start_idx..end_idx].join("\n");

        let max_lines = limit.unwrap_or(MAX_LINES).min(MAX_LINES);
        let result = truncate_head(&selected, max_lines, MAX_BYTES);

        let numbered = if hashline {
            format_hashlines(&result.content, offset)
        } else {
            add_line_numbers(&result.content, offset)
        };

        let mut output = numbered;

        if result.is_truncated() {
            if let Some(notice) = result.truncation_notice() {
                output.push('\n');
                output.push_str(&notice);
            }
            let next_offset = offset + result.output_lines;
            let remaining = total_lines.saturating_sub(next_offset - 1);
            if remaining > 0 {
                output.push_str(&format!(
                    "\n[To continue reading: offset={}, limit={}]",
                    next_offset,
                    remaining.min(MAX_LINES)
                ));
            }
        }

        Ok(ToolOutput::success(output).with_metadata(json!({
            "total_lines": total_lines,
            "offset": offset,
            "lines_returned": result.output_lines,
            "truncated": result.is_truncated(),
        })))
    }
}
