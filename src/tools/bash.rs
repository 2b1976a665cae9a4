//! Bash tool — execute shell commands with output truncation and timeout.

use async_trait::async_trait;
use serde_json::json;
use tokio::process::Command;
use tokio::sync::mpsc;
use tokio::time::Duration;

use crate::tool::{Tool, ToolDefinition, ToolOutput, ToolResult};
use crate::truncate::{truncate_tail, MAX_BYTES};

/// Maximum lines kept from bash output (tail).
const BASH_MAX_LINES: usize = 50;

/// Default command timeout in seconds.
const DEFAULT_TIMEOUT: u64 = 120;

pub struct BashTool {
    cwd: String,
    definition: ToolDefinition,
}

impl BashTool {
    pub fn new(cwd: impl Into<String>) -> Self {
        let definition = ToolDefinition {
            name: "bash".into(),
            description: "Execute a shell command. Returns stdout and stderr. Output is truncated to the last 50 lines.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to execute"
                    },
                    "timeout": {
                        "type": "integer",
                        "description": "Timeout in seconds (default: 120)"
                    }
                },
                "required": ["command"]
            }),
        };

        Self { cwd: cwd.into(), definition }
    }
}

/// Strip ANSI escape codes from output.
fn strip_ansi(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' {
            if let Some(&'[') = chars.peek() {
                chars.next();
                while let Some(&c) = chars.peek() {
                    chars.next();
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
        } else if ch == '\r' {
        } else {
            result.push(ch);
        }
    }

    result
}

#[async_trait]
impl Tool for BashTool {
    fn name(&self) -> &str {
        "bash"
    }

    fn definition(&self) -> ToolDefinition {
        self.definition.clone()
    }

    async fn execute(
        &self,
        _call_id: &str,
        arguments: serde_json::Value,
        partial_tx: Option<mpsc::UnboundedSender<String>>,
    ) -> ToolResult<ToolOutput> {
        let command = arguments.get("command").and_then(|v| v.as_str()).unwrap_or("");

        if command.is_empty() {
            return Ok(ToolOutput::error("Missing required parameter: command"));
        }

        let timeout_secs = arguments.get("timeout").and_then(|v| v.as_u64()).unwrap_or(DEFAULT_TIMEOUT);

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(command).current_dir(&self.cwd);

        let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), cmd.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Ok(ToolOutput::error(format!("Command failed: {}", e))),
            Err(_) => return Ok(ToolOutput::error(format!("Command timed out after {}s", timeout_secs))),
        };

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&stderr);
        }

        if let Some(ref tx) = partial_tx {
            let _ = tx.send(combined.clone());
        }

        let cleaned = strip_ansi(&combined);
        let truncated = truncate_tail(&cleaned, BASH_MAX_LINES, MAX_BYTES);

        let notice = truncated.truncation_notice();
        let is_truncated = truncated.is_truncated();
        let mut result_content = truncated.content;
        if let Some(notice) = notice {
            result_content = format!("{}\n{}", notice, result_content);
        }

        let tool_output = if output.status.success() {
            ToolOutput::success(result_content)
        } else {
            ToolOutput::error(result_content)
        };

        Ok(tool_output.with_metadata(json!({
            "truncated": is_truncated,
            "exit_code": output.status.code(),
        })))
    }
}
