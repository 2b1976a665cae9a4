//! Ls tool — list directory contents with metadata.

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::mpsc;

use crate::tool::{Tool, ToolDefinition, ToolOutput, ToolResult};

/// Maximum entries returned.
const MAX_ENTRIES: usize = 500;

use super::resolve_path;

pub struct LsTool {
    cwd: String,
}

impl LsTool {
    pub fn new(cwd: impl Into<String>) -> Self {
        Self { cwd: cwd.into() }
    }
}

#[async_trait]
impl Tool for LsTool {
    fn name(&self) -> &str {
        "ls"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "ls".into(),
            description: "List the contents of a directory. Shows files and subdirectories with '/' suffix for directories.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Directory path to list (defaults to working directory)"
                    },
                    "limit": {
                        "type": "integer",
                        "description": "Maximum entries to return (default: 500)"
                    }
                }
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

        let resolved = if path.is_empty() { self.cwd.clone() } else { resolve_path(&self.cwd, path) };

        let limit = arguments
            .get("limit")
            .and_then(|v| v.as_u64())
            .map(|v| (v as usize).min(MAX_ENTRIES))
            .unwrap_or(MAX_ENTRIES);

        let mut entries = match tokio::fs::read_dir(&resolved).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ToolOutput::error(format!(
                    "Directory not found: {}",
                    if path.is_empty() { &self.cwd } else { path }
                )));
            }
            Err(e) => {
                return Ok(ToolOutput::error(format!("Failed to read directory {}: {}", path, e)));
            }
        };

        let mut names: Vec<(String, bool)> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| crate::tool::ToolError(e.to_string()))? {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            names.push((entry.file_name().to_string_lossy().to_string(), is_dir));
        }

        names.sort_by(|a, b| a.0.to_lowercase().cmp(&b.0.to_lowercase()));

        let total = names.len();
        let displayed: Vec<String> = names
            .iter()
            .take(limit)
            .map(|(name, is_dir)| if *is_dir { format!("{}/", name) } else { name.clone() })
            .collect();

        let mut output = displayed.join("\n");

        if total > limit {
            output.push_str(&format!("\n[Showing {} of {} entries]", limit, total));
        }

        if total == 0 {
            output = "(empty directory)".into();
        }

        Ok(ToolOutput::success(output).with_metadata(json!({
            "total_entries": total,
            "displayed": displayed.len(),
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup() -> (tempfile::TempDir, LsTool) {
        let dir = tempdir().unwrap();
        let tool = LsTool::new(dir.path().to_str().unwrap());
        (dir, tool)
    }

    #[tokio::test]
    async fn ls_directory() {
        let (dir, tool) = setup().await;
        tokio::fs::write(dir.path().join("file.txt"), "content").await.unwrap();
        tokio::fs::write(dir.path().join("code.rs"), "fn main() {}").await.unwrap();
        tokio::fs::create_dir_all(dir.path().join("sub")).await.unwrap();
        tokio::fs::write(dir.path().join("sub/nested.txt"), "nested").await.unwrap();

        let result = tool.execute("c1", json!({}), None).await.unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("file.txt"));
        assert!(result.content.contains("code.rs"));
        assert!(result.content.contains("sub/"));
    }

    #[tokio::test]
    async fn ls_subdirectory() {
        let (dir, tool) = setup().await;
        tokio::fs::create_dir_all(dir.path().join("src")).await.unwrap();
        tokio::fs::write(dir.path().join("src/main.rs"), "fn main() {}").await.unwrap();

        let result = tool.execute("c2", json!({"path": "src"}), None).await.unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("main.rs"));
    }

    #[tokio::test]
    async fn ls_empty_dir() {
        let (dir, tool) = setup().await;
        tokio::fs::create_dir_all(dir.path().join("empty")).await.unwrap();

        let result = tool.execute("c3", json!({"path": "empty"}), None).await.unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("empty directory"));
    }

    #[tokio::test]
    async fn ls_nonexistent() {
        let (_dir, tool) = setup().await;
        let result = tool.execute("c4", json!({"path": "nope"}), None).await.unwrap();
        assert!(result.is_error);
        assert!(result.content.contains("not found"));
    }

    #[tokio::test]
    async fn ls_with_limit() {
        let (dir, tool) = setup().await;
        for i in 0..10 {
            tokio::fs::write(dir.path().join(format!("file{}.txt", i)), "").await.unwrap();
        }

        let result = tool.execute("c5", json!({"limit": 3}), None).await.unwrap();

        assert!(!result.is_error);
        assert!(result.content.contains("Showing 3 of 10"));
    }

    #[tokio::test]
    async fn ls_sorted_case_insensitive() {
        let (dir, tool) = setup().await;
        tokio::fs::write(dir.path().join("Banana.txt"), "").await.unwrap();
        tokio::fs::write(dir.path().join("apple.txt"), "").await.unwrap();
        tokio::fs::write(dir.path().join("Cherry.txt"), "").await.unwrap();

        let result = tool.execute("c6", json!({}), None).await.unwrap();

        assert!(!result.is_error);
        let lines: Vec<&str> = result.content.lines().collect();
        assert_eq!(lines[0], "apple.txt");
        assert_eq!(lines[1], "Banana.txt");
        assert_eq!(lines[2], "Cherry.txt");
    }

    #[tokio::test]
    async fn tool_name_and_definition() {
        let (_dir, tool) = setup().await;
        assert_eq!(tool.name(), "ls");
        let def = tool.definition();
        assert_eq!(def.name, "ls");
    }
}
