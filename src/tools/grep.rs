//! Grep tool — search file contents using regex or literal patterns.

use async_trait::async_trait;
use regex::RegexBuilder;
use serde_json::json;
use tokio::sync::mpsc;

use crate::tool::{Tool, ToolDefinition, ToolOutput, ToolResult};
use crate::truncate::{truncate_head, truncate_line, GREP_MAX_LINE_LENGTH, MAX_BYTES};

/// Maximum number of matches returned.
const MAX_MATCHES: usize = 100;

use super::resolve_path;

pub struct GrepTool {
    cwd: String,
}

impl GrepTool {
    pub fn new(cwd: impl Into<String>) -> Self {
        Self { cwd: cwd.into() }
    }
}

enum Matcher {
    Literal { needle: String, ignore_case: bool },
    Regex(regex::Regex),
}

impl Matcher {
    fn new(pattern: &str, literal: bool, ignore_case: bool) -> Self {
        if literal {
            return Matcher::Literal {
                needle: if ignore_case { pattern.to_lowercase() } else { pattern.to_string() },
                ignore_case,
            };
        }
        match RegexBuilder::new(pattern).case_insensitive(ignore_case).build() {
            Ok(re) => Matcher::Regex(re),
            // Fall back to literal matching for patterns that aren't valid regex.
            Err(_) => Matcher::Literal {
                needle: if ignore_case { pattern.to_lowercase() } else { pattern.to_string() },
                ignore_case,
            },
        }
    }

    fn is_match(&self, line: &str) -> bool {
        match self {
            Matcher::Literal { needle, ignore_case } => {
                if *ignore_case {
                    line.to_lowercase().contains(needle.as_str())
                } else {
                    line.contains(needle.as_str())
                }
            }
            Matcher::Regex(re) => re.is_match(line),
        }
    }
}

/// Recursively collect all file paths under a directory.
async fn collect_files(dir: &str, files: &mut Vec<String>, glob_filter: Option<&str>) -> std::io::Result<()> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(e) => e,
        Err(_) => return Ok(()),
    };

    let mut children = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        children.push(entry);
    }

    for entry in children {
        let name = entry.file_name().to_string_lossy().to_string();
        let path = format!("{}/{}", dir.trim_end_matches('/'), name);

        let file_type = match entry.file_type().await {
            Ok(t) => t,
            Err(_) => continue,
        };

        if file_type.is_dir() {
            if !name.starts_with('.') {
                Box::pin(collect_files(&path, files, glob_filter)).await?;
            }
        } else if file_type.is_file() {
            if let Some(glob) = glob_filter {
                if matches_glob(&name, glob) {
                    files.push(path);
                }
            } else {
                files.push(path);
            }
        }
    }
    Ok(())
}

/// Simple glob matching (supports *.ext patterns).
fn matches_glob(filename: &str, glob: &str) -> bool {
    if glob.starts_with("*.") {
        let ext = &glob[1..];
        filename.ends_with(ext)
    } else if glob.contains('*') {
        let parts: Vec<&str> = glob.split('*').collect();
        if parts.len() == 2 {
            filename.starts_with(parts[0]) && filename.ends_with(parts[1])
        } else {
            true
        }
    } else {
        filename == glob
    }
}

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "grep".into(),
            description: "Search file contents for a pattern. Returns matching lines with file paths and line numbers.".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "pattern": {
                        "type": "string",
                        "description": "Search pattern (literal string or regex)"
                    },
                    "path": {
                        "type": "string",
                        "description": "Directory to search in (defaults to working directory)"
                    },
                    "glob": {
                        "type": "string",
                        "description": "Glob pattern to filter files (e.g., '*.rs', '*.ts')"
                    },
                    "ignore_case": {
                        "type": "boolean",
                        "description": "Case-insensitive search"
                    },
                    "literal": {
                        "type": "boolean",
                        "description": "Treat pattern as literal string (no regex)"
                    },
                    "context": {
                        "type": "integer",
                        "description": "Number of context lines before and after each match"
                    },
                    "max_matches": {
                        "type": "integer",
                        "description": "Maximum number of matches to return (default: 100)"
                    }
                },
                "required": ["pattern"]
            }),
        }
    }

    async fn execute(
        &self,
        _call_id: &str,
        arguments: serde_json::Value,
        _partial_tx: Option<mpsc::UnboundedSender<String>>,
    ) -> ToolResult<ToolOutput> {
        let pattern = arguments.get("pattern").and_then(|v| v.as_str()).unwrap_or("");

        if pattern.is_empty() {
            return Ok(ToolOutput::error("Missing required parameter: pattern"));
        }

        let search_path = arguments
            .get("path")
            .and_then(|v| v.as_str())
            .map(|p| resolve_path(&self.cwd, p))
            .unwrap_or_else(|| self.cwd.clone());

        let glob_filter = arguments.get("glob").and_then(|v| v.as_str());
        let ignore_case = arguments.get("ignore_case").and_then(|v| v.as_bool()).unwrap_or(false);
        let literal = arguments.get("literal").and_then(|v| v.as_bool()).unwrap_or(false);
        let context_lines = arguments.get("context").and_then(|v| v.as_u64()).unwrap_or(0) as usize;
        let max_matches = arguments
            .get("max_matches")
            .and_then(|v| v.as_u64())
            .map(|v| (v as usize).min(MAX_MATCHES))
            .unwrap_or(MAX_MATCHES);

        let matcher = Matcher::new(pattern, literal, ignore_case);

        let mut files = Vec::new();
        if let Err(e) = collect_files(&search_path, &mut files, glob_filter).await {
            return Ok(ToolOutput::error(format!("Failed to enumerate files in {}: {}", search_path, e)));
        }

        files.sort();

        let mut output = String::new();
        let mut total_matches = 0;
        let mut files_with_matches = 0;

        'files: for file_path in &files {
            let content = match tokio::fs::read_to_string(file_path).await {
                Ok(c) => c,
                Err(_) => continue,
            };

            let lines: Vec<&str> = content.lines().collect();
            let mut file_had_match = false;

            for (line_idx, line) in lines.iter().enumerate() {
                if matcher.is_match(line) {
                    if !file_had_match {
                        if !output.is_empty() {
                            output.push('\n');
                        }
                        files_with_matches += 1;
                        file_had_match = true;
                    }

                    let ctx_start = line_idx.saturating_sub(context_lines);
                    for ctx_idx in ctx_start..line_idx {
                        output.push_str(&format!(
                            "{}:{}-{}\n",
                            display_path(file_path, &self.cwd),
                            ctx_idx + 1,
                            truncate_line(lines[ctx_idx], GREP_MAX_LINE_LENGTH)
                        ));
                    }

                    output.push_str(&format!(
                        "{}:{}:{}\n",
                        display_path(file_path, &self.cwd),
                        line_idx + 1,
                        truncate_line(line, GREP_MAX_LINE_LENGTH)
                    ));

                    let ctx_end = (line_idx + context_lines + 1).min(lines.len());
                    for ctx_idx in (line_idx + 1)..ctx_end {
                        output.push_str(&format!(
                            "{}:{}-{}\n",
                            display_path(file_path, &self.cwd),
                            ctx_idx + 1,
                            truncate_line(lines[ctx_idx], GREP_MAX_LINE_LENGTH)
                        ));
                    }

                    total_matches += 1;
                    if total_matches >= max_matches {
                        break 'files;
                    }
                }
            }
        }

        if total_matches == 0 {
            return Ok(ToolOutput::success(format!(
                "No matches found for pattern '{}' in {}",
                pattern,
                display_path(&search_path, &self.cwd)
            ))
            .with_metadata(json!({"matches": 0, "files": 0})));
        }

        let truncated = truncate_head(&output, total_matches + (total_matches * context_lines * 2), MAX_BYTES);

        let notice = truncated.truncation_notice();
        let is_truncated = truncated.is_truncated();
        let mut result = truncated.content;
        if total_matches >= max_matches {
            result.push_str(&format!("\n[Reached max matches limit: {}]", max_matches));
        }
        if let Some(notice) = notice {
            result.push_str(&format!("\n{}", notice));
        }

        Ok(ToolOutput::success(result).with_metadata(json!({
            "matches": total_matches,
            "files_with_matches": files_with_matches,
            "truncated": is_truncated,
        })))
    }
}

/// Make paths relative to cwd for display.
fn display_path(path: &str, cwd: &str) -> String {
    let cwd_prefix = format!("{}/", cwd.trim_end_matches('/'));
    if path.starts_with(&cwd_prefix) {
        path[cwd_prefix.len()..].to_string()
    } else {
        path.to_string()
    }
}
