//! Minimal tool-composition scaffolding: enough of a `Tool`/`ToolOutput`/
//! `ToolDefinition` surface for `presets` to build an `Arc<dyn Tool>`
//! registry, without pulling in session orchestration, streaming events,
//! or model dispatch — none of which this crate needs.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

/// Tool execution failure. Distinct from [`crate::error::HashlineError`]:
/// this is the outer "something went wrong invoking the tool" error, not
/// the core's structured edit-batch error.
#[derive(Debug)]
pub struct ToolError(pub String);

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ToolError {}

impl From<std::io::Error> for ToolError {
    fn from(e: std::io::Error) -> Self {
        ToolError(e.to_string())
    }
}

pub type ToolResult<T> = Result<T, ToolError>;

/// JSON-schema-shaped description of a tool, as handed to a model.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// The result of invoking a tool once.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub content: String,
    pub is_error: bool,
    pub metadata: Value,
}

impl ToolOutput {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            metadata: Value::Null,
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_error: true,
            metadata: Value::Null,
        }
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// A single invokable tool.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn definition(&self) -> ToolDefinition;

    async fn execute(
        &self,
        call_id: &str,
        arguments: Value,
        partial_tx: Option<mpsc::UnboundedSender<String>>,
    ) -> ToolResult<ToolOutput>;
}

/// Name-indexed collection of tools, the composition unit `presets` hands
/// back to a caller. No multi-backend routing or config-driven dispatch —
/// this crate only ever calls its own in-process tools directly.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<std::sync::Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: std::sync::Arc<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn get(&self, name: &str) -> Option<&std::sync::Arc<dyn Tool>> {
        self.tools.iter().find(|t| t.name() == name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition()).collect()
    }

    pub async fn execute(
        &self,
        name: &str,
        call_id: &str,
        arguments: Value,
        partial_tx: Option<mpsc::UnboundedSender<String>>,
    ) -> ToolResult<ToolOutput> {
        match self.get(name) {
            Some(tool) => tool.execute(call_id, arguments, partial_tx).await,
            None => Err(ToolError(format!("unknown tool: {name}"))),
        }
    }
}
