//! Preset tool collections for common use cases.
//!
//! - `coding_tools()`: full modification access (read, write, edit, hashline_edit, bash)
//! - `read_only_tools()`: exploration without modification (read, grep, find, ls)
//! - `all_tools()`: everything

use std::sync::Arc;

use crate::tool::{Tool, ToolRegistry};
use crate::tools::{
    bash::BashTool, edit::EditTool, find::FindTool, grep::GrepTool,
    hashline_edit::HashlineEditTool, ls::LsTool, read::ReadTool, write::WriteTool,
};

/// Create coding tools: read, write, edit, hashline_edit, bash.
/// Full modification access for interactive coding sessions.
pub fn coding_tools(cwd: impl Into<String>) -> ToolRegistry {
    let cwd = cwd.into();
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(WriteTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(EditTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(HashlineEditTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(BashTool::new(&cwd)) as Arc<dyn Tool>);
    registry
}

/// Create read-only tools: read, grep, find, ls.
/// Exploration without modification access.
pub fn read_only_tools(cwd: impl Into<String>) -> ToolRegistry {
    let cwd = cwd.into();
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(GrepTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(FindTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(LsTool::new(&cwd)) as Arc<dyn Tool>);
    registry
}

/// Create all tools: read, write, edit, hashline_edit, bash, grep, find, ls.
/// Complete toolkit for full agent capabilities.
pub fn all_tools(cwd: impl Into<String>) -> ToolRegistry {
    let cwd = cwd.into();
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(ReadTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(WriteTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(EditTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(HashlineEditTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(BashTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(GrepTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(FindTool::new(&cwd)) as Arc<dyn Tool>);
    registry.register(Arc::new(LsTool::new(&cwd)) as Arc<dyn Tool>);
    registry
}
