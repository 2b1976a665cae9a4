//! # hashline-core
//!
//! Line-addressed file editing for coding agents: a fuzzy text locator, a
//! content-tagged hashline view, and an optimistic-concurrency batch-edit
//! engine, wired up as a small toolbelt (read, write, edit, hashline_edit,
//! bash, grep, find, ls).
//!
//! ## Quick Start
//!
//! ```rust
//! use hashline_core::presets;
//!
//! // Create all 8 coding tools rooted at a working directory
//! let registry = presets::all_tools("/workspace");
//!
//! assert_eq!(registry.len(), 8);
//! ```
//!
//! ## Tool Presets
//!
//! | Preset | Tools | Use Case |
//! |--------|-------|----------|
//! | `coding_tools` | read, write, edit, hashline_edit, bash | Interactive coding sessions |
//! | `read_only_tools` | read, grep, find, ls | Codebase exploration |
//! | `all_tools` | all 8 tools | Full agent capabilities |
//!
//! ## Individual Tools
//!
//! Each tool can be instantiated independently:
//!
//! ```rust
//! use hashline_core::tools::read::ReadTool;
//!
//! let tool = ReadTool::new("/workspace");
//! ```

pub mod core;
pub mod error;
pub mod presets;
pub mod tool;
pub mod tools;
pub mod truncate;

// Re-export key types for convenience
pub use error::HashlineError;
pub use presets::{all_tools, coding_tools, read_only_tools};
pub use tool::{Tool, ToolDefinition, ToolError, ToolOutput, ToolRegistry, ToolResult};
pub use tools::{
    bash::BashTool,
    edit::EditTool,
    find::FindTool,
    grep::GrepTool,
    hashline_edit::HashlineEditTool,
    ls::LsTool,
    read::ReadTool,
    write::WriteTool,
};
