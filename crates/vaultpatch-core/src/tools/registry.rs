//! Tool registry: access levels, tags, and scoping.
//!
//! Names, descriptions, and argument schemas come from the MCP tool router;
//! this module only adds what a tool may do to the vault.

use std::collections::HashMap;

use tracing::warn;

use super::types::{ToolAccess, ToolDefinition};
use crate::mcp::VaultMcp;

/// Access level and scoping tags for every vault tool.
const CATALOG: &[(&str, ToolAccess, &[&str])] = &[
    ("obsidian_list_files_in_vault", ToolAccess::Read, &["browse"]),
    ("obsidian_list_files_in_dir", ToolAccess::Read, &["browse"]),
    ("obsidian_get_file_contents", ToolAccess::Read, &["read"]),
    ("obsidian_batch_get_file_contents", ToolAccess::Read, &["read"]),
    ("obsidian_list_headings", ToolAccess::Read, &["read", "edit"]),
    ("obsidian_simple_search", ToolAccess::Read, &["search"]),
    ("obsidian_complex_search", ToolAccess::Read, &["search"]),
    ("obsidian_get_recent_changes", ToolAccess::Read, &["search"]),
    ("obsidian_get_periodic_note", ToolAccess::Read, &["periodic"]),
    ("obsidian_get_recent_periodic_notes", ToolAccess::Read, &["periodic"]),
    ("obsidian_append_content", ToolAccess::Write, &["edit"]),
    ("obsidian_patch_content", ToolAccess::Write, &["edit"]),
    ("obsidian_add_to_heading", ToolAccess::Write, &["edit"]),
    ("obsidian_set_frontmatter_field", ToolAccess::Write, &["edit", "frontmatter"]),
    ("obsidian_add_tag", ToolAccess::Write, &["edit", "frontmatter"]),
    ("obsidian_create_or_update_note", ToolAccess::Write, &["edit"]),
    ("obsidian_delete_file", ToolAccess::Destructive, &["edit"]),
];

/// A registered tool with metadata.
#[derive(Debug, Clone)]
pub struct RegisteredTool {
    pub definition: ToolDefinition,
    /// What the tool may do to the vault.
    pub access: ToolAccess,
    /// Tags for scoping (e.g. "search", "edit", "periodic").
    pub tags: Vec<String>,
    pub enabled: bool,
}

/// Registry of all tools the server can expose.
pub struct ToolRegistry {
    tools: HashMap<String, RegisteredTool>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Registry holding every vault tool served over MCP.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for definition in VaultMcp::advertised_tools() {
            let Some((_, access, tags)) = CATALOG.iter().find(|(name, ..)| *name == definition.name)
            else {
                warn!(tool = %definition.name, "tool missing from access catalog, not registered");
                continue;
            };
            registry.register(RegisteredTool {
                definition,
                access: *access,
                tags: tags.iter().map(|t| t.to_string()).collect(),
                enabled: true,
            });
        }
        registry
    }

    pub fn register(&mut self, tool: RegisteredTool) {
        self.tools.insert(tool.definition.name.clone(), tool);
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    /// All registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Every enabled tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.scoped_definitions(ToolAccess::Destructive, None)
    }

    /// Enabled tools at or below `ceiling`, optionally restricted to those
    /// carrying at least one of `tags`. Sorted by name.
    pub fn scoped_definitions(
        &self,
        ceiling: ToolAccess,
        tags: Option<&[&str]>,
    ) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .filter(|t| t.enabled && t.access <= ceiling)
            .filter(|t| match tags {
                Some(wanted) => wanted.iter().any(|tag| t.tags.iter().any(|tt| tt == tag)),
                None => true,
            })
            .map(|t| t.definition.clone())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}
