//! MCP tool server backed by a [`ToolDispatcher`].

use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData, ServerHandler, ServiceExt, tool, tool_handler, tool_router};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{info, warn};

use crate::build_info::{SERVER_NAME, VERSION};
use crate::tools::args::{
    AddToHeadingArgs, BatchArgs, ComplexSearchArgs, ContentArgs, CreateOrUpdateArgs, DeleteArgs,
    DirArgs, FileArgs, FrontmatterFieldArgs, PatchArgs, PeriodicArgs, RecentChangesArgs,
    RecentPeriodicArgs, SimpleSearchArgs, TagArgs,
};
use crate::tools::{ToolDefinition, ToolDispatcher, ToolError, ToolOutput};

#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("MCP session failed to start: {0}")]
    Initialize(String),

    #[error("MCP session task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Vault tools exposed to an MCP host.
///
/// Tools above the dispatcher's access ceiling are removed from the router,
/// so they are neither listed nor callable.
#[derive(Clone)]
pub struct VaultMcp {
    dispatcher: Arc<ToolDispatcher>,
    tool_router: ToolRouter<Self>,
}

impl VaultMcp {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        let mut tool_router = Self::tool_router();
        let hidden: Vec<String> = tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .filter(|name| !dispatcher.permits(name))
            .collect();
        for name in &hidden {
            tool_router.remove_route(name);
        }
        Self {
            dispatcher: Arc::new(dispatcher),
            tool_router,
        }
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    /// Every tool the router knows, before access scoping.
    pub fn advertised_tools() -> Vec<ToolDefinition> {
        Self::tool_router()
            .list_all()
            .into_iter()
            .map(|tool| ToolDefinition {
                name: tool.name.to_string(),
                description: tool.description.as_deref().unwrap_or_default().to_string(),
                parameters: Value::Object(tool.input_schema.as_ref().clone()),
            })
            .collect()
    }

    /// Names of the tools this server will list and accept, sorted.
    pub fn served_tools(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tool_router
            .list_all()
            .into_iter()
            .map(|tool| tool.name.to_string())
            .collect();
        names.sort();
        names
    }

    /// Serve on the process's stdin and stdout until the host disconnects.
    pub async fn serve_stdio(self) -> Result<(), McpError> {
        self.serve_io(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve one newline-delimited JSON-RPC session over `reader`/`writer`.
    pub async fn serve_io<R, W>(self, reader: R, writer: W) -> Result<(), McpError>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        info!(server = SERVER_NAME, version = VERSION, "MCP server starting");
        let service = self
            .serve((reader, writer))
            .await
            .map_err(|e| McpError::Initialize(e.to_string()))?;
        let reason = service.waiting().await?;
        info!(?reason, "MCP session ended");
        Ok(())
    }
}

/// Turn a dispatcher result into an MCP tool result. Failures the caller can
/// act on are error results, not protocol errors.
fn respond(tool: &str, result: Result<ToolOutput, ToolError>) -> Result<CallToolResult, ErrorData> {
    let output = result.unwrap_or_else(|e| {
        warn!(tool, error = %e, "tool call failed");
        e.to_output()
    });
    Ok(if output.is_error {
        CallToolResult::error(vec![Content::text(output.text)])
    } else {
        CallToolResult::success(vec![Content::text(output.text)])
    })
}

#[tool_router]
impl VaultMcp {
    #[tool(
        name = "obsidian_list_files_in_vault",
        description = "List the files and directories at the root of the vault. Directories end with '/'."
    )]
    async fn list_files_in_vault(&self) -> Result<CallToolResult, ErrorData> {
        respond(
            "obsidian_list_files_in_vault",
            self.dispatcher.list_files_in_vault().await,
        )
    }

    #[tool(
        name = "obsidian_list_files_in_dir",
        description = "List the files and directories inside one vault directory. Empty directories are not returned."
    )]
    async fn list_files_in_dir(
        &self,
        Parameters(args): Parameters<DirArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(
            "obsidian_list_files_in_dir",
            self.dispatcher.list_files_in_dir(args).await,
        )
    }

    #[tool(
        name = "obsidian_get_file_contents",
        description = "Return the full text of one note."
    )]
    async fn get_file_contents(
        &self,
        Parameters(args): Parameters<FileArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(
            "obsidian_get_file_contents",
            self.dispatcher.get_file_contents(args).await,
        )
    }

    #[tool(
        name = "obsidian_batch_get_file_contents",
        description = "Return several notes at once, each under a '# <path>' header and separated by '---'."
    )]
    async fn batch_get_file_contents(
        &self,
        Parameters(args): Parameters<BatchArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(
            "obsidian_batch_get_file_contents",
            self.dispatcher.batch_get_file_contents(args).await,
        )
    }

    #[tool(
        name = "obsidian_list_headings",
        description = "List the headings of a note with their level, ancestor path, and line number. Use the path to target a heading that occurs more than once."
    )]
    async fn list_headings(
        &self,
        Parameters(args): Parameters<FileArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("obsidian_list_headings", self.dispatcher.list_headings(args).await)
    }

    #[tool(
        name = "obsidian_simple_search",
        description = "Search every note for a text query. Returns matching files with the surrounding context of each match."
    )]
    async fn simple_search(
        &self,
        Parameters(args): Parameters<SimpleSearchArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("obsidian_simple_search", self.dispatcher.simple_search(args).await)
    }

    #[tool(
        name = "obsidian_complex_search",
        description = "Search notes with a JsonLogic query. Supports the 'glob' and 'regexp' operators, e.g. {\"glob\": [\"*.md\", {\"var\": \"path\"}]}."
    )]
    async fn complex_search(
        &self,
        Parameters(args): Parameters<ComplexSearchArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("obsidian_complex_search", self.dispatcher.complex_search(args).await)
    }

    #[tool(
        name = "obsidian_get_recent_changes",
        description = "List recently modified notes, newest first. Requires the Dataview plugin."
    )]
    async fn recent_changes(
        &self,
        Parameters(args): Parameters<RecentChangesArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(
            "obsidian_get_recent_changes",
            self.dispatcher.recent_changes(args).await,
        )
    }

    #[tool(
        name = "obsidian_get_periodic_note",
        description = "Return the current periodic note for a period."
    )]
    async fn periodic_note(
        &self,
        Parameters(args): Parameters<PeriodicArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("obsidian_get_periodic_note", self.dispatcher.periodic_note(args).await)
    }

    #[tool(
        name = "obsidian_get_recent_periodic_notes",
        description = "Return the most recent periodic notes for a period."
    )]
    async fn recent_periodic_notes(
        &self,
        Parameters(args): Parameters<RecentPeriodicArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(
            "obsidian_get_recent_periodic_notes",
            self.dispatcher.recent_periodic_notes(args).await,
        )
    }

    #[tool(
        name = "obsidian_append_content",
        description = "Append text to the end of a note, creating the note if it does not exist."
    )]
    async fn append_content(
        &self,
        Parameters(args): Parameters<ContentArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("obsidian_append_content", self.dispatcher.append_content(args).await)
    }

    #[tool(
        name = "obsidian_patch_content",
        description = "Insert or replace content relative to a heading, block reference, or frontmatter field. Headings can be qualified with their parents ('Parent > Child'). When the target is missing or ambiguous the error lists the closest valid targets."
    )]
    async fn patch_content(
        &self,
        Parameters(args): Parameters<PatchArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("obsidian_patch_content", self.dispatcher.patch_content(args).await)
    }

    #[tool(
        name = "obsidian_add_to_heading",
        description = "Add content at the start or end of a heading's section."
    )]
    async fn add_to_heading(
        &self,
        Parameters(args): Parameters<AddToHeadingArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("obsidian_add_to_heading", self.dispatcher.add_to_heading(args).await)
    }

    #[tool(
        name = "obsidian_set_frontmatter_field",
        description = "Set one frontmatter field to a value, adding the field (and frontmatter block) if needed."
    )]
    async fn set_frontmatter_field(
        &self,
        Parameters(args): Parameters<FrontmatterFieldArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(
            "obsidian_set_frontmatter_field",
            self.dispatcher.set_frontmatter_field(args).await,
        )
    }

    #[tool(
        name = "obsidian_add_tag",
        description = "Add a tag to a note's frontmatter 'tags' field. Adding an existing tag does nothing."
    )]
    async fn add_tag(&self, Parameters(args): Parameters<TagArgs>) -> Result<CallToolResult, ErrorData> {
        respond("obsidian_add_tag", self.dispatcher.add_tag(args).await)
    }

    #[tool(
        name = "obsidian_create_or_update_note",
        description = "Create a note. If it exists, append to it, or replace it when overwrite is true."
    )]
    async fn create_or_update_note(
        &self,
        Parameters(args): Parameters<CreateOrUpdateArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond(
            "obsidian_create_or_update_note",
            self.dispatcher.create_or_update_note(args).await,
        )
    }

    #[tool(
        name = "obsidian_delete_file",
        description = "Delete a file or directory from the vault. Requires confirm = true."
    )]
    async fn delete_file(
        &self,
        Parameters(args): Parameters<DeleteArgs>,
    ) -> Result<CallToolResult, ErrorData> {
        respond("obsidian_delete_file", self.dispatcher.delete_file(args).await)
    }
}

#[tool_handler]
impl ServerHandler for VaultMcp {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: VERSION.to_string(),
                ..Implementation::default()
            },
            instructions: Some(
                "Read, search, and edit an Obsidian vault. List a note's headings before patching \
                 relative to a heading that may occur more than once."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}
