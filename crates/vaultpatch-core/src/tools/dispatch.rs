//! Routes tool calls to the vault and the patch engine.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info, warn};
use vaultpatch_config::AppConfig;

use crate::editor::{NoteEditor, WriteMode};
use crate::patch::{
    AnchorTarget, InsertionSpec, PatchEngine, PatchOutcome, PatchRequest, Position, TargetKind,
};
use crate::vault::{Period, SearchHit, VaultApi, recent_changes_query};

use super::args::{self, check_range};
use super::registry::ToolRegistry;
use super::types::{ToolAccess, ToolDefinition, ToolOutput};
use super::ToolError;

/// Executes tool calls against one vault.
pub struct ToolDispatcher {
    editor: NoteEditor,
    registry: ToolRegistry,
    ceiling: ToolAccess,
}

impl ToolDispatcher {
    /// Dispatcher exposing every tool with default patch settings.
    pub fn new(vault: Arc<dyn VaultApi>) -> Self {
        Self {
            editor: NoteEditor::new(vault, PatchEngine::default()),
            registry: ToolRegistry::with_defaults(),
            ceiling: ToolAccess::Destructive,
        }
    }

    pub fn from_config(vault: Arc<dyn VaultApi>, config: &AppConfig) -> Self {
        Self {
            editor: NoteEditor::new(vault, PatchEngine::new(config.patch.max_suggestions)),
            registry: ToolRegistry::with_defaults(),
            ceiling: ToolAccess::ceiling(config.tools.read_only, config.tools.allow_delete),
        }
    }

    pub fn with_ceiling(mut self, ceiling: ToolAccess) -> Self {
        self.ceiling = ceiling;
        self
    }

    /// Tools callable under the configured access ceiling.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.scoped_definitions(self.ceiling, None)
    }

    /// Whether `name` is a registered, enabled tool within the ceiling.
    pub fn permits(&self, name: &str) -> bool {
        self.registry
            .get(name)
            .is_some_and(|t| t.enabled && t.access <= self.ceiling)
    }

    /// Run one tool call with untyped arguments.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .registry
            .get(name)
            .filter(|t| t.enabled)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        if tool.access > self.ceiling {
            warn!(tool = name, access = ?tool.access, "tool call refused by configuration");
            return Err(ToolError::NotPermitted(name.to_string()));
        }

        info!(tool = name, "tool call");
        match name {
            "obsidian_list_files_in_vault" => self.list_files_in_vault().await,
            "obsidian_list_files_in_dir" => self.list_files_in_dir(args::parse(name, arguments)?).await,
            "obsidian_get_file_contents" => self.get_file_contents(args::parse(name, arguments)?).await,
            "obsidian_batch_get_file_contents" => {
                self.batch_get_file_contents(args::parse(name, arguments)?).await
            }
            "obsidian_list_headings" => self.list_headings(args::parse(name, arguments)?).await,
            "obsidian_simple_search" => self.simple_search(args::parse(name, arguments)?).await,
            "obsidian_complex_search" => self.complex_search(args::parse(name, arguments)?).await,
            "obsidian_get_recent_changes" => self.recent_changes(args::parse(name, arguments)?).await,
            "obsidian_get_periodic_note" => self.periodic_note(args::parse(name, arguments)?).await,
            "obsidian_get_recent_periodic_notes" => {
                self.recent_periodic_notes(args::parse(name, arguments)?).await
            }
            "obsidian_append_content" => self.append_content(args::parse(name, arguments)?).await,
            "obsidian_patch_content" => self.patch_content(args::parse(name, arguments)?).await,
            "obsidian_add_to_heading" => self.add_to_heading(args::parse(name, arguments)?).await,
            "obsidian_set_frontmatter_field" => {
                self.set_frontmatter_field(args::parse(name, arguments)?).await
            }
            "obsidian_add_tag" => self.add_tag(args::parse(name, arguments)?).await,
            "obsidian_create_or_update_note" => {
                self.create_or_update_note(args::parse(name, arguments)?).await
            }
            "obsidian_delete_file" => self.delete_file(args::parse(name, arguments)?).await,
            _ => Err(ToolError::UnknownTool(name.to_string())),
        }
    }

    /// Like [`call`](Self::call), but failures the caller can act on become
    /// error outputs. Only unknown tools remain errors.
    pub async fn call_for_output(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        match self.call(name, arguments).await {
            Ok(output) => Ok(output),
            Err(ToolError::UnknownTool(n)) => Err(ToolError::UnknownTool(n)),
            Err(e) => {
                warn!(tool = name, error = %e, "tool call failed");
                Ok(e.to_output())
            }
        }
    }

    pub async fn list_files_in_vault(&self) -> Result<ToolOutput, ToolError> {
        to_json(&self.editor.vault().list_files(None).await?)
    }

    pub async fn list_files_in_dir(&self, a: args::DirArgs) -> Result<ToolOutput, ToolError> {
        to_json(&self.editor.vault().list_files(Some(&a.dirpath)).await?)
    }

    pub async fn get_file_contents(&self, a: args::FileArgs) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::text(self.editor.vault().get_file(&a.filepath).await?))
    }

    pub async fn batch_get_file_contents(&self, a: args::BatchArgs) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::text(self.editor.batch_contents(&a.filepaths).await))
    }

    pub async fn list_headings(&self, a: args::FileArgs) -> Result<ToolOutput, ToolError> {
        to_json(&self.editor.headings(&a.filepath).await?)
    }

    pub async fn simple_search(&self, a: args::SimpleSearchArgs) -> Result<ToolOutput, ToolError> {
        let hits = self
            .editor
            .vault()
            .simple_search(&a.query, a.context_length)
            .await?;
        to_json(&format_hits(hits))
    }

    pub async fn complex_search(&self, a: args::ComplexSearchArgs) -> Result<ToolOutput, ToolError> {
        to_json(&self.editor.vault().search_json_logic(&a.query).await?)
    }

    pub async fn recent_changes(&self, a: args::RecentChangesArgs) -> Result<ToolOutput, ToolError> {
        const TOOL: &str = "obsidian_get_recent_changes";
        let limit = check_range(TOOL, "limit", a.limit, 1, Some(100))?;
        let days = check_range(TOOL, "days", a.days, 1, None)?;
        to_json(
            &self
                .editor
                .vault()
                .search_dql(&recent_changes_query(limit, days))
                .await?,
        )
    }

    pub async fn periodic_note(&self, a: args::PeriodicArgs) -> Result<ToolOutput, ToolError> {
        let period = parse_period("obsidian_get_periodic_note", &a.period)?;
        Ok(ToolOutput::text(self.editor.vault().periodic_note(period).await?))
    }

    pub async fn recent_periodic_notes(
        &self,
        a: args::RecentPeriodicArgs,
    ) -> Result<ToolOutput, ToolError> {
        const TOOL: &str = "obsidian_get_recent_periodic_notes";
        let period = parse_period(TOOL, &a.period)?;
        let limit = check_range(TOOL, "limit", a.limit, 1, Some(50))?;
        to_json(
            &self
                .editor
                .vault()
                .recent_periodic_notes(period, limit, a.include_content)
                .await?,
        )
    }

    pub async fn append_content(&self, a: args::ContentArgs) -> Result<ToolOutput, ToolError> {
        self.editor.vault().append_file(&a.filepath, &a.content).await?;
        Ok(ToolOutput::text(format!("Appended content to {}", a.filepath)))
    }

    pub async fn patch_content(&self, a: args::PatchArgs) -> Result<ToolOutput, ToolError> {
        let position: Position = a.operation.parse()?;
        let kind: TargetKind = a.target_type.parse()?;
        let request = PatchRequest {
            target: AnchorTarget::from_kind(kind, &a.target, a.trim_whitespace),
            spec: InsertionSpec::new(position, a.content).trimmed(a.trim_whitespace),
            create_if_missing: a.create_if_missing,
        };
        let outcome = self.editor.patch_or_create(&a.filepath, &request).await?;
        Ok(describe_patch(&a.filepath, &outcome))
    }

    pub async fn add_to_heading(&self, a: args::AddToHeadingArgs) -> Result<ToolOutput, ToolError> {
        let position = match a.position.trim().to_ascii_lowercase().as_str() {
            "start" => Position::Start,
            "end" => Position::End,
            other => {
                return Err(ToolError::InvalidArguments {
                    tool: "obsidian_add_to_heading".to_string(),
                    message: format!("position must be 'start' or 'end', got {other:?}"),
                });
            }
        };
        let request = PatchRequest {
            target: AnchorTarget::heading(a.heading, a.trim_whitespace),
            spec: InsertionSpec::new(position, a.content).trimmed(a.trim_whitespace),
            create_if_missing: a.create_if_missing,
        };
        let outcome = self.editor.patch_or_create(&a.filepath, &request).await?;
        Ok(describe_patch(&a.filepath, &outcome))
    }

    pub async fn set_frontmatter_field(
        &self,
        a: args::FrontmatterFieldArgs,
    ) -> Result<ToolOutput, ToolError> {
        let request = PatchRequest {
            target: AnchorTarget::frontmatter(a.field.trim()),
            spec: InsertionSpec::new(Position::Replace, a.rendered_value()),
            create_if_missing: a.create_if_missing,
        };
        let outcome = self.editor.patch_or_create(&a.filepath, &request).await?;
        Ok(describe_patch(&a.filepath, &outcome))
    }

    pub async fn add_tag(&self, a: args::TagArgs) -> Result<ToolOutput, ToolError> {
        let outcome = self.editor.add_tag(&a.filepath, &a.tag).await?;
        let tag = a.tag.trim().trim_start_matches('#');
        Ok(ToolOutput::text(if outcome.changed {
            format!("Added tag #{tag} to {}", a.filepath)
        } else {
            format!("{} already has tag #{tag}", a.filepath)
        }))
    }

    pub async fn create_or_update_note(
        &self,
        a: args::CreateOrUpdateArgs,
    ) -> Result<ToolOutput, ToolError> {
        let mode = self
            .editor
            .create_or_update(&a.filepath, &a.content, a.overwrite)
            .await?;
        let verb = match mode {
            WriteMode::Created => "Created",
            WriteMode::Overwritten => "Overwrote",
            WriteMode::Appended => "Appended to",
        };
        Ok(ToolOutput::text(format!("{verb} {}", a.filepath)))
    }

    pub async fn delete_file(&self, a: args::DeleteArgs) -> Result<ToolOutput, ToolError> {
        if !a.confirm {
            return Err(ToolError::InvalidArguments {
                tool: "obsidian_delete_file".to_string(),
                message: "confirm must be true to delete a file".to_string(),
            });
        }
        self.editor.vault().delete_file(&a.filepath).await?;
        Ok(ToolOutput::text(format!("Deleted {}", a.filepath)))
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<ToolOutput, ToolError> {
    Ok(ToolOutput::text(serde_json::to_string_pretty(value)?))
}

fn parse_period(tool: &str, raw: &str) -> Result<Period, ToolError> {
    raw.parse().map_err(|e: crate::vault::types::InvalidPeriod| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

fn format_hits(hits: Vec<SearchHit>) -> Value {
    Value::Array(
        hits.into_iter()
            .map(|hit| {
                json!({
                    "filename": hit.filename,
                    "score": hit.score,
                    "matches": hit.matches.iter().map(|m| json!({
                        "context": m.context,
                        "match_position": {"start": m.span.start, "end": m.span.end}
                    })).collect::<Vec<_>>()
                })
            })
            .collect(),
    )
}

fn describe_patch(path: &str, outcome: &PatchOutcome) -> ToolOutput {
    let mut text = if outcome.changed {
        format!("Patched {path} at {}", outcome.anchor)
    } else {
        format!("{path} already matches the requested content at {}", outcome.anchor)
    };
    if outcome.created {
        text.push_str(" (target created)");
    }
    ToolOutput::text(text)
}
