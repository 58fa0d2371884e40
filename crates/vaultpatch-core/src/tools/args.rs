//! Typed tool arguments. Their JSON Schemas are what MCP hosts see.

use rmcp::schemars;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ToolError;

/// Deserialize `args` for `tool`, mapping failures to
/// [`ToolError::InvalidArguments`]. `null` is treated as `{}`.
pub fn parse<T: DeserializeOwned>(tool: &str, args: Value) -> Result<T, ToolError> {
    let args = if args.is_null() {
        Value::Object(Default::default())
    } else {
        args
    };
    serde_json::from_value(args).map_err(|e| ToolError::InvalidArguments {
        tool: tool.to_string(),
        message: e.to_string(),
    })
}

/// Check an integer argument against an inclusive range.
pub fn check_range(tool: &str, name: &str, value: u32, min: u32, max: Option<u32>) -> Result<u32, ToolError> {
    let too_big = max.is_some_and(|m| value > m);
    if value < min || too_big {
        let bound = match max {
            Some(m) => format!("between {min} and {m}"),
            None => format!("at least {min}"),
        };
        return Err(ToolError::InvalidArguments {
            tool: tool.to_string(),
            message: format!("{name} must be {bound}, got {value}"),
        });
    }
    Ok(value)
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DirArgs {
    #[schemars(description = "Directory path relative to the vault root")]
    pub dirpath: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FileArgs {
    #[schemars(description = "Path to the note, relative to the vault root")]
    pub filepath: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct BatchArgs {
    #[schemars(description = "Note paths relative to the vault root")]
    pub filepaths: Vec<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SimpleSearchArgs {
    #[schemars(description = "Text to search for")]
    pub query: String,
    #[schemars(description = "Characters of context to return around each match")]
    #[serde(default = "default_context_length")]
    pub context_length: u32,
}

fn default_context_length() -> u32 {
    100
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ComplexSearchArgs {
    #[schemars(description = "JsonLogic query object")]
    pub query: Value,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PeriodicArgs {
    #[schemars(description = "One of daily, weekly, monthly, quarterly, yearly")]
    pub period: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecentPeriodicArgs {
    #[schemars(description = "One of daily, weekly, monthly, quarterly, yearly")]
    pub period: String,
    #[schemars(description = "Number of notes to return, 1 to 50")]
    #[serde(default = "default_periodic_limit")]
    pub limit: u32,
    #[serde(default)]
    pub include_content: bool,
}

fn default_periodic_limit() -> u32 {
    5
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecentChangesArgs {
    #[schemars(description = "Number of notes to return, 1 to 100")]
    #[serde(default = "default_recent_limit")]
    pub limit: u32,
    #[schemars(description = "Only notes modified within this many days")]
    #[serde(default = "default_days")]
    pub days: u32,
}

fn default_recent_limit() -> u32 {
    10
}

fn default_days() -> u32 {
    90
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ContentArgs {
    #[schemars(description = "Path to the note, relative to the vault root")]
    pub filepath: String,
    #[schemars(description = "Text to append")]
    pub content: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PatchArgs {
    #[schemars(description = "Path to the note, relative to the vault root")]
    pub filepath: String,
    #[schemars(description = "append, prepend, or replace")]
    pub operation: String,
    #[schemars(description = "heading, block, or frontmatter")]
    pub target_type: String,
    #[schemars(description = "Heading text or 'Parent > Child' path, block reference id, or frontmatter key")]
    pub target: String,
    pub content: String,
    #[serde(default)]
    pub create_if_missing: bool,
    #[serde(default)]
    pub trim_whitespace: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddToHeadingArgs {
    #[schemars(description = "Path to the note, relative to the vault root")]
    pub filepath: String,
    #[schemars(description = "Heading text or 'Parent > Child' path")]
    pub heading: String,
    pub content: String,
    #[schemars(description = "start or end")]
    #[serde(default = "default_position")]
    pub position: String,
    #[serde(default = "yes")]
    pub trim_whitespace: bool,
    #[serde(default)]
    pub create_if_missing: bool,
}

fn default_position() -> String {
    "end".to_string()
}

fn yes() -> bool {
    true
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FrontmatterFieldArgs {
    #[schemars(description = "Path to the note, relative to the vault root")]
    pub filepath: String,
    pub field: String,
    #[schemars(description = "New value; strings are written as-is, other JSON values as JSON")]
    pub value: Value,
    #[serde(default = "yes")]
    pub create_if_missing: bool,
}

impl FrontmatterFieldArgs {
    /// The value as it should appear after `key: `.
    pub fn rendered_value(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct TagArgs {
    #[schemars(description = "Path to the note, relative to the vault root")]
    pub filepath: String,
    #[schemars(description = "Tag, with or without a leading '#'")]
    pub tag: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateOrUpdateArgs {
    #[schemars(description = "Path to the note, relative to the vault root")]
    pub filepath: String,
    pub content: String,
    #[schemars(description = "Replace an existing note instead of appending to it")]
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct DeleteArgs {
    #[schemars(description = "Path to the file or directory, relative to the vault root")]
    pub filepath: String,
    #[schemars(description = "Must be true to delete")]
    #[serde(default)]
    pub confirm: bool,
}
