#![deny(unsafe_code)]

//! vaultpatch CLI: MCP stdio server and one-shot note edits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vaultpatch_config::AppConfig;
use vaultpatch_core::build_info;
use vaultpatch_core::patch::{AnchorTarget, InsertionSpec, PatchEngine, PatchRequest, Position};
use vaultpatch_core::tools::{ToolAccess, ToolRegistry};
use vaultpatch_core::{EditError, NoteEditor, RestVaultClient, ToolDispatcher, VaultApi, VaultMcp};

/// vaultpatch: heading-aware editing of Obsidian notes over the Local REST API.
#[derive(Parser)]
#[command(name = "vaultpatch", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file.
    #[arg(short, long, default_value = "vaultpatch.toml")]
    config: PathBuf,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server on stdin/stdout.
    Serve,

    /// List the tools exposed under the current configuration.
    Tools {
        /// Only tools carrying this tag.
        #[arg(long)]
        tag: Option<String>,

        /// Print full definitions as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Invoke one tool and print its result.
    Call {
        name: String,

        /// Tool arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Print the heading outline of a note.
    Headings {
        path: String,

        #[arg(long)]
        json: bool,
    },

    /// Print the text under a heading, block, or frontmatter field.
    Read {
        path: String,

        #[command(flatten)]
        target: TargetArgs,

        /// Match headings ignoring surrounding whitespace.
        #[arg(long)]
        trim: bool,
    },

    /// Insert or replace content at a heading, block, or frontmatter field.
    Patch {
        path: String,

        #[command(flatten)]
        target: TargetArgs,

        /// start, end, or replace.
        #[arg(long, default_value = "end")]
        position: String,

        /// Content to insert; read from stdin when omitted.
        #[arg(long, allow_hyphen_values = true)]
        content: Option<String>,

        /// Trim the content and match headings loosely.
        #[arg(long)]
        trim: bool,

        /// Create the heading or frontmatter field (or the note) if missing.
        #[arg(long)]
        create: bool,
    },

    /// Validate and display configuration.
    Config {
        /// Show the resolved configuration.
        #[arg(long)]
        show: bool,
    },

    /// Print version, git hash, and build profile.
    Version,
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct TargetArgs {
    /// Heading text, optionally qualified as `Parent > Child`.
    #[arg(long)]
    heading: Option<String>,

    /// Block reference id, with or without `^`.
    #[arg(long)]
    block: Option<String>,

    /// Frontmatter key.
    #[arg(long)]
    frontmatter: Option<String>,
}

impl TargetArgs {
    fn to_target(&self, trim: bool) -> Result<AnchorTarget> {
        match (&self.heading, &self.block, &self.frontmatter) {
            (Some(h), None, None) => Ok(AnchorTarget::heading(h.as_str(), trim)),
            (None, Some(b), None) => Ok(AnchorTarget::block(b)),
            (None, None, Some(f)) => Ok(AnchorTarget::frontmatter(f.as_str())),
            _ => Err(anyhow!(
                "exactly one of --heading, --block, or --frontmatter is required"
            )),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli.config).await?;

    let level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    // stdout carries MCP traffic and command output, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();
    if !cli.config.exists() {
        info!(path = %cli.config.display(), "config file not found, using defaults");
    }

    let output = run(cli.command, &cli.config, &config).await?;
    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}

async fn run(command: Commands, config_path: &Path, config: &AppConfig) -> Result<String> {
    match command {
        Commands::Serve => cmd_serve(config).await,
        Commands::Tools { tag, json } => cmd_tools(config, tag.as_deref(), json),
        Commands::Call { name, args } => cmd_call(config, &name, &args).await,
        Commands::Headings { path, json } => cmd_headings(config, &path, json).await,
        Commands::Read { path, target, trim } => {
            let target = target.to_target(trim)?;
            editor(config)?
                .read_target(&path, &target)
                .await
                .map_err(explain)
        }
        Commands::Patch {
            path,
            target,
            position,
            content,
            trim,
            create,
        } => {
            let content = match content {
                Some(c) => c,
                None => read_stdin().await?,
            };
            let position: Position = position.parse().map_err(|e| anyhow!("{e}"))?;
            let request = PatchRequest {
                target: target.to_target(trim)?,
                spec: InsertionSpec::new(position, content).trimmed(trim),
                create_if_missing: create,
            };
            cmd_patch(config, &path, &request).await
        }
        Commands::Config { show } => cmd_config(config_path, config, show),
        Commands::Version => Ok(format!(
            "{} {}",
            build_info::SERVER_NAME,
            build_info::version_string()
        )),
    }
}

async fn cmd_serve(config: &AppConfig) -> Result<String> {
    let dispatcher = ToolDispatcher::from_config(connect(config)?, config);
    info!(tools = dispatcher.definitions().len(), "starting MCP server");
    VaultMcp::new(dispatcher).serve_stdio().await?;
    Ok(String::new())
}

fn cmd_tools(config: &AppConfig, tag: Option<&str>, json: bool) -> Result<String> {
    let ceiling = ToolAccess::ceiling(config.tools.read_only, config.tools.allow_delete);
    let tags: Vec<&str> = tag.into_iter().collect();
    let definitions = ToolRegistry::with_defaults()
        .scoped_definitions(ceiling, (!tags.is_empty()).then_some(tags.as_slice()));
    if json {
        return Ok(serde_json::to_string_pretty(&definitions)?);
    }
    Ok(definitions
        .iter()
        .map(|d| {
            let summary = d.description.lines().next().unwrap_or_default();
            format!("{:<36} {summary}", d.name)
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

async fn cmd_call(config: &AppConfig, name: &str, raw_args: &str) -> Result<String> {
    let arguments: Value =
        serde_json::from_str(raw_args).with_context(|| format!("--args is not valid JSON: {raw_args}"))?;
    let dispatcher = ToolDispatcher::from_config(connect(config)?, config);
    let output = dispatcher.call_for_output(name, arguments).await?;
    if output.is_error {
        return Err(anyhow!(output.text));
    }
    Ok(output.text)
}

async fn cmd_headings(config: &AppConfig, path: &str, json: bool) -> Result<String> {
    let headings = editor(config)?.headings(path).await.map_err(explain)?;
    if json {
        return Ok(serde_json::to_string_pretty(&headings)?);
    }
    Ok(headings
        .iter()
        .map(|h| {
            let indent = "  ".repeat(usize::from(h.level.saturating_sub(1)));
            format!("{indent}{} {}  (line {})", "#".repeat(usize::from(h.level)), h.text.trim(), h.line)
        })
        .collect::<Vec<_>>()
        .join("\n"))
}

async fn cmd_patch(config: &AppConfig, path: &str, request: &PatchRequest) -> Result<String> {
    let outcome = editor(config)?
        .patch_or_create(path, request)
        .await
        .map_err(explain)?;
    let mut text = if outcome.changed {
        format!("Patched {path} at {}", outcome.anchor)
    } else {
        format!("{path} unchanged at {}", outcome.anchor)
    };
    if outcome.created {
        text.push_str(" (target created)");
    }
    Ok(text)
}

fn cmd_config(config_path: &Path, config: &AppConfig, show: bool) -> Result<String> {
    if show {
        // The API key is never serialized, so the dump is safe to print.
        let toml_str = toml::to_string_pretty(config)
            .map_err(|e| anyhow!("TOML error: {e}"))?;
        return Ok(toml_str);
    }
    Ok(format!(
        "Configuration at '{}' is valid.",
        config_path.display()
    ))
}

/// Patch errors carry guidance worth showing in full.
fn explain(err: EditError) -> anyhow::Error {
    match err {
        EditError::Patch(e) => anyhow!(e.render()),
        other => anyhow!(other),
    }
}

fn connect(config: &AppConfig) -> Result<Arc<dyn VaultApi>> {
    config.require_api_key()?;
    Ok(Arc::new(RestVaultClient::from_config(&config.vault)?))
}

fn editor(config: &AppConfig) -> Result<NoteEditor> {
    Ok(NoteEditor::new(
        connect(config)?,
        PatchEngine::new(config.patch.max_suggestions),
    ))
}

async fn read_stdin() -> Result<String> {
    let mut content = String::new();
    tokio::io::stdin()
        .read_to_string(&mut content)
        .await
        .context("failed to read content from stdin")?;
    Ok(content)
}

async fn load_config(path: &Path) -> Result<AppConfig> {
    let config = if path.exists() {
        AppConfig::load(path)
            .await
            .with_context(|| format!("failed to load {}", path.display()))?
    } else {
        AppConfig::default()
    };
    Ok(config.apply_env()?)
}
