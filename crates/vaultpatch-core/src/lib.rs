#![deny(unsafe_code)]

//! vaultpatch core: heading-relative editing of Obsidian notes.
//!
//! The patch engine locates a heading, block reference, or frontmatter field
//! inside a Markdown note and splices content in at that anchor. Around it
//! sit a client for the Obsidian Local REST API, a registry of named tools,
//! and an MCP server that exposes those tools to an assistant over stdio.

use std::future::Future;
use std::pin::Pin;

/// Boxed `Send` future, used as the return type of object-safe async traits
/// such as [`vault::VaultApi`].
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Compile-time build metadata (version, git hash, profile).
pub mod build_info;
/// Vault-backed read-modify-write note edits.
pub mod editor;
/// MCP tool server (rmcp) over stdio.
pub mod mcp;
/// Heading index, target resolution, and section patching.
pub mod patch;
/// Vault-relative path normalization.
pub mod path;
/// API key storage with zeroization.
pub mod secret;
/// Tool registry and dispatcher.
pub mod tools;
/// `VaultApi` trait and the Local REST API client.
pub mod vault;

pub use editor::{EditError, NoteEditor};
pub use mcp::VaultMcp;
pub use patch::{PatchEngine, PatchError, PatchRequest};
pub use tools::{ToolDispatcher, ToolError};
pub use vault::{RestVaultClient, VaultApi, VaultError};
