//! Model Context Protocol server over stdio.

pub mod server;

pub use server::{McpError, VaultMcp};
