#![deny(unsafe_code)]

//! Shared test utilities for the vaultpatch workspace.
//!
//! Provides an in-memory vault, a mock Local REST API server, config
//! builders, and tracing helpers so crate tests stay short.
//!
//! ```toml
//! [dev-dependencies]
//! vaultpatch-test-utils = { workspace = true }
//! ```

pub mod config;
pub mod memory_vault;
pub mod mock_server;
pub mod tracing_setup;

pub use config::{TestConfigBuilder, TestConfigFile};
pub use memory_vault::MemoryVault;
pub use mock_server::{MockRestApi, TEST_API_KEY};
