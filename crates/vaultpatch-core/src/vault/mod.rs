//! Vault access: the [`VaultApi`] trait and its Local REST API client.

pub mod api;
pub mod client;
pub mod types;

pub use api::{VaultApi, VaultError};
pub use client::{ClientSettings, RestVaultClient};
pub use types::{FileListing, MatchSpan, Period, SearchHit, SearchMatch, recent_changes_query};
