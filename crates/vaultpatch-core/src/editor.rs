//! Read-modify-write edits of notes stored in a vault.

use std::sync::Arc;

use tracing::{debug, info};

use crate::patch::{
    AnchorTarget, HeadingSummary, PatchEngine, PatchError, PatchOutcome, PatchRequest,
};
use crate::path::normalize;
use crate::vault::{VaultApi, VaultError};

#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

/// How [`NoteEditor::create_or_update`] treated an existing note.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Created,
    Overwritten,
    Appended,
}

/// Applies patches to vault notes: fetch, patch in memory, write back.
///
/// Nothing is cached between calls; each edit works on a fresh copy.
#[derive(Clone)]
pub struct NoteEditor {
    vault: Arc<dyn VaultApi>,
    engine: PatchEngine,
}

impl NoteEditor {
    pub fn new(vault: Arc<dyn VaultApi>, engine: PatchEngine) -> Self {
        Self { vault, engine }
    }

    pub fn vault(&self) -> &Arc<dyn VaultApi> {
        &self.vault
    }

    pub fn engine(&self) -> &PatchEngine {
        &self.engine
    }

    pub async fn patch(&self, path: &str, request: &PatchRequest) -> Result<PatchOutcome, EditError> {
        let path = normalize(path);
        let text = self.vault.get_file(&path).await?;
        let outcome = self.engine.patch(&text, request)?;
        self.write_back(&path, &outcome).await?;
        info!(path = %path, anchor = %outcome.anchor, created = outcome.created, "patched note");
        Ok(outcome)
    }

    /// Like [`patch`](Self::patch), but a missing note is treated as empty
    /// when `request.create_if_missing` is set.
    pub async fn patch_or_create(
        &self,
        path: &str,
        request: &PatchRequest,
    ) -> Result<PatchOutcome, EditError> {
        let path = normalize(path);
        let text = match self.vault.get_file(&path).await {
            Ok(text) => text,
            Err(e) if e.is_not_found() && request.create_if_missing => {
                debug!(path = %path, "note missing, starting from empty");
                String::new()
            }
            Err(e) => return Err(e.into()),
        };
        let outcome = self.engine.patch(&text, request)?;
        self.write_back(&path, &outcome).await?;
        Ok(outcome)
    }

    pub async fn headings(&self, path: &str) -> Result<Vec<HeadingSummary>, EditError> {
        let text = self.vault.get_file(&normalize(path)).await?;
        Ok(self.engine.list_headings(&text))
    }

    /// Text currently under `target` in the note.
    pub async fn read_target(&self, path: &str, target: &AnchorTarget) -> Result<String, EditError> {
        let text = self.vault.get_file(&normalize(path)).await?;
        Ok(self.engine.read_target(&text, target)?)
    }

    pub async fn add_tag(&self, path: &str, tag: &str) -> Result<PatchOutcome, EditError> {
        let path = normalize(path);
        let text = self.vault.get_file(&path).await?;
        let outcome = self.engine.add_tag(&text, tag)?;
        self.write_back(&path, &outcome).await?;
        Ok(outcome)
    }

    /// Create the note, or overwrite/append when it already exists.
    pub async fn create_or_update(
        &self,
        path: &str,
        content: &str,
        overwrite: bool,
    ) -> Result<WriteMode, EditError> {
        let path = normalize(path);
        let mode = match self.vault.get_file(&path).await {
            Ok(_) if overwrite => WriteMode::Overwritten,
            Ok(_) => WriteMode::Appended,
            Err(e) if e.is_not_found() => WriteMode::Created,
            Err(e) => return Err(e.into()),
        };
        match mode {
            WriteMode::Appended => self.vault.append_file(&path, content).await?,
            WriteMode::Created | WriteMode::Overwritten => {
                self.vault.put_file(&path, content).await?
            }
        }
        info!(path = %path, ?mode, "wrote note");
        Ok(mode)
    }

    /// Concatenate several notes as `# path` sections. A note that cannot be
    /// read contributes its error message instead of failing the batch.
    pub async fn batch_contents(&self, paths: &[String]) -> String {
        let mut out = String::new();
        for raw in paths {
            let path = normalize(raw);
            match self.vault.get_file(&path).await {
                Ok(content) => out.push_str(&format!("# {path}\n\n{content}\n\n---\n\n")),
                Err(e) => out.push_str(&format!("# {path}\n\nError reading file: {e}\n\n---\n\n")),
            }
        }
        out
    }

    async fn write_back(&self, path: &str, outcome: &PatchOutcome) -> Result<(), VaultError> {
        if outcome.changed {
            self.vault.put_file(path, &outcome.text).await
        } else {
            debug!(path, "patch left note unchanged, skipping write");
            Ok(())
        }
    }
}
