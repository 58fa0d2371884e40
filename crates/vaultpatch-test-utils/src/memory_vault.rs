//! In-memory [`VaultApi`] for tests.
//!
//! Behaves like the Local REST API for the operations tools use: missing
//! files are 404s, appends create files, and directory listings fold nested
//! paths into `dir/` entries.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::{Value, json};
use vaultpatch_core::BoxFuture;
use vaultpatch_core::vault::{MatchSpan, Period, SearchHit, SearchMatch, VaultApi, VaultError};

#[derive(Default)]
pub struct MemoryVault {
    files: Mutex<BTreeMap<String, String>>,
    periodic: Mutex<BTreeMap<String, String>>,
    queries: Mutex<Vec<String>>,
    writes: AtomicUsize,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_file(self, path: &str, content: &str) -> Self {
        self.insert(path, content);
        self
    }

    pub fn insert(&self, path: &str, content: &str) {
        self.files
            .lock()
            .expect("vault lock poisoned")
            .insert(path.to_string(), content.to_string());
    }

    pub fn set_periodic(&self, period: Period, content: &str) {
        self.periodic
            .lock()
            .expect("vault lock poisoned")
            .insert(period.as_str().to_string(), content.to_string());
    }

    pub fn content(&self, path: &str) -> Option<String> {
        self.files.lock().expect("vault lock poisoned").get(path).cloned()
    }

    pub fn paths(&self) -> Vec<String> {
        self.files
            .lock()
            .expect("vault lock poisoned")
            .keys()
            .cloned()
            .collect()
    }

    /// Number of put/append/delete calls made so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// DQL and JsonLogic queries received, in order.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().expect("vault lock poisoned").clone()
    }
}

pub fn not_found(operation: &'static str) -> VaultError {
    VaultError::Api {
        status: 404,
        code: 40400,
        message: "File not found".to_string(),
        operation,
        suggestion: None,
    }
}

/// Entries directly under `dir` (`""` for the root), directories suffixed
/// with `/`. `None` when nothing lives under `dir`.
pub fn list_entries<'a>(paths: impl Iterator<Item = &'a String>, dir: &str) -> Option<Vec<String>> {
    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    };
    let entries: BTreeSet<String> = paths
        .filter_map(|p| p.strip_prefix(&prefix))
        .map(|rest| match rest.split_once('/') {
            Some((first, _)) => format!("{first}/"),
            None => rest.to_string(),
        })
        .collect();
    (!entries.is_empty() || dir.is_empty()).then(|| entries.into_iter().collect())
}

/// Case-sensitive substring search; the context is the line holding the match.
pub fn search_files<'a>(
    files: impl Iterator<Item = (&'a String, &'a String)>,
    query: &str,
) -> Vec<SearchHit> {
    if query.is_empty() {
        return Vec::new();
    }
    files
        .filter_map(|(path, content)| {
            let matches: Vec<SearchMatch> = content
                .match_indices(query)
                .map(|(start, m)| {
                    let line_start = content[..start].rfind('\n').map_or(0, |i| i + 1);
                    let line_end = content[start..]
                        .find('\n')
                        .map_or(content.len(), |i| start + i);
                    SearchMatch {
                        context: content[line_start..line_end].to_string(),
                        span: MatchSpan {
                            start,
                            end: start + m.len(),
                        },
                    }
                })
                .collect();
            (!matches.is_empty()).then(|| SearchHit {
                filename: path.clone(),
                score: matches.len() as f64,
                matches,
            })
        })
        .collect()
}

impl VaultApi for MemoryVault {
    fn list_files<'a>(&'a self, dir: Option<&'a str>) -> BoxFuture<'a, Result<Vec<String>, VaultError>> {
        Box::pin(async move {
            let dir = vaultpatch_core::path::normalize(dir.unwrap_or(""));
            let files = self.files.lock().expect("vault lock poisoned");
            list_entries(files.keys(), &dir).ok_or_else(|| not_found("list_files"))
        })
    }

    fn get_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String, VaultError>> {
        Box::pin(async move {
            let path = vaultpatch_core::path::normalize(path);
            self.content(&path).ok_or_else(|| not_found("get_file"))
        })
    }

    fn put_file<'a>(&'a self, path: &'a str, content: &'a str) -> BoxFuture<'a, Result<(), VaultError>> {
        Box::pin(async move {
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.insert(&vaultpatch_core::path::normalize(path), content);
            Ok(())
        })
    }

    fn append_file<'a>(
        &'a self,
        path: &'a str,
        content: &'a str,
    ) -> BoxFuture<'a, Result<(), VaultError>> {
        Box::pin(async move {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let path = vaultpatch_core::path::normalize(path);
            self.files
                .lock()
                .expect("vault lock poisoned")
                .entry(path)
                .or_default()
                .push_str(content);
            Ok(())
        })
    }

    fn delete_file<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<(), VaultError>> {
        Box::pin(async move {
            self.writes.fetch_add(1, Ordering::SeqCst);
            let path = vaultpatch_core::path::normalize(path);
            self.files
                .lock()
                .expect("vault lock poisoned")
                .remove(&path)
                .map(drop)
                .ok_or_else(|| not_found("delete_file"))
        })
    }

    fn simple_search<'a>(
        &'a self,
        query: &'a str,
        _context_length: u32,
    ) -> BoxFuture<'a, Result<Vec<SearchHit>, VaultError>> {
        Box::pin(async move {
            let files = self.files.lock().expect("vault lock poisoned");
            Ok(search_files(files.iter(), query))
        })
    }

    fn search_json_logic<'a>(&'a self, query: &'a Value) -> BoxFuture<'a, Result<Value, VaultError>> {
        Box::pin(async move {
            self.queries
                .lock()
                .expect("vault lock poisoned")
                .push(query.to_string());
            let files = self.files.lock().expect("vault lock poisoned");
            Ok(Value::Array(
                files
                    .keys()
                    .map(|f| json!({"filename": f, "result": true}))
                    .collect(),
            ))
        })
    }

    fn search_dql<'a>(&'a self, query: &'a str) -> BoxFuture<'a, Result<Value, VaultError>> {
        Box::pin(async move {
            self.queries
                .lock()
                .expect("vault lock poisoned")
                .push(query.to_string());
            let files = self.files.lock().expect("vault lock poisoned");
            Ok(Value::Array(
                files
                    .keys()
                    .map(|f| json!({"filename": f, "result": {"file.mtime": "2024-01-01T00:00:00"}}))
                    .collect(),
            ))
        })
    }

    fn periodic_note(&self, period: Period) -> BoxFuture<'_, Result<String, VaultError>> {
        Box::pin(async move {
            self.periodic
                .lock()
                .expect("vault lock poisoned")
                .get(period.as_str())
                .cloned()
                .ok_or_else(|| not_found("periodic_note"))
        })
    }

    fn recent_periodic_notes(
        &self,
        period: Period,
        limit: u32,
        include_content: bool,
    ) -> BoxFuture<'_, Result<Value, VaultError>> {
        Box::pin(async move {
            let periodic = self.periodic.lock().expect("vault lock poisoned");
            let notes: Vec<Value> = periodic
                .get(period.as_str())
                .into_iter()
                .take(limit as usize)
                .map(|content| {
                    let mut note = json!({"path": format!("{}.md", period.as_str())});
                    if include_content {
                        note["content"] = json!(content);
                    }
                    note
                })
                .collect();
            Ok(Value::Array(notes))
        })
    }
}
