// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Persisted cache index
//!
//! The index is a single JSON document `{ "version": 1, "entries": { .. } }`
//! keyed by the canonical cache key. It is always rewritten in full.

use super::CachedResult;
use crate::error::{PipeError, PipeResult};
use crate::key::CacheKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tempfile::NamedTempFile;
use tracing::debug;

/// Only index layout this build reads and writes
pub const INDEX_VERSION: u32 = 1;

/// All persisted entries, ordered by key
pub type IndexEntries = BTreeMap<CacheKey, CachedResult>;

#[derive(Debug, Serialize, Deserialize)]
struct IndexDocument {
    version: u32,
    #[serde(default)]
    entries: IndexEntries,
}

/// Storage for the cache index
pub trait IndexBackend: Send + Sync {
    /// Read every persisted entry. An absent index is an empty cache.
    fn load(&self) -> PipeResult<IndexEntries>;

    /// Replace the persisted index with `entries`
    fn save(&self, entries: &IndexEntries) -> PipeResult<()>;

    /// Where the index lives, for diagnostics
    fn location(&self) -> PathBuf;
}

/// Parse index text. Blank text is an empty cache, anything else must be a
/// well-formed document of the supported version.
pub fn parse_index(text: &str, path: &Path) -> PipeResult<IndexEntries> {
    if text.trim().is_empty() {
        return Ok(IndexEntries::new());
    }
    let corrupt = |reason: String| PipeError::CacheIndexCorrupt {
        path: path.to_path_buf(),
        reason,
    };

    let document: IndexDocument =
        serde_json::from_str(text).map_err(|e| corrupt(e.to_string()))?;
    if document.version != INDEX_VERSION {
        return Err(corrupt(format!(
            "unsupported index version {} (expected {INDEX_VERSION})",
            document.version
        )));
    }

    for (key, entry) in &document.entries {
        if &entry.key != key {
            return Err(corrupt(format!("entry stored under {key} claims key {}", entry.key)));
        }
        if entry.id != key.result_id() {
            return Err(corrupt(format!("entry {key} has mismatched id {}", entry.id)));
        }
    }
    Ok(document.entries)
}

/// Serialize `entries` into the on-disk document
pub fn render_index(entries: &IndexEntries) -> serde_json::Result<String> {
    #[derive(Serialize)]
    struct Borrowed<'a> {
        version: u32,
        entries: &'a IndexEntries,
    }
    serde_json::to_string_pretty(&Borrowed {
        version: INDEX_VERSION,
        entries,
    })
}

/// Index stored as a JSON file, replaced atomically on every save
#[derive(Debug, Clone)]
pub struct JsonIndexFile {
    path: PathBuf,
}

impl JsonIndexFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IndexBackend for JsonIndexFile {
    fn load(&self) -> PipeResult<IndexEntries> {
        match fs::read_to_string(&self.path) {
            Ok(text) => parse_index(&text, &self.path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(IndexEntries::new()),
            Err(e) => Err(PipeError::CacheIndexCorrupt {
                path: self.path.clone(),
                reason: e.to_string(),
            }),
        }
    }

    fn save(&self, entries: &IndexEntries) -> PipeResult<()> {
        let text = render_index(entries).map_err(|e| PipeError::export(&self.path, e))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| PipeError::export(dir, e))?;

        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PipeError::export(dir, e))?;
        tmp.write_all(text.as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| PipeError::export(&self.path, e))?;
        tmp.persist(&self.path)
            .map_err(|e| PipeError::export(&self.path, e.error))?;

        debug!(path = %self.path.display(), entries = entries.len(), "rewrote cache index");
        Ok(())
    }

    fn location(&self) -> PathBuf {
        self.path.clone()
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    entries: IndexEntries,
    saves: usize,
    fail_saves: bool,
}

/// In-memory index. Clones share state, so a test can keep a handle after
/// moving the backend into a store and reopen a second store on it.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: IndexEntries) -> Self {
        let index = Self::new();
        index.lock().entries = entries;
        index
    }

    /// Number of successful saves so far
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    pub fn saved_entries(&self) -> IndexEntries {
        self.lock().entries.clone()
    }

    /// Make every following save fail with an export error
    pub fn fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IndexBackend for MemoryIndex {
    fn load(&self) -> PipeResult<IndexEntries> {
        Ok(self.lock().entries.clone())
    }

    fn save(&self, entries: &IndexEntries) -> PipeResult<()> {
        let mut state = self.lock();
        if state.fail_saves {
            return Err(PipeError::export(self.location(), "index backend rejected write"));
        }
        state.entries = entries.clone();
        state.saves += 1;
        Ok(())
    }

    fn location(&self) -> PathBuf {
        PathBuf::from("<memory>")
    }
}
