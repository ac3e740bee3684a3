// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Deduplicating result store
//!
//! Every key moves through `Absent -> Building -> Ready`, or through
//! `Building -> Failed -> Absent` when the builder errors. Only one caller
//! builds a given key at a time; everyone else arriving meanwhile blocks on
//! the in-flight slot and receives the same outcome.

use super::index::{IndexBackend, IndexEntries};
use super::{BuildOutput, CachedResult};
use crate::error::{PipeError, PipeResult};
use crate::key::CacheKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    /// Requests served without running a builder
    pub hits: usize,
    /// Requests that ran a builder
    pub misses: usize,
    pub builds: usize,
    pub failures: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Outcome cell shared between the building caller and its waiters
#[derive(Default)]
struct BuildSlot {
    outcome: Mutex<Option<PipeResult<CachedResult>>>,
    ready: Condvar,
}

impl BuildSlot {
    fn complete(&self, outcome: PipeResult<CachedResult>) {
        let mut slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(outcome);
        self.ready.notify_all();
    }

    fn wait(&self) -> PipeResult<CachedResult> {
        let slot = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = self
            .ready
            .wait_while(slot, |outcome| outcome.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(outcome) => outcome.clone(),
            None => Err(PipeError::construction("build finished without an outcome")),
        }
    }
}

/// Releases the in-flight marker even if the builder unwinds
struct LeaderGuard<'a> {
    store: &'a ResultStore,
    key: &'a CacheKey,
    slot: Arc<BuildSlot>,
    finished: bool,
}

impl LeaderGuard<'_> {
    fn finish(mut self, outcome: PipeResult<CachedResult>) -> PipeResult<CachedResult> {
        self.release(outcome.clone());
        self.finished = true;
        outcome
    }

    fn release(&self, outcome: PipeResult<CachedResult>) {
        self.store.in_flight.remove(self.key);
        self.slot.complete(outcome);
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.store.failures.fetch_add(1, Ordering::Relaxed);
            self.store.discard_dir(&self.store.root.join(self.key.result_id()));
            self.release(Err(PipeError::construction(format!(
                "builder for {} panicked",
                self.key
            ))));
        }
    }
}

enum Role {
    Ready(CachedResult),
    Leader(Arc<BuildSlot>),
    Waiter(Arc<BuildSlot>),
}

/// Result cache rooted at a directory, with entries persisted through an
/// [`IndexBackend`]
pub struct ResultStore {
    root: PathBuf,
    backend: Box<dyn IndexBackend>,
    entries: DashMap<CacheKey, CachedResult>,
    in_flight: DashMap<CacheKey, Arc<BuildSlot>>,
    /// Serialises index rewrites
    writer: Mutex<()>,
    hits: AtomicUsize,
    misses: AtomicUsize,
    builds: AtomicUsize,
    failures: AtomicUsize,
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStore")
            .field("root", &self.root)
            .field("index", &self.backend.location())
            .field("entries", &self.entries.len())
            .finish()
    }
}

impl ResultStore {
    /// Open the store, loading every persisted entry. A corrupt index is
    /// fatal here; nothing is served from a store that failed to open.
    pub fn open(
        root: impl Into<PathBuf>,
        backend: impl IndexBackend + 'static,
    ) -> PipeResult<Self> {
        let root = root.into();
        let loaded = backend.load()?;
        info!(
            root = %root.display(),
            index = %backend.location().display(),
            entries = loaded.len(),
            "opened result store"
        );

        Ok(Self {
            root,
            backend: Box::new(backend),
            entries: loaded.into_iter().collect(),
            in_flight: DashMap::new(),
            writer: Mutex::new(()),
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
            builds: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pure read: never builds and never touches the index
    pub fn lookup(&self, key: &CacheKey) -> Option<CachedResult> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Return the entry for `key`, running `build` only when no entry exists
    /// and no other caller is already building it.
    ///
    /// The builder receives the result directory `<root>/<id>` and must write
    /// its artifacts there. Its error is passed through unchanged and no entry
    /// is recorded; the next request for the key builds again.
    pub fn get_or_create<F>(&self, key: &CacheKey, build: F) -> PipeResult<CachedResult>
    where
        F: FnOnce(&Path) -> PipeResult<BuildOutput>,
    {
        if let Some(hit) = self.lookup(key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(%key, id = %hit.id, "cache hit");
            return Ok(hit);
        }

        let role = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(building) => Role::Waiter(Arc::clone(building.get())),
            Entry::Vacant(vacant) => match self.lookup(key) {
                // Finished between the first lookup and taking the marker
                Some(hit) => Role::Ready(hit),
                None => {
                    let slot = Arc::new(BuildSlot::default());
                    vacant.insert(Arc::clone(&slot));
                    Role::Leader(slot)
                }
            },
        };

        match role {
            Role::Ready(hit) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(%key, id = %hit.id, "cache hit");
                Ok(hit)
            }
            Role::Waiter(slot) => {
                debug!(%key, "waiting for in-flight build");
                let outcome = slot.wait();
                if outcome.is_ok() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                }
                outcome
            }
            Role::Leader(slot) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let guard = LeaderGuard {
                    store: self,
                    key,
                    slot,
                    finished: false,
                };
                let outcome = self.build_entry(key, build);
                guard.finish(outcome)
            }
        }
    }

    fn build_entry<F>(&self, key: &CacheKey, build: F) -> PipeResult<CachedResult>
    where
        F: FnOnce(&Path) -> PipeResult<BuildOutput>,
    {
        let id = key.result_id();
        let dir = self.root.join(&id);
        if dir.exists() {
            // Left over from a build that never reached the index
            debug!(dir = %dir.display(), "clearing stale result directory");
            self.discard_dir(&dir);
        }

        info!(%key, %id, "building result");
        let outcome =
            build(&dir).and_then(|output| self.commit(CachedResult::new(key.clone(), output)));

        match &outcome {
            Ok(entry) => {
                self.builds.fetch_add(1, Ordering::Relaxed);
                info!(%key, artifacts = entry.artifacts.len(), "cached result");
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                warn!(%key, error = %err, "build failed");
                self.discard_dir(&dir);
            }
        }
        outcome
    }

    /// Persist the index including `entry`, then publish it. A failed write
    /// leaves the in-memory entries untouched.
    fn commit(&self, entry: CachedResult) -> PipeResult<CachedResult> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let mut snapshot = self.snapshot();
        snapshot.insert(entry.key.clone(), entry.clone());
        self.backend.save(&snapshot)?;
        self.entries.insert(entry.key.clone(), entry.clone());
        info!(
            index = %self.backend.location().display(),
            entries = snapshot.len(),
            "wrote cache index"
        );
        Ok(entry)
    }

    fn snapshot(&self) -> IndexEntries {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    fn discard_dir(&self, dir: &Path) {
        match fs::remove_dir_all(dir) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %dir.display(), error = %e, "failed to remove result directory"),
        }
    }

    /// All entries ordered by key
    pub fn entries(&self) -> Vec<CachedResult> {
        self.snapshot().into_values().collect()
    }

    /// Resolve an artifact by result identifier and file name.
    ///
    /// Returns `None` unless an entry with `id` lists exactly `file_name`, so
    /// names with separators or `..` can never escape the result directory.
    pub fn artifact_path(&self, id: &str, file_name: &str) -> Option<PathBuf> {
        let mut components = Path::new(file_name).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => {}
            _ => return None,
        }
        self.entries
            .iter()
            .find(|entry| entry.id == id && entry.has_artifact(file_name))
            .map(|entry| self.root.join(&entry.id).join(file_name))
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            builds: self.builds.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }

    /// Rewrite the index from the current entries
    pub fn flush(&self) -> PipeResult<()> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.backend.save(&self.snapshot())
    }

    /// Flush and release the store
    pub fn close(self) -> PipeResult<()> {
        self.flush()?;
        info!(root = %self.root.display(), entries = self.entries.len(), "closed result store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryIndex;
    use crate::key::CanonicalParameters;
    use crate::params::{DuctParameters, RackParameters};
    use serde_json::json;

    fn write_part(dir: &Path) -> PipeResult<BuildOutput> {
        fs::create_dir_all(dir).map_err(|e| PipeError::export(dir, e))?;
        fs::write(dir.join("part.stl"), b"solid").map_err(|e| PipeError::export(dir, e))?;
        BuildOutput::new(vec!["part.stl".into()], &json!({"triangles": 0}))
    }

    #[test]
    fn miss_then_hit() {
        let root = tempfile::tempdir().unwrap();
        let index = MemoryIndex::new();
        let store = ResultStore::open(root.path(), index.clone()).unwrap();
        let key = DuctParameters::default().cache_key();
        let calls = AtomicUsize::new(0);

        assert!(store.lookup(&key).is_none());
        let first = store
            .get_or_create(&key, |dir| {
                calls.fetch_add(1, Ordering::SeqCst);
                write_part(dir)
            })
            .unwrap();
        let second = store
            .get_or_create(&key, |dir| {
                calls.fetch_add(1, Ordering::SeqCst);
                write_part(dir)
            })
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(index.save_count(), 1);
        assert_eq!(store.lookup(&key), Some(first.clone()));
        assert!(first.artifact_paths(root.path())[0].exists());

        let stats = store.stats();
        assert_eq!((stats.entries, stats.hits, stats.misses, stats.builds), (1, 1, 1, 1));
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn failed_build_leaves_no_entry() {
        let root = tempfile::tempdir().unwrap();
        let index = MemoryIndex::new();
        let store = ResultStore::open(root.path(), index.clone()).unwrap();
        let key = RackParameters::default().cache_key();

        let err = store
            .get_or_create(&key, |dir| {
                write_part(dir)?;
                Err(PipeError::construction("boom"))
            })
            .unwrap_err();
        assert_eq!(err, PipeError::construction("boom"));
        assert!(store.lookup(&key).is_none());
        assert!(!root.path().join(key.result_id()).exists());
        assert_eq!(index.save_count(), 0);

        // Failed keys return to absent and build again
        assert!(store.get_or_create(&key, write_part).is_ok());
        assert_eq!(store.stats().failures, 1);
        assert_eq!(store.stats().builds, 1);
    }

    #[test]
    fn index_write_failure_rolls_back() {
        let root = tempfile::tempdir().unwrap();
        let index = MemoryIndex::new();
        index.fail_saves(true);
        let store = ResultStore::open(root.path(), index.clone()).unwrap();
        let key = DuctParameters::default().cache_key();

        let err = store.get_or_create(&key, write_part).unwrap_err();
        assert!(matches!(err, PipeError::Export { .. }));
        assert!(store.is_empty());
        assert!(!root.path().join(key.result_id()).exists());

        index.fail_saves(false);
        assert!(store.get_or_create(&key, write_part).is_ok());
        assert_eq!(index.saved_entries().len(), 1);
    }

    #[test]
    fn panicking_builder_releases_key() {
        let root = tempfile::tempdir().unwrap();
        let store = ResultStore::open(root.path(), MemoryIndex::new()).unwrap();
        let key = DuctParameters::default().cache_key();

        let unwound = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.get_or_create(&key, |_| panic!("builder crashed"))
        }));
        assert!(unwound.is_err());
        assert!(store.in_flight.is_empty());
        assert!(store.get_or_create(&key, write_part).is_ok());
    }

    #[test]
    fn artifact_path_only_resolves_listed_files() {
        let root = tempfile::tempdir().unwrap();
        let store = ResultStore::open(root.path(), MemoryIndex::new()).unwrap();
        let key = DuctParameters::default().cache_key();
        let entry = store.get_or_create(&key, write_part).unwrap();

        assert_eq!(
            store.artifact_path(&entry.id, "part.stl"),
            Some(root.path().join(&entry.id).join("part.stl"))
        );
        assert_eq!(store.artifact_path(&entry.id, "other.stl"), None);
        assert_eq!(store.artifact_path(&entry.id, "../index.json"), None);
        assert_eq!(store.artifact_path("unknown", "part.stl"), None);
    }

    #[test]
    fn reopen_serves_persisted_entries() {
        let root = tempfile::tempdir().unwrap();
        let index = MemoryIndex::new();
        let key = DuctParameters::default().cache_key();

        let store = ResultStore::open(root.path(), index.clone()).unwrap();
        let built = store.get_or_create(&key, write_part).unwrap();
        store.close().unwrap();

        let reopened = ResultStore::open(root.path(), index.clone()).unwrap();
        let served = reopened
            .get_or_create(&key, |_| panic!("must not rebuild"))
            .unwrap();
        assert_eq!(served, built);
        assert_eq!(reopened.entries(), vec![built]);
    }
}
