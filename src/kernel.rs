// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Kernel API: cached duct generation on a worker pool

use crate::cache::{BuildOutput, CacheStats, CachedResult, JsonIndexFile, ResultStore};
use crate::config::PipemeshConfig;
use crate::duct::duct_builder;
use crate::error::{PipeError, PipeResult};
use crate::key::{CacheKey, CanonicalParameters};
use crate::params::DuctParameters;
use anyhow::{Context, Result};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{mpsc, Arc, Condvar, Mutex, PoisonError};
use tracing::{debug, error};

/// Pending or finished outcome of a submitted request
#[derive(Debug)]
pub struct BuildHandle {
    key: Option<CacheKey>,
    state: HandleState,
}

#[derive(Debug)]
enum HandleState {
    Ready(PipeResult<CachedResult>),
    Pending(mpsc::Receiver<PipeResult<CachedResult>>),
}

impl BuildHandle {
    fn ready(key: Option<CacheKey>, outcome: PipeResult<CachedResult>) -> Self {
        Self {
            key,
            state: HandleState::Ready(outcome),
        }
    }

    /// Key of the request, `None` when the parameters were rejected
    pub fn key(&self) -> Option<&CacheKey> {
        self.key.as_ref()
    }

    /// True when the outcome was known at submission time
    pub fn is_ready(&self) -> bool {
        matches!(self.state, HandleState::Ready(_))
    }

    /// Block until the outcome is available
    pub fn wait(self) -> PipeResult<CachedResult> {
        match self.state {
            HandleState::Ready(outcome) => outcome,
            HandleState::Pending(receiver) => receiver.recv().unwrap_or_else(|_| {
                Err(PipeError::construction(
                    "build job was dropped before reporting a result",
                ))
            }),
        }
    }
}

/// Count of queued or running jobs
#[derive(Debug, Default)]
struct Pending {
    jobs: Mutex<usize>,
    idle: Condvar,
}

impl Pending {
    fn start(self: &Arc<Self>) -> PendingJob {
        *self.jobs.lock().unwrap_or_else(PoisonError::into_inner) += 1;
        PendingJob(Arc::clone(self))
    }

    fn wait_idle(&self) {
        let jobs = self.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        let _idle = self
            .idle
            .wait_while(jobs, |jobs| *jobs > 0)
            .unwrap_or_else(PoisonError::into_inner);
    }
}

/// Marks one job done when dropped, also on unwind
struct PendingJob(Arc<Pending>);

impl Drop for PendingJob {
    fn drop(&mut self) {
        let mut jobs = self.0.jobs.lock().unwrap_or_else(PoisonError::into_inner);
        *jobs = jobs.saturating_sub(1);
        if *jobs == 0 {
            self.0.idle.notify_all();
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Main kernel: owns the result store and the build pool
pub struct Kernel {
    store: Arc<ResultStore>,
    pool: rayon::ThreadPool,
    pending: Arc<Pending>,
}

impl Kernel {
    /// Open the store described by `config` and start the worker pool
    pub fn open(config: &PipemeshConfig) -> Result<Self> {
        let backend = JsonIndexFile::new(config.index_path());
        let store = ResultStore::open(&config.store_dir, backend).with_context(|| {
            format!("Failed to open result store at {:?}", config.store_dir)
        })?;
        Self::with_store(store, config.workers)
    }

    /// Run on an already opened store
    pub fn with_store(store: ResultStore, workers: Option<usize>) -> Result<Self> {
        let mut builder =
            rayon::ThreadPoolBuilder::new().thread_name(|i| format!("pipemesh-worker-{i}"));
        if let Some(workers) = workers {
            builder = builder.num_threads(workers);
        }
        let pool = builder.build().context("Failed to start worker pool")?;
        debug!(workers = pool.current_num_threads(), "started build pool");

        Ok(Self {
            store: Arc::new(store),
            pool,
            pending: Arc::default(),
        })
    }

    /// Request a duct. Invalid parameters and cached results are answered
    /// immediately; anything else is built on the pool.
    pub fn submit(&self, params: DuctParameters) -> BuildHandle {
        if let Err(err) = params.validate() {
            return BuildHandle::ready(None, Err(err));
        }
        self.submit_with(params.cache_key(), duct_builder(params))
    }

    /// Request any keyed result built by `build`
    pub fn submit_with<F>(&self, key: CacheKey, build: F) -> BuildHandle
    where
        F: FnOnce(&Path) -> PipeResult<BuildOutput> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        if let Some(hit) = store.lookup(&key) {
            // Route through the store so the hit is counted
            let outcome = store.get_or_create(&key, build);
            return BuildHandle::ready(Some(hit.key), outcome);
        }

        let (sender, receiver) = mpsc::channel();
        let job_key = key.clone();
        let job = self.pending.start();
        self.pool.spawn(move || {
            let _job = job;
            // A panic must not reach rayon, which aborts the process on it
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                store.get_or_create(&job_key, build)
            }))
            .unwrap_or_else(|payload| {
                let message = panic_message(payload.as_ref());
                error!(key = %job_key, %message, "builder panicked");
                Err(PipeError::construction(format!(
                    "builder for {job_key} panicked: {message}"
                )))
            });
            // Nobody listening is fine, the result stays cached
            let _ = sender.send(outcome);
        });

        BuildHandle {
            key: Some(key),
            state: HandleState::Pending(receiver),
        }
    }

    /// Request a duct and wait for it
    pub fn generate(&self, params: DuctParameters) -> PipeResult<CachedResult> {
        self.submit(params).wait()
    }

    pub fn lookup(&self, key: &CacheKey) -> Option<CachedResult> {
        self.store.lookup(key)
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Wait for queued builds, stop the pool and flush the index
    pub fn close(self) -> PipeResult<()> {
        let Self {
            store,
            pool,
            pending,
        } = self;
        pending.wait_idle();
        drop(pool);
        match Arc::try_unwrap(store) {
            Ok(store) => store.close(),
            // A finished job has not released its handle yet
            Err(shared) => shared.flush(),
        }
    }
}
