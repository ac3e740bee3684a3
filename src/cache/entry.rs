// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Cached result descriptors

use crate::error::{PipeError, PipeResult};
use crate::key::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a builder hands back to the store: artifact file names relative to
/// the result directory plus free-form metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOutput {
    pub artifacts: Vec<String>,
    pub metadata: serde_json::Value,
}

impl BuildOutput {
    pub fn new(artifacts: Vec<String>, metadata: &impl Serialize) -> PipeResult<Self> {
        let metadata = serde_json::to_value(metadata)
            .map_err(|e| PipeError::construction(format!("unserializable metadata: {e}")))?;
        Ok(Self { artifacts, metadata })
    }
}

/// A finished, immutable cache entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
    pub key: CacheKey,
    /// Content-addressed directory identifier
    pub id: String,
    /// File names inside the result directory, in build order
    pub artifacts: Vec<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl CachedResult {
    pub fn new(key: CacheKey, output: BuildOutput) -> Self {
        Self {
            id: key.result_id(),
            key,
            artifacts: output.artifacts,
            metadata: output.metadata,
            created_at: Utc::now(),
        }
    }

    /// Artifact paths resolved against the store root
    pub fn artifact_paths(&self, root: &Path) -> Vec<PathBuf> {
        let dir = root.join(&self.id);
        self.artifacts.iter().map(|name| dir.join(name)).collect()
    }

    pub fn has_artifact(&self, file_name: &str) -> bool {
        self.artifacts.iter().any(|name| name == file_name)
    }
}
