// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Error types for duct generation and the result cache

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias used throughout the crate
pub type PipeResult<T> = Result<T, PipeError>;

/// Errors surfaced by the geometry builder, the exporter and the result store.
///
/// The enum is `Clone` because a single failed build is handed to every
/// caller waiting on the same cache key. I/O sources are therefore captured
/// as text rather than kept as `std::io::Error`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipeError {
    /// A parameter set violates a geometric precondition.
    #[error("invalid geometry parameters: {reason}")]
    InvalidGeometryParameters { reason: String },

    /// Lofting, subtraction or tessellation produced an unusable solid.
    #[error("geometry construction failed: {reason}")]
    GeometryConstruction { reason: String },

    /// Writing a mesh artifact or the cache index failed.
    #[error("export to {path} failed: {reason}")]
    Export { path: PathBuf, reason: String },

    /// A non-empty cache index could not be understood.
    #[error("cache index {path} is corrupt: {reason}")]
    CacheIndexCorrupt { path: PathBuf, reason: String },
}

impl PipeError {
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidGeometryParameters {
            reason: reason.into(),
        }
    }

    pub fn construction(reason: impl Into<String>) -> Self {
        Self::GeometryConstruction {
            reason: reason.into(),
        }
    }

    pub fn export(path: impl Into<PathBuf>, source: impl std::fmt::Display) -> Self {
        Self::Export {
            path: path.into(),
            reason: source.to_string(),
        }
    }

    /// Only I/O failures can succeed when the caller issues a new request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Export { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_error_display() {
        let err = PipeError::export(
            "/tmp/models/abc/pipe.stl",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("pipe.stl"));
        assert!(msg.contains("denied"));
        assert!(err.is_retryable());
    }

    #[test]
    fn invalid_parameters_are_not_retryable() {
        let err = PipeError::invalid("wall_thickness must be positive");
        assert!(err.to_string().contains("wall_thickness"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn corrupt_index_display() {
        let err = PipeError::CacheIndexCorrupt {
            path: PathBuf::from("models/index.json"),
            reason: "expected value at line 1".to_string(),
        };
        assert!(err.to_string().contains("index.json"));
        assert!(!err.is_retryable());
    }
}
