// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh comparison utilities for export round-trip checks

use crate::geometry::Mesh;
use serde::{Deserialize, Serialize};

/// Result of mesh comparison
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MeshComparison {
    pub vertex_count_match: bool,
    pub triangle_count_match: bool,
    pub bbox_match: bool,
    pub vertex_count_diff: i64,
    pub triangle_count_diff: i64,
    pub bbox_tolerance: f64,
    pub passed: bool,
}

/// Compare two meshes for equivalence
pub fn compare_meshes(mesh_a: &Mesh, mesh_b: &Mesh, tolerance: f64) -> MeshComparison {
    let vertex_count_diff = mesh_b.vertex_count() as i64 - mesh_a.vertex_count() as i64;
    let triangle_count_diff = mesh_b.triangle_count() as i64 - mesh_a.triangle_count() as i64;
    let bbox_match = mesh_a
        .bounding_box()
        .approx_eq(&mesh_b.bounding_box(), tolerance);

    MeshComparison {
        vertex_count_match: vertex_count_diff == 0,
        triangle_count_match: triangle_count_diff == 0,
        bbox_match,
        vertex_count_diff,
        triangle_count_diff,
        bbox_tolerance: tolerance,
        passed: vertex_count_diff == 0 && triangle_count_diff == 0 && bbox_match,
    }
}
