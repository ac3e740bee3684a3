// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry analytics and statistics

use super::Mesh;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Geometry statistics and analytics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeometryStats {
    /// Total volume in cubic units
    pub volume: f64,
    /// Total surface area in square units
    pub surface_area: f64,
    /// Bounding box [min_x, min_y, min_z, max_x, max_y, max_z]
    pub bbox: [f64; 6],
    /// Number of vertices
    pub vertex_count: usize,
    /// Number of triangles
    pub triangle_count: usize,
    /// Every edge shared by exactly two consistently wound triangles
    pub is_watertight: bool,
}

impl GeometryStats {
    /// Create empty stats
    pub fn empty() -> Self {
        Self {
            volume: 0.0,
            surface_area: 0.0,
            bbox: [0.0; 6],
            vertex_count: 0,
            triangle_count: 0,
            is_watertight: false,
        }
    }

    /// Pretty print statistics
    pub fn print(&self) {
        println!("╔══════════════════════════════════════════════════════════╗");
        println!("║              GEOMETRY ANALYTICS                          ║");
        println!("╠══════════════════════════════════════════════════════════╣");
        println!("║ Volume:          {:>10.4} mm³                      ║", self.volume);
        println!("║ Surface Area:    {:>10.4} mm²                      ║", self.surface_area);
        println!("║                                                          ║");
        println!("║ Bounding Box:                                            ║");
        println!(
            "║   Min: ({:>7.2}, {:>7.2}, {:>7.2})                      ║",
            self.bbox[0], self.bbox[1], self.bbox[2]
        );
        println!(
            "║   Max: ({:>7.2}, {:>7.2}, {:>7.2})                      ║",
            self.bbox[3], self.bbox[4], self.bbox[5]
        );
        println!(
            "║   Size: {:>7.2} × {:>7.2} × {:>7.2} mm               ║",
            self.bbox[3] - self.bbox[0],
            self.bbox[4] - self.bbox[1],
            self.bbox[5] - self.bbox[2]
        );
        println!("║                                                          ║");
        println!("║ Vertices:        {:>10}                              ║", self.vertex_count);
        println!("║ Triangles:       {:>10}                              ║", self.triangle_count);
        println!(
            "║ Watertight:      {:>10}                              ║",
            if self.is_watertight { "Yes" } else { "No" }
        );
        println!("╚══════════════════════════════════════════════════════════╝");
    }
}

/// Analyze mesh geometry and compute statistics
pub fn analyze(mesh: &Mesh) -> GeometryStats {
    if mesh.vertices.is_empty() || mesh.triangles.is_empty() {
        return GeometryStats::empty();
    }

    let bbox = mesh.bounding_box();
    GeometryStats {
        volume: signed_volume(mesh).abs(),
        surface_area: surface_area(mesh),
        bbox: [
            bbox.min.x, bbox.min.y, bbox.min.z, bbox.max.x, bbox.max.y, bbox.max.z,
        ],
        vertex_count: mesh.vertex_count(),
        triangle_count: mesh.triangle_count(),
        is_watertight: check_oriented_manifold(mesh).is_ok(),
    }
}

/// Enclosed volume, positive when triangles wind counter-clockwise seen from outside
pub fn signed_volume(mesh: &Mesh) -> f64 {
    mesh.triangles
        .iter()
        .map(|triangle| {
            let [v0, v1, v2] = mesh.triangle_positions(triangle);
            // Signed volume of tetrahedron formed by triangle and origin
            v0.coords.dot(&v1.coords.cross(&v2.coords)) / 6.0
        })
        .sum()
}

/// Calculate total surface area
pub fn surface_area(mesh: &Mesh) -> f64 {
    mesh.triangles
        .iter()
        .map(|triangle| {
            let [v0, v1, v2] = mesh.triangle_positions(triangle);
            (v1 - v0).cross(&(v2 - v0)).norm() / 2.0
        })
        .sum()
}

/// Check that the mesh is a closed, consistently oriented manifold.
///
/// Every directed edge must appear exactly once and its reverse exactly
/// once, i.e. each undirected edge is shared by two triangles that traverse
/// it in opposite directions.
pub fn check_oriented_manifold(mesh: &Mesh) -> Result<(), String> {
    let vertex_count = mesh.vertices.len();
    let mut directed: HashMap<(usize, usize), usize> = HashMap::new();

    for (index, triangle) in mesh.triangles.iter().enumerate() {
        let indices = &triangle.indices;
        if indices.iter().any(|&i| i >= vertex_count) {
            return Err(format!("triangle #{index} references a missing vertex"));
        }
        for i in 0..3 {
            let edge = (indices[i], indices[(i + 1) % 3]);
            if edge.0 == edge.1 {
                return Err(format!("triangle #{index} repeats vertex {}", edge.0));
            }
            *directed.entry(edge).or_insert(0) += 1;
        }
    }

    for (&(a, b), &count) in &directed {
        if count != 1 {
            return Err(format!("edge {a}->{b} is used by {count} triangles in the same direction"));
        }
        if !directed.contains_key(&(b, a)) {
            return Err(format!("edge {a}->{b} is a boundary edge"));
        }
    }
    Ok(())
}
