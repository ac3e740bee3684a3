// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Fixed-tolerance tessellation of loft solids
//!
//! Tolerances are constants: the same solid always yields the same mesh, which
//! keeps cached artifacts interchangeable across runs.

use super::analytics::{check_oriented_manifold, signed_volume};
use super::{Loft, Mesh, Profile, Solid, Triangle, Vertex};
use crate::error::{PipeError, PipeResult};
use crate::utils::math::{double_area, normalize_angle};
use nalgebra::Point3;
use std::f64::consts::TAU;
use tracing::debug;

/// Maximum distance between a circle and its inscribed polygon
pub const CHORD_TOLERANCE: f64 = 0.01;
pub const MIN_SEGMENTS: usize = 32;
pub const MAX_SEGMENTS: usize = 4096;

/// Angles closer than this are treated as one sample
const ANGLE_EPSILON: f64 = 1e-9;

/// Number of uniform samples needed for a circle of `radius`, a multiple of 4
pub fn segment_count(radius: f64) -> usize {
    let raw = if radius > CHORD_TOLERANCE {
        let step = 2.0 * (1.0 - CHORD_TOLERANCE / radius).acos();
        (TAU / step).ceil() as usize
    } else {
        MIN_SEGMENTS
    };
    let clamped = raw.clamp(MIN_SEGMENTS, MAX_SEGMENTS);
    clamped.div_ceil(4) * 4
}

/// Sorted sample angles shared by every profile of a solid.
///
/// Uniform circle samples plus the corners of every rectangle, so corners
/// become exact vertices and all profiles are sampled along the same rays.
pub fn angle_schedule(profiles: &[&Profile]) -> Vec<f64> {
    let segments = profiles
        .iter()
        .filter_map(|p| p.curvature_radius())
        .map(segment_count)
        .max()
        .unwrap_or(MIN_SEGMENTS);

    let mut angles: Vec<f64> = (0..segments)
        .map(|i| TAU * i as f64 / segments as f64)
        .chain(
            profiles
                .iter()
                .flat_map(|p| p.corner_angles())
                .map(normalize_angle),
        )
        .collect();
    angles.sort_by(f64::total_cmp);
    angles.dedup_by(|a, b| (*a - *b).abs() < ANGLE_EPSILON);
    if let (Some(&first), Some(&last)) = (angles.first(), angles.last()) {
        if TAU - last + first < ANGLE_EPSILON && angles.len() > 1 {
            angles.pop();
        }
    }
    angles
}

/// Triangulate a solid into a closed, outward-oriented manifold mesh
pub fn tessellate(solid: &Solid) -> PipeResult<Mesh> {
    let angles = angle_schedule(&solid.profiles());
    let mesh = match solid {
        Solid::Loft(loft) => tessellate_loft(loft, &angles),
        Solid::Shell { outer, inner } => tessellate_shell(outer, inner, &angles),
    };
    validate(&mesh)?;
    debug!(
        samples = angles.len(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "tessellated solid"
    );
    Ok(mesh)
}

fn ring(mesh: &mut Mesh, profile: &Profile, angles: &[f64]) -> Vec<usize> {
    angles
        .iter()
        .map(|&angle| mesh.add_vertex(Vertex::at(profile.point_at(angle))))
        .collect()
}

/// Wall between two rings sampled on the same angles
fn add_wall(mesh: &mut Mesh, bottom: &[usize], top: &[usize], inward: bool) {
    let n = bottom.len();
    for i in 0..n {
        let j = (i + 1) % n;
        if inward {
            mesh.add_quad(bottom[i], top[i], top[j], bottom[j]);
        } else {
            mesh.add_quad(bottom[i], bottom[j], top[j], top[i]);
        }
    }
}

/// Annulus between an outer and an inner ring in one plane
fn add_annulus(mesh: &mut Mesh, outer: &[usize], inner: &[usize], facing_up: bool) {
    let n = outer.len();
    for i in 0..n {
        let j = (i + 1) % n;
        if facing_up {
            mesh.add_quad(outer[i], outer[j], inner[j], inner[i]);
        } else {
            mesh.add_quad(outer[i], inner[i], inner[j], outer[j]);
        }
    }
}

/// Triangle fan closing a ring around its center point
fn add_cap(mesh: &mut Mesh, ring: &[usize], z: f64, facing_up: bool) {
    let center = mesh.add_vertex(Vertex::at(Point3::new(0.0, 0.0, z)));
    let n = ring.len();
    for i in 0..n {
        let j = (i + 1) % n;
        let indices = if facing_up {
            [center, ring[i], ring[j]]
        } else {
            [center, ring[j], ring[i]]
        };
        mesh.add_triangle(Triangle::new(indices));
    }
}

fn tessellate_loft(loft: &Loft, angles: &[f64]) -> Mesh {
    let n = angles.len();
    let mut mesh = Mesh::with_capacity(2 * n + 2, 4 * n);
    let bottom = ring(&mut mesh, loft.bottom(), angles);
    let top = ring(&mut mesh, loft.top(), angles);
    add_wall(&mut mesh, &bottom, &top, false);
    add_cap(&mut mesh, &bottom, loft.bottom().z, false);
    add_cap(&mut mesh, &top, loft.top().z, true);
    mesh.recompute_normals();
    mesh
}

fn tessellate_shell(outer: &Loft, inner: &Loft, angles: &[f64]) -> Mesh {
    let n = angles.len();
    let mut mesh = Mesh::with_capacity(4 * n, 8 * n);
    let outer_bottom = ring(&mut mesh, outer.bottom(), angles);
    let outer_top = ring(&mut mesh, outer.top(), angles);
    let inner_bottom = ring(&mut mesh, inner.bottom(), angles);
    let inner_top = ring(&mut mesh, inner.top(), angles);

    add_wall(&mut mesh, &outer_bottom, &outer_top, false);
    add_wall(&mut mesh, &inner_bottom, &inner_top, true);
    add_annulus(&mut mesh, &outer_bottom, &inner_bottom, false);
    add_annulus(&mut mesh, &outer_top, &inner_top, true);
    mesh.recompute_normals();
    mesh
}

fn validate(mesh: &Mesh) -> PipeResult<()> {
    if mesh.is_empty() {
        return Err(PipeError::construction("tessellation produced no triangles"));
    }
    if let Some(index) = mesh.triangles.iter().position(|t| {
        let [p0, p1, p2] = mesh.triangle_positions(t);
        double_area(&p0, &p1, &p2) <= f64::EPSILON
    }) {
        return Err(PipeError::construction(format!(
            "tessellation produced degenerate triangle #{index}"
        )));
    }
    check_oriented_manifold(mesh).map_err(PipeError::construction)?;
    if signed_volume(mesh) <= 0.0 {
        return Err(PipeError::construction(
            "tessellated solid encloses no volume or is inside out",
        ));
    }
    Ok(())
}
