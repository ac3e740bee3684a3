// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Math utilities

use nalgebra::{Point3, Vector3};
use std::f64::consts::TAU;

/// Unit normal of a triangle given three vertices, zero when degenerate
pub fn triangle_normal(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> Vector3<f64> {
    let v1 = p1 - p0;
    let v2 = p2 - p0;
    v1.cross(&v2).try_normalize(1e-12).unwrap_or_else(Vector3::zeros)
}

/// Twice the area of a triangle
pub fn double_area(p0: &Point3<f64>, p1: &Point3<f64>, p2: &Point3<f64>) -> f64 {
    (p1 - p0).cross(&(p2 - p0)).norm()
}

/// Linear interpolation
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

/// Wrap an angle into `[0, 2π)`
pub fn normalize_angle(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}
