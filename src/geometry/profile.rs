// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Planar cross-section profiles centered on the z axis

use nalgebra::Point3;
use std::f64::consts::{PI, TAU};

/// Closed planar curve shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProfileShape {
    Circle { radius: f64 },
    Rectangle { half_width: f64, half_height: f64 },
}

/// A shape placed in the plane `z = const`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Profile {
    pub shape: ProfileShape,
    pub z: f64,
}

impl Profile {
    pub fn circle(radius: f64, z: f64) -> Self {
        Self {
            shape: ProfileShape::Circle { radius },
            z,
        }
    }

    pub fn rectangle(half_width: f64, half_height: f64, z: f64) -> Self {
        Self {
            shape: ProfileShape::Rectangle {
                half_width,
                half_height,
            },
            z,
        }
    }

    /// Both profiles in this crate are star-shaped about the axis, so a
    /// profile is fully described by its distance from the axis per angle.
    pub fn radius_at(&self, angle: f64) -> f64 {
        match self.shape {
            ProfileShape::Circle { radius } => radius,
            ProfileShape::Rectangle {
                half_width,
                half_height,
            } => {
                let c = angle.cos().abs();
                let s = angle.sin().abs();
                if c * half_height >= s * half_width {
                    half_width / c
                } else {
                    half_height / s
                }
            }
        }
    }

    /// Point of the curve on the ray at `angle`.
    ///
    /// Rectangle points are snapped onto the side they hit so corners and
    /// extents come out exact.
    pub fn point_at(&self, angle: f64) -> Point3<f64> {
        let (s, c) = angle.sin_cos();
        match self.shape {
            ProfileShape::Circle { radius } => Point3::new(radius * c, radius * s, self.z),
            ProfileShape::Rectangle {
                half_width,
                half_height,
            } => {
                let (x, y) = if c.abs() * half_height >= s.abs() * half_width {
                    (half_width.copysign(c), half_width * s / c.abs())
                } else {
                    (half_height * c / s.abs(), half_height.copysign(s))
                };
                Point3::new(
                    x.clamp(-half_width, half_width),
                    y.clamp(-half_height, half_height),
                    self.z,
                )
            }
        }
    }

    /// Angles in `[0, 2π)` where the curve has a sharp corner
    pub fn corner_angles(&self) -> Vec<f64> {
        match self.shape {
            ProfileShape::Circle { .. } => Vec::new(),
            ProfileShape::Rectangle {
                half_width,
                half_height,
            } => {
                let a = half_height.atan2(half_width);
                vec![a, PI - a, PI + a, TAU - a]
            }
        }
    }

    /// Radius of a circle for chord tolerance purposes, `None` for straight-edged shapes
    pub fn curvature_radius(&self) -> Option<f64> {
        match self.shape {
            ProfileShape::Circle { radius } => Some(radius),
            ProfileShape::Rectangle { .. } => None,
        }
    }

    /// Distance to the farthest point of the curve
    pub fn max_radius(&self) -> f64 {
        match self.shape {
            ProfileShape::Circle { radius } => radius,
            ProfileShape::Rectangle {
                half_width,
                half_height,
            } => half_width.hypot(half_height),
        }
    }

    /// Distance to the nearest point of the curve
    pub fn min_radius(&self) -> f64 {
        match self.shape {
            ProfileShape::Circle { radius } => radius,
            ProfileShape::Rectangle {
                half_width,
                half_height,
            } => half_width.min(half_height),
        }
    }

    pub fn area(&self) -> f64 {
        match self.shape {
            ProfileShape::Circle { radius } => PI * radius * radius,
            ProfileShape::Rectangle {
                half_width,
                half_height,
            } => 4.0 * half_width * half_height,
        }
    }

    pub fn is_degenerate(&self) -> bool {
        let extent_ok = |v: f64| v.is_finite() && v > 0.0;
        let degenerate_extent = match self.shape {
            ProfileShape::Circle { radius } => !extent_ok(radius),
            ProfileShape::Rectangle {
                half_width,
                half_height,
            } => !extent_ok(half_width) || !extent_ok(half_height),
        };
        degenerate_extent || !self.z.is_finite()
    }

    /// True when `other` lies in the same plane and strictly inside this curve
    pub fn strictly_contains(&self, other: &Profile) -> bool {
        if self.z != other.z {
            return false;
        }
        use ProfileShape::*;
        match (self.shape, other.shape) {
            (Circle { radius: outer }, Circle { radius: inner }) => inner < outer,
            (
                Rectangle {
                    half_width: ow,
                    half_height: oh,
                },
                Rectangle {
                    half_width: iw,
                    half_height: ih,
                },
            ) => iw < ow && ih < oh,
            (Rectangle { .. }, Circle { radius }) => radius < self.min_radius(),
            (Circle { radius }, Rectangle { .. }) => other.max_radius() < radius,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rectangle_radius_hits_sides_and_corners() {
        let rect = Profile::rectangle(25.0, 15.0, 60.0);
        assert_relative_eq!(rect.radius_at(0.0), 25.0);
        assert_relative_eq!(rect.radius_at(PI / 2.0), 15.0, epsilon = 1e-12);
        assert_relative_eq!(rect.radius_at(PI), 25.0, epsilon = 1e-12);

        let corner = rect.corner_angles()[0];
        assert_relative_eq!(rect.radius_at(corner), 25.0f64.hypot(15.0), epsilon = 1e-9);
        let p = rect.point_at(corner);
        assert_relative_eq!(p.x, 25.0, epsilon = 1e-9);
        assert_relative_eq!(p.y, 15.0, epsilon = 1e-9);
        assert_relative_eq!(p.z, 60.0);

        // Snapped points never leave the rectangle
        for corner in rect.corner_angles() {
            let p = rect.point_at(corner);
            assert!(p.x.abs() <= 25.0 && p.y.abs() <= 15.0);
        }
        let side = rect.point_at(PI);
        assert_eq!(side.x, -25.0);
        assert!(side.y.abs() < 1e-12);
    }

    #[test]
    fn corner_angles_are_sorted_in_range() {
        let angles = Profile::rectangle(5.0, 20.0, 0.0).corner_angles();
        assert_eq!(angles.len(), 4);
        assert!(angles.windows(2).all(|w| w[0] < w[1]));
        assert!(angles.iter().all(|a| (0.0..TAU).contains(a)));
        assert!(Profile::circle(3.0, 0.0).corner_angles().is_empty());
    }

    #[test]
    fn containment() {
        let outer = Profile::circle(10.0, 0.0);
        assert!(outer.strictly_contains(&Profile::circle(9.0, 0.0)));
        assert!(!outer.strictly_contains(&Profile::circle(10.0, 0.0)));
        assert!(!outer.strictly_contains(&Profile::circle(9.0, 1.0)));

        let rect = Profile::rectangle(25.0, 15.0, 0.0);
        assert!(rect.strictly_contains(&Profile::rectangle(24.0, 14.0, 0.0)));
        assert!(!rect.strictly_contains(&Profile::rectangle(26.0, 14.0, 0.0)));
        assert!(rect.strictly_contains(&Profile::circle(14.0, 0.0)));
        assert!(!outer.strictly_contains(&Profile::rectangle(8.0, 8.0, 0.0)));
    }

    #[test]
    fn degenerate_profiles() {
        assert!(Profile::circle(0.0, 0.0).is_degenerate());
        assert!(Profile::rectangle(1.0, -1.0, 0.0).is_degenerate());
        assert!(!Profile::rectangle(1.0, 1.0, 0.0).is_degenerate());
        assert!(Profile::circle(1.0, f64::NAN).is_degenerate());
        assert!(Profile::rectangle(1.0, 1.0, f64::INFINITY).is_degenerate());
    }
}
