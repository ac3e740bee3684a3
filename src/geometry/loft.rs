// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Ruled loft between two parallel profiles

use super::Profile;
use crate::error::{PipeError, PipeResult};
use crate::utils::math::lerp;
use nalgebra::Point3;

/// Closed solid swept linearly from `bottom` to `top`.
///
/// Boundary points are matched by polar angle about the z axis, so the
/// cross-section at any height is the radial blend of the two end profiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Loft {
    bottom: Profile,
    top: Profile,
}

impl Loft {
    pub fn new(bottom: Profile, top: Profile) -> PipeResult<Self> {
        if bottom.is_degenerate() || top.is_degenerate() {
            return Err(PipeError::construction(format!(
                "cannot loft degenerate profiles {bottom:?} -> {top:?}"
            )));
        }
        if top.z <= bottom.z {
            return Err(PipeError::construction(format!(
                "loft top plane z={} must lie above bottom plane z={}",
                top.z, bottom.z
            )));
        }
        Ok(Self { bottom, top })
    }

    pub fn bottom(&self) -> &Profile {
        &self.bottom
    }

    pub fn top(&self) -> &Profile {
        &self.top
    }

    pub fn height(&self) -> f64 {
        self.top.z - self.bottom.z
    }

    /// Distance from the axis at `angle`, `t = 0` at the bottom and `t = 1` at the top
    pub fn radius_at(&self, angle: f64, t: f64) -> f64 {
        lerp(self.bottom.radius_at(angle), self.top.radius_at(angle), t)
    }

    pub fn point_at(&self, angle: f64, t: f64) -> Point3<f64> {
        let r = self.radius_at(angle, t);
        Point3::new(
            r * angle.cos(),
            r * angle.sin(),
            lerp(self.bottom.z, self.top.z, t),
        )
    }

    pub fn profiles(&self) -> [&Profile; 2] {
        [&self.bottom, &self.top]
    }
}
