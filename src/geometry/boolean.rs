// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boolean difference between coaxial lofts

use super::{Loft, Solid};
use crate::error::{PipeError, PipeResult};
use tracing::debug;

/// Subtract `tool` from `base`.
///
/// Both lofts share the z axis and the polar-angle point matching, so when
/// the tool's end profiles lie in the same planes and strictly inside the
/// base's end profiles, the tool is strictly inside the base at every height
/// and the difference is the hollow shell between the two walls. Any other
/// configuration would need general surface intersection and is rejected.
pub fn subtract(base: &Loft, tool: &Loft) -> PipeResult<Solid> {
    for (outer, inner, end) in [
        (base.bottom(), tool.bottom(), "bottom"),
        (base.top(), tool.top(), "top"),
    ] {
        if outer.z != inner.z {
            return Err(PipeError::construction(format!(
                "{end} planes differ (z={} vs z={}); only coplanar loft ends can be subtracted",
                outer.z, inner.z
            )));
        }
        if !outer.strictly_contains(inner) {
            return Err(PipeError::construction(format!(
                "{end} profile of the subtracted loft is not strictly inside the base; \
                 the difference would not be a closed manifold shell"
            )));
        }
    }

    debug!(
        base_height = base.height(),
        "subtracting coaxial loft, result is a hollow shell"
    );
    Ok(Solid::Shell {
        outer: *base,
        inner: *tool,
    })
}

impl Loft {
    /// Boolean difference `self - tool`
    pub fn difference(&self, tool: &Loft) -> PipeResult<Solid> {
        subtract(self, tool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Profile;

    fn loft(r: f64, hw: f64, hh: f64) -> Loft {
        Loft::new(Profile::circle(r, 0.0), Profile::rectangle(hw, hh, 60.0)).unwrap()
    }

    #[test]
    fn nested_lofts_give_shell() {
        let solid = loft(10.0, 25.0, 15.0).difference(&loft(9.0, 24.0, 14.0)).unwrap();
        assert!(solid.is_hollow());
        assert_eq!(solid.profiles().len(), 4);
        assert_eq!(solid.z_range(), (0.0, 60.0));
    }

    #[test]
    fn touching_profiles_fail() {
        let result = loft(10.0, 25.0, 15.0).difference(&loft(10.0, 24.0, 14.0));
        assert!(matches!(result, Err(PipeError::GeometryConstruction { .. })));
    }

    #[test]
    fn crossing_profiles_fail() {
        let result = loft(10.0, 25.0, 15.0).difference(&loft(9.0, 26.0, 14.0));
        assert!(result.is_err());
    }

    #[test]
    fn misaligned_planes_fail() {
        let tool = Loft::new(Profile::circle(9.0, 1.0), Profile::rectangle(24.0, 14.0, 60.0))
            .unwrap();
        let result = loft(10.0, 25.0, 15.0).difference(&tool);
        assert!(result.unwrap_err().to_string().contains("planes differ"));
    }
}
