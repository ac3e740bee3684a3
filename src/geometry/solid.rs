// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Boundary-represented solids produced by the duct builder

use super::{Loft, Profile};

/// In-memory B-rep solid.
///
/// Owned by the build that created it and dropped after tessellation.
#[derive(Debug, Clone, PartialEq)]
pub enum Solid {
    /// A full lofted body bounded by its wall and two planar caps
    Loft(Loft),
    /// `outer` minus `inner`: outer wall, inward-facing inner wall and two annular caps
    Shell { outer: Loft, inner: Loft },
}

impl Solid {
    /// Every cross-section profile of the solid
    pub fn profiles(&self) -> Vec<&Profile> {
        match self {
            Self::Loft(loft) => loft.profiles().to_vec(),
            Self::Shell { outer, inner } => {
                let mut profiles = outer.profiles().to_vec();
                profiles.extend(inner.profiles());
                profiles
            }
        }
    }

    pub fn z_range(&self) -> (f64, f64) {
        let loft = match self {
            Self::Loft(loft) => loft,
            Self::Shell { outer, .. } => outer,
        };
        (loft.bottom().z, loft.top().z)
    }

    pub fn is_hollow(&self) -> bool {
        matches!(self, Self::Shell { .. })
    }
}
