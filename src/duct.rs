// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Hollow circle-to-rectangle transition duct
//!
//! The wall is produced by shrinking both end profiles by the wall thickness
//! and subtracting the inner loft from the outer one. Thickness is exact in
//! the two end planes only; along the transition it is the linear blend of
//! the end offsets, not a true offset surface.

use crate::cache::BuildOutput;
use crate::error::PipeResult;
use crate::geometry::{tessellate, Loft, Profile, Solid};
use crate::io::{write_mesh_asset, MeshAsset};
use crate::params::DuctParameters;
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Material tag reported for every duct artifact
pub const DUCT_MATERIAL: &str = "metal";

/// Build the hollow duct solid. Nothing is constructed when the parameters
/// are invalid.
pub fn build_duct(params: &DuctParameters) -> PipeResult<Solid> {
    params.validate()?;

    let (hw, hh) = params.outer_half_extents();
    let (inner_hw, inner_hh) = params.inner_half_extents();

    let outer = Loft::new(
        Profile::circle(params.circular_radius, 0.0),
        Profile::rectangle(hw, hh, params.length),
    )?;
    let inner = Loft::new(
        Profile::circle(params.inner_radius(), 0.0),
        Profile::rectangle(inner_hw, inner_hh, params.length),
    )?;

    debug!(?params, "lofted outer and inner duct profiles");
    outer.difference(&inner)
}

/// Build, tessellate and export one duct into `dir`
pub fn generate_duct(params: &DuctParameters, dir: &Path) -> PipeResult<MeshAsset> {
    let solid = build_duct(params)?;
    let mesh = tessellate(&solid)?;
    drop(solid);
    let asset = write_mesh_asset(mesh, dir, &params.file_name())?;
    info!(
        file = %asset.path.display(),
        triangles = asset.mesh.triangle_count(),
        "generated duct mesh"
    );
    Ok(asset)
}

/// Descriptor metadata for a generated duct, in the shape the viewer consumes
#[derive(Debug, Clone, Serialize)]
pub struct DuctMetadata {
    pub parameters: DuctParameters,
    pub min: [f64; 3],
    pub max: [f64; 3],
    pub center: [f64; 3],
    pub size: [f64; 3],
    pub materials: Vec<&'static str>,
    pub triangles: usize,
    pub vertices: usize,
    pub volume: f64,
}

impl DuctMetadata {
    pub fn from_asset(params: &DuctParameters, asset: &MeshAsset) -> Self {
        let bbox = asset.mesh.bounding_box();
        let stats = crate::geometry::analyze(&asset.mesh);
        Self {
            parameters: *params,
            min: bbox.min.coords.into(),
            max: bbox.max.coords.into(),
            center: bbox.center().coords.into(),
            size: bbox.size().into(),
            materials: vec![DUCT_MATERIAL],
            triangles: stats.triangle_count,
            vertices: stats.vertex_count,
            volume: stats.volume,
        }
    }
}

/// Cache builder for a duct: generate into the result directory and describe it
pub fn duct_builder(params: DuctParameters) -> impl FnOnce(&Path) -> PipeResult<BuildOutput> {
    move |dir| {
        let asset = generate_duct(&params, dir)?;
        let metadata = DuctMetadata::from_asset(&params, &asset);
        BuildOutput::new(vec![asset.file_name], &metadata)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipeError;

    #[test]
    fn builds_shell_for_default_parameters() {
        let solid = build_duct(&DuctParameters::default()).unwrap();
        match solid {
            Solid::Shell { outer, inner } => {
                assert_eq!(*outer.bottom(), Profile::circle(10.0, 0.0));
                assert_eq!(*outer.top(), Profile::rectangle(25.0, 15.0, 60.0));
                assert_eq!(*inner.bottom(), Profile::circle(9.0, 0.0));
                assert_eq!(*inner.top(), Profile::rectangle(24.0, 14.0, 60.0));
            }
            other => panic!("expected a shell, got {other:?}"),
        }
    }

    #[test]
    fn invalid_parameters_write_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("result");
        let params = DuctParameters {
            wall_thickness: 12.0,
            ..Default::default()
        };
        let err = generate_duct(&params, &target).unwrap_err();
        assert!(matches!(err, PipeError::InvalidGeometryParameters { .. }));
        assert!(!target.exists());
    }

    #[test]
    fn metadata_reports_bounding_box() {
        let dir = tempfile::tempdir().unwrap();
        let params = DuctParameters::default();
        let asset = generate_duct(&params, dir.path()).unwrap();
        let metadata = DuctMetadata::from_asset(&params, &asset);

        assert_eq!(metadata.min, [-25.0, -15.0, 0.0]);
        assert_eq!(metadata.max, [25.0, 15.0, 60.0]);
        assert_eq!(metadata.size, [50.0, 30.0, 60.0]);
        assert_eq!(metadata.center, [0.0, 0.0, 30.0]);
        assert_eq!(metadata.materials, vec!["metal"]);
        assert!(metadata.volume > 0.0);
    }
}
