// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Round-trip export/import tests

use anyhow::Result;
use pipemesh::geometry::analyze;
use pipemesh::io::{compare_meshes, export_stl_with_format, StlFormat};
use pipemesh::{export_stl, import_stl, render_duct, DuctParameters};

#[test]
fn test_roundtrip_stl_export() -> Result<()> {
    let original = render_duct(&DuctParameters::default())?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("duct.stl");

    export_stl(&original, &path)?;
    let imported = import_stl(&path)?;

    let comparison = compare_meshes(&original, &imported, 1e-4);
    println!("{comparison:?}");
    assert!(comparison.passed);
    assert!(analyze(&imported).is_watertight);
    Ok(())
}

#[test]
fn test_roundtrip_ascii_export() -> Result<()> {
    let original = render_duct(&DuctParameters::new(2.0, 15.0, 40.0, 40.0, 25.0))?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("duct_ascii.stl");

    export_stl_with_format(&original, &path, StlFormat::Ascii)?;
    let imported = import_stl(&path)?;

    assert_eq!(imported.triangle_count(), original.triangle_count());
    assert!(analyze(&imported).is_watertight);
    Ok(())
}
