// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL importer for reading generated artifacts back

use crate::geometry::{Mesh, Triangle, Vertex};
use anyhow::{Context, Result};
use nalgebra::Point3;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Read an STL file (binary or ASCII) into an indexed mesh.
///
/// Coincident vertices are merged by the reader, so a closed mesh written by
/// the exporter reads back closed.
pub fn import_stl(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open STL file: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let stl = stl_io::read_stl(&mut reader)
        .with_context(|| format!("Failed to parse STL file: {}", path.display()))?;

    let mut mesh = Mesh::with_capacity(stl.vertices.len(), stl.faces.len());
    for v in &stl.vertices {
        mesh.add_vertex(Vertex::at(Point3::new(v[0] as f64, v[1] as f64, v[2] as f64)));
    }
    for face in &stl.faces {
        mesh.add_triangle(Triangle::new(face.vertices));
    }
    mesh.recompute_normals();
    Ok(mesh)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_import_ascii_stl() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            "solid t\n\
             facet normal 0 0 1\n outer loop\n\
             vertex 0 0 0\n vertex 1 0 0\n vertex 0 1 0\n endloop\nendfacet\n\
             facet normal 0 0 1\n outer loop\n\
             vertex 1 0 0\n vertex 1 1 0\n vertex 0 1 0\n endloop\nendfacet\n\
             endsolid t\n"
        )?;

        let mesh = import_stl(file.path())?;
        assert_eq!(mesh.triangle_count(), 2);
        // Shared corners are merged
        assert_eq!(mesh.vertex_count(), 4);
        Ok(())
    }

    #[test]
    fn missing_file_is_reported() {
        let err = import_stl("/nonexistent/duct.stl").unwrap_err();
        assert!(err.to_string().contains("Failed to open STL file"));
    }
}
