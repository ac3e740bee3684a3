// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! STL mesh export

use crate::error::{PipeError, PipeResult};
use crate::geometry::Mesh;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// STL flavour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StlFormat {
    #[default]
    Binary,
    Ascii,
}

/// A mesh together with the file it was written to
#[derive(Debug, Clone)]
pub struct MeshAsset {
    pub mesh: Mesh,
    pub path: PathBuf,
    pub file_name: String,
}

/// Export mesh to binary STL format
pub fn export_stl(mesh: &Mesh, path: &Path) -> PipeResult<()> {
    export_stl_with_format(mesh, path, StlFormat::Binary)
}

/// Export mesh to `path`, writing through a temporary file in the same
/// directory so a failed write never leaves a truncated file behind.
pub fn export_stl_with_format(mesh: &Mesh, path: &Path, format: StlFormat) -> PipeResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| PipeError::export(dir, e))?;

    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        match format {
            StlFormat::Binary => write_stl_binary(mesh, &mut writer),
            StlFormat::Ascii => write_stl_ascii(mesh, &mut writer),
        }
        .and_then(|_| writer.flush())
        .map_err(|e| PipeError::export(path, e))?;
    }

    tmp.as_file()
        .sync_all()
        .map_err(|e| PipeError::export(path, e))?;
    tmp.persist(path)
        .map_err(|e| PipeError::export(path, e.error))?;
    Ok(())
}

/// Write `mesh` as `file_name` inside `dir`, creating the directory first
pub fn write_mesh_asset(mesh: Mesh, dir: &Path, file_name: &str) -> PipeResult<MeshAsset> {
    fs::create_dir_all(dir).map_err(|e| PipeError::export(dir, e))?;
    let path = dir.join(file_name);
    export_stl(&mesh, &path)?;
    debug!(
        path = %path.display(),
        triangles = mesh.triangle_count(),
        "wrote STL artifact"
    );
    Ok(MeshAsset {
        mesh,
        path,
        file_name: file_name.to_string(),
    })
}

fn facets(mesh: &Mesh) -> impl Iterator<Item = ([f32; 3], [[f32; 3]; 3])> + '_ {
    mesh.triangles.iter().map(|tri| {
        let normal = mesh.face_normal(tri);
        let positions = mesh
            .triangle_positions(tri)
            .map(|p| [p.x as f32, p.y as f32, p.z as f32]);
        ([normal.x as f32, normal.y as f32, normal.z as f32], positions)
    })
}

fn write_stl_binary<W: Write>(mesh: &Mesh, writer: &mut W) -> std::io::Result<()> {
    use stl_io::{Normal, Triangle as StlTriangle, Vertex as StlVertex};

    let triangles: Vec<StlTriangle> = facets(mesh)
        .map(|(normal, [v0, v1, v2])| StlTriangle {
            normal: Normal::new(normal),
            vertices: [StlVertex::new(v0), StlVertex::new(v1), StlVertex::new(v2)],
        })
        .collect();

    stl_io::write_stl(writer, triangles.iter())
}

fn write_stl_ascii<W: Write>(mesh: &Mesh, writer: &mut W) -> std::io::Result<()> {
    writeln!(writer, "solid mesh")?;

    for (normal, vertices) in facets(mesh) {
        writeln!(
            writer,
            "  facet normal {} {} {}",
            normal[0], normal[1], normal[2]
        )?;
        writeln!(writer, "    outer loop")?;
        for v in vertices {
            writeln!(writer, "      vertex {} {} {}", v[0], v[1], v[2])?;
        }
        writeln!(writer, "    endloop")?;
        writeln!(writer, "  endfacet")?;
    }

    writeln!(writer, "endsolid mesh")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{tessellate, Loft, Profile, Solid};

    fn box_mesh() -> Mesh {
        let loft = Loft::new(
            Profile::rectangle(5.0, 5.0, 0.0),
            Profile::rectangle(5.0, 5.0, 10.0),
        )
        .unwrap();
        tessellate(&Solid::Loft(loft)).unwrap()
    }

    #[test]
    fn test_export_stl() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("box.stl");
        let mesh = box_mesh();

        export_stl(&mesh, &path)?;

        // 80 byte header, u32 count, 50 bytes per facet
        let len = fs::metadata(&path)?.len();
        assert_eq!(len, 84 + 50 * mesh.triangle_count() as u64);
        // Only the final file remains in the directory
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_export_ascii() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("box.stl");
        let mesh = box_mesh();

        export_stl_with_format(&mesh, &path, StlFormat::Ascii)?;

        let text = fs::read_to_string(&path)?;
        assert!(text.starts_with("solid mesh"));
        assert_eq!(text.matches("endfacet").count(), mesh.triangle_count());
        Ok(())
    }

    #[test]
    fn asset_directory_is_created() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let nested = dir.path().join("abc").join("def");
        let asset = write_mesh_asset(box_mesh(), &nested, "box.stl")?;
        assert_eq!(asset.path, nested.join("box.stl"));
        assert!(asset.path.exists());
        Ok(())
    }

    #[test]
    fn unwritable_destination_is_export_error() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let blocker = dir.path().join("taken");
        fs::write(&blocker, b"not a directory")?;

        let err = write_mesh_asset(box_mesh(), &blocker.join("sub"), "box.stl").unwrap_err();
        assert!(matches!(err, PipeError::Export { .. }));
        Ok(())
    }
}
